//! In-memory view of one directory slot.

use alloc::string::String;

use crate::error::DirError;

/// Kind of node a directory slot describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
    /// No usable backing data (volume labels, malformed slots).
    Unknown,
}

/// Handle to an entry held by a [`Volume`](crate::Volume).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) usize);

/// A file or directory as seen through its parent's directory data.
///
/// Entries are snapshots: the bytes on disk stay authoritative and a
/// re-read of the parent produces fresh entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    name:          String,
    entry_type:    EntryType,
    // FAT cannot describe files of 4 GiB or more.
    size:          u32,
    // 0 when nothing is allocated (empty files, `..` of a root child).
    first_cluster: u32,
    header_offset: u32,
    parent:        Option<EntryId>,
}

impl DirectoryEntry {
    /// Entry backed by the 32-byte header at `header_offset` in the parent's data.
    pub fn new(
        name: impl Into<String>,
        entry_type: EntryType,
        size: u32,
        first_cluster: u32,
        header_offset: u32,
        parent: Option<EntryId>,
    ) -> Result<Self, DirError> {
        if first_cluster < 2 {
            return Err(DirError::InvalidFirstCluster(first_cluster));
        }
        Ok(Self {
            name: name.into(),
            entry_type,
            size,
            first_cluster,
            header_offset,
            parent,
        })
    }

    /// Entry whose header names no data cluster, such as an empty file.
    ///
    /// Reading its data yields nothing.
    pub fn without_data(
        name: impl Into<String>,
        entry_type: EntryType,
        size: u32,
        header_offset: u32,
        parent: Option<EntryId>,
    ) -> Self {
        Self { name: name.into(), entry_type, size, first_cluster: 0, header_offset, parent }
    }

    /// Directory handle built from a known cluster, without a header of its own.
    pub fn directory(
        name: impl Into<String>,
        first_cluster: u32,
        parent: Option<EntryId>,
    ) -> Result<Self, DirError> {
        Self::new(name, EntryType::Directory, 0, first_cluster, 0, parent)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn is_directory(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// First cluster of the data, 0 if the entry has none.
    pub fn first_cluster(&self) -> u32 {
        self.first_cluster
    }

    pub fn has_data(&self) -> bool {
        self.first_cluster != 0
    }

    /// Byte offset of this entry's header inside the parent's directory data.
    pub fn header_offset(&self) -> u32 {
        self.header_offset
    }

    pub fn parent(&self) -> Option<EntryId> {
        self.parent
    }

    pub(crate) fn set_cached_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_cached_size(&mut self, size: u32) {
        self.size = size;
    }
}
