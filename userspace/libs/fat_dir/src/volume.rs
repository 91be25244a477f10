//! Entry arena and the operations that touch directory data.
//!
//! Every field mutation is a full read-modify-write of the parent directory:
//! the whole chain is read, the field bytes are spliced in, and the whole
//! chain is written back. Callers serialize mutations that share a parent.

use alloc::string::String;
use alloc::vec::Vec;

use log::{debug, info};

use crate::entry::{DirectoryEntry, EntryId, EntryType};
use crate::error::DirError;
use crate::listing::{decode_listing, find_free_slot};
use crate::metadata::{
    Attributes, DIR_ENTRY_SIZE, MetadataField, OFFSET_ATTRIBUTE, OFFSET_STATUS, SlotMarker,
};
use crate::short_name;
use crate::storage::ClusterStore;

/// A storage backend plus every entry handed out for it.
///
/// Entries are addressed by [`EntryId`] and refer to their parent by id, so a
/// child never owns its parent. Ids stay valid for the life of the volume.
pub struct Volume<S: ClusterStore> {
    store:   S,
    entries: Vec<DirectoryEntry>,
}

impl<S: ClusterStore> Volume<S> {
    pub fn new(store: S) -> Self {
        Self { store, entries: Vec::new() }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // ─── Arena ─────────────────────────────────────────────────────────────────

    /// Registers a parentless directory handle for the chain at `first_cluster`,
    /// typically the root directory.
    pub fn open_directory(&mut self, name: &str, first_cluster: u32) -> Result<EntryId, DirError> {
        let entry = DirectoryEntry::directory(name, first_cluster, None)?;
        Ok(self.insert(entry))
    }

    pub fn insert(&mut self, entry: DirectoryEntry) -> EntryId {
        self.entries.push(entry);
        EntryId(self.entries.len() - 1)
    }

    /// # Panics
    ///
    /// If `id` was not issued by this volume. Use [`Volume::get`] otherwise.
    pub fn entry(&self, id: EntryId) -> &DirectoryEntry {
        &self.entries[id.0]
    }

    pub fn get(&self, id: EntryId) -> Option<&DirectoryEntry> {
        self.entries.get(id.0)
    }

    pub fn parent(&self, id: EntryId) -> Option<EntryId> {
        self.get(id).and_then(DirectoryEntry::parent)
    }

    fn lookup(&self, id: EntryId) -> Result<&DirectoryEntry, DirError> {
        self.get(id).ok_or(DirError::NoSuchEntry)
    }

    fn lookup_mut(&mut self, id: EntryId) -> Result<&mut DirectoryEntry, DirError> {
        self.entries.get_mut(id.0).ok_or(DirError::NoSuchEntry)
    }

    // ─── Raw data ──────────────────────────────────────────────────────────────

    /// Full contents of the entry's cluster chain, empty if it has no cluster.
    pub fn read_data(&mut self, id: EntryId) -> Result<Vec<u8>, DirError> {
        match self.data_cluster(id)? {
            Some(cluster) => Ok(self.store.read_cluster(cluster)?),
            None => Ok(Vec::new()),
        }
    }

    /// Overwrites the entry's cluster chain. An entry without a cluster only
    /// accepts empty data.
    pub fn write_data(&mut self, id: EntryId, data: &[u8]) -> Result<(), DirError> {
        match self.data_cluster(id)? {
            Some(cluster) => Ok(self.store.write_cluster(cluster, data)?),
            None if data.is_empty() => Ok(()),
            None => Err(DirError::NoDataCluster),
        }
    }

    fn data_cluster(&self, id: EntryId) -> Result<Option<u32>, DirError> {
        let entry = self.lookup(id)?;
        if entry.entry_type() == EntryType::Unknown {
            return Err(DirError::InvalidEntryType);
        }
        Ok(entry.has_data().then(|| entry.first_cluster()))
    }

    // ─── Listing ───────────────────────────────────────────────────────────────

    /// Decodes the directory and registers each child, in on-disk order.
    ///
    /// Every call registers fresh snapshots; ids from earlier calls keep
    /// pointing at the older ones.
    pub fn read_directory(&mut self, dir: EntryId) -> Result<Vec<EntryId>, DirError> {
        if !self.lookup(dir)?.is_directory() {
            return Err(DirError::NotADirectory);
        }
        let data = self.read_data(dir)?;
        decode_listing(&data)
            .into_iter()
            .map(|listed| {
                let entry = if listed.first_cluster < 2 {
                    debug!("{:?} has no data cluster", listed.name);
                    DirectoryEntry::without_data(
                        listed.name,
                        listed.entry_type,
                        listed.size,
                        listed.header_offset,
                        Some(dir),
                    )
                } else {
                    DirectoryEntry::new(
                        listed.name,
                        listed.entry_type,
                        listed.size,
                        listed.first_cluster,
                        listed.header_offset,
                        Some(dir),
                    )?
                };
                Ok(self.insert(entry))
            })
            .collect()
    }

    // ─── Field mutation ────────────────────────────────────────────────────────

    /// Writes the low-order bytes of `value` (little-endian) into `field` of
    /// the entry's header. Bytes past the fourth are zeroed.
    pub fn set_field_value(
        &mut self,
        id: EntryId,
        field: MetadataField,
        value: u32,
    ) -> Result<(), DirError> {
        let bytes = value.to_le_bytes();
        self.splice(id, |data, header| {
            let window = field_window(data, header, field)?;
            for (i, b) in window.iter_mut().enumerate() {
                *b = bytes.get(i).copied().unwrap_or(0);
            }
            Ok(())
        })
    }

    /// Writes `text` narrowly encoded, space-padded or cut to the field length.
    pub fn set_field_text(
        &mut self,
        id: EntryId,
        field: MetadataField,
        text: &str,
    ) -> Result<(), DirError> {
        self.splice(id, |data, header| {
            short_name::encode_narrow(text, field_window(data, header, field)?);
            Ok(())
        })
    }

    /// Renames the entry in place using the 8.3 layout.
    ///
    /// Names that do not fit 8.3 unchanged fail with
    /// [`DirError::InvalidShortName`] before any I/O. Long-name fragments
    /// directly in front of the header are marked deleted in the same write
    /// so the short name takes effect.
    pub fn set_name(&mut self, id: EntryId, name: &str) -> Result<(), DirError> {
        let raw = short_name::encode_exact(name).ok_or(DirError::InvalidShortName)?;
        self.splice(id, |data, header| {
            field_window(data, header, MetadataField::ShortName)?.copy_from_slice(&raw);
            let mut offset = header;
            while offset >= DIR_ENTRY_SIZE {
                offset -= DIR_ENTRY_SIZE;
                let slot = &mut data[offset..offset + DIR_ENTRY_SIZE];
                if !Attributes::from_bits_retain(slot[OFFSET_ATTRIBUTE]).is_long_name() {
                    break;
                }
                slot[OFFSET_STATUS] = SlotMarker::Deleted.into();
            }
            Ok(())
        })?;
        self.lookup_mut(id)?.set_cached_name(String::from(name));
        Ok(())
    }

    pub fn set_size(&mut self, id: EntryId, size: u32) -> Result<(), DirError> {
        self.set_field_value(id, MetadataField::Size, size)?;
        self.lookup_mut(id)?.set_cached_size(size);
        Ok(())
    }

    /// Read the parent's data, let `edit` change the bytes around the entry's
    /// header, write the data back. Empty parent data is left alone.
    fn splice(
        &mut self,
        id: EntryId,
        edit: impl FnOnce(&mut [u8], usize) -> Result<(), DirError>,
    ) -> Result<(), DirError> {
        let entry = self.lookup(id)?;
        let parent = entry.parent().ok_or(DirError::NoParent)?;
        let header = entry.header_offset() as usize;

        let mut data = self.read_data(parent)?;
        if data.is_empty() {
            debug!("parent of {:?} has no data, write skipped", self.lookup(id)?.name());
            return Ok(());
        }
        edit(&mut data, header)?;
        self.write_data(parent, &data)
    }

    // ─── Directory creation ────────────────────────────────────────────────────

    /// Creates a subdirectory `name` inside `parent`.
    ///
    /// Only directories can be created; asking for a file fails with
    /// [`DirError::FileCreationUnsupported`] before any I/O. `name` must fit
    /// the 8.3 layout unchanged.
    pub fn add_directory_entry(
        &mut self,
        parent: EntryId,
        name: &str,
        entry_type: EntryType,
    ) -> Result<EntryId, DirError> {
        match entry_type {
            EntryType::Directory => {}
            EntryType::File => return Err(DirError::FileCreationUnsupported),
            EntryType::Unknown => return Err(DirError::UnknownEntryType),
        }
        if !self.lookup(parent)?.is_directory() {
            return Err(DirError::NotADirectory);
        }
        let raw = short_name::encode_exact(name).ok_or(DirError::InvalidShortName)?;

        let data = self.read_data(parent)?;
        let taken = decode_listing(&data)
            .iter()
            .any(|existing| short_name::names_match(&existing.name, name));
        if taken {
            return Err(DirError::AlreadyExists);
        }

        // Slot first, so a full directory does not leak a cluster.
        let header = find_free_slot(&data)?;
        let cluster = self.store.allocate_next_free_cluster()?;

        let entry =
            DirectoryEntry::new(name, EntryType::Directory, 0, cluster, header, Some(parent))?;
        let id = self.insert(entry);
        self.allocate_directory_entry(id, &raw)?;
        self.seed_directory(id)?;

        info!("created directory {name:?} at cluster {cluster}, slot {header:#x}");
        Ok(id)
    }

    /// Materializes the header of a new directory in its parent.
    ///
    /// The free-slot check leaves bytes 28..32 unexamined, so the size is
    /// written as well.
    fn allocate_directory_entry(&mut self, id: EntryId, raw: &[u8; 11]) -> Result<(), DirError> {
        let cluster = self.lookup(id)?.first_cluster();

        self.splice(id, |data, header| {
            field_window(data, header, MetadataField::ShortName)?.copy_from_slice(raw);
            Ok(())
        })?;
        self.set_field_value(id, MetadataField::Attributes, Attributes::DIRECTORY.bits().into())?;
        self.set_field_value(id, MetadataField::FirstClusterHigh, cluster >> 16)?;
        self.set_field_value(id, MetadataField::FirstClusterLow, cluster & 0xFFFF)?;
        self.set_field_value(id, MetadataField::Size, 0)
    }

    /// Clears the directory's chain and writes its `.` and `..` entries.
    fn seed_directory(&mut self, id: EntryId) -> Result<(), DirError> {
        let own = self.lookup(id)?.first_cluster();
        // `..` of a directory whose parent is the root points at cluster 0.
        let up = self
            .parent(id)
            .filter(|&p| self.parent(p).is_some())
            .and_then(|p| self.get(p))
            .map_or(0, DirectoryEntry::first_cluster);

        let mut data = self.read_data(id)?;
        if data.len() < 2 * DIR_ENTRY_SIZE {
            return Err(DirError::SlotOutOfRange {
                offset: 0,
                len: 2 * DIR_ENTRY_SIZE,
                available: data.len(),
            });
        }
        data.fill(0);
        data[..DIR_ENTRY_SIZE].copy_from_slice(&dot_slot(".", own));
        data[DIR_ENTRY_SIZE..2 * DIR_ENTRY_SIZE].copy_from_slice(&dot_slot("..", up));
        self.write_data(id, &data)
    }
}

/// Bytes of `field` for the header at `header`, bounds-checked against `data`.
fn field_window(data: &mut [u8], header: usize, field: MetadataField) -> Result<&mut [u8], DirError> {
    let loc = field.location();
    let range = loc.range(header);
    let available = data.len();
    data.get_mut(range.clone()).ok_or(DirError::SlotOutOfRange {
        offset: range.start,
        len: loc.len,
        available,
    })
}

fn dot_slot(name: &str, cluster: u32) -> [u8; DIR_ENTRY_SIZE] {
    let mut slot = [0u8; DIR_ENTRY_SIZE];
    let put = |slot: &mut [u8; DIR_ENTRY_SIZE], field: MetadataField, bytes: &[u8]| {
        slot[field.location().range(0)].copy_from_slice(bytes);
    };
    put(&mut slot, MetadataField::ShortName, &short_name::encode(name));
    put(&mut slot, MetadataField::Attributes, &[Attributes::DIRECTORY.bits()]);
    put(&mut slot, MetadataField::FirstClusterHigh, &((cluster >> 16) as u16).to_le_bytes());
    put(&mut slot, MetadataField::FirstClusterLow, &(cluster as u16).to_le_bytes());
    slot
}
