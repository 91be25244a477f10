use core::fmt;

use crate::storage::StorageError;

/// Errors returned by the directory layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirError {
    /// Clusters 0 and 1 are reserved and never start a chain.
    InvalidFirstCluster(u32),
    /// Raw data access on an entry of type `Unknown`.
    InvalidEntryType,
    /// `Unknown` passed where a file or directory kind is required.
    UnknownEntryType,
    NotADirectory,
    /// The id was not issued by this volume.
    NoSuchEntry,
    /// Data write to an entry that owns no cluster yet.
    NoDataCluster,
    /// Name is empty or does not survive the 8.3 layout unchanged.
    InvalidShortName,
    /// Field mutation on an entry with no parent directory to write into.
    NoParent,
    /// Every slot of the directory is in use.
    NoFreeSlot,
    /// Creating file entries is not available in this layer.
    FileCreationUnsupported,
    AlreadyExists,
    /// The slot window falls outside the parent's directory data.
    SlotOutOfRange { offset: usize, len: usize, available: usize },
    Storage(StorageError),
}

impl From<StorageError> for DirError {
    fn from(err: StorageError) -> Self {
        DirError::Storage(err)
    }
}

impl fmt::Display for DirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirError::InvalidFirstCluster(c) => write!(f, "first cluster {c} is reserved"),
            DirError::InvalidEntryType => f.write_str("invalid directory entry type"),
            DirError::UnknownEntryType => f.write_str("unknown directory entry type"),
            DirError::NotADirectory => f.write_str("entry is not a directory"),
            DirError::NoSuchEntry => f.write_str("no such entry in this volume"),
            DirError::NoDataCluster => f.write_str("entry has no data cluster"),
            DirError::InvalidShortName => f.write_str("name does not fit the 8.3 layout"),
            DirError::NoParent => f.write_str("entry has no parent directory"),
            DirError::NoFreeSlot => f.write_str("failed to find an unallocated directory entry"),
            DirError::FileCreationUnsupported => {
                f.write_str("creating new files is currently not implemented")
            }
            DirError::AlreadyExists => f.write_str("an entry with that name already exists"),
            DirError::SlotOutOfRange { offset, len, available } => write!(
                f,
                "slot bytes {offset}..{} exceed directory data of {available} bytes",
                offset + len
            ),
            DirError::Storage(err) => write!(f, "storage: {err}"),
        }
    }
}

impl core::error::Error for DirError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            DirError::Storage(err) => Some(err),
            _ => None,
        }
    }
}
