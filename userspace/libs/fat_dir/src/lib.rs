// Library crate root. No_std when not testing (e.g. `cargo check --target x86_64-unknown-none`).
#![cfg_attr(not(test), no_std)]

//! FAT directory layer: decodes the 32-byte directory slots of a FAT volume
//! (including VFAT long names) into entry nodes, and edits those slots in place.
//!
//! Cluster-level I/O is supplied by the caller through [`ClusterStore`].

extern crate alloc;

pub mod entry;
pub mod error;
pub mod lfn;
pub mod listing;
pub mod metadata;
pub mod short_name;
pub mod storage;
pub mod volume;

#[cfg(test)]
mod testing;

pub use entry::{DirectoryEntry, EntryId, EntryType};
pub use error::DirError;
pub use listing::{ListedEntry, decode_listing, find_free_slot};
pub use metadata::{Attributes, DIR_ENTRY_SIZE, FieldLocation, MetadataField};
pub use storage::{ClusterStore, StorageError};
pub use volume::Volume;
