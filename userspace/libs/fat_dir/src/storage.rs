//! Cluster-level storage seam.
//!
//! The directory layer never touches sectors or the FAT itself. Whatever sits
//! underneath (a block device driver, an image file, a test buffer) implements
//! [`ClusterStore`], which keeps the layer unit-testable with an in-memory mock.

use alloc::vec::Vec;
use core::fmt;

/// Byte access to cluster chains plus free-cluster allocation.
pub trait ClusterStore {
    /// Full contents of the chain starting at `cluster`.
    fn read_cluster(&mut self, cluster: u32) -> Result<Vec<u8>, StorageError>;

    /// Overwrite the chain starting at `cluster`. `data` must match the chain's capacity.
    fn write_cluster(&mut self, cluster: u32, data: &[u8]) -> Result<(), StorageError>;

    /// Claim an unused cluster and mark it as the end of a one-cluster chain.
    fn allocate_next_free_cluster(&mut self) -> Result<u32, StorageError>;
}

impl<T: ClusterStore + ?Sized> ClusterStore for &mut T {
    fn read_cluster(&mut self, cluster: u32) -> Result<Vec<u8>, StorageError> {
        (**self).read_cluster(cluster)
    }
    fn write_cluster(&mut self, cluster: u32, data: &[u8]) -> Result<(), StorageError> {
        (**self).write_cluster(cluster, data)
    }
    fn allocate_next_free_cluster(&mut self) -> Result<u32, StorageError> {
        (**self).allocate_next_free_cluster()
    }
}

/// Failures reported by a [`ClusterStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Reserved (0/1) or out-of-volume cluster number.
    InvalidCluster(u32),
    LengthMismatch { expected: usize, actual: usize },
    NoFreeCluster,
    IoError,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::InvalidCluster(c) => write!(f, "invalid cluster number {c}"),
            StorageError::LengthMismatch { expected, actual } => {
                write!(f, "chain holds {expected} bytes, got {actual}")
            }
            StorageError::NoFreeCluster => f.write_str("no free cluster left on the volume"),
            StorageError::IoError => f.write_str("storage I/O error"),
        }
    }
}

impl core::error::Error for StorageError {}
