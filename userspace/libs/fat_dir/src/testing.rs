//! Test backends and slot builders.

extern crate std;

use std::collections::HashMap;
use std::io::Cursor;
use std::vec;
use std::vec::Vec;

use crate::metadata::{DIR_ENTRY_SIZE, LFN_LAST_FRAGMENT, LFN_PADDING};
use crate::storage::{ClusterStore, StorageError};

// ─── In-memory cluster store ───────────────────────────────────────────────────

/// One buffer per cluster, single-cluster chains only.
pub struct MemStore {
    clusters:     HashMap<u32, Vec<u8>>,
    cluster_size: usize,
    next_free:    u32,
    exhausted:    bool,
    pub reads:    usize,
    pub writes:   usize,
}

impl MemStore {
    /// Root directory lives in cluster 2, allocation starts at 3.
    pub fn new(cluster_size: usize) -> Self {
        let mut clusters = HashMap::new();
        clusters.insert(2, vec![0u8; cluster_size]);
        Self { clusters, cluster_size, next_free: 3, exhausted: false, reads: 0, writes: 0 }
    }

    /// Fills `cluster` with `slots` followed by zeroed (free) slots.
    pub fn with_slots(mut self, cluster: u32, slots: &[[u8; DIR_ENTRY_SIZE]]) -> Self {
        self.clusters.insert(cluster, directory_data(slots, self.cluster_size));
        if cluster >= self.next_free {
            self.next_free = cluster + 1;
        }
        self
    }

    /// Stores `data` verbatim, whatever its length.
    pub fn with_bytes(mut self, cluster: u32, data: Vec<u8>) -> Self {
        self.clusters.insert(cluster, data);
        self
    }

    pub fn without_free_clusters(mut self) -> Self {
        self.exhausted = true;
        self
    }

    pub fn cluster(&self, cluster: u32) -> &[u8] {
        &self.clusters[&cluster]
    }

    pub fn io_count(&self) -> usize {
        self.reads + self.writes
    }
}

impl ClusterStore for MemStore {
    fn read_cluster(&mut self, cluster: u32) -> Result<Vec<u8>, StorageError> {
        self.reads += 1;
        self.clusters.get(&cluster).cloned().ok_or(StorageError::InvalidCluster(cluster))
    }

    fn write_cluster(&mut self, cluster: u32, data: &[u8]) -> Result<(), StorageError> {
        self.writes += 1;
        let buf = self.clusters.get_mut(&cluster).ok_or(StorageError::InvalidCluster(cluster))?;
        if buf.len() != data.len() {
            return Err(StorageError::LengthMismatch { expected: buf.len(), actual: data.len() });
        }
        buf.copy_from_slice(data);
        Ok(())
    }

    fn allocate_next_free_cluster(&mut self) -> Result<u32, StorageError> {
        if self.exhausted {
            return Err(StorageError::NoFreeCluster);
        }
        let cluster = self.next_free;
        self.next_free += 1;
        // Left dirty so tests can see the directory layer clears it.
        self.clusters.insert(cluster, vec![0xAA; self.cluster_size]);
        Ok(cluster)
    }
}

// ─── FAT32 image store ─────────────────────────────────────────────────────────

const FAT_ENTRY_MASK: u32 = 0x0FFF_FFFF;
const FAT_END_OF_CHAIN: u32 = 0x0FFF_FFF8;

/// Cluster access over a raw FAT32 image, following chains through the FAT.
pub struct ImageStore {
    image:          Vec<u8>,
    cluster_size:   usize,
    fat_offset:     usize,
    fat_size:       usize,
    fat_count:      usize,
    data_offset:    usize,
    cluster_count:  u32,
    root_cluster:   u32,
}

impl ImageStore {
    /// Fresh FAT32 image formatted by `fatfs`.
    ///
    /// FAT32 needs at least 65 525 data clusters; at 512 bytes per cluster
    /// that puts the floor around 34 MB, so 40 MB it is.
    pub fn format() -> Self {
        const SIZE: usize = 40 * 1024 * 1024;
        let mut cursor = Cursor::new(vec![0u8; SIZE]);
        fatfs::format_volume(
            &mut cursor,
            fatfs::FormatVolumeOptions::new().fat_type(fatfs::FatType::Fat32),
        ).expect("format_volume failed");
        Self::from_image(cursor.into_inner())
    }

    pub fn from_image(image: Vec<u8>) -> Self {
        let u16_at = |o: usize| u16::from_le_bytes([image[o], image[o + 1]]) as usize;
        let u32_at = |o: usize| u32::from_le_bytes([image[o], image[o + 1], image[o + 2], image[o + 3]]);

        let bytes_per_sector = u16_at(11);
        let sectors_per_cluster = image[13] as usize;
        let reserved = u16_at(14);
        let fat_count = image[16] as usize;
        let total_sectors = match u16_at(19) {
            0 => u32_at(32) as usize,
            n => n,
        };
        let fat_sectors = u32_at(36) as usize;
        let data_sector = reserved + fat_count * fat_sectors;
        let root_cluster = u32_at(44);

        Self {
            cluster_size: bytes_per_sector * sectors_per_cluster,
            fat_offset: reserved * bytes_per_sector,
            fat_size: fat_sectors * bytes_per_sector,
            fat_count,
            data_offset: data_sector * bytes_per_sector,
            cluster_count: ((total_sectors - data_sector) / sectors_per_cluster) as u32,
            root_cluster,
            image,
        }
    }

    pub fn root_cluster(&self) -> u32 {
        self.root_cluster
    }

    /// Mounts the image with `fatfs` for the duration of `f`.
    pub fn with_fs<R>(&mut self, f: impl FnOnce(&fatfs::FileSystem<Cursor<&mut Vec<u8>>>) -> R) -> R {
        let fs = fatfs::FileSystem::new(Cursor::new(&mut self.image), fatfs::FsOptions::new())
            .expect("FileSystem::new failed");
        f(&fs)
    }

    fn fat_entry(&self, cluster: u32) -> u32 {
        let o = self.fat_offset + cluster as usize * 4;
        u32::from_le_bytes([self.image[o], self.image[o + 1], self.image[o + 2], self.image[o + 3]])
            & FAT_ENTRY_MASK
    }

    fn set_fat_entry(&mut self, cluster: u32, value: u32) {
        for copy in 0..self.fat_count {
            let o = self.fat_offset + copy * self.fat_size + cluster as usize * 4;
            self.image[o..o + 4].copy_from_slice(&value.to_le_bytes());
        }
    }

    fn is_valid(&self, cluster: u32) -> bool {
        cluster >= 2 && cluster < self.cluster_count + 2
    }

    fn chain(&self, start: u32) -> Result<Vec<u32>, StorageError> {
        if !self.is_valid(start) {
            return Err(StorageError::InvalidCluster(start));
        }
        let mut chain = vec![start];
        let mut current = start;
        loop {
            let next = self.fat_entry(current);
            if next >= FAT_END_OF_CHAIN || !self.is_valid(next) {
                break;
            }
            if chain.len() > self.cluster_count as usize {
                return Err(StorageError::IoError);
            }
            chain.push(next);
            current = next;
        }
        Ok(chain)
    }

    fn cluster_range(&self, cluster: u32) -> core::ops::Range<usize> {
        let start = self.data_offset + (cluster as usize - 2) * self.cluster_size;
        start..start + self.cluster_size
    }
}

impl ClusterStore for ImageStore {
    fn read_cluster(&mut self, cluster: u32) -> Result<Vec<u8>, StorageError> {
        let mut data = Vec::new();
        for c in self.chain(cluster)? {
            data.extend_from_slice(&self.image[self.cluster_range(c)]);
        }
        Ok(data)
    }

    fn write_cluster(&mut self, cluster: u32, data: &[u8]) -> Result<(), StorageError> {
        let chain = self.chain(cluster)?;
        let expected = chain.len() * self.cluster_size;
        if data.len() != expected {
            return Err(StorageError::LengthMismatch { expected, actual: data.len() });
        }
        for (c, chunk) in chain.into_iter().zip(data.chunks_exact(self.cluster_size)) {
            let range = self.cluster_range(c);
            self.image[range].copy_from_slice(chunk);
        }
        Ok(())
    }

    fn allocate_next_free_cluster(&mut self) -> Result<u32, StorageError> {
        let cluster = (2..self.cluster_count + 2)
            .find(|&c| self.fat_entry(c) == 0)
            .ok_or(StorageError::NoFreeCluster)?;
        self.set_fat_entry(cluster, FAT_ENTRY_MASK);
        Ok(cluster)
    }
}

// ─── Slot builders ─────────────────────────────────────────────────────────────

/// Positions of the 13 name units inside a long-name fragment.
const LFN_UNIT_OFFSETS: [usize; 13] = [1, 3, 5, 7, 9, 14, 16, 18, 20, 22, 24, 28, 30];

/// Short slot with the given 11-byte name, attribute byte, first cluster and size.
pub fn short_slot(name: &[u8; 11], attr: u8, cluster: u32, size: u32) -> [u8; DIR_ENTRY_SIZE] {
    let mut slot = [0u8; DIR_ENTRY_SIZE];
    slot[..11].copy_from_slice(name);
    slot[11] = attr;
    slot[20..22].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
    slot[26..28].copy_from_slice(&(cluster as u16).to_le_bytes());
    slot[28..32].copy_from_slice(&size.to_le_bytes());
    slot
}

/// Long-name fragment holding up to 13 `units`, NUL-terminated and
/// `0xFFFF`-padded when shorter.
pub fn lfn_slot(ordinal: u8, units: &[u16]) -> [u8; DIR_ENTRY_SIZE] {
    assert!(units.len() <= LFN_UNIT_OFFSETS.len());
    let mut slot = [0u8; DIR_ENTRY_SIZE];
    slot[0] = ordinal;
    slot[11] = 0x0F;
    for (i, &offset) in LFN_UNIT_OFFSETS.iter().enumerate() {
        let unit = match i.cmp(&units.len()) {
            core::cmp::Ordering::Less => units[i],
            core::cmp::Ordering::Equal => 0,
            core::cmp::Ordering::Greater => LFN_PADDING,
        };
        slot[offset..offset + 2].copy_from_slice(&unit.to_le_bytes());
    }
    slot
}

/// Fragments spelling `name`, in on-disk order (last fragment first).
pub fn lfn_slots(name: &str) -> Vec<[u8; DIR_ENTRY_SIZE]> {
    let units: Vec<u16> = name.encode_utf16().collect();
    let chunks: Vec<&[u16]> = units.chunks(13).collect();
    let last = chunks.len();
    chunks
        .iter()
        .enumerate()
        .rev()
        .map(|(i, chunk)| {
            let ordinal = (i + 1) as u8 | if i + 1 == last { LFN_LAST_FRAGMENT } else { 0 };
            lfn_slot(ordinal, chunk)
        })
        .collect()
}

/// `slots` laid out back to back, zero-filled up to `capacity` bytes.
pub fn directory_data(slots: &[[u8; DIR_ENTRY_SIZE]], capacity: usize) -> Vec<u8> {
    let mut data = vec![0u8; capacity];
    for (i, slot) in slots.iter().enumerate() {
        data[i * DIR_ENTRY_SIZE..(i + 1) * DIR_ENTRY_SIZE].copy_from_slice(slot);
    }
    data
}
