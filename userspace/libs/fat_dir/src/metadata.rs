//! Fixed byte layout of a FAT directory slot.
//!
//! Every field the directory layer reads or writes is addressed through
//! [`MetadataField::location`], so offsets live in exactly one place.

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

// ─── Constants ─────────────────────────────────────────────────────────────────

/// Size of one directory slot in bytes.
pub const DIR_ENTRY_SIZE: usize = 32;

/// Ordinal bit marking the last (first on disk) fragment of a long name.
pub const LFN_LAST_FRAGMENT: u8 = 0x40;

/// Padding unit stored after the terminating NUL of a long name.
pub const LFN_PADDING: u16 = 0xFFFF;

pub(crate) const OFFSET_STATUS:    usize = 0;
pub(crate) const OFFSET_ATTRIBUTE: usize = 11;
pub(crate) const OFFSET_LFN_TYPE:  usize = 12;

// ─── Attribute byte ────────────────────────────────────────────────────────────

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Attributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN    = 0x02;
        const SYSTEM    = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE   = 0x20;

        /// Long-name fragment marker (all four low bits set).
        const LONG_NAME = Self::READ_ONLY.bits()
            | Self::HIDDEN.bits()
            | Self::SYSTEM.bits()
            | Self::VOLUME_ID.bits();

        // Volumes may carry reserved bits
        const _ = !0;
    }
}

impl Attributes {
    /// Only the exact `0x0F` pattern marks a long-name fragment.
    pub fn is_long_name(self) -> bool {
        self == Self::LONG_NAME
    }

    /// The bits that decide what kind of node a short slot describes.
    pub fn kind_bits(self) -> Self {
        self & (Self::DIRECTORY | Self::VOLUME_ID)
    }
}

// ─── Status byte ───────────────────────────────────────────────────────────────

/// Reserved values of a slot's first byte. Any other value `>= 0x20` is a live entry.
#[repr(u8)]
#[derive(Debug, Clone, Copy, TryFromPrimitive, IntoPrimitive, PartialEq, Eq)]
pub enum SlotMarker {
    /// No further slots are in use.
    EndOfDirectory = 0x00,
    /// Stands in for a leading 0xE5 character in the name (Kanji lead byte).
    KanjiEscape    = 0x05,
    Deleted        = 0xE5,
}

// ─── Field table ───────────────────────────────────────────────────────────────

/// Position of a field inside a 32-byte slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLocation {
    pub offset: usize,
    pub len:    usize,
}

impl FieldLocation {
    const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// Byte range of this field for the slot whose header starts at `header`.
    pub fn range(self, header: usize) -> core::ops::Range<usize> {
        header + self.offset..header + self.offset + self.len
    }
}

/// Fields of a short directory slot that can be rewritten in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    ShortName,
    Attributes,
    FirstClusterHigh,
    FirstClusterLow,
    Size,
}

impl MetadataField {
    pub const fn location(self) -> FieldLocation {
        match self {
            MetadataField::ShortName        => FieldLocation::new(0, 11),
            MetadataField::Attributes       => FieldLocation::new(11, 1),
            MetadataField::FirstClusterHigh => FieldLocation::new(20, 2),
            MetadataField::FirstClusterLow  => FieldLocation::new(26, 2),
            MetadataField::Size             => FieldLocation::new(28, 4),
        }
    }
}

// ─── Slot readers ──────────────────────────────────────────────────────────────

pub(crate) fn read_u16(slot: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([slot[offset], slot[offset + 1]])
}

pub(crate) fn read_u32(slot: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([slot[offset], slot[offset + 1], slot[offset + 2], slot[offset + 3]])
}

/// Reads a numeric field of a short slot.
pub(crate) fn read_field(slot: &[u8], field: MetadataField) -> u32 {
    let loc = field.location();
    match loc.len {
        1 => slot[loc.offset] as u32,
        2 => read_u16(slot, loc.offset) as u32,
        _ => read_u32(slot, loc.offset),
    }
}

/// First cluster: high word shifted into the upper half, low word as-is.
pub(crate) fn first_cluster(slot: &[u8]) -> u32 {
    (read_field(slot, MetadataField::FirstClusterHigh) << 16)
        | read_field(slot, MetadataField::FirstClusterLow)
}
