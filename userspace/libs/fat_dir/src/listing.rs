//! Directory data decoding.
//!
//! A directory's data is a sequence of 32-byte slots. Long-name fragments are
//! collected until the short slot they name, which then yields one entry.
//! Decoding is a pure function of the bytes so it can be tested without any
//! storage underneath.

use alloc::string::String;
use alloc::vec::Vec;
use core::ops::ControlFlow;

use log::{debug, warn};

use crate::entry::EntryType;
use crate::error::DirError;
use crate::lfn::{self, PendingLongName};
use crate::metadata::{
    self, Attributes, DIR_ENTRY_SIZE, MetadataField, OFFSET_ATTRIBUTE, OFFSET_STATUS, SlotMarker,
};
use crate::short_name;

/// Status bytes below this value that are not markers are never valid names.
const FIRST_NAME_BYTE: u8 = 0x20;

/// Words probed by [`find_free_slot`], relative to the slot start.
const FREE_SLOT_PROBES: [usize; 4] = [0, 8, 16, 24];

/// One live entry found in a directory's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub name:          String,
    pub entry_type:    EntryType,
    pub size:          u32,
    /// 0 for empty files and for `..` of a root child.
    pub first_cluster: u32,
    /// Offset of the short slot inside the decoded data.
    pub header_offset: u32,
}

#[derive(Default)]
struct Walk {
    pending: PendingLongName,
    entries: Vec<ListedEntry>,
}

impl Walk {
    fn step(mut self, offset: usize, slot: &[u8]) -> ControlFlow<Self, Self> {
        let attrs = Attributes::from_bits_retain(slot[OFFSET_ATTRIBUTE]);
        let status = slot[OFFSET_STATUS];

        #[cfg(feature = "verbose_decode")]
        log::trace!("slot {offset:#06x}: status {status:#04x} attrib {:#04x}", attrs.bits());

        if attrs.is_long_name() {
            self.long_name_fragment(slot);
            return ControlFlow::Continue(self);
        }

        match SlotMarker::try_from(status) {
            Ok(SlotMarker::EndOfDirectory) => {
                debug!("end of directory at {offset:#x}");
                return ControlFlow::Break(self);
            }
            Ok(marker @ (SlotMarker::Deleted | SlotMarker::KanjiEscape)) => {
                debug!("slot {offset:#x}: {marker:?}, skipped");
                return ControlFlow::Continue(self);
            }
            Err(_) if status < FIRST_NAME_BYTE => {
                debug!("slot {offset:#x}: invalid status {status:#04x}, skipped");
                return ControlFlow::Continue(self);
            }
            Err(_) => {}
        }

        self.short_slot(offset, slot, attrs);
        ControlFlow::Continue(self)
    }

    fn long_name_fragment(&mut self, slot: &[u8]) {
        if slot[OFFSET_STATUS] == u8::from(SlotMarker::Deleted) {
            return;
        }
        if !lfn::is_name_fragment(slot) {
            return;
        }
        if lfn::starts_new_name(slot) {
            self.pending.clear();
        }
        self.pending.prepend(&lfn::decode_fragment(slot));
    }

    fn short_slot(&mut self, offset: usize, slot: &[u8], attrs: Attributes) {
        let name = if self.pending.is_empty() {
            short_name::to_string(&short_name::render(&slot[..11]))
        } else {
            let long = self.pending.take();
            String::from(short_name::clean_long_name(&long))
        };

        let kind = attrs.kind_bits();
        let entry_type = if kind.is_empty() {
            EntryType::File
        } else if kind == Attributes::DIRECTORY {
            EntryType::Directory
        } else if kind == Attributes::VOLUME_ID {
            debug!("slot {offset:#x}: volume label {name:?}, skipped");
            return;
        } else {
            debug!("slot {offset:#x}: both directory and volume bits set, skipped");
            return;
        };

        let size = metadata::read_field(slot, MetadataField::Size);
        if entry_type == EntryType::File && size == 0 && name.is_empty() {
            debug!("slot {offset:#x}: empty nameless file, skipped");
            return;
        }

        let first_cluster = metadata::first_cluster(slot);
        debug!("slot {offset:#x}: {entry_type:?} {name:?} size {size} cluster {first_cluster}");
        self.entries.push(ListedEntry {
            name,
            entry_type,
            size,
            first_cluster,
            header_offset: offset as u32,
        });
    }
}

/// Decodes every live entry in `data`, stopping at the end-of-directory marker.
///
/// Deleted slots, volume labels and malformed slots are skipped. A trailing
/// partial slot is ignored.
pub fn decode_listing(data: &[u8]) -> Vec<ListedEntry> {
    let walk = data
        .chunks_exact(DIR_ENTRY_SIZE)
        .enumerate()
        .try_fold(Walk::default(), |walk, (i, slot)| walk.step(i * DIR_ENTRY_SIZE, slot));
    match walk {
        ControlFlow::Continue(walk) | ControlFlow::Break(walk) => walk.entries,
    }
}

/// Offset of the first slot whose words at 0, 8, 16 and 24 are all zero.
///
/// Only those four words are probed; a slot with stray bytes elsewhere still
/// counts as free, and a deleted (`0xE5`) slot does not.
pub fn find_free_slot(data: &[u8]) -> Result<u32, DirError> {
    data.chunks_exact(DIR_ENTRY_SIZE)
        .position(|slot| FREE_SLOT_PROBES.iter().all(|&o| metadata::read_u32(slot, o) == 0))
        .map(|i| (i * DIR_ENTRY_SIZE) as u32)
        .ok_or_else(|| {
            warn!("no free slot in {} bytes of directory data", data.len());
            DirError::NoFreeSlot
        })
}
