//! VFAT long filename fragments.
//!
//! A long name is stored as a run of slots with attribute `0x0F` placed before
//! the short slot it names. Each fragment carries up to 13 UTF-16LE units in
//! three blocks, and fragments appear on disk last-to-first.

use alloc::string::String;
use alloc::vec::Vec;

use crate::metadata::{LFN_LAST_FRAGMENT, LFN_PADDING, OFFSET_LFN_TYPE, OFFSET_STATUS, read_u16};

/// (byte offset, unit count) of the three name blocks inside a fragment slot.
const BLOCK_1: (usize, usize) = (1, 5);
const BLOCK_2: (usize, usize) = (14, 6);
const BLOCK_3: (usize, usize) = (28, 2);

/// Only type-0 fragments carry name characters.
pub fn is_name_fragment(slot: &[u8]) -> bool {
    slot[OFFSET_LFN_TYPE] == 0
}

/// The fragment with the continuation bit set opens a new name.
pub fn starts_new_name(slot: &[u8]) -> bool {
    slot[OFFSET_STATUS] & LFN_LAST_FRAGMENT != 0
}

/// Decodes the UTF-16 units of one fragment.
///
/// Each block stops at a NUL unit. A later block is read only when its first
/// unit is not the `0xFFFF` padding, or when everything before it was full
/// (`0xFFFF` is a valid character when it does not follow a NUL).
pub fn decode_fragment(slot: &[u8]) -> Vec<u16> {
    let mut units = Vec::with_capacity(13);
    take_units(slot, BLOCK_1, &mut units);
    if read_u16(slot, BLOCK_2.0) != LFN_PADDING || units.len() == BLOCK_1.1 {
        take_units(slot, BLOCK_2, &mut units);
        if read_u16(slot, BLOCK_3.0) != LFN_PADDING || units.len() == BLOCK_1.1 + BLOCK_2.1 {
            take_units(slot, BLOCK_3, &mut units);
        }
    }
    units
}

fn take_units(slot: &[u8], (offset, count): (usize, usize), out: &mut Vec<u16>) {
    for j in 0..count {
        let unit = read_u16(slot, offset + j * 2);
        if unit == 0 {
            break;
        }
        out.push(unit);
    }
}

/// Long name being assembled while the decoder walks towards its short slot.
#[derive(Debug, Default, Clone)]
pub struct PendingLongName {
    units: Vec<u16>,
}

impl PendingLongName {
    pub fn clear(&mut self) {
        self.units.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Fragments arrive last-to-first, so each one goes in front.
    pub fn prepend(&mut self, fragment: &[u16]) {
        self.units.splice(0..0, fragment.iter().copied());
    }

    /// The assembled name, leaving the buffer empty.
    pub fn take(&mut self) -> String {
        let name = String::from_utf16_lossy(&self.units);
        self.units.clear();
        name
    }
}
