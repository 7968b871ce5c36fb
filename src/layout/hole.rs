// Mon Jan 19 2026 - Alex

use std::fmt;

/// Unused byte range inside a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hole {
    pub offset: u64,
    pub size: u64,
    /// Declaration index of the member the hole follows.
    pub after: Option<usize>,
    /// Found inside an anonymous struct/union member, offsets relative to the parent.
    pub nested: bool,
}

impl Hole {
    pub fn new(offset: u64, size: u64, after: Option<usize>) -> Self {
        Self {
            offset,
            size,
            after,
            nested: false,
        }
    }

    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    pub(crate) fn shifted(mut self, base: u64) -> Self {
        self.offset += base;
        self.after = None;
        self.nested = true;
        self
    }
}

impl fmt::Display for Hole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} byte{} at {}", self.size, if self.size == 1 { "" } else { "s" }, self.offset)
    }
}

/// Unused bits inside a bitfield storage unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitHole {
    /// Absolute bit position where the hole starts.
    pub bit_offset: u64,
    pub bits: u64,
    pub after: Option<usize>,
    pub nested: bool,
}

impl BitHole {
    pub fn new(bit_offset: u64, bits: u64, after: Option<usize>) -> Self {
        Self {
            bit_offset,
            bits,
            after,
            nested: false,
        }
    }

    pub(crate) fn shifted(mut self, base: u64) -> Self {
        self.bit_offset += base * 8;
        self.after = None;
        self.nested = true;
        self
    }
}

impl fmt::Display for BitHole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bit{} at bit {}", self.bits, if self.bits == 1 { "" } else { "s" }, self.bit_offset)
    }
}
