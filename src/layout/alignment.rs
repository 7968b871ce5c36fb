// Mon Jan 19 2026 - Alex

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Alignment {
    value: u64,
}

impl Alignment {
    /// Rounds odd requests up to the next power of two; zero means byte alignment.
    pub fn new(value: u64) -> Self {
        Self {
            value: value.max(1).next_power_of_two(),
        }
    }

    pub fn as_u64(&self) -> u64 {
        self.value
    }

    pub fn align(&self, offset: u64) -> u64 {
        (offset + self.value - 1) & !(self.value - 1)
    }

    pub fn is_aligned(&self, offset: u64) -> bool {
        offset & (self.value - 1) == 0
    }
}

impl Default for Alignment {
    fn default() -> Self {
        Self::new(1)
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Number of cachelines touched by an object of `size` bytes starting at 0.
pub fn nr_cachelines(size: u64, cacheline_size: u64) -> u64 {
    if cacheline_size == 0 {
        return 0;
    }
    (size + cacheline_size - 1) / cacheline_size
}

/// Whether `[offset, offset + size)` crosses a cacheline boundary.
pub fn straddles(offset: u64, size: u64, cacheline_size: u64) -> bool {
    if cacheline_size == 0 || size == 0 {
        return false;
    }
    offset / cacheline_size != (offset + size - 1) / cacheline_size
}
