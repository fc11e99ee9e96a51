use crate::config::HeapConfig;
use crate::{Error, ErrorKind, Result};

// A physical location: the byte offset from the start of the pool
pub type Addr = usize;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Space {
    Lower,
    Upper,
}

impl Space {
    pub fn other(self) -> Space {
        match self {
            Space::Lower => Space::Upper,
            Space::Upper => Space::Lower,
        }
    }
}

/// The raw bytes backing a heap, split into two equal halves.
/// Objects are bump allocated out of the active half; the
/// inactive half only holds data while a collection is copying into it.
pub struct Pool {
    bytes: Vec<u8>,
    half: usize,
    active: Space,
    alloc_cursor: Addr,
    copy_cursor: Addr,
}

impl Pool {
    pub fn new(config: &HeapConfig) -> Result<Self> {
        config.validate()?;
        let half = config.half_size();
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(2 * half).map_err(|e| Error::new(ErrorKind::OutOfMemory,
            format!("could not get {} bytes from the system: {}", 2 * half, e)))?;
        bytes.resize(2 * half, 0);
        Ok(Self { bytes, half, active: Space::Lower, alloc_cursor: 0, copy_cursor: half })
    }

    pub fn half_size(&self) -> usize {
        self.half
    }

    pub fn active(&self) -> Space {
        self.active
    }

    pub fn base(&self, space: Space) -> Addr {
        match space {
            Space::Lower => 0,
            Space::Upper => self.half,
        }
    }

    pub fn active_base(&self) -> Addr {
        self.base(self.active)
    }

    pub fn inactive_base(&self) -> Addr {
        self.base(self.active.other())
    }

    pub fn alloc_cursor(&self) -> Addr {
        self.alloc_cursor
    }

    pub fn used(&self) -> usize {
        self.alloc_cursor - self.active_base()
    }

    pub fn free(&self) -> usize {
        self.half - self.used()
    }

    pub fn has_space(&self, size: usize) -> bool {
        size <= self.free()
    }

    pub fn contains(&self, addr: Addr) -> bool {
        addr < self.bytes.len()
    }

    /// True if `addr` starts a record inside the allocated part of the active half.
    pub fn in_active(&self, addr: Addr) -> bool {
        addr >= self.active_base() && addr < self.alloc_cursor
    }

    // Caller checks has_space first
    pub fn bump(&mut self, size: usize) -> Addr {
        debug_assert!(self.has_space(size));
        let addr = self.alloc_cursor;
        self.alloc_cursor += size;
        addr
    }

    pub fn slice(&self, addr: Addr, len: usize) -> &[u8] {
        &self.bytes[addr..addr + len]
    }

    pub fn slice_mut(&mut self, addr: Addr, len: usize) -> &mut [u8] {
        &mut self.bytes[addr..addr + len]
    }

    pub fn begin_copy(&mut self) {
        self.copy_cursor = self.inactive_base();
    }

    /// Copy a whole record from the active half into the inactive half.
    pub fn copy_record(&mut self, from: Addr, len: usize) -> Result<Addr> {
        let end = self.inactive_base() + self.half;
        if self.copy_cursor + len > end || !self.in_active(from) || from + len > self.alloc_cursor {
            return Err(Error::new(ErrorKind::CorruptReference,
                format!("record at {:#x} ({} bytes) cannot be copied forward", from, len)));
        }
        let to = self.copy_cursor;
        self.bytes.copy_within(from..from + len, to);
        self.copy_cursor += len;
        Ok(to)
    }

    /// Wipe the active half and make the copy target the new active half.
    pub fn flip(&mut self) {
        let from = self.active_base();
        self.bytes[from..from + self.half].fill(0);
        self.active = self.active.other();
        self.alloc_cursor = self.copy_cursor;
        self.copy_cursor = self.inactive_base();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(size: usize) -> Pool {
        Pool::new(&HeapConfig::new(size)).unwrap()
    }

    #[test]
    fn bump_stays_inside_active_half() {
        let mut p = pool(64);
        assert_eq!(p.half_size(), 32);
        assert_eq!(p.bump(16), 0);
        assert_eq!(p.bump(16), 16);
        assert_eq!(p.used(), 32);
        assert!(!p.has_space(8));
    }

    #[test]
    fn flip_swaps_halves_and_zeroes() {
        let mut p = pool(64);
        let a = p.bump(16);
        p.slice_mut(a, 16).fill(0xAB);
        p.begin_copy();
        let to = p.copy_record(a, 16).unwrap();
        assert_eq!(to, 32);
        p.flip();
        assert_eq!(p.active(), Space::Upper);
        assert_eq!(p.active_base(), 32);
        assert_eq!(p.used(), 16);
        assert!(p.slice(0, 32).iter().all(|b| *b == 0));
        assert!(p.slice(32, 16).iter().all(|b| *b == 0xAB));
    }

    #[test]
    fn copy_rejects_addresses_outside_from_space() {
        let mut p = pool(64);
        p.bump(16);
        p.begin_copy();
        let err = p.copy_record(40, 8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptReference);
    }
}
