use super::pool::Addr;
use crate::store::{Handle, NULL_REF};
use crate::{Error, ErrorKind, Result};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Slot {
    Empty,
    Resident(Addr),
    // Only seen while a collection is running: the object
    // has already been copied to this address in the target half
    Relocated(Addr),
}

/// Maps handles to the current address of their object.
pub struct HandleTable {
    slots: Vec<Slot>,
    // Slots at or above this index have never been handed out
    next_free: usize,
}

impl HandleTable {
    pub fn new(capacity: usize) -> Self {
        Self { slots: vec![Slot::Empty; capacity.max(1)], next_free: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn high_water(&self) -> usize {
        self.next_free
    }

    pub fn live(&self) -> usize {
        self.slots[..self.next_free].iter()
            .filter(|s| **s != Slot::Empty)
            .count()
    }

    pub fn new_handle(&mut self, addr: Addr) -> Result<Handle> {
        // Reuse a dead slot before growing
        if let Some(i) = self.slots[..self.next_free].iter().position(|s| *s == Slot::Empty) {
            self.slots[i] = Slot::Resident(addr);
            return Ok(Handle::from_raw(i as u32));
        }
        if self.next_free >= NULL_REF as usize {
            return Err(Error::new_const(ErrorKind::OutOfMemory, "handle space exhausted"));
        }
        if self.next_free == self.slots.len() {
            let grown = self.slots.len() * 2;
            log::trace!(target: "heap", "growing handle table to {} slots", grown);
            self.slots.resize(grown, Slot::Empty);
        }
        let i = self.next_free;
        self.next_free += 1;
        self.slots[i] = Slot::Resident(addr);
        Ok(Handle::from_raw(i as u32))
    }

    pub fn slot(&self, h: Handle) -> Option<Slot> {
        if h.index() < self.next_free { Some(self.slots[h.index()]) } else { None }
    }

    /// Look up the address of a live handle. `limit` is the end of the pool;
    /// anything at or past it means the table itself is damaged.
    pub fn resolve(&self, h: Handle, limit: Addr) -> Result<Addr> {
        let addr = match self.slot(h) {
            None => return Err(Error::new(ErrorKind::InvalidHandle,
                format!("{} is out of range", h))),
            Some(Slot::Empty) => return Err(Error::new(ErrorKind::InvalidHandle,
                format!("{} does not refer to a live object", h))),
            Some(Slot::Resident(a)) | Some(Slot::Relocated(a)) => a,
        };
        if addr >= limit {
            return Err(Error::new(ErrorKind::InvalidHandle,
                format!("{} points outside the pool ({:#x})", h, addr)));
        }
        Ok(addr)
    }

    pub fn clear(&mut self, h: Handle) {
        self.slots[h.index()] = Slot::Empty;
    }

    pub fn rebind(&mut self, h: Handle, addr: Addr) {
        self.slots[h.index()] = Slot::Resident(addr);
    }

    pub fn relocate(&mut self, h: Handle, addr: Addr) {
        self.slots[h.index()] = Slot::Relocated(addr);
    }

    /// Turn every relocation marker back into a plain address
    /// once a collection has finished.
    pub fn settle(&mut self) {
        for slot in self.slots[..self.next_free].iter_mut() {
            if let Slot::Relocated(a) = *slot {
                *slot = Slot::Resident(a);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_by_doubling() {
        let mut t = HandleTable::new(2);
        for i in 0..5 {
            assert_eq!(t.new_handle(i * 8).unwrap().raw(), i as u32);
        }
        assert_eq!(t.capacity(), 8);
        assert_eq!(t.high_water(), 5);
        assert_eq!(t.live(), 5);
    }

    #[test]
    fn reuses_empty_slots_below_high_water() {
        let mut t = HandleTable::new(4);
        let a = t.new_handle(0).unwrap();
        let b = t.new_handle(8).unwrap();
        t.clear(a);
        let c = t.new_handle(16).unwrap();
        assert_eq!(c, a);
        assert_eq!(t.resolve(c, 64).unwrap(), 16);
        assert_eq!(t.resolve(b, 64).unwrap(), 8);
        assert_eq!(t.high_water(), 2);
    }

    #[test]
    fn resolve_rejects_bad_handles() {
        let mut t = HandleTable::new(4);
        let a = t.new_handle(0).unwrap();
        let far = Handle::from_raw(3);
        assert_eq!(t.resolve(far, 64).unwrap_err().kind(), ErrorKind::InvalidHandle);
        t.rebind(a, 128);
        assert_eq!(t.resolve(a, 64).unwrap_err().kind(), ErrorKind::InvalidHandle);
        t.clear(a);
        assert_eq!(t.resolve(a, 64).unwrap_err().kind(), ErrorKind::InvalidHandle);
    }

    #[test]
    fn settle_clears_relocation_markers() {
        let mut t = HandleTable::new(4);
        let a = t.new_handle(0).unwrap();
        t.relocate(a, 32);
        assert_eq!(t.slot(a), Some(Slot::Relocated(32)));
        t.settle();
        assert_eq!(t.slot(a), Some(Slot::Resident(32)));
    }
}
