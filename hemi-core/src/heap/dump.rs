use std::fmt;

use super::pool::{Addr, Space};
use super::Heap;
use crate::store::object::{self, Header, HEADER_SIZE};
use crate::Result;

/// A point-in-time view of how full a heap is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Usage {
    pub used: usize,
    pub free: usize,
    pub half_size: usize,
    pub live_handles: usize,
    pub table_capacity: usize,
}

/// One record in the active half.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    pub addr: Addr,
    pub header: Header,
}

/// Walks the records of the active half in address order.
/// Stops after yielding the first unreadable header.
pub struct Records<'h> {
    heap: &'h Heap,
    addr: Addr,
    failed: bool,
}

impl<'h> Iterator for Records<'h> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.addr >= self.heap.pool.alloc_cursor() {
            return None;
        }
        match Header::read(self.heap.pool.slice(self.addr, HEADER_SIZE)) {
            Ok(header) => {
                let record = Record { addr: self.addr, header };
                self.addr += header.record_size();
                Some(Ok(record))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Displays every record of a heap, one per line.
pub struct Dump<'h> {
    heap: &'h Heap,
}

impl<'h> fmt::Display for Dump<'h> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heap = self.heap;
        let base = heap.pool.active_base();
        let space = match heap.pool.active() {
            Space::Lower => "lower",
            Space::Upper => "upper",
        };
        writeln!(f, "active half: {} ({} bytes)", space, heap.half_size())?;
        for record in heap.records() {
            let Record { addr, header } = match record {
                Ok(r) => r,
                Err(e) => return writeln!(f, "<pool is corrupt: {}>", e),
            };
            let payload = heap.pool.slice(addr + HEADER_SIZE, header.payload_len());
            write!(f, "{:#06x} size {} {} {}: ", addr - base, header.record_size(), header.handle, header.tag)?;
            match object::decode_payload(header.tag, payload) {
                Ok(value) => writeln!(f, "{}", value)?,
                Err(e) => writeln!(f, "<{}>", e)?,
            }
        }
        writeln!(f, "free {:#06x} size {}", heap.used_bytes(), heap.pool.free())
    }
}

impl Heap {
    pub fn usage(&self) -> Usage {
        Usage {
            used: self.pool.used(),
            free: self.pool.free(),
            half_size: self.pool.half_size(),
            live_handles: self.table.live(),
            table_capacity: self.table.capacity(),
        }
    }

    pub fn records(&self) -> Records<'_> {
        Records { heap: self, addr: self.pool.active_base(), failed: false }
    }

    pub fn display(&self) -> Dump<'_> {
        Dump { heap: self }
    }

    /// A listing of every object in the active half. Never collects.
    pub fn dump(&self) -> String {
        self.display().to_string()
    }
}
