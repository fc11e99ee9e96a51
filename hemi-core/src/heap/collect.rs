use std::fmt;
use std::time::{Duration, Instant};

use super::pool::{Addr, Pool};
use super::table::{HandleTable, Slot};
use super::Heap;
use crate::roots::Roots;
use crate::store::object::{self, Header, HEADER_SIZE};
use crate::store::{Field, Handle};
use crate::{Error, ErrorKind, Result};

/// Running totals over every collection a heap has done.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GcStats {
    pub collections: usize,
    pub last_reclaimed: usize,
    pub total_reclaimed: usize,
    pub handles_freed: usize,
    pub last_pause: Duration,
}

// Who asked for an object to be kept, for error messages
#[derive(Clone, Copy)]
enum Referrer<'a> {
    Root(&'a str),
    Pinned,
    Field(Handle, Field),
}

impl<'a> fmt::Display for Referrer<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Referrer::Root(name) => write!(f, "global {:?}", name),
            Referrer::Pinned => f.write_str("an allocation in progress"),
            Referrer::Field(h, field) => write!(f, "{:?} field of {}", field, h),
        }
    }
}

struct Collector<'h> {
    pool: &'h mut Pool,
    table: &'h mut HandleTable,
    // Objects that still have to be copied, with whoever referenced them
    pending: Vec<(Handle, Handle, Field)>,
    survivors: usize,
}

impl<'h> Collector<'h> {
    fn corrupt(h: Handle, by: Referrer, why: &str) -> Error {
        Error::new(ErrorKind::CorruptReference, format!("{} (from {}) {}", h, by, why))
    }

    /// Copy one object into the target half unless it is already there,
    /// then queue the objects it references.
    fn evacuate(&mut self, h: Handle, by: Referrer) -> Result<()> {
        let addr = match self.table.slot(h) {
            Some(Slot::Relocated(_)) => return Ok(()),
            Some(Slot::Resident(addr)) => addr,
            Some(Slot::Empty) => return Err(Self::corrupt(h, by, "refers to a freed object")),
            None => return Err(Self::corrupt(h, by, "is not a valid handle")),
        };
        if !self.pool.in_active(addr) {
            return Err(Self::corrupt(h, by, "points outside the from-space"));
        }
        let header = Header::read(self.pool.slice(addr, HEADER_SIZE))
            .map_err(|e| Self::corrupt(h, by, &format!("has a damaged header: {}", e)))?;
        if header.handle != h {
            return Err(Self::corrupt(h, by, &format!("points at a record owned by {}", header.handle)));
        }

        // The record moves before its fields are followed, so a cycle
        // back to it finds the relocation marker and stops
        let to = self.pool.copy_record(addr, header.record_size())?;
        self.table.relocate(h, to);
        self.survivors += 1;

        let payload = self.pool.slice(to + HEADER_SIZE, header.payload_len());
        // Reversed so the first field is popped (and copied) first
        for field in header.tag.fields().iter().rev() {
            if let Some(child) = object::read_ref(header.tag, payload, *field)? {
                self.pending.push((child, h, *field));
            }
        }
        Ok(())
    }

    fn drain(&mut self) -> Result<()> {
        while let Some((h, parent, field)) = self.pending.pop() {
            self.evacuate(h, Referrer::Field(parent, field))?;
        }
        Ok(())
    }

    fn root(&mut self, h: Handle, by: Referrer) -> Result<()> {
        self.evacuate(h, by)?;
        self.drain()
    }

    /// Walk the from-space in address order and free the handle
    /// of every record that was not copied. Returns the number freed.
    fn sweep(&mut self) -> Result<usize> {
        let mut freed = 0;
        let mut addr: Addr = self.pool.active_base();
        while addr < self.pool.alloc_cursor() {
            let header = Header::read(self.pool.slice(addr, HEADER_SIZE))?;
            match self.table.slot(header.handle) {
                Some(Slot::Relocated(_)) => (),
                Some(Slot::Resident(a)) if a == addr => {
                    self.table.clear(header.handle);
                    freed += 1;
                }
                _ => return Err(Error::new(ErrorKind::CorruptReference,
                    format!("record at {:#x} claims {} which does not point back at it",
                        addr, header.handle))),
            }
            addr += header.record_size();
        }
        Ok(freed)
    }
}

impl Heap {
    /// Run a full collection and return the number of bytes reclaimed.
    pub fn collect(&mut self, roots: &dyn Roots) -> Result<usize> {
        self.collect_pinned(roots, &[])
    }

    pub(super) fn collect_pinned(&mut self, roots: &dyn Roots, pinned: &[Handle]) -> Result<usize> {
        self.check_poisoned()?;
        // Nothing has moved yet, so a bad root leaves the heap usable
        self.check_roots(roots, pinned)?;
        match self.stop_and_copy(roots, pinned) {
            Ok(reclaimed) => Ok(reclaimed),
            Err(e) => {
                log::error!(target: "gc", "collection aborted: {}", e);
                self.poisoned = true;
                Err(e)
            }
        }
    }

    fn check_roots(&self, roots: &dyn Roots, pinned: &[Handle]) -> Result<()> {
        let mut bad = None;
        roots.for_each_global(&mut |name, h| {
            if bad.is_none() {
                if let Err(e) = self.header(h) {
                    bad = Some(Collector::corrupt(h, Referrer::Root(name), &e.to_string()));
                }
            }
        });
        if let Some(e) = bad {
            return Err(e);
        }
        for h in pinned {
            self.header(*h).map_err(|e| Collector::corrupt(*h, Referrer::Pinned, &e.to_string()))?;
        }
        Ok(())
    }

    fn stop_and_copy(&mut self, roots: &dyn Roots, pinned: &[Handle]) -> Result<usize> {
        let start = Instant::now();
        let before = self.pool.used();
        log::debug!(target: "gc", "collecting garbage ({} bytes in use)", before);

        self.pool.begin_copy();
        let mut collector = Collector {
            pool: &mut self.pool,
            table: &mut self.table,
            pending: Vec::new(),
            survivors: 0,
        };

        // the callback cannot fail, so keep the first error around
        let mut traced = Ok(());
        roots.for_each_global(&mut |name, h| {
            if traced.is_ok() {
                traced = collector.root(h, Referrer::Root(name));
            }
        });
        traced?;
        for h in pinned {
            collector.root(*h, Referrer::Pinned)?;
        }

        let freed = collector.sweep()?;
        let survivors = collector.survivors;
        self.table.settle();
        self.pool.flip();

        let reclaimed = before - self.pool.used();
        self.stats.collections += 1;
        self.stats.last_reclaimed = reclaimed;
        self.stats.total_reclaimed += reclaimed;
        self.stats.handles_freed += freed;
        self.stats.last_pause = start.elapsed();
        log::info!(target: "gc", "reclaimed {} bytes of garbage ({} objects freed, {} kept)",
            reclaimed, freed, survivors);
        Ok(reclaimed)
    }
}
