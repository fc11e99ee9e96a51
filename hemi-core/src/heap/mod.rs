use crate::config::HeapConfig;
use crate::roots::Roots;
use crate::store::object::{self, record_size, Header, HEADER_SIZE, MAX_PAYLOAD};
use crate::store::{Field, Handle, Value, ValueType};
use crate::{Error, ErrorKind, Result};

use ordered_float::OrderedFloat;

pub mod pool;
pub mod table;
pub mod collect;
pub mod dump;


pub use collect::GcStats;
pub use dump::{Dump, Record, Records, Usage};
pub use pool::{Addr, Space};

use pool::Pool;
use table::HandleTable;

// Fresh scalar payloads are filled with this so that
// reads of uninitialized data stand out
pub const SENTINEL: u8 = 0xCC;

/// A two-space copying heap.
///
/// Every object lives in the active half of the pool and is named by a
/// `Handle`. When the active half fills up, `allocate` runs one collection
/// which copies everything reachable from the roots into the other half.
pub struct Heap {
    pool: Pool,
    table: HandleTable,
    stats: GcStats,
    // Set when a collection found the object graph corrupt
    poisoned: bool,
}

impl Heap {
    pub fn new(pool_size: usize) -> Result<Self> {
        Self::with_config(HeapConfig::new(pool_size))
    }

    pub fn with_config(config: HeapConfig) -> Result<Self> {
        let pool = Pool::new(&config)?;
        log::debug!(target: "heap", "initialized pool of {} bytes ({} per half)",
            2 * pool.half_size(), pool.half_size());
        Ok(Self {
            pool,
            table: HandleTable::new(config.initial_handles),
            stats: GcStats::default(),
            poisoned: false,
        })
    }

    /// Release the pool. Every handle into this heap is dead afterwards.
    pub fn cleanup(self) {
        log::debug!(target: "heap", "releasing pool ({} live handles)", self.table.live());
    }

    fn check_poisoned(&self) -> Result<()> {
        if self.poisoned {
            return Err(Error::new_const(ErrorKind::CorruptReference,
                "heap was found corrupt by an earlier collection"));
        }
        Ok(())
    }

    /// Allocate an object of type `tag` and return its handle.
    ///
    /// `requested_size` is only used for strings; all other types have a
    /// fixed payload. Scalar payloads start out filled with `SENTINEL`,
    /// reference fields start out null. If the active half is full this
    /// runs one collection using `roots` before giving up with `OutOfMemory`.
    pub fn allocate(&mut self, tag: ValueType, requested_size: usize, roots: &dyn Roots) -> Result<Handle> {
        self.allocate_pinned(tag, requested_size, roots, &[])
    }

    // `pinned` handles are kept alive by a collection run on behalf of this
    // allocation, even if no root reaches them yet
    fn allocate_pinned(&mut self, tag: ValueType, requested_size: usize,
                       roots: &dyn Roots, pinned: &[Handle]) -> Result<Handle> {
        self.check_poisoned()?;
        let payload = tag.fixed_payload().unwrap_or(requested_size);
        if payload > MAX_PAYLOAD {
            return Err(Error::new(ErrorKind::BadFormat,
                format!("{} payload of {} bytes is too large", tag, payload)));
        }
        let size = record_size(payload);
        if !self.pool.has_space(size) {
            log::debug!(target: "heap", "no room for {} bytes with {} in use", size, self.pool.used());
            self.collect_pinned(roots, pinned)?;
            if !self.pool.has_space(size) {
                return Err(Error::new(ErrorKind::OutOfMemory,
                    format!("cannot service request of size {} with {} bytes allocated",
                        size, self.pool.used())));
            }
        }
        let addr = self.pool.alloc_cursor();
        let handle = self.table.new_handle(addr)?;
        self.pool.bump(size);

        let header = Header::new(tag, payload, handle)?;
        header.write(self.pool.slice_mut(addr, HEADER_SIZE));
        let fill = if tag.is_compound() { 0xFF } else { SENTINEL };
        self.pool.slice_mut(addr + HEADER_SIZE, payload).fill(fill);
        log::trace!(target: "heap", "allocated {} {} at {:#x} ({} bytes)", tag, handle, addr, size);
        Ok(handle)
    }

    /// Allocate an object and initialize it from `value`.
    pub fn alloc(&mut self, value: &Value, roots: &dyn Roots) -> Result<Handle> {
        let tag = value.value_type();
        let mut pinned = Vec::with_capacity(3);
        for field in tag.fields() {
            if let Some(h) = value.field(*field) {
                self.resolve(h)?;
                pinned.push(h);
            }
        }
        let handle = self.allocate_pinned(tag, value.payload_size(), roots, &pinned)?;
        let addr = self.resolve(handle)?;
        object::encode_payload(value, self.pool.slice_mut(addr + HEADER_SIZE, value.payload_size()));
        Ok(handle)
    }

    pub fn alloc_none(&mut self, roots: &dyn Roots) -> Result<Handle> {
        self.alloc(&Value::None, roots)
    }

    pub fn alloc_bool(&mut self, b: bool, roots: &dyn Roots) -> Result<Handle> {
        self.alloc(&Value::Bool(b), roots)
    }

    pub fn alloc_int(&mut self, i: i64, roots: &dyn Roots) -> Result<Handle> {
        self.alloc(&Value::Int(i), roots)
    }

    pub fn alloc_float(&mut self, f: f64, roots: &dyn Roots) -> Result<Handle> {
        self.alloc(&Value::Float(OrderedFloat(f)), roots)
    }

    pub fn alloc_string(&mut self, s: &str, roots: &dyn Roots) -> Result<Handle> {
        self.alloc(&Value::String(s.to_owned()), roots)
    }

    pub fn alloc_list_node(&mut self, value: Option<Handle>, next: Option<Handle>,
                           roots: &dyn Roots) -> Result<Handle> {
        self.alloc(&Value::ListNode { value, next }, roots)
    }

    pub fn alloc_dict_node(&mut self, key: Option<Handle>, value: Option<Handle>,
                           next: Option<Handle>, roots: &dyn Roots) -> Result<Handle> {
        self.alloc(&Value::DictNode { key, value, next }, roots)
    }

    /// The current address of a handle's object.
    pub fn resolve(&self, h: Handle) -> Result<Addr> {
        let addr = self.table.resolve(h, 2 * self.pool.half_size())?;
        if !self.pool.in_active(addr) {
            return Err(Error::new(ErrorKind::InvalidHandle,
                format!("{} points outside the active half ({:#x})", h, addr)));
        }
        Ok(addr)
    }

    pub fn header(&self, h: Handle) -> Result<Header> {
        let addr = self.resolve(h)?;
        let header = Header::read(self.pool.slice(addr, HEADER_SIZE))?;
        if header.handle != h {
            return Err(Error::new(ErrorKind::InvalidHandle,
                format!("{} resolves to a record owned by {}", h, header.handle)));
        }
        Ok(header)
    }

    pub fn type_of(&self, h: Handle) -> Result<ValueType> {
        Ok(self.header(h)?.tag)
    }

    /// The raw payload bytes of an object, without header or padding.
    pub fn payload(&self, h: Handle) -> Result<&[u8]> {
        let header = self.header(h)?;
        let addr = self.resolve(h)?;
        Ok(self.pool.slice(addr + HEADER_SIZE, header.payload_len()))
    }

    pub fn read(&self, h: Handle) -> Result<Value> {
        let header = self.header(h)?;
        object::decode_payload(header.tag, self.payload(h)?)
    }

    pub fn get_ref(&self, h: Handle, field: Field) -> Result<Option<Handle>> {
        let header = self.header(h)?;
        object::read_ref(header.tag, self.payload(h)?, field)
    }

    /// Point one reference field of a list or dict node at `target`.
    pub fn set_ref(&mut self, h: Handle, field: Field, target: Option<Handle>) -> Result<()> {
        let header = self.header(h)?;
        if let Some(t) = target {
            self.resolve(t)?;
        }
        let addr = self.resolve(h)?;
        let payload = self.pool.slice_mut(addr + HEADER_SIZE, header.payload_len());
        object::write_ref(header.tag, payload, field, target)
    }

    /// Overwrite the contents of a scalar in place. The new value must have
    /// the same type and, for strings, the same length.
    pub fn set_scalar(&mut self, h: Handle, value: &Value) -> Result<()> {
        let header = self.header(h)?;
        let tag = value.value_type();
        if tag.is_compound() || tag != header.tag || value.payload_size() != header.payload_len() {
            return Err(Error::new(ErrorKind::IncorrectType,
                format!("cannot store {} into {} {}", tag, header.tag, h)));
        }
        let addr = self.resolve(h)?;
        object::encode_payload(value, self.pool.slice_mut(addr + HEADER_SIZE, header.payload_len()));
        Ok(())
    }

    /// Bytes in use in the active half.
    pub fn used_bytes(&self) -> usize {
        self.pool.used()
    }

    pub fn half_size(&self) -> usize {
        self.pool.half_size()
    }

    pub fn active_space(&self) -> Space {
        self.pool.active()
    }

    pub fn is_pool_address(&self, addr: Addr) -> bool {
        self.pool.contains(addr)
    }

    pub fn live_handles(&self) -> usize {
        self.table.live()
    }

    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}
