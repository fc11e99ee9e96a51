use crate::{Error, ErrorKind, Result};
use crate::store::{ALIGNMENT, HEADER_SIZE};

pub const DEFAULT_POOL_SIZE: usize = 1024;
pub const DEFAULT_INITIAL_HANDLES: usize = 16;

/// Parameters fixed at heap construction.
///
/// `pool_size` is the size of the whole pool. Each half gets
/// `pool_size / 2` bytes, rounded down to the record alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapConfig {
    pub pool_size: usize,
    pub initial_handles: usize,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            initial_handles: DEFAULT_INITIAL_HANDLES,
        }
    }
}

impl HeapConfig {
    pub fn new(pool_size: usize) -> Self {
        Self { pool_size, ..Self::default() }
    }

    pub fn with_initial_handles(mut self, initial_handles: usize) -> Self {
        self.initial_handles = initial_handles;
        self
    }

    pub fn half_size(&self) -> usize {
        (self.pool_size / 2) / ALIGNMENT * ALIGNMENT
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::new_const(ErrorKind::BadConfig, "pool size must be positive"));
        }
        // each half must at least hold the smallest record
        if self.half_size() < HEADER_SIZE {
            return Err(Error::new(ErrorKind::BadConfig,
                format!("pool of {} bytes cannot hold a single object", self.pool_size)));
        }
        if self.initial_handles == 0 {
            return Err(Error::new_const(ErrorKind::BadConfig, "handle table needs at least one slot"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_size_rounds_down_to_alignment() {
        assert_eq!(HeapConfig::new(1024).half_size(), 512);
        assert_eq!(HeapConfig::new(1030).half_size(), 512);
        assert_eq!(HeapConfig::new(15).half_size(), 0);
    }

    #[test]
    fn rejects_degenerate_pools() {
        let err = HeapConfig::new(0).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadConfig);
        let err = HeapConfig::new(8).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadConfig);
        let err = HeapConfig::new(64).with_initial_handles(0).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadConfig);
        assert!(HeapConfig::new(16).validate().is_ok());
    }
}
