pub mod util;
pub mod config;
pub mod store;
pub mod heap;
pub mod roots;

pub use util::error::{Error, ErrorKind, Result};
pub use config::HeapConfig;
pub use heap::{Heap, GcStats, Usage};
pub use roots::{Globals, Roots};
pub use store::{Field, Handle, Value, ValueType};
