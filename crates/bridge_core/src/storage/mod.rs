//! Argument storage
//!
//! [`Storage`] is the raw memory behind one argument slot, either owned or
//! wrapping caller memory. [`Cursor`] walks it with bounds checks.

mod allocation;
mod cursor;
mod storage_error;

pub use allocation::{Storage, StorageAllocator, MAX_STORAGE_SIZE};
pub use cursor::Cursor;
pub use storage_error::StorageError;
