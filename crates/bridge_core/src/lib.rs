//! Bridge Core
//!
//! Native side of the value bridge:
//! - Type encoding parser and method signatures
//! - Struct registry
//! - Size and alignment of native types
//! - Argument storage and bounds-checked cursors

pub mod encoding;
pub mod layout;
pub mod memory;
pub mod registry;
pub mod storage;

pub use bytemuck;
pub use encoding::{parse, parse_with, EncodingError, MethodSignature, StructDef, StructField, TypeDescriptor};
pub use layout::{LayoutCalculator, TypeLayout};
pub use memory::{AllocationStats, AllocationTracker};
pub use registry::{StructRegistry, StructResolver};
pub use storage::{Cursor, Storage, StorageAllocator, StorageError, MAX_STORAGE_SIZE};

/// Bridge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
