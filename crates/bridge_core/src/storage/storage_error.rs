use thiserror::Error;

/// Errors raised by storage allocation and cursor traversal.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("access of {size} bytes at offset {offset} is outside a {len}-byte buffer")]
    OutOfBounds { offset: usize, size: usize, len: usize },

    #[error("cannot lay out {size} bytes with alignment {align}")]
    LayoutOverflow { size: usize, align: usize },

    #[error("allocator could not provide {size} bytes with alignment {align}")]
    AllocationFailed { size: usize, align: usize },

    #[error("external storage pointer is null")]
    NullPointer,

    #[error("external storage at {address:#x} is not aligned to {align}")]
    Misaligned { address: usize, align: usize },
}
