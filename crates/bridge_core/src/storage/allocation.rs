// allocation.rs - Owned and external argument storage
//
// Owned storage is a zeroed heap block released on drop. External storage
// wraps memory the caller keeps alive; dropping it never frees anything.

use super::{Cursor, StorageError};
use crate::encoding::TypeDescriptor;
use crate::layout::LayoutCalculator;
use crate::memory::AllocationTracker;
use crate::registry::StructRegistry;
use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::slice;

/// Largest owned block a single slot may request.
pub const MAX_STORAGE_SIZE: usize = 1 << 30;

/// Fixed-size memory region backing one argument slot.
pub struct Storage {
    ptr: NonNull<u8>,
    len: usize,
    align: usize,
    owned: bool,
}

impl Storage {
    /// Allocate `size` zeroed bytes aligned to `align`. Sizes above
    /// [`MAX_STORAGE_SIZE`] are refused without asking the allocator.
    pub fn zeroed(size: usize, align: usize) -> Result<Self, StorageError> {
        if size > MAX_STORAGE_SIZE {
            return Err(StorageError::LayoutOverflow { size, align });
        }
        let layout = Layout::from_size_align(size, align.max(1))
            .map_err(|_| StorageError::LayoutOverflow { size, align })?;

        let ptr = if layout.size() == 0 {
            // Zero-sized slots never touch the allocator.
            NonNull::new(layout.align() as *mut u8).ok_or(StorageError::NullPointer)?
        } else {
            // SAFETY: layout has a non-zero size.
            let raw = unsafe { alloc::alloc_zeroed(layout) };
            match NonNull::new(raw) {
                Some(ptr) => ptr,
                None => {
                    return Err(StorageError::AllocationFailed {
                        size,
                        align: layout.align(),
                    })
                }
            }
        };

        AllocationTracker::record_allocation(layout.size());
        tracing::trace!(size, align = layout.align(), "allocated storage");
        Ok(Self {
            ptr,
            len: layout.size(),
            align: layout.align(),
            owned: true,
        })
    }

    /// Wrap caller-owned memory.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `size` bytes for the whole
    /// lifetime of the returned storage, and nothing else may access that
    /// memory while a borrow obtained from this storage is alive.
    pub unsafe fn external(ptr: *mut u8, size: usize, align: usize) -> Result<Self, StorageError> {
        let ptr = NonNull::new(ptr).ok_or(StorageError::NullPointer)?;
        let align = align.max(1);
        let address = ptr.as_ptr() as usize;
        if address % align != 0 {
            return Err(StorageError::Misaligned { address, align });
        }
        Ok(Self {
            ptr,
            len: size,
            align,
            owned: false,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn align(&self) -> usize {
        self.align
    }

    #[inline]
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Address of the first byte, as handed to native code.
    #[inline]
    pub fn address(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: ptr is valid for len bytes (owned allocation or the
        // external constructor's contract).
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above; &mut self guarantees exclusive access through
        // this handle.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    pub fn cursor(&self) -> Cursor<&[u8]> {
        Cursor::new(self.as_bytes())
    }

    pub fn cursor_mut(&mut self) -> Cursor<&mut [u8]> {
        Cursor::new(self.as_bytes_mut())
    }

    pub fn zero(&mut self) {
        self.as_bytes_mut().fill(0);
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        if self.len > 0 {
            // SAFETY: owned blocks were allocated in `zeroed` with exactly
            // this size and alignment.
            unsafe {
                let layout = Layout::from_size_align_unchecked(self.len, self.align);
                alloc::dealloc(self.ptr.as_ptr(), layout);
            }
        }
        AllocationTracker::record_release(self.len);
        tracing::trace!(size = self.len, "released storage");
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("address", &format_args!("{:#x}", self.address()))
            .field("len", &self.len)
            .field("align", &self.align)
            .field("owned", &self.owned)
            .finish()
    }
}

/// Sizes storage for descriptors and hands it out.
#[derive(Clone, Copy, Default)]
pub struct StorageAllocator<'r> {
    layout: LayoutCalculator<'r>,
}

impl<'r> StorageAllocator<'r> {
    pub fn new() -> Self {
        Self {
            layout: LayoutCalculator::new(),
        }
    }

    pub fn with_registry(registry: &'r StructRegistry) -> Self {
        Self {
            layout: LayoutCalculator::with_registry(registry),
        }
    }

    pub fn layout(&self) -> &LayoutCalculator<'r> {
        &self.layout
    }

    /// Zeroed, exclusively owned storage for one value of `ty`.
    pub fn allocate(&self, ty: &TypeDescriptor) -> Result<Storage, StorageError> {
        let layout = self.layout.layout_of(ty);
        Storage::zeroed(layout.size, layout.align)
    }

    /// Non-owning storage for one value of `ty` at `ptr`.
    ///
    /// # Safety
    ///
    /// Same contract as [`Storage::external`] for `size_of(ty)` bytes.
    pub unsafe fn allocate_external(
        &self,
        ptr: *mut u8,
        ty: &TypeDescriptor,
    ) -> Result<Storage, StorageError> {
        let layout = self.layout.layout_of(ty);
        Storage::external(ptr, layout.size, layout.align)
    }
}
