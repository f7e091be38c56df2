//! Owned memory regions backing slab blocks

use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;

/// Owned, zero-initialised heap region aligned to [`BlockMemory::ALIGNMENT`].
///
/// This is the unit of memory a pool receives from the environment or from a
/// donor. Dropping it returns the region to the global allocator.
pub struct BlockMemory {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl BlockMemory {
    /// Alignment of every region; also the largest supported item alignment
    pub const ALIGNMENT: usize = 32;

    /// Request `size` zeroed bytes from the global allocator.
    ///
    /// Returns `None` if `size` is zero or the allocator fails.
    pub fn allocate(size: usize) -> Option<Self> {
        if size == 0 {
            return None;
        }
        let layout = Layout::from_size_align(size, Self::ALIGNMENT).ok()?;
        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        NonNull::new(raw).map(|ptr| Self { ptr, layout })
    }

    /// Size of the region in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.layout.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layout.size() == 0
    }

    /// Pointer to the first byte
    #[inline]
    pub fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Address of the first byte
    #[inline]
    pub fn start(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Address one past the last byte
    #[inline]
    pub fn end(&self) -> usize {
        self.start() + self.len()
    }

    /// Byte offset of `addr` inside the region, if it lies in `[start, end)`
    #[inline]
    pub fn offset_of(&self, addr: usize) -> Option<usize> {
        if addr >= self.start() && addr < self.end() {
            Some(addr - self.start())
        } else {
            None
        }
    }

    /// Pointer to byte `offset`. `offset` must be below `len()`.
    #[inline]
    pub(crate) fn at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset < self.len());
        // SAFETY: offset is inside the allocation, so the result is non-null
        // and in bounds.
        unsafe { NonNull::new_unchecked(self.ptr.as_ptr().add(offset)) }
    }
}

impl Drop for BlockMemory {
    fn drop(&mut self) {
        // SAFETY: ptr was returned by alloc_zeroed with this exact layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

impl fmt::Debug for BlockMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockMemory")
            .field("start", &format_args!("{:#x}", self.start()))
            .field("len", &self.len())
            .finish()
    }
}
