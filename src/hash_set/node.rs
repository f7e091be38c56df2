//! Chain nodes and the bucket array

use crate::slab::BlockMemory;
use std::alloc::Layout;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;
use std::slice;

pub(crate) type Link<T> = Option<NonNull<Node<T>>>;

/// One stored item with its cached hash
pub(crate) struct Node<T> {
    pub(crate) next: Link<T>,
    pub(crate) hash: u32,
    pub(crate) item: T,
}

/// Power-of-two array of chain heads.
///
/// Lives in a [`BlockMemory`] so a replaced array can be donated to the node
/// backend. Zeroed memory reads as all-empty buckets.
pub(crate) struct Buckets<T> {
    memory: BlockMemory,
    len: usize,
    _marker: PhantomData<Link<T>>,
}

impl<T> Buckets<T> {
    /// Allocate `len` empty buckets, or `None` if memory is unavailable
    pub(crate) fn allocate(len: usize) -> Option<Self> {
        let bytes = len.checked_mul(mem::size_of::<Link<T>>())?;
        BlockMemory::allocate(bytes).map(|memory| Self {
            memory,
            len,
            _marker: PhantomData,
        })
    }

    /// Layout reported when an unrecoverable bucket allocation fails
    pub(crate) fn layout(len: usize) -> Layout {
        Layout::array::<Link<T>>(len).unwrap_or_else(|_| Layout::new::<Link<T>>())
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[Link<T>] {
        // SAFETY: the region holds `len` initialised links (zero is `None`)
        // and is aligned well beyond a pointer.
        unsafe { slice::from_raw_parts(self.memory.as_ptr().cast().as_ptr(), self.len) }
    }

    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [Link<T>] {
        // SAFETY: as above, and `&mut self` gives exclusive access.
        unsafe { slice::from_raw_parts_mut(self.memory.as_ptr().cast().as_ptr(), self.len) }
    }

    #[inline]
    pub(crate) fn as_mut_ptr(&mut self) -> *mut Link<T> {
        self.memory.as_ptr().cast().as_ptr()
    }

    pub(crate) fn into_memory(self) -> BlockMemory {
        self.memory
    }
}
