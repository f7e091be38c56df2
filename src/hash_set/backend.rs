//! Node memory backends for ChainedHashSet

use crate::error::{Error, Result};
use crate::slab::{BlockMemory, FixedSlabPool};
use std::alloc::{self, Layout};
use std::collections::HashSet;
use std::ptr::NonNull;
use tracing::trace;

/// Source of fixed-size node memory for a hash set.
///
/// A set calls `configure` once, before any other method, with the size and
/// alignment of its nodes. A backend that cannot serve that layout must
/// return an error; every slot `alloc` hands out afterwards must fit it.
pub trait NodePool {
    /// Prepare to hand out items of `item_size` bytes aligned to `alignment`
    fn configure(&mut self, item_size: usize, alignment: usize, initial_capacity: usize)
        -> Result<()>;

    /// One item's worth of memory, or `None` when exhausted
    fn alloc(&mut self) -> Option<NonNull<u8>>;

    /// Return memory obtained from `alloc`
    fn free(&mut self, ptr: NonNull<u8>);

    /// Offer a spare region; the backend may keep it or drop it
    fn donate(&mut self, memory: BlockMemory);

    /// Reclaim every outstanding item at once
    fn clear(&mut self);
}

/// Backend keeping nodes in a [`FixedSlabPool`]
#[derive(Debug, Default)]
pub struct SlabBackend {
    pool: FixedSlabPool,
}

impl SlabBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing pool; its item size is replaced on `configure`,
    /// which fails while the pool still has live items
    pub fn with_pool(pool: FixedSlabPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &FixedSlabPool {
        &self.pool
    }
}

impl NodePool for SlabBackend {
    fn configure(
        &mut self,
        item_size: usize,
        alignment: usize,
        initial_capacity: usize,
    ) -> Result<()> {
        if !self.pool.set_item_size(item_size, alignment) {
            return Err(Error::InvalidArgument(format!(
                "slab pool has {} live items and cannot switch to {}-byte nodes",
                self.pool.live_items(),
                item_size
            )));
        }
        if self.pool.item_size() < item_size || self.pool.alignment() < alignment {
            return Err(Error::InvalidArgument(format!(
                "slab pool cannot hold {}-byte nodes aligned to {}",
                item_size, alignment
            )));
        }
        self.pool.set_min_free(1);
        self.pool.set_next_block_items(initial_capacity);
        self.pool
            .set_min_donation_size((initial_capacity >> 1) * self.pool.item_size());
        Ok(())
    }

    fn alloc(&mut self) -> Option<NonNull<u8>> {
        self.pool.alloc()
    }

    fn free(&mut self, ptr: NonNull<u8>) {
        self.pool.free(ptr);
    }

    fn donate(&mut self, memory: BlockMemory) {
        if memory.len() < self.pool.min_donation_size() {
            trace!(
                bytes = memory.len(),
                minimum = self.pool.min_donation_size(),
                "Dropping donation below minimum size"
            );
            return;
        }
        self.pool.donate(memory);
    }

    fn clear(&mut self) {
        self.pool.clear();
    }
}

/// Backend allocating every node separately from the global allocator
#[derive(Debug, Default)]
pub struct SystemBackend {
    layout: Option<Layout>,
    live: HashSet<usize>,
}

impl SystemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes currently allocated
    pub fn live_nodes(&self) -> usize {
        self.live.len()
    }

    fn release(&mut self, addr: usize) {
        if let Some(layout) = self.layout {
            // SAFETY: addr came from `alloc` with this layout and is freed once.
            unsafe { alloc::dealloc(addr as *mut u8, layout) }
        }
    }
}

impl NodePool for SystemBackend {
    fn configure(
        &mut self,
        item_size: usize,
        alignment: usize,
        _initial_capacity: usize,
    ) -> Result<()> {
        if !self.live.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "system backend has {} live nodes",
                self.live.len()
            )));
        }
        let layout = Layout::from_size_align(item_size.max(1), alignment.max(1))
            .map_err(|e| Error::InvalidArgument(format!("node layout: {}", e)))?;
        self.layout = Some(layout.pad_to_align());
        Ok(())
    }

    fn alloc(&mut self) -> Option<NonNull<u8>> {
        let layout = self.layout?;
        // SAFETY: layout has a non-zero size.
        let ptr = NonNull::new(unsafe { alloc::alloc(layout) })?;
        self.live.insert(ptr.as_ptr() as usize);
        Some(ptr)
    }

    fn free(&mut self, ptr: NonNull<u8>) {
        let addr = ptr.as_ptr() as usize;
        if self.live.remove(&addr) {
            self.release(addr);
        }
    }

    fn donate(&mut self, memory: BlockMemory) {
        drop(memory);
    }

    fn clear(&mut self) {
        let live: Vec<usize> = self.live.drain().collect();
        for addr in live {
            self.release(addr);
        }
    }
}

impl Drop for SystemBackend {
    fn drop(&mut self) {
        self.clear();
    }
}
