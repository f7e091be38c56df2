//! Fixed-size slab pool implementation

use super::block::{BlockOrigin, BlockRecord};
use super::config::{aligned_size, effective_alignment, PoolConfig};
use super::memory::BlockMemory;
use crate::error::Result;
use serde::Serialize;
use std::ptr::NonNull;
use tracing::{debug, info, trace, warn};

/// Slab pool handing out slots of one fixed size
///
/// Blocks are kept roughly ordered by free slot count, most free first.
/// Allocation always comes from the front block; the order is repaired by an
/// insertion sort only when the front block runs out of slots.
#[derive(Debug)]
pub struct FixedSlabPool {
    blocks: Vec<BlockRecord>,
    /// Slot size in bytes, a multiple of `alignment`
    item_size: usize,
    alignment: usize,
    next_block_items: usize,
    growth_factor: f64,
    min_free: usize,
    min_donation_size: usize,
    memory_limit: Option<usize>,
    /// Bytes currently held that came from the environment
    allocated_bytes: usize,
    live: usize,
    allocations: u64,
    frees: u64,
    growth_events: u64,
    donations: u64,
}

impl FixedSlabPool {
    /// Create a pool with the default configuration
    pub fn new() -> Self {
        Self::from_config(&PoolConfig::default())
    }

    /// Create a pool from a validated configuration
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_config(&config))
    }

    fn from_config(config: &PoolConfig) -> Self {
        let alignment = effective_alignment(config.item_size, config.alignment);
        let item_size = aligned_size(config.item_size, alignment);
        debug!(
            item_size,
            alignment,
            next_block_items = config.next_block_items,
            "Initializing slab pool"
        );
        Self {
            blocks: Vec::new(),
            item_size,
            alignment,
            next_block_items: config.next_block_items.max(1),
            growth_factor: config.growth_factor.max(1.0),
            min_free: config.min_free,
            min_donation_size: config.min_donation_size,
            memory_limit: config.memory_limit,
            allocated_bytes: 0,
            live: 0,
            allocations: 0,
            frees: 0,
            growth_events: 0,
            donations: 0,
        }
    }

    /// Change the item size and alignment.
    ///
    /// Only allowed while no items are live; otherwise nothing changes and
    /// `false` is returned. Every block is re-partitioned for the new size.
    pub fn set_item_size(&mut self, size: usize, alignment: usize) -> bool {
        if self.live > 0 {
            warn!(
                live = self.live,
                "Rejected item size change on a pool with live items"
            );
            return false;
        }

        self.alignment = effective_alignment(size, alignment);
        self.item_size = aligned_size(size, self.alignment);
        let item_size = self.item_size;
        for block in &mut self.blocks {
            block.partition(item_size);
        }
        self.sort_blocks();

        debug!(
            item_size = self.item_size,
            alignment = self.alignment,
            blocks = self.blocks.len(),
            "Re-partitioned slab pool"
        );
        true
    }

    /// Allocate one slot.
    ///
    /// Returns `None` when no block has room and the environment refuses to
    /// provide another one.
    pub fn alloc(&mut self) -> Option<NonNull<u8>> {
        if self.blocks.first().map_or(true, |b| b.free() == 0) {
            self.sort_blocks();
        }

        let best_free = self.blocks.first().map_or(0, |b| b.free());
        if best_free < self.min_free.max(1) && !self.grow() && best_free == 0 {
            debug!(item_size = self.item_size, "Slab pool exhausted");
            return None;
        }

        let item_size = self.item_size;
        let ptr = self.blocks[0].alloc_slot(item_size);
        self.live += 1;
        self.allocations += 1;
        trace!(ptr = ?ptr, "Allocated slot");
        Some(ptr)
    }

    /// Return a slot to the pool.
    ///
    /// Pointers that do not name a live slot of this pool are ignored.
    /// Returns whether a slot was released.
    pub fn free(&mut self, ptr: NonNull<u8>) -> bool {
        let addr = ptr.as_ptr() as usize;
        let item_size = self.item_size;

        let released = self
            .blocks
            .iter_mut()
            .find(|block| block.contains(addr))
            .map_or(false, |block| block.free_slot(addr, item_size));

        if released {
            self.live -= 1;
            self.frees += 1;
        } else {
            trace!(addr, "Ignored free of unknown slot");
        }
        released
    }

    /// Take ownership of `memory` and use it as a block.
    ///
    /// The pool does not check `min_donation_size`; donors are expected to.
    pub fn donate(&mut self, memory: BlockMemory) {
        let bytes = memory.len();
        let block = BlockRecord::new(memory, self.item_size, BlockOrigin::Donated);
        if block.slots() < self.min_free {
            debug!(
                slots = block.slots(),
                min_free = self.min_free,
                "Donated block is below the minimum free threshold"
            );
        }
        debug!(bytes, slots = block.slots(), "Accepted donated block");
        self.donations += 1;
        self.insert_sorted(block);
    }

    /// Mark every slot free without returning memory
    pub fn clear(&mut self) {
        self.blocks.iter_mut().for_each(BlockRecord::clear);
        self.sort_blocks();
        self.live = 0;
        debug!(blocks = self.blocks.len(), "Cleared slab pool");
    }

    /// Return every block to the environment
    pub fn release_all(&mut self) {
        if !self.blocks.is_empty() {
            info!(
                blocks = self.blocks.len(),
                bytes = self.total_bytes(),
                "Releasing slab pool memory"
            );
        }
        self.blocks.clear();
        self.allocated_bytes = 0;
        self.live = 0;
    }

    /// Whether `ptr` points into one of this pool's blocks
    pub fn owns(&self, ptr: NonNull<u8>) -> bool {
        let addr = ptr.as_ptr() as usize;
        self.blocks.iter().any(|block| block.contains(addr))
    }

    fn grow(&mut self) -> bool {
        let bytes = match self.next_block_items.checked_mul(self.item_size) {
            Some(bytes) => bytes,
            None => return false,
        };

        if let Some(limit) = self.memory_limit {
            if self.allocated_bytes + bytes > limit {
                warn!(
                    requested = bytes,
                    held = self.allocated_bytes,
                    limit,
                    "Slab pool memory limit reached"
                );
                return false;
            }
        }

        let memory = match BlockMemory::allocate(bytes) {
            Some(memory) => memory,
            None => {
                warn!(requested = bytes, "Environment refused a new slab block");
                return false;
            }
        };

        let block = BlockRecord::new(memory, self.item_size, BlockOrigin::Allocated);
        debug!(
            slots = block.slots(),
            bytes,
            blocks = self.blocks.len() + 1,
            "Attached new slab block"
        );
        self.allocated_bytes += bytes;
        self.growth_events += 1;
        self.insert_sorted(block);
        self.next_block_items = next_growth(self.next_block_items, self.growth_factor);
        true
    }

    fn insert_sorted(&mut self, block: BlockRecord) {
        let position = self
            .blocks
            .iter()
            .position(|b| b.free() < block.free())
            .unwrap_or(self.blocks.len());
        self.blocks.insert(position, block);
    }

    /// Insertion sort by free slots, descending. Cheap for nearly sorted input.
    fn sort_blocks(&mut self) {
        for i in 1..self.blocks.len() {
            let mut j = i;
            while j > 0 && self.blocks[j - 1].free() < self.blocks[j].free() {
                self.blocks.swap(j - 1, j);
                j -= 1;
            }
        }
    }

    #[inline]
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Items allocated and not yet freed
    #[inline]
    pub fn live_items(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &[BlockRecord] {
        &self.blocks
    }

    /// Total slots across all blocks
    pub fn capacity(&self) -> usize {
        self.blocks.iter().map(BlockRecord::slots).sum()
    }

    pub fn free_slots(&self) -> usize {
        self.blocks.iter().map(BlockRecord::free).sum()
    }

    /// Bytes held in all blocks, donated ones included
    pub fn total_bytes(&self) -> usize {
        self.blocks.iter().map(BlockRecord::bytes).sum()
    }

    #[inline]
    pub fn next_block_items(&self) -> usize {
        self.next_block_items
    }

    #[inline]
    pub fn growth_factor(&self) -> f64 {
        self.growth_factor
    }

    #[inline]
    pub fn min_free(&self) -> usize {
        self.min_free
    }

    #[inline]
    pub fn min_donation_size(&self) -> usize {
        self.min_donation_size
    }

    #[inline]
    pub fn memory_limit(&self) -> Option<usize> {
        self.memory_limit
    }

    pub fn set_next_block_items(&mut self, items: usize) {
        self.next_block_items = items.max(1);
    }

    /// Values below 1.0 are raised to 1.0
    pub fn set_growth_factor(&mut self, factor: f64) {
        self.growth_factor = if factor.is_nan() { 1.0 } else { factor.max(1.0) };
    }

    pub fn set_min_free(&mut self, min_free: usize) {
        self.min_free = min_free;
    }

    pub fn set_min_donation_size(&mut self, bytes: usize) {
        self.min_donation_size = bytes;
    }

    pub fn set_memory_limit(&mut self, limit: Option<usize>) {
        self.memory_limit = limit;
    }

    /// Snapshot of the pool's counters and blocks
    pub fn stats(&self) -> PoolStats {
        let blocks: Vec<BlockStats> = self
            .blocks
            .iter()
            .enumerate()
            .map(|(index, block)| BlockStats {
                index,
                origin: block.origin(),
                bytes: block.bytes(),
                slots: block.slots(),
                free_slots: block.free(),
                used_slots: block.used(),
            })
            .collect();

        PoolStats {
            item_size: self.item_size,
            alignment: self.alignment,
            live_items: self.live,
            total_slots: self.capacity(),
            free_slots: self.free_slots(),
            total_bytes: self.total_bytes(),
            allocations: self.allocations,
            frees: self.frees,
            growth_events: self.growth_events,
            donations: self.donations,
            next_block_items: self.next_block_items,
            blocks,
        }
    }
}

impl Default for FixedSlabPool {
    fn default() -> Self {
        Self::new()
    }
}

fn next_growth(current: usize, factor: f64) -> usize {
    let grown = (current as f64 * factor).ceil() as usize;
    grown.max(current)
}

/// Statistics for the slab pool
#[derive(Debug, Clone, Default, Serialize)]
pub struct PoolStats {
    pub item_size: usize,
    pub alignment: usize,
    pub live_items: usize,
    pub total_slots: usize,
    pub free_slots: usize,
    pub total_bytes: usize,
    pub allocations: u64,
    pub frees: u64,
    pub growth_events: u64,
    pub donations: u64,
    pub next_block_items: usize,
    pub blocks: Vec<BlockStats>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BlockStats {
    pub index: usize,
    pub origin: BlockOrigin,
    pub bytes: usize,
    pub slots: usize,
    pub free_slots: usize,
    pub used_slots: usize,
}
