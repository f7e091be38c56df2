//! Block records: one memory region split into equal slots

use super::memory::BlockMemory;
use crate::bitvec::BitVector;
use serde::Serialize;
use std::ptr::NonNull;

/// Where a block's memory came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockOrigin {
    /// Requested from the environment by the pool
    Allocated,
    /// Handed over by a caller through `donate`
    Donated,
}

/// A block of slots and the bitmap tracking which are occupied
#[derive(Debug)]
pub struct BlockRecord {
    memory: BlockMemory,
    /// Bit `i` is set while slot `i` is handed out
    occupancy: BitVector,
    slots: usize,
    free: usize,
    /// Lowest possibly-free slot. Equals `slots` once the block fills up.
    first_free: usize,
    origin: BlockOrigin,
}

impl BlockRecord {
    /// Wrap `memory` and split it into slots of `item_size` bytes
    pub fn new(memory: BlockMemory, item_size: usize, origin: BlockOrigin) -> Self {
        let mut block = Self {
            memory,
            occupancy: BitVector::new(),
            slots: 0,
            free: 0,
            first_free: 0,
            origin,
        };
        block.partition(item_size);
        block
    }

    /// Recompute the slot count for `item_size` and mark every slot free
    pub fn partition(&mut self, item_size: usize) {
        self.slots = self.memory.len() / item_size;
        self.occupancy.accommodate(self.slots);
        self.clear();
    }

    /// Mark every slot free
    pub fn clear(&mut self) {
        self.occupancy.zero();
        self.free = self.slots;
        self.first_free = 0;
    }

    /// Hand out the slot at the free hint. The block must have a free slot.
    pub fn alloc_slot(&mut self, item_size: usize) -> NonNull<u8> {
        debug_assert!(self.free > 0, "alloc_slot on a full block");
        let index = self.first_free;
        debug_assert!(!self.occupancy.get(index));

        self.occupancy.set(index);
        self.free -= 1;
        self.first_free = self.occupancy.next_unset_from(index + 1);

        self.memory.at(index * item_size)
    }

    /// Release the slot containing `addr`.
    ///
    /// Returns `false` without changing anything if `addr` is outside this
    /// block, not on a slot boundary, past the last slot, or already free.
    pub fn free_slot(&mut self, addr: usize, item_size: usize) -> bool {
        let offset = match self.memory.offset_of(addr) {
            Some(offset) => offset,
            None => return false,
        };
        if offset % item_size != 0 {
            return false;
        }
        let index = offset / item_size;
        if index >= self.slots || !self.occupancy.get(index) {
            return false;
        }

        self.occupancy.unset(index);
        self.free += 1;
        if index < self.first_free {
            self.first_free = index;
        }
        true
    }

    /// Whether `addr` lies in this block's byte range
    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        self.memory.offset_of(addr).is_some()
    }

    #[inline]
    pub fn slots(&self) -> usize {
        self.slots
    }

    #[inline]
    pub fn free(&self) -> usize {
        self.free
    }

    #[inline]
    pub fn used(&self) -> usize {
        self.slots - self.free
    }

    #[inline]
    pub fn first_free(&self) -> usize {
        self.first_free
    }

    #[inline]
    pub fn bytes(&self) -> usize {
        self.memory.len()
    }

    #[inline]
    pub fn origin(&self) -> BlockOrigin {
        self.origin
    }

    #[inline]
    pub fn occupancy(&self) -> &BitVector {
        &self.occupancy
    }

    /// Give the memory back, consuming the record
    pub fn into_memory(self) -> BlockMemory {
        self.memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(slots: usize, item_size: usize) -> BlockRecord {
        let memory = BlockMemory::allocate(slots * item_size).unwrap();
        BlockRecord::new(memory, item_size, BlockOrigin::Allocated)
    }

    #[test]
    fn test_partition() {
        let memory = BlockMemory::allocate(100).unwrap();
        let block = BlockRecord::new(memory, 8, BlockOrigin::Donated);
        assert_eq!(block.slots(), 12);
        assert_eq!(block.free(), 12);
        assert_eq!(block.occupancy().bits(), 12);
        assert_eq!(block.origin(), BlockOrigin::Donated);
    }

    #[test]
    fn test_alloc_advances_hint() {
        let mut block = block(4, 8);
        let a = block.alloc_slot(8).as_ptr() as usize;
        let b = block.alloc_slot(8).as_ptr() as usize;
        assert_eq!(b - a, 8);
        assert_eq!(block.first_free(), 2);
        assert_eq!(block.used(), 2);
    }

    #[test]
    fn test_hint_goes_stale_when_full() {
        let mut block = block(2, 8);
        block.alloc_slot(8);
        block.alloc_slot(8);
        assert_eq!(block.free(), 0);
        assert_eq!(block.first_free(), block.slots());
    }

    #[test]
    fn test_free_lowers_hint() {
        let mut block = block(4, 8);
        let first = block.alloc_slot(8).as_ptr() as usize;
        block.alloc_slot(8);
        block.alloc_slot(8);

        assert!(block.free_slot(first, 8));
        assert_eq!(block.first_free(), 0);
        assert_eq!(block.free(), 2);

        let again = block.alloc_slot(8).as_ptr() as usize;
        assert_eq!(again, first);
    }

    #[test]
    fn test_free_ignores_foreign_and_duplicate_pointers() {
        let mut block = block(4, 8);
        let ptr = block.alloc_slot(8).as_ptr() as usize;

        assert!(!block.free_slot(ptr + 3, 8));
        assert!(!block.free_slot(ptr + 4096, 8));
        assert!(block.free_slot(ptr, 8));
        assert!(!block.free_slot(ptr, 8));
        assert_eq!(block.free(), 4);
    }

    #[test]
    fn test_tail_padding_is_not_a_slot() {
        let memory = BlockMemory::allocate(20).unwrap();
        let start = memory.start();
        let mut block = BlockRecord::new(memory, 8, BlockOrigin::Allocated);
        assert_eq!(block.slots(), 2);
        assert!(block.contains(start + 16));
        assert!(!block.free_slot(start + 16, 8));
    }
}
