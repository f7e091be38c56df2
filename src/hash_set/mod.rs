//! Separate-chaining hash set
//!
//! Items are stored in nodes obtained from a [`NodePool`] backend, by default
//! a [`FixedSlabPool`](crate::FixedSlabPool). Each node caches its item's hash.
//!
//! # Architecture
//!
//! ```text
//! buckets (len 4, mask 0b11)
//!   [0] → {hash=4}
//!   [1]
//!   [2]
//!   [3] → {hash=7} → {hash=3}
//! ```
//!
//! When the item count would pass the trigger the bucket array doubles.
//! Every chain is split in one pass on the newly significant hash bit: nodes
//! with the bit clear stay at `i`, the rest move to `i + old_len`. Cached
//! hashes mean nothing is rehashed. The old array is donated to the backend.

mod backend;
mod iter;
mod node;

pub use backend::{NodePool, SlabBackend, SystemBackend};
pub use iter::Iter;

use crate::error::{Error, Result};
use crate::hash::Hashable;
use crate::slab::BlockMemory;
use iter::ChainIter;
use node::{Buckets, Link, Node};
use serde::{Deserialize, Serialize};
use std::alloc::{handle_alloc_error, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::{self, addr_of_mut};
use tracing::{debug, warn};

/// Sizing for a new [`ChainedHashSet`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashSetConfig {
    /// Initial bucket count (rounded up to a power of two, 0 means 2)
    pub initial_bins: usize,
    /// Item count that triggers doubling (0 means the bucket count)
    pub initial_trigger: usize,
}

impl Default for HashSetConfig {
    fn default() -> Self {
        Self {
            initial_bins: 16,
            initial_trigger: 0,
        }
    }
}

/// Hash set with separate chaining and pool-allocated nodes
pub struct ChainedHashSet<T, P: NodePool = SlabBackend> {
    buckets: Buckets<T>,
    len: usize,
    mask: usize,
    /// Doubles the bucket array when `len` would exceed it
    trigger: usize,
    longest_chain: usize,
    backend: P,
    _owns: PhantomData<T>,
}

impl<T, P: NodePool + Default> ChainedHashSet<T, P> {
    /// Create a set with `initial_bins` buckets.
    ///
    /// `initial_trigger` of zero sets the trigger to the bucket count.
    pub fn new(initial_bins: usize, initial_trigger: usize) -> Self {
        Self::with_backend(P::default(), initial_bins, initial_trigger)
    }

    pub fn with_config(config: &HashSetConfig) -> Self {
        Self::new(config.initial_bins, config.initial_trigger)
    }
}

impl<T, P: NodePool> ChainedHashSet<T, P> {
    /// Create a set drawing its nodes from `backend`.
    ///
    /// The backend is configured for this set's node layout with
    /// `initial_bins` as its initial capacity.
    ///
    /// # Panics
    ///
    /// If the backend refuses the node layout or `initial_bins` has no
    /// power of two above it. See [`ChainedHashSet::try_with_backend`].
    pub fn with_backend(backend: P, initial_bins: usize, initial_trigger: usize) -> Self {
        match Self::try_with_backend(backend, initial_bins, initial_trigger) {
            Ok(set) => set,
            Err(e) => panic!("cannot create hash set: {}", e),
        }
    }

    /// Create a set drawing its nodes from `backend`, reporting a backend
    /// that cannot hold this set's nodes as [`Error::InvalidArgument`]
    pub fn try_with_backend(
        mut backend: P,
        initial_bins: usize,
        initial_trigger: usize,
    ) -> Result<Self> {
        assert!(
            mem::align_of::<Node<T>>() <= BlockMemory::ALIGNMENT,
            "item alignment exceeds {} bytes",
            BlockMemory::ALIGNMENT
        );

        let requested = if initial_bins == 0 { 2 } else { initial_bins };
        let bins = requested.checked_next_power_of_two().ok_or_else(|| {
            Error::InvalidArgument(format!("{} initial buckets is too many", initial_bins))
        })?;
        let trigger = if initial_trigger == 0 { bins } else { initial_trigger };

        backend.configure(mem::size_of::<Node<T>>(), mem::align_of::<Node<T>>(), requested)?;
        let buckets =
            Buckets::allocate(bins).unwrap_or_else(|| handle_alloc_error(Buckets::<T>::layout(bins)));

        Ok(Self {
            buckets,
            len: 0,
            mask: bins - 1,
            trigger,
            longest_chain: 0,
            backend,
            _owns: PhantomData,
        })
    }

    /// Number of items
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets (always a power of two)
    #[inline]
    pub fn bins(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub fn trigger(&self) -> usize {
        self.trigger
    }

    /// Longest chain any insertion has produced
    #[inline]
    pub fn longest_chain(&self) -> usize {
        self.longest_chain
    }

    pub fn backend(&self) -> &P {
        &self.backend
    }

    /// Chain length of every bucket
    pub fn bucket_lengths(&self) -> Vec<usize> {
        self.buckets
            .as_slice()
            .iter()
            .map(|&head| ChainIter::new(head).count())
            .collect()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.buckets.as_slice(), self.len)
    }

    /// Remove every item, keeping the bucket count
    pub fn clear(&mut self) {
        self.drop_items();
        self.backend.clear();
        self.len = 0;
        self.longest_chain = 0;
    }

    #[inline]
    fn bucket_of(&self, hash: u32) -> usize {
        hash as usize & self.mask
    }

    fn chain(&self, hash: u32) -> ChainIter<'_, T> {
        ChainIter::new(self.buckets.as_slice()[self.bucket_of(hash)])
    }

    /// Drop every item in place; node memory is left to the backend.
    ///
    /// Each node is unlinked before its item is dropped, so if an item's
    /// destructor panics the remaining items are still reachable and are
    /// dropped exactly once later.
    fn drop_items(&mut self) {
        for i in 0..self.buckets.len() {
            while let Some(node) = self.buckets.as_slice()[i] {
                let node = node.as_ptr();
                // SAFETY: linked nodes hold initialised items, and the node
                // leaves the chain before its item is dropped.
                unsafe {
                    self.buckets.as_mut_slice()[i] = (*node).next;
                    self.len -= 1;
                    ptr::drop_in_place(addr_of_mut!((*node).item));
                }
            }
        }
    }

    /// Double the bucket array, splitting every chain on one more hash bit
    fn resize(&mut self) {
        let old_bins = self.buckets.len();
        let new_bins = old_bins << 1;
        let mut fresh = match Buckets::<T>::allocate(new_bins) {
            Some(buckets) => buckets,
            None => {
                warn!(bins = new_bins, "Could not grow hash set buckets");
                return;
            }
        };

        let base = fresh.as_mut_ptr();
        for i in 0..old_bins {
            let mut link = self.buckets.as_slice()[i];
            // SAFETY: `low` and `high` point either into `fresh` (indices
            // below new_bins) or at the `next` field of a node already moved.
            unsafe {
                let mut low: *mut Link<T> = base.add(i);
                let mut high: *mut Link<T> = base.add(i + old_bins);
                while let Some(node) = link {
                    let raw = node.as_ptr();
                    link = (*raw).next;
                    if ((*raw).hash as usize & old_bins) != 0 {
                        *high = Some(node);
                        high = addr_of_mut!((*raw).next);
                    } else {
                        *low = Some(node);
                        low = addr_of_mut!((*raw).next);
                    }
                }
                *low = None;
                *high = None;
            }
        }

        let old = mem::replace(&mut self.buckets, fresh);
        self.backend.donate(old.into_memory());
        self.mask = new_bins - 1;
        self.trigger = self.trigger.saturating_mul(2);
        debug!(bins = new_bins, len = self.len, trigger = self.trigger, "Resized hash set");
    }
}

impl<T: Hashable + Eq, P: NodePool> ChainedHashSet<T, P> {
    /// Insert `item` unless an equal item is present.
    ///
    /// Returns the stored item (the existing one for duplicates), or `None`
    /// if the backend could not supply a node.
    pub fn add(&mut self, item: T) -> Option<&T> {
        let hash = item.hash32();

        let mut chain = 1;
        for node in self.chain(hash) {
            if node.hash == hash && node.item == item {
                // SAFETY: the node outlives the borrow of self returned here.
                return Some(unsafe { &*(&node.item as *const T) });
            }
            chain += 1;
        }

        if self.len + 1 > self.trigger {
            self.resize();
        }

        let ptr = self.backend.alloc()?.cast::<Node<T>>();
        let index = self.bucket_of(hash);
        let head = self.buckets.as_slice()[index];
        // SAFETY: the backend handed out a fresh, suitably sized and aligned
        // slot for one node.
        unsafe { ptr.as_ptr().write(Node { next: head, hash, item }) };
        self.buckets.as_mut_slice()[index] = Some(ptr);

        self.len += 1;
        self.longest_chain = self.longest_chain.max(chain);
        // SAFETY: just initialised above.
        Some(unsafe { &(*ptr.as_ptr()).item })
    }

    /// Look up the item equal to `key`
    pub fn find<K>(&self, key: &K) -> Option<&T>
    where
        K: Hashable + ?Sized,
        T: PartialEq<K>,
    {
        let hash = key.hash32();
        self.chain(hash)
            .find(|node| node.hash == hash && node.item == *key)
            .map(|node| &node.item)
    }

    pub fn contains<K>(&self, key: &K) -> bool
    where
        K: Hashable + ?Sized,
        T: PartialEq<K>,
    {
        self.find(key).is_some()
    }

    /// Remove the item equal to `key`. Returns whether one was removed.
    pub fn remove<K>(&mut self, key: &K) -> bool
    where
        K: Hashable + ?Sized,
        T: PartialEq<K>,
    {
        self.take(key).is_some()
    }

    /// Remove and return the item equal to `key`
    pub fn take<K>(&mut self, key: &K) -> Option<T>
    where
        K: Hashable + ?Sized,
        T: PartialEq<K>,
    {
        let hash = key.hash32();
        let index = self.bucket_of(hash);

        // SAFETY: `slot` always points at a live link: the bucket itself or
        // the `next` field of a node still in the chain.
        unsafe {
            let mut slot: *mut Link<T> = self.buckets.as_mut_ptr().add(index);
            while let Some(node) = *slot {
                let raw = node.as_ptr();
                if (*raw).hash == hash && (*raw).item == *key {
                    *slot = (*raw).next;
                    let Node { item, .. } = raw.read();
                    self.backend.free(node.cast());
                    self.len -= 1;
                    return Some(item);
                }
                slot = addr_of_mut!((*raw).next);
            }
        }
        None
    }
}

impl<T, P: NodePool> Drop for ChainedHashSet<T, P> {
    fn drop(&mut self) {
        self.drop_items();
        self.backend.clear();
    }
}

impl<T: Hashable + Eq, P: NodePool + Default> Default for ChainedHashSet<T, P> {
    fn default() -> Self {
        Self::with_config(&HashSetConfig::default())
    }
}

impl<T, P> Clone for ChainedHashSet<T, P>
where
    T: Hashable + Eq + Clone,
    P: NodePool + Default,
{
    fn clone(&self) -> Self {
        let mut copy = Self::new(self.bins(), self.trigger);
        copy.extend(self.iter().cloned());
        copy
    }
}

impl<T: Hashable + Eq, P: NodePool> Extend<T> for ChainedHashSet<T, P> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            if self.add(item).is_none() {
                handle_alloc_error(Layout::new::<Node<T>>());
            }
        }
    }
}

impl<T: Hashable + Eq, P: NodePool + Default> FromIterator<T> for ChainedHashSet<T, P> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

impl<'a, T, P: NodePool> IntoIterator for &'a ChainedHashSet<T, P> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<T: fmt::Debug, P: NodePool> fmt::Debug for ChainedHashSet<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
