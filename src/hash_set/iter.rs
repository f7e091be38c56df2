//! Iteration over a ChainedHashSet

use super::node::{Link, Node};
use std::iter::FusedIterator;
use std::marker::PhantomData;

/// Walks one bucket's chain
pub(crate) struct ChainIter<'a, T> {
    link: Link<T>,
    _marker: PhantomData<&'a Node<T>>,
}

impl<'a, T> ChainIter<'a, T> {
    pub(crate) fn new(head: Link<T>) -> Self {
        Self {
            link: head,
            _marker: PhantomData,
        }
    }
}

impl<'a, T> Iterator for ChainIter<'a, T> {
    type Item = &'a Node<T>;

    fn next(&mut self) -> Option<&'a Node<T>> {
        self.link.map(|node| {
            // SAFETY: linked nodes stay valid while the set is borrowed.
            let node = unsafe { &*node.as_ptr() };
            self.link = node.next;
            node
        })
    }
}

/// Iterator over the items of a [`ChainedHashSet`](super::ChainedHashSet).
///
/// Yields items bucket by bucket, and within a bucket from the most recently
/// added node. The set cannot be modified while an `Iter` is alive.
pub struct Iter<'a, T> {
    buckets: &'a [Link<T>],
    next_bucket: usize,
    chain: ChainIter<'a, T>,
    remaining: usize,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(buckets: &'a [Link<T>], len: usize) -> Self {
        Self {
            buckets,
            next_bucket: 0,
            chain: ChainIter::new(None),
            remaining: len,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        loop {
            if let Some(node) = self.chain.next() {
                self.remaining -= 1;
                return Some(&node.item);
            }
            let head = *self.buckets.get(self.next_bucket)?;
            self.next_bucket += 1;
            self.chain = ChainIter::new(head);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}
