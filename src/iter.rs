//! Positions and iterators over a [`CoalescedSet`].
//!
//! A position is a plain slot index. Advancing skips free slots and stops
//! at the next occupied slot or at the terminal sentinel, which is the
//! end position and is never stepped past. Order is slot order and is not
//! preserved across growth or erase.

use crate::coalesced_set::CoalescedSet;
use crate::slot::Slot;
use core::iter::FusedIterator;

/// Logical location of a key in a set, as returned by
/// [`CoalescedSet::find`] and [`CoalescedSet::insert`].
///
/// Positions are not tied to a borrow of the set. Any erase or any insert
/// that grows the set may move keys, after which an old position resolves
/// to a different key or to nothing.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Position(usize);

impl Position {
    pub(crate) fn new(index: usize) -> Self {
        Position(index)
    }

    /// Slot index in the set's internal array.
    pub fn index(&self) -> usize {
        self.0
    }

    /// The key stored at this position, if the slot is occupied.
    pub fn key<'a, K, S>(&self, set: &'a CoalescedSet<K, S>) -> Option<&'a K> {
        set.key_at(*self)
    }
}

/// Borrowing iterator over the keys of a set, in slot order.
pub struct Iter<'a, K> {
    slots: &'a [Slot<K>],
    at: usize,
    remaining: usize,
}

impl<'a, K> Iter<'a, K> {
    pub(crate) fn new(slots: &'a [Slot<K>], len: usize) -> Self {
        Iter {
            slots,
            at: 0,
            remaining: len,
        }
    }
}

impl<K> Clone for Iter<'_, K> {
    fn clone(&self) -> Self {
        Iter {
            slots: self.slots,
            at: self.at,
            remaining: self.remaining,
        }
    }
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(slot) = self.slots.get(self.at) {
            match slot {
                Slot::Free => self.at += 1,
                Slot::Occupied { key, .. } => {
                    self.at += 1;
                    self.remaining -= 1;
                    return Some(key);
                }
                Slot::Terminal => break,
            }
        }
        None
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K> ExactSizeIterator for Iter<'_, K> {}
impl<K> FusedIterator for Iter<'_, K> {}

/// Owning iterator over the keys of a set, in slot order.
pub struct IntoIter<K> {
    slots: std::vec::IntoIter<Slot<K>>,
    remaining: usize,
}

impl<K> IntoIter<K> {
    pub(crate) fn new(slots: Vec<Slot<K>>, len: usize) -> Self {
        IntoIter {
            slots: slots.into_iter(),
            remaining: len,
        }
    }
}

impl<K> Iterator for IntoIter<K> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let key = self.slots.by_ref().find_map(Slot::into_key)?;
        self.remaining -= 1;
        Some(key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K> ExactSizeIterator for IntoIter<K> {}
impl<K> FusedIterator for IntoIter<K> {}

impl<'a, K, S> IntoIterator for &'a CoalescedSet<K, S> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Iter<'a, K> {
        self.iter()
    }
}

impl<K, S> IntoIterator for CoalescedSet<K, S> {
    type Item = K;
    type IntoIter = IntoIter<K>;

    fn into_iter(self) -> IntoIter<K> {
        self.into_keys()
    }
}
