//! SlotStore: the contiguous slot array and its chain primitives.
//!
//! Layout is `[address region | cellar | terminal]`. Home addresses only
//! range over the address region; the cellar is filled from the top down by
//! the free cursor whenever a key collides. Links are plain indices into the
//! same vector, so rebuilding the vector never leaves a dangling reference.
//!
//! The store never hashes or compares keys. Callers compute home addresses
//! and pass them in, which keeps every call into user code in
//! `CoalescedSet`, behind its reentrancy guard.

use crate::error::ReserveError;
use crate::slot::Slot;
use core::fmt;

#[derive(Debug)]
pub(crate) struct SlotStore<K> {
    slots: Vec<Slot<K>>,
    address_size: usize,
    cellar_size: usize,
    // Every slot above the cursor is known to be occupied.
    free_cursor: usize,
}

impl<K> SlotStore<K> {
    /// Allocate an all-free store. Fails without side effects if the
    /// allocation cannot be made.
    pub(crate) fn try_blank(address_size: usize, cellar_size: usize) -> Result<Self, ReserveError> {
        debug_assert!(address_size > 0);
        let capacity = address_size
            .checked_add(cellar_size)
            .ok_or(ReserveError::CapacityOverflow)?;
        let total = capacity
            .checked_add(1)
            .ok_or(ReserveError::CapacityOverflow)?;

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(total)
            .map_err(|_| ReserveError::AllocFailed { slots: total })?;
        slots.resize_with(capacity, || Slot::Free);
        slots.push(Slot::Terminal);

        Ok(Self {
            slots,
            address_size,
            cellar_size,
            free_cursor: capacity - 1,
        })
    }

    #[inline]
    pub(crate) fn address_size(&self) -> usize {
        self.address_size
    }

    #[inline]
    pub(crate) fn cellar_size(&self) -> usize {
        self.cellar_size
    }

    /// Number of usable (non-terminal) slots.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.address_size + self.cellar_size
    }

    /// Index of the terminal sentinel.
    #[inline]
    pub(crate) fn terminal(&self) -> usize {
        self.slots.len() - 1
    }

    #[inline]
    pub(crate) fn home(&self, hash: u64) -> usize {
        (hash % self.address_size as u64) as usize
    }

    #[inline]
    pub(crate) fn slot(&self, index: usize) -> Option<&Slot<K>> {
        self.slots.get(index)
    }

    #[inline]
    pub(crate) fn slots(&self) -> &[Slot<K>] {
        &self.slots
    }

    #[inline]
    pub(crate) fn is_occupied(&self, index: usize) -> bool {
        self.slots[index].is_occupied()
    }

    #[inline]
    pub(crate) fn key(&self, index: usize) -> Option<&K> {
        self.slots[index].key()
    }

    #[inline]
    pub(crate) fn link(&self, index: usize) -> Option<usize> {
        self.slots[index].link()
    }

    /// The next slot on the chain, if the link leads to an occupied slot.
    /// A link into a free slot or the terminal ends the chain.
    #[inline]
    pub(crate) fn live_successor(&self, index: usize) -> Option<usize> {
        self.link(index).filter(|&next| self.is_occupied(next))
    }

    /// Last slot of the chain that passes through `start`.
    pub(crate) fn chain_tail(&self, start: usize) -> usize {
        let mut at = start;
        while let Some(next) = self.live_successor(at) {
            at = next;
        }
        at
    }

    pub(crate) fn set_link(&mut self, index: usize, to: Option<usize>) {
        if let Slot::Occupied { link, .. } = &mut self.slots[index] {
            *link = to;
        }
    }

    /// Put `key` into a free slot as an unlinked chain member.
    pub(crate) fn occupy(&mut self, index: usize, key: K) {
        debug_assert!(self.slots[index].is_free(), "occupy on a used slot");
        self.slots[index] = Slot::Occupied { key, link: None };
    }

    /// Free an occupied slot and hand back its key. Links pointing at the
    /// slot are left in place; they read as end-of-chain while it is free.
    pub(crate) fn vacate(&mut self, index: usize) -> Option<K> {
        match core::mem::replace(&mut self.slots[index], Slot::Free) {
            Slot::Occupied { key, .. } => Some(key),
            other => {
                self.slots[index] = other;
                None
            }
        }
    }

    /// Move the key at `from` into the free slot `to`; `from` becomes free.
    pub(crate) fn relocate(&mut self, from: usize, to: usize) {
        if let Some(key) = self.vacate(from) {
            self.occupy(to, key);
        }
    }

    /// Claim the highest free slot at or below the cursor.
    ///
    /// The cursor only moves down between resets: slots above it stay
    /// occupied until an erase or rebuild, and both reset it.
    pub(crate) fn claim_free_slot(&mut self) -> usize {
        while self.slots[self.free_cursor].is_occupied() {
            debug_assert!(self.free_cursor > 0, "no free slot below the cursor");
            self.free_cursor -= 1;
        }
        self.free_cursor
    }

    pub(crate) fn reset_cursor(&mut self) {
        self.free_cursor = self.capacity() - 1;
    }

    /// Place a key known to be absent. A free home slot takes it directly;
    /// otherwise it goes to a free slot chained behind the tail of the
    /// chain passing through `home`. Returns the slot index used.
    pub(crate) fn place(&mut self, home: usize, key: K) -> usize {
        if !self.is_occupied(home) {
            self.occupy(home, key);
            return home;
        }
        let tail = self.chain_tail(home);
        let index = self.claim_free_slot();
        self.occupy(index, key);
        self.set_link(tail, Some(index));
        index
    }

    /// First occupied slot at or after `index`, or the terminal.
    pub(crate) fn skip_free(&self, index: usize) -> usize {
        let mut at = index.min(self.terminal());
        while self.slots[at].is_free() {
            at += 1;
        }
        at
    }

    /// Consume the store, yielding live keys in slot order.
    pub(crate) fn into_keys(self) -> impl Iterator<Item = K> {
        self.slots.into_iter().filter_map(Slot::into_key)
    }

    pub(crate) fn into_slots(self) -> Vec<Slot<K>> {
        self.slots
    }
}

/// Slot-by-slot dump of a set's internal layout, for debugging.
///
/// Produced by [`CoalescedSet::layout`](crate::CoalescedSet::layout).
pub struct Layout<'a, K> {
    pub(crate) store: &'a SlotStore<K>,
    pub(crate) len: usize,
}

impl<K: fmt::Debug> fmt::Display for Layout<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "len = {} address = {} cellar = {}",
            self.len, self.store.address_size, self.store.cellar_size
        )?;
        for (i, slot) in self.store.slots.iter().enumerate() {
            match slot {
                Slot::Free => writeln!(f, "{i}: --free--")?,
                Slot::Occupied { key, link: Some(next) } => writeln!(f, "{i}: {key:?} -> {next}")?,
                Slot::Occupied { key, link: None } => writeln!(f, "{i}: {key:?}")?,
                Slot::Terminal => writeln!(f, "{i}: --end--")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(address: usize, cellar: usize) -> SlotStore<u64> {
        SlotStore::try_blank(address, cellar).unwrap()
    }

    #[test]
    fn blank_store_layout() {
        let s = blank(5, 3);
        assert_eq!(s.capacity(), 8);
        assert_eq!(s.terminal(), 8);
        assert!(matches!(s.slot(8), Some(Slot::Terminal)));
        assert!(s.slots()[..8].iter().all(Slot::is_free));
        assert_eq!(s.skip_free(0), 8);
    }

    #[test]
    fn collisions_fill_from_the_top_and_chain_in_order() {
        let mut s = blank(5, 3);
        assert_eq!(s.place(2, 2), 2);
        assert_eq!(s.place(2, 7), 7);
        assert_eq!(s.place(2, 12), 6);
        assert_eq!(s.link(2), Some(7));
        assert_eq!(s.link(7), Some(6));
        assert_eq!(s.link(6), None);
        assert_eq!(s.chain_tail(2), 6);
    }

    #[test]
    fn cursor_spills_into_address_region_when_cellar_is_full() {
        let mut s = blank(3, 1);
        s.place(0, 0);
        assert_eq!(s.place(0, 3), 3);
        // Cellar exhausted; next collision takes the highest free address slot.
        assert_eq!(s.place(0, 6), 2);
        assert_eq!(s.chain_tail(0), 2);
    }

    #[test]
    fn link_into_free_slot_ends_chain() {
        let mut s = blank(5, 3);
        s.place(1, 1);
        s.place(1, 6);
        assert_eq!(s.vacate(7), Some(6));
        assert_eq!(s.link(1), Some(7));
        assert_eq!(s.live_successor(1), None);
        assert_eq!(s.chain_tail(1), 1);
        assert_eq!(s.vacate(7), None);
    }

    #[test]
    fn layout_dump_lists_every_slot() {
        let mut s = blank(2, 1);
        s.place(0, 10);
        s.place(0, 12);
        let dump = Layout { store: &s, len: 2 }.to_string();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(
            lines,
            [
                "len = 2 address = 2 cellar = 1",
                "0: 10 -> 2",
                "1: --free--",
                "2: 12",
                "3: --end--",
            ]
        );
    }
}
