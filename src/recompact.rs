//! Deletion engine: erase a key and repair the chain it sat on.
//!
//! Freeing a slot in the middle of a chain would cut off every key behind
//! it, because lookups treat a free slot as end-of-chain. So after the slot
//! is freed, the members that followed it are detached and settled again
//! one by one, in chain order:
//!
//! - home slot free: the key moves to its home and becomes a chain head;
//! - otherwise: the key stays where it is and is linked behind the tail of
//!   the chain through its home.
//!
//! Chain walks stop in front of detached members, so a key is never linked
//! behind a slot that may still be freed later in the same pass. Stale
//! links into freed slots are left alone; they read as end-of-chain, and a
//! later occupant of such a slot simply joins the two chains.
//!
//! A detached member's home is never another detached member still waiting
//! to be settled: links have out-degree one and no cycles, so the walk from
//! a key's home reaches the key before anything that follows it.

use crate::table::Table;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::HashSet;

impl<K, S> Table<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Remove the key equal to `q` and return it.
    pub(crate) fn take<Q>(&mut self, q: &Q) -> Option<K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        let at = self.locate(hash, q)?;

        // The freed slot may sit above the cursor.
        self.store.reset_cursor();

        let rest = self.chain_after(at);
        let key = self.store.vacate(at);
        self.len -= 1;
        if !rest.is_empty() {
            self.recompact(rest);
        }
        key
    }

    /// Slots reachable from `at` by live links, in chain order.
    fn chain_after(&self, at: usize) -> Vec<usize> {
        let mut rest = Vec::new();
        let mut cur = at;
        while let Some(next) = self.store.live_successor(cur) {
            rest.push(next);
            cur = next;
        }
        rest
    }

    fn recompact(&mut self, order: Vec<usize>) {
        let mut detached: HashSet<usize> = order.iter().copied().collect();
        for &at in &order {
            self.store.set_link(at, None);
        }

        let (mut relocated, mut relinked) = (0usize, 0usize);
        for &at in &order {
            detached.remove(&at);

            let home = match self.store.key(at) {
                Some(key) => self.store.home(self.hasher.hash_one(key)),
                None => continue,
            };
            if home == at {
                continue;
            }

            debug_assert!(!detached.contains(&home), "home {home} not yet settled");
            if !self.store.is_occupied(home) {
                self.store.relocate(at, home);
                relocated += 1;
            } else {
                let tail = self.settled_tail(home, &detached);
                // The walk reaches `at` only if it is already on its home chain.
                if tail != at {
                    self.store.set_link(tail, Some(at));
                }
                relinked += 1;
            }
        }

        log::trace!(
            "recompacted {} chain members: {} moved home, {} relinked in place",
            order.len(),
            relocated,
            relinked
        );
    }

    /// Tail of the chain through `start`, not walking into detached slots.
    fn settled_tail(&self, start: usize, detached: &HashSet<usize>) -> usize {
        let mut at = start;
        while let Some(next) = self
            .store
            .live_successor(at)
            .filter(|n| !detached.contains(n))
        {
            at = next;
        }
        at
    }
}
