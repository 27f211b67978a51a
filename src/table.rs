//! Table: hashing engine over a [`SlotStore`].
//!
//! Owns the hasher, the sizing [`Config`] and the live count, and implements
//! lookup, insertion and growth on top of the store's chain primitives. The
//! deletion engine lives in `recompact`. Nothing here guards against
//! reentrancy; `CoalescedSet` does that around every call that can reach
//! user `Hash`/`Eq` code.

use crate::config::Config;
use crate::error::ReserveError;
use crate::slot::Slot;
use crate::store::SlotStore;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};

pub(crate) struct Table<K, S> {
    pub(crate) hasher: S,
    pub(crate) config: Config,
    pub(crate) store: SlotStore<K>,
    pub(crate) len: usize,
}

/// Unwrap a growth result the way `std` collections do: an allocation
/// failure in an infallible API is a panic.
#[track_caller]
pub(crate) fn infallible<T>(result: Result<T, ReserveError>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("{e}"),
    }
}

impl<K, S> Table<K, S> {
    pub(crate) fn blank(config: Config, hasher: S) -> Result<Self, ReserveError> {
        let store = Self::blank_store(&config)?;
        Ok(Self {
            hasher,
            config,
            store,
            len: 0,
        })
    }

    fn blank_store(config: &Config) -> Result<SlotStore<K>, ReserveError> {
        let address = config.min_address_size();
        SlotStore::try_blank(address, config.cellar_size_for(address))
    }

    /// Drop every key and fall back to the minimum layout.
    pub(crate) fn clear(&mut self) -> Result<(), ReserveError> {
        let fresh = Self::blank_store(&self.config)?;
        let old = core::mem::replace(&mut self.store, fresh);
        self.len = 0;
        drop(old);
        Ok(())
    }
}

impl<K, S> Table<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    #[inline]
    pub(crate) fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// Walk the chain through `hash`'s home address and return the slot
    /// holding a key equal to `q`.
    ///
    /// Chains are acyclic, so the walk ends at a slot with no live
    /// successor after at most `capacity` steps.
    pub(crate) fn locate<Q>(&self, hash: u64, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let mut at = self.store.home(hash);
        if !self.store.is_occupied(at) {
            return None;
        }
        loop {
            if self.store.key(at).is_some_and(|k| k.borrow() == q) {
                return Some(at);
            }
            at = self.store.live_successor(at)?;
        }
    }

    /// Insert `key` unless an equal key is present. Returns the slot of the
    /// stored key and whether it was newly inserted.
    pub(crate) fn insert(&mut self, key: K) -> Result<(usize, bool), ReserveError> {
        let hash = self.make_hash(&key);
        if let Some(at) = self.locate(hash, &key) {
            return Ok((at, false));
        }
        self.grow_for(self.len + 1)?;
        let home = self.store.home(hash);
        let at = self.store.place(home, key);
        self.len += 1;
        Ok((at, true))
    }

    /// Place a key known to be absent, without growing.
    fn place_new(&mut self, key: K) -> usize {
        let home = self.store.home(self.hasher.hash_one(&key));
        let at = self.store.place(home, key);
        self.len += 1;
        at
    }

    pub(crate) fn reserve(&mut self, additional: usize) -> Result<(), ReserveError> {
        let target = self
            .len
            .checked_add(additional)
            .ok_or(ReserveError::CapacityOverflow)?;
        self.grow_for(target)
    }

    /// Grow so that `target` keys stay within the load factor. The address
    /// size follows `n -> 2n + 1` until the bound holds.
    fn grow_for(&mut self, target: usize) -> Result<(), ReserveError> {
        if !self.config.over_limit(target, self.store.capacity()) {
            return Ok(());
        }
        let mut address = self.store.address_size();
        loop {
            address = address
                .checked_mul(2)
                .and_then(|a| a.checked_add(1))
                .ok_or(ReserveError::CapacityOverflow)?;
            if !self.config.over_limit(target, address) {
                break;
            }
        }
        self.rebuild(address)
    }

    /// Replace the store with a blank one of at least `requested` home
    /// addresses and reinsert every live key in slot order.
    ///
    /// The new store is fully allocated before the old one is touched, so
    /// an error leaves the table unchanged.
    pub(crate) fn rebuild(&mut self, requested: usize) -> Result<(), ReserveError> {
        let address = requested
            .max(self.config.min_address_size())
            .max(self.config.address_size_for(self.len));
        let cellar = self.config.cellar_size_for(address);
        let fresh = SlotStore::try_blank(address, cellar)?;
        let old = core::mem::replace(&mut self.store, fresh);

        log::debug!(
            "rebuilding coalesced table: address {} -> {}, cellar {} -> {}, {} keys",
            old.address_size(),
            address,
            old.cellar_size(),
            cellar,
            self.len
        );

        for key in old.into_keys() {
            let home = self.store.home(self.hasher.hash_one(&key));
            self.store.place(home, key);
        }
        Ok(())
    }

    /// Deep copy by reinsertion; the copy's chain layout may differ.
    pub(crate) fn duplicate(&self) -> Result<Self, ReserveError>
    where
        K: Clone,
        S: Clone,
    {
        let mut copy = Table::blank(self.config, self.hasher.clone())?;
        copy.reserve(self.len)?;
        for key in self.store.slots().iter().filter_map(Slot::key) {
            copy.place_new(key.clone());
        }
        Ok(copy)
    }

    /// Check every structural invariant; panics on the first violation.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let slots = self.store.slots();
        assert_eq!(slots.len(), self.store.capacity() + 1);
        assert!(matches!(slots.last(), Some(Slot::Terminal)));
        assert!(
            slots[..slots.len() - 1]
                .iter()
                .all(|s| !matches!(s, Slot::Terminal)),
            "terminal before the end"
        );
        let occupied = slots.iter().filter(|s| s.is_occupied()).count();
        assert_eq!(occupied, self.len, "len out of sync with occupied slots");
        assert!(
            !self.config.over_limit(self.len, self.store.capacity()),
            "load factor exceeded"
        );

        for (i, slot) in slots.iter().enumerate() {
            let Some(key) = slot.key() else { continue };
            let hash = self.make_hash(key);
            let mut at = self.store.home(hash);
            let mut steps = 0;
            while at != i {
                at = self
                    .store
                    .live_successor(at)
                    .unwrap_or_else(|| panic!("slot {i} unreachable from its home"));
                steps += 1;
                assert!(steps <= slots.len(), "cycle on the chain to slot {i}");
            }
            assert_eq!(self.locate(hash, key), Some(i), "duplicate of slot {i}");
        }
    }
}
