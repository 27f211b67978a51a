//! CoalescedSet: public set API with a debug reentrancy guard.

use crate::config::Config;
use crate::error::ReserveError;
use crate::iter::{IntoIter, Iter, Position};
use crate::reentrancy::DebugReentrancy;
use crate::store::Layout;
use crate::table::{infallible, Table};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use std::collections::hash_map::RandomState;

/// A hash set built on coalesced hashing.
///
/// Keys live in one slot array split into an address region, indexed by
/// `hash % address_size`, and a cellar that absorbs collisions. Colliding
/// keys are linked into chains inside the array. See [`Config`] for the
/// sizing knobs.
///
/// Like the `std` collections, behavior is unspecified (but memory safe) if
/// a key's `Hash` or `Eq` changes while it is in the set, or if either
/// panics.
pub struct CoalescedSet<K, S = RandomState> {
    table: Table<K, S>,
    reentrancy: DebugReentrancy,
}

impl<K> CoalescedSet<K>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_config_and_hasher(config, Default::default())
    }
}

impl<K, S> Default for CoalescedSet<K, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, S> CoalescedSet<K, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_config_and_hasher(Config::default(), hasher)
    }

    /// # Panics
    ///
    /// Panics if the minimum layout of `config` cannot be allocated.
    pub fn with_config_and_hasher(config: Config, hasher: S) -> Self {
        Self {
            table: infallible(Table::blank(config, hasher)),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len
    }

    pub fn is_empty(&self) -> bool {
        self.table.len == 0
    }

    /// Usable slots: address region plus cellar.
    pub fn capacity(&self) -> usize {
        self.table.store.capacity()
    }

    pub fn address_size(&self) -> usize {
        self.table.store.address_size()
    }

    pub fn cellar_size(&self) -> usize {
        self.table.store.cellar_size()
    }

    pub fn config(&self) -> &Config {
        &self.table.config
    }

    pub fn hasher(&self) -> &S {
        &self.table.hasher
    }

    /// Remove every key and shrink back to the minimum layout.
    pub fn clear(&mut self) {
        infallible(self.table.clear());
    }

    /// Exchange the entire contents of two sets, including their hashers
    /// and configuration.
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    pub fn iter(&self) -> Iter<'_, K> {
        Iter::new(self.table.store.slots(), self.table.len)
    }

    pub(crate) fn into_keys(self) -> IntoIter<K> {
        let len = self.table.len;
        IntoIter::new(self.table.store.into_slots(), len)
    }

    /// Position of the first key in slot order, or [`end`](Self::end).
    pub fn begin(&self) -> Position {
        Position::new(self.table.store.skip_free(0))
    }

    /// The terminal position.
    pub fn end(&self) -> Position {
        Position::new(self.table.store.terminal())
    }

    /// Next occupied position after `pos`. The end position stays put.
    pub fn advance(&self, pos: Position) -> Position {
        let terminal = self.table.store.terminal();
        if pos.index() >= terminal {
            return self.end();
        }
        Position::new(self.table.store.skip_free(pos.index() + 1))
    }

    pub(crate) fn key_at(&self, pos: Position) -> Option<&K> {
        self.table.store.slot(pos.index()).and_then(|s| s.key())
    }

    /// Slot-by-slot dump of the internal layout.
    pub fn layout(&self) -> Layout<'_, K> {
        Layout {
            store: &self.table.store,
            len: self.table.len,
        }
    }
}

impl<K, S> CoalescedSet<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn find<Q>(&self, q: &Q) -> Option<Position>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("find");
        let hash = self.table.make_hash(q);
        self.table.locate(hash, q).map(Position::new)
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("get");
        let hash = self.table.make_hash(q);
        let at = self.table.locate(hash, q)?;
        self.table.store.key(at)
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("contains");
        let hash = self.table.make_hash(q);
        self.table.locate(hash, q).is_some()
    }

    /// 1 if an equal key is present, else 0.
    pub fn count<Q>(&self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        usize::from(self.contains(q))
    }

    /// Insert `key` unless an equal key is already present.
    ///
    /// Returns the position of the stored key and whether `key` was
    /// inserted. A rejected duplicate is dropped and the set is unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the set needs to grow and the new slot array cannot be
    /// allocated. Use [`try_insert`](Self::try_insert) to handle that case.
    pub fn insert(&mut self, key: K) -> (Position, bool) {
        infallible(self.try_insert(key))
    }

    pub fn try_insert(&mut self, key: K) -> Result<(Position, bool), ReserveError> {
        let _g = self.reentrancy.enter("insert");
        let (at, inserted) = self.table.insert(key)?;
        Ok((Position::new(at), inserted))
    }

    /// Remove the key equal to `q`. Returns whether a key was removed.
    pub fn erase<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.take(q).is_some()
    }

    /// Remove and return the key equal to `q`.
    pub fn take<Q>(&mut self, q: &Q) -> Option<K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("erase");
        self.table.take(q)
    }

    /// Grow ahead of time so `additional` more keys fit without a rebuild.
    pub fn reserve(&mut self, additional: usize) {
        infallible(self.try_reserve(additional));
    }

    pub fn try_reserve(&mut self, additional: usize) -> Result<(), ReserveError> {
        let _g = self.reentrancy.enter("reserve");
        self.table.reserve(additional)
    }

    /// Insert every key of `iter`, or none of them.
    ///
    /// Room for all keys is reserved up front; if that fails the set is
    /// left exactly as it was. Duplicates only lower the final count, so no
    /// insert after the reservation can trigger growth.
    pub fn try_extend<I>(&mut self, iter: I) -> Result<(), ReserveError>
    where
        I: IntoIterator<Item = K>,
    {
        let keys: Vec<K> = iter.into_iter().collect();
        let _g = self.reentrancy.enter("extend");
        self.table.reserve(keys.len())?;
        for key in keys {
            self.table.insert(key)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        self.table.assert_consistent();
    }
}

impl<K, S> Clone for CoalescedSet<K, S>
where
    K: Clone + Eq + Hash,
    S: BuildHasher + Clone,
{
    fn clone(&self) -> Self {
        let _g = self.reentrancy.enter("clone");
        Self {
            table: infallible(self.table.duplicate()),
            reentrancy: DebugReentrancy::new(),
        }
    }
}

/// Set equality: same length and every key of one is in the other.
impl<K, S> PartialEq for CoalescedSet<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && other.iter().all(|k| self.contains(k))
    }
}

impl<K, S> Eq for CoalescedSet<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
}

impl<K: fmt::Debug, S> fmt::Debug for CoalescedSet<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K, S> FromIterator<K> for CoalescedSet<K, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::with_hasher(S::default());
        set.extend(iter);
        set
    }
}

impl<K, S> Extend<K> for CoalescedSet<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<'a, K, S> Extend<&'a K> for CoalescedSet<K, S>
where
    K: Eq + Hash + Copy + 'a,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = &'a K>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::hash::Hasher;

    /// Hashes integers to themselves so home addresses are predictable.
    #[derive(Clone, Default)]
    struct IdentityState;
    struct IdentityHasher(u64);
    impl BuildHasher for IdentityState {
        type Hasher = IdentityHasher;
        fn build_hasher(&self) -> IdentityHasher {
            IdentityHasher(0)
        }
    }
    impl Hasher for IdentityHasher {
        fn write(&mut self, bytes: &[u8]) {
            for &b in bytes {
                self.0 = (self.0 << 8) | u64::from(b);
            }
        }
        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
        fn finish(&self) -> u64 {
            self.0
        }
    }

    fn identity_set() -> CoalescedSet<u64, IdentityState> {
        CoalescedSet::with_hasher(IdentityState)
    }

    /// Invariant: a duplicate insert reports the existing position and
    /// leaves the set unchanged.
    #[test]
    fn duplicate_insert_rejected() {
        let mut s: CoalescedSet<String> = CoalescedSet::new();
        let (p1, fresh) = s.insert("dup".to_string());
        assert!(fresh);
        let (p2, again) = s.insert("dup".to_string());
        assert!(!again);
        assert_eq!(p1, p2);
        assert_eq!(s.len(), 1);
        s.assert_consistent();
    }

    /// Invariant: borrowed lookup works (store `String`, query with `&str`).
    #[test]
    fn borrowed_lookup_with_str() {
        let mut s: CoalescedSet<String> = CoalescedSet::new();
        s.insert("hello".to_string());
        assert!(s.contains("hello"));
        assert!(!s.contains("world"));
        assert_eq!(s.get("hello").map(String::as_str), Some("hello"));
        assert_eq!(s.count("hello"), 1);
        assert_eq!(s.count("world"), 0);
        assert!(s.erase("hello"));
        assert!(!s.erase("hello"));
    }

    /// Invariant: full collision chain lands at home, then fills the cellar
    /// from the top in insertion order.
    #[test]
    fn collision_chain_fills_cellar_from_the_top() {
        let mut s = identity_set();
        assert_eq!(s.address_size(), 21);
        assert_eq!(s.cellar_size(), 13);
        let at: Vec<usize> = [5, 26, 47, 68]
            .into_iter()
            .map(|k| s.insert(k).0.index())
            .collect();
        assert_eq!(at, [5, 33, 32, 31]);

        assert!(s.erase(&26));
        assert_eq!(s.find(&47).map(|p| p.index()), Some(32));
        assert_eq!(s.find(&68).map(|p| p.index()), Some(31));
        assert!(s.find(&26).is_none());
        s.assert_consistent();
    }

    /// Invariant: growth keeps `len <= capacity * max_load_factor` and
    /// follows the `2n + 1` address sequence.
    #[test]
    fn growth_follows_load_factor() {
        let mut s = identity_set();
        for k in 0..30u64 {
            s.insert(k);
        }
        assert_eq!(s.address_size(), 21, "30 keys fit in 34 slots at 0.91");
        s.insert(30);
        assert_eq!(s.address_size(), 43);
        assert_eq!(s.cellar_size(), 27);
        for k in 31..500u64 {
            s.insert(k);
            assert!(s.len() as f64 <= s.capacity() as f64 * 0.91);
        }
        for k in 0..500u64 {
            assert!(s.contains(&k), "{k} lost across growth");
        }
        s.assert_consistent();
    }

    /// Invariant: `advance` walks occupied slots in slot order and stops at
    /// the terminal position.
    #[test]
    fn positions_walk_occupied_slots() {
        let mut s = identity_set();
        assert_eq!(s.begin(), s.end());
        for k in [3, 24, 1] {
            s.insert(k);
        }
        let mut seen = Vec::new();
        let mut pos = s.begin();
        while pos != s.end() {
            seen.push((pos.index(), *pos.key(&s).unwrap()));
            pos = s.advance(pos);
        }
        assert_eq!(seen, [(1, 1), (3, 3), (33, 24)]);
        assert_eq!(s.advance(s.end()), s.end());
        assert_eq!(s.end().key(&s), None);
    }

    /// Invariant: iteration yields each key exactly once, with an exact size.
    #[test]
    fn iteration_visits_every_key_once() {
        let mut s: CoalescedSet<u32> = CoalescedSet::new();
        s.extend(0..100);
        let it = s.iter();
        assert_eq!(it.len(), 100);
        let seen: BTreeSet<u32> = it.copied().collect();
        assert_eq!(seen, (0..100).collect::<BTreeSet<u32>>());
        let owned: BTreeSet<u32> = s.into_iter().collect();
        assert_eq!(owned.len(), 100);
    }

    /// Invariant: clear drops all keys and returns to the minimum layout.
    #[test]
    fn clear_resets_layout() {
        let mut s = identity_set();
        s.extend(0..200u64);
        assert!(s.address_size() > 21);
        s.clear();
        assert!(s.is_empty());
        assert_eq!(s.address_size(), 21);
        assert!(!s.contains(&5));
        s.insert(5);
        assert_eq!(s.len(), 1);
    }

    /// Invariant: a clone holds the same keys and is independent.
    #[test]
    fn clone_is_deep_and_equal() {
        let mut s = identity_set();
        s.extend([5u64, 26, 47, 68, 1, 2]);
        s.erase(&26);
        let mut c = s.clone();
        assert_eq!(c, s);
        c.assert_consistent();
        c.insert(99);
        assert_ne!(c, s);
        assert!(!s.contains(&99));
    }

    /// Invariant (debug-only): re-entering the set from `K: Clone` while
    /// the set is being copied panics due to the reentrancy guard.
    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_from_clone_during_copy() {
        use core::cell::Cell;

        type KeySet = CoalescedSet<CloneKey, IdentityState>;
        thread_local! {
            static TARGET: Cell<*const KeySet> = const { Cell::new(core::ptr::null()) };
        }

        #[derive(PartialEq, Eq, Hash)]
        struct CloneKey(u64);
        impl Clone for CloneKey {
            fn clone(&self) -> Self {
                let set = TARGET.with(Cell::get);
                if !set.is_null() {
                    // Reach back into the set while it is being copied.
                    unsafe {
                        let _ = (*set).contains(&CloneKey(0));
                    }
                }
                CloneKey(self.0)
            }
        }

        let mut s: KeySet = CoalescedSet::with_hasher(IdentityState);
        s.insert(CloneKey(1));
        s.insert(CloneKey(2));
        let copy = s.clone();
        assert_eq!(copy.len(), 2);

        TARGET.with(|t| t.set(&s as *const _));
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = s.clone();
        }));
        TARGET.with(|t| t.set(core::ptr::null()));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }

    /// Invariant (debug-only): re-entering the set from `K: Eq` during a
    /// chain walk panics due to the reentrancy guard.
    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_from_eq_during_find() {
        #[derive(Clone, Default)]
        struct ConstState;
        struct ConstHasher;
        impl BuildHasher for ConstState {
            type Hasher = ConstHasher;
            fn build_hasher(&self) -> ConstHasher {
                ConstHasher
            }
        }
        impl Hasher for ConstHasher {
            fn write(&mut self, _bytes: &[u8]) {}
            fn finish(&self) -> u64 {
                0
            }
        }

        struct ReentryKey {
            id: &'static str,
            set: *const CoalescedSet<ReentryKey, ConstState>,
        }
        impl PartialEq for ReentryKey {
            fn eq(&self, other: &Self) -> bool {
                if !other.set.is_null() {
                    // Reach back into the set while it is walking a chain.
                    unsafe {
                        let _ = (*other.set).contains(self);
                    }
                }
                self.id == other.id
            }
        }
        impl Eq for ReentryKey {}
        impl Hash for ReentryKey {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }

        let mut s: CoalescedSet<ReentryKey, ConstState> = CoalescedSet::with_hasher(ConstState);
        s.insert(ReentryKey {
            id: "a",
            set: core::ptr::null(),
        });
        let query = ReentryKey {
            id: "b",
            set: &s as *const _,
        };
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = s.find(&query);
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }
}
