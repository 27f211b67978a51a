#![cfg(test)]

// Property tests for CoalescedSet kept inside the crate so they can run the
// structural invariant check after every operation.

use crate::{CoalescedSet, Config};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::hash::{BuildHasher, Hasher};

// Pool-indexed operations to improve shrinking: indices shrink to earlier
// keys, pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize),
    Erase(usize),
    Take(usize),
    Find(usize),
    Contains(u64),
    Reserve(u8),
    Iterate,
    CloneEq,
    Clear,
}

fn arb_ops(pool_len: usize) -> impl Strategy<Value = Vec<OpI>> {
    let idx = 0..pool_len;
    // Inserts and erases dominate so chains get long and are cut often.
    let op = prop_oneof![
        6 => idx.clone().prop_map(OpI::Insert),
        3 => idx.clone().prop_map(OpI::Erase),
        1 => idx.clone().prop_map(OpI::Take),
        2 => idx.prop_map(OpI::Find),
        1 => any::<u64>().prop_map(OpI::Contains),
        1 => any::<u8>().prop_map(OpI::Reserve),
        1 => Just(OpI::Iterate),
        1 => Just(OpI::CloneEq),
        1 => Just(OpI::Clear),
    ];
    proptest::collection::vec(op, 1..200)
}

fn arb_scenario(keys: BoxedStrategy<u64>) -> impl Strategy<Value = (Vec<u64>, Vec<OpI>)> {
    proptest::collection::vec(keys, 1..=48).prop_flat_map(|pool| {
        let n = pool.len();
        arb_ops(n).prop_map(move |ops| (pool.clone(), ops))
    })
}

/// Hashes integers to themselves so keys can be aimed at chosen homes.
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

// Keys congruent to a handful of residues modulo the starting address size,
// so nearly every insert collides.
fn colliding_keys() -> BoxedStrategy<u64> {
    (0u64..4, 0u64..64).prop_map(|(r, m)| r + 21 * m).boxed()
}

// Runs one scenario against a std HashSet model. Checked after every op:
// - structural invariants (every key reachable from its home, no cycles,
//   len matches occupied slots, load factor bound);
// - `len`/`is_empty` parity with the model.
// Per op:
// - insert reports `inserted` iff the key was absent, and the position
//   resolves to the key;
// - erase/take succeed iff the key was present; a second erase fails;
// - find/contains parity with the model;
// - iteration yields the model's key set exactly once each;
// - clones compare equal and are structurally sound.
fn run<S>(mut sut: CoalescedSet<u64, S>, pool: Vec<u64>, ops: Vec<OpI>) -> Result<(), TestCaseError>
where
    S: BuildHasher + Clone,
{
    let mut model: HashSet<u64> = HashSet::new();
    for op in ops {
        match op {
            OpI::Insert(i) => {
                let k = pool[i];
                let before = sut.len();
                let (pos, inserted) = sut.insert(k);
                prop_assert_eq!(inserted, model.insert(k));
                prop_assert_eq!(pos.key(&sut), Some(&k));
                prop_assert_eq!(sut.len(), before + usize::from(inserted));
            }
            OpI::Erase(i) => {
                let k = pool[i];
                prop_assert_eq!(sut.erase(&k), model.remove(&k));
                prop_assert!(!sut.erase(&k), "second erase must fail");
            }
            OpI::Take(i) => {
                let k = pool[i];
                let present = model.remove(&k);
                prop_assert_eq!(sut.take(&k), present.then_some(k));
            }
            OpI::Find(i) => {
                let k = pool[i];
                let found = sut.find(&k);
                prop_assert_eq!(found.is_some(), model.contains(&k));
                if let Some(p) = found {
                    prop_assert_eq!(p.key(&sut), Some(&k));
                }
                prop_assert_eq!(sut.count(&k), usize::from(model.contains(&k)));
            }
            OpI::Contains(k) => {
                prop_assert_eq!(sut.contains(&k), model.contains(&k));
            }
            OpI::Reserve(n) => {
                sut.reserve(usize::from(n));
                let limit = sut.capacity() as f64 * sut.config().max_load_factor();
                prop_assert!((sut.len() + usize::from(n)) as f64 <= limit);
            }
            OpI::Iterate => {
                let seen: Vec<u64> = sut.iter().copied().collect();
                let unique: BTreeSet<u64> = seen.iter().copied().collect();
                prop_assert_eq!(seen.len(), unique.len(), "key visited twice");
                prop_assert_eq!(unique, model.iter().copied().collect::<BTreeSet<u64>>());
            }
            OpI::CloneEq => {
                let copy = sut.clone();
                copy.assert_consistent();
                prop_assert!(copy == sut);
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
            }
        }

        sut.assert_consistent();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }

    // Final sweep: every remaining key is still reachable.
    for k in &model {
        prop_assert!(sut.contains(k), "{} unreachable", k);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    // Property: state-machine equivalence with the default random hasher.
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario(any::<u64>().boxed())) {
        run(CoalescedSet::new(), pool, ops)?;
    }

    // Property: same invariants when almost every key shares a home with
    // others, so erases keep cutting long chains.
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario(colliding_keys())) {
        run(CoalescedSet::with_hasher(IdentityState), pool, ops)?;
    }

    // Property: same invariants with a tiny cellar and no load-factor slack,
    // so collisions spill into the address region and freed slots leave
    // stale links that later join chains together.
    #[test]
    fn prop_state_machine_spilling((pool, ops) in arb_scenario((0u64..64).boxed())) {
        let config = Config::new()
            .with_min_address_size(4).unwrap()
            .with_cellar_ratio(0.25).unwrap()
            .with_max_load_factor(1.0).unwrap();
        run(CoalescedSet::with_config_and_hasher(config, IdentityState), pool, ops)?;
    }

    // Property: equality ignores insertion order and layout.
    #[test]
    fn prop_equality_is_order_independent(keys in proptest::collection::vec(0u64..200, 0..80)) {
        let forward: CoalescedSet<u64, IdentityState> = keys.iter().copied().collect();
        let backward: CoalescedSet<u64, IdentityState> = keys.iter().rev().copied().collect();
        prop_assert!(forward == backward);

        let mut extra = backward.clone();
        extra.insert(1_000);
        prop_assert!(forward != extra);
    }
}
