//! coalesced-set: a single-threaded hash set built on coalesced hashing.
//!
//! Internal Design:
//!
//! Summary
//! - One slot array per set: `[address region | cellar | terminal]`.
//!   A key's home address is `hash % address_size`; homes never point into
//!   the cellar, so collisions are forced into chains that live inside the
//!   array and are linked by slot index.
//! - Layers:
//!   - SlotStore<K>: the slot vector, chain walking, the free cursor and
//!     the direct-or-cellar placement primitive. Never hashes.
//!   - Table<K, S>: hasher, sizing `Config` and live count; lookup,
//!     insertion, growth, and the deletion engine (`recompact`).
//!   - CoalescedSet<K, S>: public API; wraps every call that may run user
//!     `Hash`/`Eq` code in a debug-only reentrancy guard.
//!
//! Slots
//! - A slot is `Free`, `Occupied { key, link }` or `Terminal`. Only occupied
//!   slots carry a key or a link. A link into a free slot or the terminal
//!   reads as end-of-chain.
//! - Link absence is `None`, never a reserved index, so slot 0 is an
//!   ordinary chain member.
//!
//! Insertion
//! - A free home slot takes the key directly. Otherwise the key goes to the
//!   highest free slot at or below the free cursor and is linked behind the
//!   tail of the chain through its home.
//! - The cursor only moves down until an erase or rebuild resets it to the
//!   top; between resets no slot above it can become free.
//!
//! Deletion
//! - The freed slot's followers are detached and settled again in chain
//!   order: moved to their home if it is free, otherwise relinked in place
//!   behind the tail of their home chain. See `recompact`.
//!
//! Growth
//! - Growth triggers when `len > capacity * max_load_factor`. The address
//!   size follows `n -> 2n + 1`; the cellar is `floor(address * ratio)`.
//!   A blank store is fully allocated before keys are moved into it, so a
//!   failed growth leaves the set as it was. Clones and rebuilds both
//!   reinsert keys into a blank store; chain layouts may differ while the
//!   sets compare equal.
//!
//! Notes and non-goals
//! - Single-threaded: the set is `Send` when its keys and hasher are, but
//!   never `Sync`.
//! - Iteration order is slot order; it is neither insertion order nor
//!   stable across growth or erase.
//! - Positions are plain indices and are not invalidated by the type system;
//!   they are only meaningful until the next erase or growing insert.

mod coalesced_set;
mod coalesced_set_proptest;
mod config;
mod error;
mod iter;
mod recompact;
mod reentrancy;
mod slot;
mod store;
mod table;

// Public surface
pub use coalesced_set::CoalescedSet;
pub use config::Config;
pub use error::{ConfigError, ReserveError};
pub use iter::{IntoIter, Iter, Position};
pub use store::Layout;
