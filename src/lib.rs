//! heap-hashtable: an open-addressing hash table with per-key policy traits
//! and hooks for running under a tracing garbage collector.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one probing engine shared by maps and sets, parameterized by
//!   small policy types so the same code serves plain heap allocation and a
//!   collector-managed heap.
//! - Layers:
//!   - `HashTable<T, X, Tr, A>`: the engine. Power-of-two bucket array,
//!     triangular probing, tombstones on erase, growth and shrink by
//!     rehash. `X` extracts the key from a stored value, `Tr` hashes and
//!     compares keys, `A` decides everything memory related.
//!   - `HashMap` / `HashSet`: façades over the engine storing
//!     `KeyValuePair<K, V>` and bare keys respectively.
//!   - `HeapAllocator` + `Heap`: a mark-sweep arena that tables can live
//!     in. Tables trace their elements, fire insertion barriers while the
//!     heap is marking, and have dead weak entries removed after marking.
//!
//! Constraints
//! - Single-threaded. The heap's marker runs incrementally on the mutator
//!   thread rather than on a background thread.
//! - Capacity is a power of two, at least `HashTraits::MINIMUM_TABLE_SIZE`.
//! - `(live + deleted) * 2 < capacity` after every insert, so probing always
//!   reaches an empty bucket.
//! - Keys reserved as "empty" or "deleted" by their traits must not be
//!   inserted. Debug builds assert this.
//!
//! Policy seams
//! - `HashTraits`: hash, equality, reserved keys, minimum size, and whether
//!   moving a key needs a GC-forbidden scope.
//! - `HashTranslator`: probing with a query of another type than the key.
//! - `TableAllocator`: backing allocation and in-place expansion, tombstone
//!   reuse policy, whether shrinking is currently allowed, and the
//!   new-element notification used for write barriers.
//!
//! Rehashing
//! - Growth doubles the table unless few entries are live, in which case it
//!   rehashes at the same size to drop tombstones.
//! - The new backing is fully populated and announced to the allocator
//!   before it replaces the old one; tombstones are never carried over.
//! - Weak tables are never resized while their dead entries are removed,
//!   so they get a chance to shrink on their next insert instead.
//!
//! Debug checks
//! - Entering a table from its own key hash or equality panics.
//! - Positions (`find_position`, `first_position`) are stamped with the
//!   table's modification count and panic if used after a mutation.
//!
//! Notes and non-goals
//! - Hashing of generic keys uses `rustc_hash::FxBuildHasher`; it is fast
//!   and deterministic, not DoS resistant.
//! - `dump-stats` enables per-table probe and rehash counters.

pub mod allocator;
pub mod bucket;
mod construct_traits;
mod debug_checks;
pub mod hash_functions;
pub mod hash_map;
pub mod hash_set;
pub mod hash_table;
#[cfg(test)]
mod hash_table_proptest;
pub mod hash_traits;
pub mod hash_translator;
pub mod heap;
pub mod heap_allocator;
pub mod key_value_pair;
#[cfg(feature = "dump-stats")]
pub mod stats;
pub mod visitor;
pub mod weak_processing;

// Public surface
pub use allocator::{PartitionAllocator, ReserveError, TableAllocator};
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::{HashTable, Position};
pub use hash_traits::{
    AlreadyHashedTraits, FloatHashTraits, GenericHashTraits, HashTraits, IntHashTraits,
    IntWithZeroKeyHashTraits, PairHashTraits, PtrHashTraits,
};
pub use hash_translator::{BorrowTranslator, HashTranslator};
pub use heap::{GarbageCollected, GcPhase, Heap, Member, ObjectId, Persistent, WeakMember};
pub use heap_allocator::{HeapAllocator, HeapHashMap, HeapHashSet};
pub use key_value_pair::KeyValuePair;
pub use visitor::{LivenessBroker, Trace, Visitor};
pub use weak_processing::WeakProcessingState;
