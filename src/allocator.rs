//! The memory-management strategy a `HashTable` is parameterized over.
//!
//! The table never talks to a collector directly. Everything it needs from
//! one (backing allocation, in-place growth, GC-forbidden scopes, deleted
//! bucket reuse policy, write barriers) goes through `TableAllocator`. The
//! trait is parameterized by the element type so a collector-backed
//! allocator can demand that elements be traceable while the plain
//! allocator accepts anything.

use crate::bucket::Bucket;
use core::alloc::Layout;
use core::fmt;

pub trait TableAllocator<T> {
    /// Backings are reachable by a tracing collector.
    const IS_GARBAGE_COLLECTED: bool = false;

    /// Elements hold weak references and are swept by weak processing.
    /// Such tables also shrink on insert, since the sweep never does.
    const WEAK_ELEMENTS: bool = false;

    /// A backing of `len` empty buckets.
    fn allocate_backing(&self, len: usize) -> Vec<Bucket<T>> {
        match try_allocate_buckets(len) {
            Ok(backing) => backing,
            Err(error) => self.handle_out_of_memory(error),
        }
    }

    fn free_backing(&self, backing: Vec<Bucket<T>>) {
        drop(backing);
    }

    /// Best-effort growth of `backing` so that it can hold `new_len` buckets
    /// without being replaced. On success the table keeps the same backing
    /// and re-probes every entry into it.
    fn expand_backing(&self, _backing: &mut Vec<Bucket<T>>, _new_len: usize) -> bool {
        false
    }

    fn enter_gc_forbidden_scope(&self) {}

    fn leave_gc_forbidden_scope(&self) {}

    /// Consulted before any shrink; false while a collector forbids
    /// allocation.
    fn is_allocation_allowed(&self) -> bool {
        true
    }

    /// Whether an insert may recycle a tombstone instead of an empty bucket.
    fn can_reuse_deleted_bucket(&self) -> bool {
        true
    }

    /// Cheap check used to skip per-element barriers.
    fn is_write_barrier_needed(&self) -> bool {
        false
    }

    /// A live element now exists in one of this allocator's backings.
    fn notify_new_object(&self, _element: &T) {}

    fn handle_out_of_memory(&self, error: ReserveError) -> ! {
        match error {
            ReserveError::CapacityOverflow => panic!("hash table capacity overflow"),
            ReserveError::AllocError { layout } => std::alloc::handle_alloc_error(layout),
        }
    }
}

/// Plain heap allocation: no barriers, no tracing, tombstones always
/// reusable.
#[derive(Clone, Copy, Debug, Default)]
pub struct PartitionAllocator;

impl<T> TableAllocator<T> for PartitionAllocator {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReserveError {
    /// The requested bucket count does not fit in the address space.
    CapacityOverflow,
    AllocError { layout: Layout },
}

impl fmt::Display for ReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReserveError::CapacityOverflow => f.write_str("hash table capacity overflow"),
            ReserveError::AllocError { layout } => write!(
                f,
                "hash table backing allocation of {} bytes failed",
                layout.size()
            ),
        }
    }
}

impl std::error::Error for ReserveError {}

/// Allocate `len` empty buckets with checked size arithmetic.
pub fn try_allocate_buckets<T>(len: usize) -> Result<Vec<Bucket<T>>, ReserveError> {
    let layout = Layout::array::<Bucket<T>>(len).map_err(|_| ReserveError::CapacityOverflow)?;
    let mut backing = Vec::new();
    backing
        .try_reserve_exact(len)
        .map_err(|_| ReserveError::AllocError { layout })?;
    backing.resize_with(len, Bucket::default);
    Ok(backing)
}

/// Make room for `new_len` buckets in `backing` without changing its
/// contents.
pub fn try_grow_buckets<T>(backing: &mut Vec<Bucket<T>>, new_len: usize) -> Result<(), ReserveError> {
    let layout =
        Layout::array::<Bucket<T>>(new_len).map_err(|_| ReserveError::CapacityOverflow)?;
    let additional = new_len.saturating_sub(backing.len());
    backing
        .try_reserve_exact(additional)
        .map_err(|_| ReserveError::AllocError { layout })
}
