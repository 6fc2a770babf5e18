//! `HeapAllocator`: the `TableAllocator` for tables whose elements hold heap
//! references, plus the tracing entry points for such tables.
//!
//! Every policy answer comes from the owning heap's current phase:
//! - Marking: deleted buckets are not reused, backings are not expanded in
//!   place, and each new element goes through the insertion barrier.
//! - Weak processing: allocation is forbidden, so tables neither grow nor
//!   shrink while dead entries are being removed.

use crate::allocator::{try_grow_buckets, TableAllocator};
use crate::bucket::Bucket;
use crate::hash_map::HashMap;
use crate::hash_set::HashSet;
use crate::hash_table::HashTable;
use crate::hash_traits::{GenericHashTraits, HashTraits};
use crate::heap::{GcPhase, HeapState};
use crate::key_value_pair::Extractor;
use crate::visitor::{LivenessBroker, Trace, Visitor};
use crate::weak_processing::{self, WeakProcessingState};
use core::cell::Cell;
use core::fmt;
use std::rc::Rc;

pub type HeapHashMap<K, V, KT = GenericHashTraits<K>> = HashMap<K, V, KT, HeapAllocator>;
pub type HeapHashSet<T, Tr = GenericHashTraits<T>> = HashSet<T, Tr, HeapAllocator>;

pub struct HeapAllocator {
    heap: Rc<HeapState>,
    weak_state: Cell<WeakProcessingState>,
    weak_cycle: Cell<u64>,
}

impl HeapAllocator {
    pub(crate) fn new(heap: Rc<HeapState>) -> Self {
        Self {
            heap,
            weak_state: Cell::new(WeakProcessingState::NotYetProcessed),
            weak_cycle: Cell::new(0),
        }
    }

    pub fn phase(&self) -> GcPhase {
        self.heap.phase()
    }

    /// Weak processing progress of the owning table in the current cycle.
    pub fn weak_processing_state(&self) -> WeakProcessingState {
        if self.weak_cycle.get() == self.heap.cycle() {
            self.weak_state.get()
        } else {
            WeakProcessingState::NotYetProcessed
        }
    }

    pub(crate) fn set_weak_processing_state(&self, state: WeakProcessingState) {
        self.weak_cycle.set(self.heap.cycle());
        self.weak_state.set(state);
    }

    pub(crate) fn record_weak_table_swept(&self) {
        self.heap.record_weak_table_swept();
    }
}

/// A clone belongs to a different table, so it starts unprocessed.
impl Clone for HeapAllocator {
    fn clone(&self) -> Self {
        Self::new(Rc::clone(&self.heap))
    }
}

impl fmt::Debug for HeapAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapAllocator")
            .field("phase", &self.heap.phase())
            .field("weak_state", &self.weak_processing_state())
            .finish()
    }
}

impl<T: Trace> TableAllocator<T> for HeapAllocator {
    const IS_GARBAGE_COLLECTED: bool = true;
    const WEAK_ELEMENTS: bool = T::IS_WEAK;

    fn allocate_backing(&self, len: usize) -> Vec<Bucket<T>> {
        debug_assert!(
            self.heap.phase() != GcPhase::WeakProcessing,
            "table backing allocated during weak processing"
        );
        let backing = match crate::allocator::try_allocate_buckets(len) {
            Ok(backing) => backing,
            Err(error) => <Self as TableAllocator<T>>::handle_out_of_memory(self, error),
        };
        self.heap.record_backing_allocated();
        backing
    }

    fn free_backing(&self, backing: Vec<Bucket<T>>) {
        self.heap.record_backing_freed();
        drop(backing);
    }

    fn expand_backing(&self, backing: &mut Vec<Bucket<T>>, new_len: usize) -> bool {
        if self.heap.phase() == GcPhase::Marking || !self.heap.is_allocation_allowed() {
            return false;
        }
        if try_grow_buckets(backing, new_len).is_err() {
            return false;
        }
        self.heap.record_backing_expanded();
        log::trace!(target: "heap", "expanded table backing in place to {} buckets", new_len);
        true
    }

    fn enter_gc_forbidden_scope(&self) {
        self.heap.enter_gc_forbidden_scope();
    }

    fn leave_gc_forbidden_scope(&self) {
        self.heap.leave_gc_forbidden_scope();
    }

    fn is_allocation_allowed(&self) -> bool {
        self.heap.is_allocation_allowed()
    }

    fn can_reuse_deleted_bucket(&self) -> bool {
        self.heap.phase() != GcPhase::Marking
    }

    fn is_write_barrier_needed(&self) -> bool {
        self.heap.phase() == GcPhase::Marking
    }

    fn notify_new_object(&self, element: &T) {
        self.heap.write_barrier(element);
    }
}

/// Tracing a collector-backed table traces every live element. Weak tables
/// also ask for a weak callback on the object holding them, whose
/// `process_weak` then reaches the table's sweep.
impl<T, X, Tr> Trace for HashTable<T, X, Tr, HeapAllocator>
where
    T: Trace,
    X: Extractor<T>,
    Tr: HashTraits<Type = X::Key>,
{
    fn trace(&self, visitor: &mut Visitor<'_>) {
        if T::IS_WEAK {
            visitor.register_weak_table();
        }
        for value in self.buckets().iter().filter_map(Bucket::as_live) {
            value.trace(visitor);
        }
    }

    fn process_weak(&mut self, broker: &LivenessBroker) {
        weak_processing::sweep_weak_table(self, broker);
    }
}

impl<T, X, Tr> HashTable<T, X, Tr, HeapAllocator>
where
    T: Trace,
    X: Extractor<T>,
    Tr: HashTraits<Type = X::Key>,
{
    /// Remove entries whose weak references died. Returns how many were
    /// removed.
    pub fn process_weak(&mut self, broker: &LivenessBroker) -> usize {
        weak_processing::sweep_weak_table(self, broker)
    }
}

impl<K, V, KT> Trace for HashMap<K, V, KT, HeapAllocator>
where
    K: Trace,
    V: Trace,
    KT: HashTraits<Type = K>,
{
    fn trace(&self, visitor: &mut Visitor<'_>) {
        self.table().trace(visitor);
    }

    fn process_weak(&mut self, broker: &LivenessBroker) {
        weak_processing::sweep_weak_table(self.table_mut(), broker);
    }
}

impl<K, V, KT> HashMap<K, V, KT, HeapAllocator>
where
    K: Trace,
    V: Trace,
    KT: HashTraits<Type = K>,
{
    /// Remove entries whose weak keys or values died. Returns how many were
    /// removed.
    pub fn process_weak(&mut self, broker: &LivenessBroker) -> usize {
        weak_processing::sweep_weak_table(self.table_mut(), broker)
    }

    pub fn weak_processing_state(&self) -> WeakProcessingState {
        self.allocator().weak_processing_state()
    }
}

impl<T, Tr> Trace for HashSet<T, Tr, HeapAllocator>
where
    T: Trace,
    Tr: HashTraits<Type = T>,
{
    fn trace(&self, visitor: &mut Visitor<'_>) {
        self.table().trace(visitor);
    }

    fn process_weak(&mut self, broker: &LivenessBroker) {
        weak_processing::sweep_weak_table(self.table_mut(), broker);
    }
}

impl<T, Tr> HashSet<T, Tr, HeapAllocator>
where
    T: Trace,
    Tr: HashTraits<Type = T>,
{
    pub fn process_weak(&mut self, broker: &LivenessBroker) -> usize {
        weak_processing::sweep_weak_table(self.table_mut(), broker)
    }

    pub fn weak_processing_state(&self) -> WeakProcessingState {
        self.allocator().weak_processing_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::{Heap, WeakMember};
    use crate::key_value_pair::KeyValuePair;

    fn int_set(heap: &Heap) -> HeapHashSet<u32> {
        HashSet::new_in(heap.allocator())
    }

    /// Invariant: The allocator's answers follow the heap phase.
    #[test]
    fn policy_tracks_phase() {
        let heap = Heap::new();
        let alloc = heap.allocator();
        let reuse = <HeapAllocator as TableAllocator<u32>>::can_reuse_deleted_bucket;
        let barrier = <HeapAllocator as TableAllocator<u32>>::is_write_barrier_needed;
        let allowed = <HeapAllocator as TableAllocator<u32>>::is_allocation_allowed;

        assert!(reuse(&alloc) && !barrier(&alloc) && allowed(&alloc));
        heap.start_marking();
        assert!(!reuse(&alloc) && barrier(&alloc) && allowed(&alloc));
        heap.finish_marking();
        assert!(!allowed(&alloc));
        heap.sweep();
        assert!(allowed(&alloc));
    }

    /// Invariant: Backings are grown in place outside marking, and every
    /// allocated backing is freed when the table goes away.
    #[test]
    fn backings_are_counted() {
        let heap = Heap::new();
        let mut set = int_set(&heap);
        for k in 0..20 {
            set.insert(k);
        }
        assert!(heap.stats().backing_expansions >= 3);
        drop(set);
        let stats = heap.stats();
        assert_eq!(stats.backings_allocated, stats.backings_freed);
    }

    /// Invariant: Tables with strong elements never register for weak
    /// processing.
    #[test]
    fn strong_table_needs_no_weak_processing() {
        assert!(!<HeapAllocator as TableAllocator<u32>>::WEAK_ELEMENTS);
        assert!(
            <HeapAllocator as TableAllocator<KeyValuePair<WeakMember<()>, u32>>>::WEAK_ELEMENTS
        );
    }
}
