//! Removal of dead entries from weak tables after marking.
//!
//! A table is swept at most once per collection cycle:
//! `NotYetProcessed -> Processing -> Done`. The sweep walks buckets from last
//! to first and tombstones every entry whose weak part died. It never
//! resizes: allocation is forbidden during weak processing, so an
//! under-loaded table stays that way until its next insert or erase.
//!
//! Ephemeron values are not judged here. Whether the strong half of a pair
//! was kept alive was already decided by marking; the sweep only drops pairs
//! whose weak half is dead.

use crate::allocator::TableAllocator;
use crate::hash_table::HashTable;
use crate::hash_traits::HashTraits;
use crate::heap::GcPhase;
use crate::heap_allocator::HeapAllocator;
use crate::key_value_pair::Extractor;
use crate::visitor::{LivenessBroker, Trace};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeakProcessingState {
    NotYetProcessed,
    Processing,
    Done,
}

/// Sweep `table` with `broker`. Returns the number of entries removed; zero
/// for tables without weak elements or already swept this cycle.
pub fn sweep_weak_table<T, X, Tr>(
    table: &mut HashTable<T, X, Tr, HeapAllocator>,
    broker: &LivenessBroker,
) -> usize
where
    T: Trace,
    X: Extractor<T>,
    Tr: HashTraits<Type = X::Key>,
{
    if !<HeapAllocator as TableAllocator<T>>::WEAK_ELEMENTS {
        return 0;
    }
    let allocator = table.allocator();
    debug_assert_eq!(
        allocator.phase(),
        GcPhase::WeakProcessing,
        "weak table swept outside weak processing"
    );
    allocator.record_weak_table_swept();
    match allocator.weak_processing_state() {
        WeakProcessingState::Done => return 0,
        WeakProcessingState::Processing => {
            panic!("weak table swept while its sweep is already running")
        }
        WeakProcessingState::NotYetProcessed => {}
    }
    allocator.set_weak_processing_state(WeakProcessingState::Processing);

    let capacity = table.capacity();
    let removed = table.remove_entries_where(|value| !value.is_alive(broker));
    debug_assert_eq!(table.capacity(), capacity);

    table
        .allocator()
        .set_weak_processing_state(WeakProcessingState::Done);
    log::trace!(
        target: "heap",
        "weak table sweep removed {} entries, {} remain in {} buckets",
        removed,
        table.len(),
        capacity
    );
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash_map::HashMap;
    use crate::heap::{GarbageCollected, Heap, WeakMember};
    use crate::heap_allocator::HeapHashMap;
    use crate::visitor::Visitor;

    struct Leaf;

    impl Trace for Leaf {
        fn trace(&self, _visitor: &mut Visitor<'_>) {}
    }

    impl GarbageCollected for Leaf {}

    /// Invariant: Dead entries become tombstones and the table keeps its
    /// capacity; a second sweep in the same cycle does nothing.
    #[test]
    fn sweep_removes_dead_without_shrinking() {
        let heap = Heap::new();
        let mut map: HeapHashMap<WeakMember<Leaf>, u32> = HashMap::new_in(heap.allocator());
        let mut roots = Vec::new();
        for i in 0..40 {
            let leaf = heap.allocate(Leaf);
            if i < 4 {
                roots.push(heap.persistent(leaf));
            }
            map.set(leaf.downgrade(), i);
        }
        let capacity = map.capacity();

        heap.start_marking();
        let broker = heap.finish_marking();
        assert_eq!(map.weak_processing_state(), WeakProcessingState::NotYetProcessed);
        assert_eq!(map.process_weak(&broker), 36);
        assert_eq!(map.weak_processing_state(), WeakProcessingState::Done);
        assert_eq!(map.process_weak(&broker), 0);
        assert_eq!(map.len(), 4);
        assert_eq!(map.capacity(), capacity);
        assert_eq!(heap.sweep(), 36);

        // The next cycle starts unprocessed again.
        heap.start_marking();
        assert_eq!(map.weak_processing_state(), WeakProcessingState::NotYetProcessed);
        heap.sweep();
    }

    /// Invariant: Tables without weak elements are never swept.
    #[test]
    fn strong_table_is_skipped() {
        let heap = Heap::new();
        let mut map: HeapHashMap<u32, u32> = HashMap::new_in(heap.allocator());
        map.set(1, 1);
        heap.start_marking();
        let broker = heap.finish_marking();
        assert_eq!(map.process_weak(&broker), 0);
        assert_eq!(map.weak_processing_state(), WeakProcessingState::NotYetProcessed);
        heap.sweep();
    }
}
