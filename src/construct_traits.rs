//! Writing elements into buckets, and telling the allocator about it.
//!
//! `notify_new_element` is the single point where an allocator learns that a
//! live element now exists in a backing. For a collector-backed allocator
//! this is where the write barrier fires.

use crate::allocator::TableAllocator;
use crate::bucket::Bucket;

/// Write `value` into `slot` without notifying anyone. Used for moves during
/// a rehash, where the whole new backing is announced at once afterwards.
#[inline]
pub fn construct<T>(slot: &mut Bucket<T>, value: T) -> &mut T {
    *slot = Bucket::Live(value);
    match slot {
        Bucket::Live(value) => value,
        _ => unreachable!("bucket was just made live"),
    }
}

#[inline]
pub fn construct_and_notify_element<'a, T, A>(
    allocator: &A,
    slot: &'a mut Bucket<T>,
    value: T,
) -> &'a mut T
where
    A: TableAllocator<T>,
{
    let element = construct(slot, value);
    notify_new_element(allocator, element);
    element
}

#[inline]
pub fn notify_new_element<T, A: TableAllocator<T>>(allocator: &A, element: &T) {
    allocator.notify_new_object(element);
}

/// Batched form of `notify_new_element` over a backing. Skips the walk
/// entirely when the allocator reports that no barrier is needed.
pub fn notify_new_elements<T, A: TableAllocator<T>>(allocator: &A, backing: &[Bucket<T>]) {
    if !allocator.is_write_barrier_needed() {
        return;
    }
    for element in backing.iter().filter_map(Bucket::as_live) {
        allocator.notify_new_object(element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct Recording {
        barrier: Cell<bool>,
        seen: RefCell<Vec<u32>>,
    }

    impl TableAllocator<u32> for Recording {
        fn is_write_barrier_needed(&self) -> bool {
            self.barrier.get()
        }

        fn notify_new_object(&self, element: &u32) {
            self.seen.borrow_mut().push(*element);
        }
    }

    #[test]
    fn construct_does_not_notify() {
        let alloc = Recording::default();
        let mut slot = Bucket::Empty;
        *construct(&mut slot, 4) += 1;
        assert_eq!(slot.as_live(), Some(&5));
        assert!(alloc.seen.borrow().is_empty());
    }

    #[test]
    fn construct_and_notify_reports_element() {
        let alloc = Recording::default();
        let mut slot = Bucket::Deleted;
        construct_and_notify_element(&alloc, &mut slot, 7);
        assert_eq!(*alloc.seen.borrow(), vec![7]);
    }

    #[test]
    fn batched_notify_skips_without_barrier() {
        let alloc = Recording::default();
        let backing = vec![Bucket::Live(1), Bucket::Empty, Bucket::Deleted, Bucket::Live(2)];
        notify_new_elements(&alloc, &backing);
        assert!(alloc.seen.borrow().is_empty());

        alloc.barrier.set(true);
        notify_new_elements(&alloc, &backing);
        assert_eq!(*alloc.seen.borrow(), vec![1, 2]);
    }
}
