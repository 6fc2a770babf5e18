//! A small single-threaded mark-sweep heap for collector-backed tables.
//!
//! Objects live in a `SlotMap` arena and are referred to by generational
//! `ObjectId`s wrapped in typed handles:
//! - `Member<T>`: strong edge, traced.
//! - `WeakMember<T>`: weak edge, cleared by weak processing.
//! - `Persistent<T>`: an off-heap root; keeps its object alive while held.
//!
//! A cycle runs `Idle -> Marking -> WeakProcessing -> Idle`. Marking is
//! incremental: `advance_marking` traces a bounded number of objects, and the
//! mutator may run between steps. Mutations made while marking must be
//! announced with `write_barrier` (tables do this themselves through
//! `HeapAllocator`). `finish_marking` drains the worklist, resolves
//! ephemerons, runs registered weak callbacks and returns the
//! `LivenessBroker`; `sweep` frees every unmarked object.
//!
//! Collector state that tables consult (phase, GC-forbidden depth, mark
//! state for barriers) is held separately from the arena in `HeapState`, so
//! allocators stored inside heap objects do not keep the arena alive.

use crate::heap_allocator::HeapAllocator;
use crate::visitor::{LivenessBroker, MarkingState, Trace, Visitor};
use core::any::Any;
use core::cell::{Cell, Ref, RefCell};
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use slotmap::{new_key_type, SecondaryMap, SlotMap};
use std::rc::Rc;

new_key_type! {
    /// Generational id of a heap object.
    pub struct ObjectId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GcPhase {
    Idle,
    Marking,
    WeakProcessing,
}

/// Objects stored on the heap. After marking, an object whose trace
/// registered a weak callback gets `Trace::process_weak`; objects holding
/// weak tables must forward it to each of them.
pub trait GarbageCollected: Trace + 'static {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub backings_allocated: u64,
    pub backings_freed: u64,
    pub backing_expansions: u64,
    pub write_barriers: u64,
}

/// Collector state shared with `HeapAllocator`s.
#[derive(Debug)]
pub(crate) struct HeapState {
    phase: Cell<GcPhase>,
    cycle: Cell<u64>,
    gc_forbidden_depth: Cell<usize>,
    marking: RefCell<MarkingState>,
    backings_allocated: Cell<u64>,
    backings_freed: Cell<u64>,
    backing_expansions: Cell<u64>,
    write_barriers: Cell<u64>,
    weak_tables_swept: Cell<u64>,
}

fn bump(cell: &Cell<u64>) {
    cell.set(cell.get() + 1);
}

impl HeapState {
    fn new() -> Self {
        Self {
            phase: Cell::new(GcPhase::Idle),
            cycle: Cell::new(0),
            gc_forbidden_depth: Cell::new(0),
            marking: RefCell::new(MarkingState::default()),
            backings_allocated: Cell::new(0),
            backings_freed: Cell::new(0),
            backing_expansions: Cell::new(0),
            write_barriers: Cell::new(0),
            weak_tables_swept: Cell::new(0),
        }
    }

    pub(crate) fn phase(&self) -> GcPhase {
        self.phase.get()
    }

    /// Counts started marking phases; weak tables use it to tell cycles apart.
    pub(crate) fn cycle(&self) -> u64 {
        self.cycle.get()
    }

    pub(crate) fn is_allocation_allowed(&self) -> bool {
        self.phase.get() != GcPhase::WeakProcessing && self.gc_forbidden_depth.get() == 0
    }

    pub(crate) fn enter_gc_forbidden_scope(&self) {
        self.gc_forbidden_depth.set(self.gc_forbidden_depth.get() + 1);
    }

    pub(crate) fn leave_gc_forbidden_scope(&self) {
        let depth = self.gc_forbidden_depth.get();
        assert!(depth > 0, "unbalanced GC-forbidden scope");
        self.gc_forbidden_depth.set(depth - 1);
    }

    pub(crate) fn is_gc_forbidden(&self) -> bool {
        self.gc_forbidden_depth.get() > 0
    }

    /// Insertion barrier: grey everything `value` references.
    pub(crate) fn write_barrier<T: Trace + ?Sized>(&self, value: &T) {
        if self.phase.get() != GcPhase::Marking {
            return;
        }
        bump(&self.write_barriers);
        let mut marking = self.marking.borrow_mut();
        value.trace(&mut Visitor::new(&mut marking, None));
    }

    pub(crate) fn record_backing_allocated(&self) {
        bump(&self.backings_allocated);
    }

    pub(crate) fn record_backing_freed(&self) {
        bump(&self.backings_freed);
    }

    pub(crate) fn record_backing_expanded(&self) {
        bump(&self.backing_expansions);
    }

    pub(crate) fn record_weak_table_swept(&self) {
        bump(&self.weak_tables_swept);
    }

    fn stats(&self) -> HeapStats {
        HeapStats {
            backings_allocated: self.backings_allocated.get(),
            backings_freed: self.backings_freed.get(),
            backing_expansions: self.backing_expansions.get(),
            write_barriers: self.write_barriers.get(),
        }
    }
}

struct HeapObject {
    value: Box<dyn Any>,
    trace: fn(&dyn Any, &mut Visitor<'_>),
    process_weak: fn(&mut dyn Any, &LivenessBroker),
}

fn trace_object<T: GarbageCollected>(value: &dyn Any, visitor: &mut Visitor<'_>) {
    if let Some(value) = value.downcast_ref::<T>() {
        value.trace(visitor);
    }
}

fn process_weak_object<T: GarbageCollected>(value: &mut dyn Any, broker: &LivenessBroker) {
    if let Some(value) = value.downcast_mut::<T>() {
        Trace::process_weak(value, broker);
    }
}

struct HeapInner {
    objects: RefCell<SlotMap<ObjectId, HeapObject>>,
    roots: RefCell<SecondaryMap<ObjectId, usize>>,
    state: Rc<HeapState>,
}

/// Handle to a heap. Clones share the same heap.
#[derive(Clone)]
pub struct Heap {
    inner: Rc<HeapInner>,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("objects", &self.object_count())
            .field("phase", &self.phase())
            .finish()
    }
}

impl Heap {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(HeapInner {
                objects: RefCell::new(SlotMap::with_key()),
                roots: RefCell::new(SecondaryMap::new()),
                state: Rc::new(HeapState::new()),
            }),
        }
    }

    /// Allocator for tables that hold heap references.
    pub fn allocator(&self) -> HeapAllocator {
        HeapAllocator::new(Rc::clone(&self.inner.state))
    }

    pub fn phase(&self) -> GcPhase {
        self.inner.state.phase()
    }

    pub fn is_allocation_allowed(&self) -> bool {
        self.inner.state.is_allocation_allowed()
    }

    pub fn enter_gc_forbidden_scope(&self) {
        self.inner.state.enter_gc_forbidden_scope();
    }

    pub fn leave_gc_forbidden_scope(&self) {
        self.inner.state.leave_gc_forbidden_scope();
    }

    pub fn stats(&self) -> HeapStats {
        self.inner.state.stats()
    }

    pub fn object_count(&self) -> usize {
        self.inner.objects.borrow().len()
    }

    /// Move `value` onto the heap. Objects allocated while marking start out
    /// marked.
    ///
    /// # Panics
    /// During weak processing, inside a GC-forbidden scope, or from inside a
    /// `with_mut` closure.
    pub fn allocate<T: GarbageCollected>(&self, value: T) -> Member<T> {
        assert!(
            self.is_allocation_allowed(),
            "heap allocation while allocation is not allowed"
        );
        let id = self.inner.objects.borrow_mut().insert(HeapObject {
            value: Box::new(value),
            trace: trace_object::<T>,
            process_weak: process_weak_object::<T>,
        });
        if self.phase() == GcPhase::Marking {
            self.inner.state.marking.borrow_mut().mark(id);
        }
        Member::from_id(id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.inner.objects.borrow().contains_key(id)
    }

    /// Shared access to a live object. `None` once it has been swept.
    pub fn get<T: GarbageCollected>(&self, member: Member<T>) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.inner.objects.borrow(), |objects| {
            objects.get(member.id())?.value.downcast_ref::<T>()
        })
        .ok()
    }

    /// Exclusive access to a live object for the duration of `f`.
    pub fn with_mut<T: GarbageCollected, R>(
        &self,
        member: Member<T>,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let mut objects = self.inner.objects.borrow_mut();
        let value = objects.get_mut(member.id())?.value.downcast_mut::<T>()?;
        Some(f(value))
    }

    /// Root `member` for as long as the returned handle lives.
    pub fn persistent<T>(&self, member: Member<T>) -> Persistent<T> {
        Persistent::new(Rc::clone(&self.inner), member)
    }

    /// Announce that `value` was stored into an already-marked object.
    pub fn write_barrier<T: Trace + ?Sized>(&self, value: &T) {
        self.inner.state.write_barrier(value);
    }

    pub fn start_marking(&self) {
        assert_eq!(self.phase(), GcPhase::Idle, "marking already in progress");
        assert!(
            !self.inner.state.is_gc_forbidden(),
            "garbage collection inside a GC-forbidden scope"
        );
        let state = &self.inner.state;
        state.cycle.set(state.cycle.get() + 1);
        state.phase.set(GcPhase::Marking);

        let mut marking = state.marking.borrow_mut();
        marking.reset();
        let roots = self.inner.roots.borrow();
        for (id, _) in roots.iter() {
            marking.mark(id);
        }
        log::debug!(
            target: "heap",
            "marking started (cycle {}, {} roots)",
            state.cycle.get(),
            roots.len()
        );
    }

    /// Trace an off-heap root, e.g. a table owned by the embedder.
    pub fn trace_root<T: Trace + ?Sized>(&self, root: &T) {
        assert_eq!(self.phase(), GcPhase::Marking, "trace_root outside marking");
        let mut marking = self.inner.state.marking.borrow_mut();
        root.trace(&mut Visitor::new(&mut marking, None));
    }

    /// Trace up to `budget` grey objects. Returns true when the worklist is
    /// empty.
    pub fn advance_marking(&self, budget: usize) -> bool {
        assert_eq!(self.phase(), GcPhase::Marking, "advance_marking outside marking");
        let objects = self.inner.objects.borrow();
        let mut marking = self.inner.state.marking.borrow_mut();
        for _ in 0..budget {
            let Some(id) = marking.pop_worklist() else {
                break;
            };
            // Swept or never-allocated ids can still be referenced by stale
            // handles.
            if let Some(object) = objects.get(id) {
                (object.trace)(&*object.value, &mut Visitor::new(&mut marking, Some(id)));
            }
        }
        marking.worklist_is_empty()
    }

    /// Finish marking and run weak processing for heap objects that asked
    /// for it. The broker stays valid for the embedder to sweep its own weak
    /// tables until `sweep` is called.
    pub fn finish_marking(&self) -> LivenessBroker {
        while !self.advance_marking(usize::MAX) {}

        let state = &self.inner.state;
        let (broker, callbacks, weak_tables) = {
            let mut marking = state.marking.borrow_mut();
            let unresolved = marking.discard_unresolved_ephemerons();
            log::debug!(
                target: "heap",
                "marking finished, {} ephemeron keys unreachable",
                unresolved
            );
            (
                marking.liveness_broker(),
                marking.take_weak_callbacks(),
                marking.take_weak_tables(),
            )
        };

        state.phase.set(GcPhase::WeakProcessing);
        let mut objects = self.inner.objects.borrow_mut();
        for id in &callbacks {
            if let Some(object) = objects.get_mut(*id) {
                let swept_before = state.weak_tables_swept.get();
                (object.process_weak)(&mut *object.value, &broker);
                let swept = state.weak_tables_swept.get() - swept_before;
                let traced = weak_tables.get(*id).copied().unwrap_or(0) as u64;
                if swept < traced {
                    log::warn!(
                        target: "heap",
                        "object {:?} swept {} of its {} weak tables",
                        id,
                        swept,
                        traced
                    );
                }
                debug_assert!(
                    swept >= traced,
                    "process_weak must reach every weak table the object traces"
                );
            }
        }
        log::debug!(
            target: "heap",
            "weak processing ran for {} objects",
            callbacks.len()
        );
        broker
    }

    /// Free every object that was not marked. Finishes marking first if
    /// needed. Returns the number of objects freed.
    pub fn sweep(&self) -> usize {
        match self.phase() {
            GcPhase::Idle => return 0,
            GcPhase::Marking => {
                self.finish_marking();
            }
            GcPhase::WeakProcessing => {}
        }

        let dead: Vec<HeapObject> = {
            let marking = self.inner.state.marking.borrow();
            let mut objects = self.inner.objects.borrow_mut();
            let ids: Vec<ObjectId> = objects
                .keys()
                .filter(|id| !marking.is_marked(*id))
                .collect();
            ids.into_iter().filter_map(|id| objects.remove(id)).collect()
        };
        self.inner.state.phase.set(GcPhase::Idle);
        let freed = dead.len();
        // Finalizers of dead objects may touch the heap, so run them with
        // no borrows held.
        drop(dead);
        log::debug!(
            target: "heap",
            "swept {} objects, {} live",
            freed,
            self.object_count()
        );
        freed
    }

    /// Run a full cycle. Returns the number of objects freed, or 0 if a
    /// GC-forbidden scope is active.
    pub fn collect_garbage(&self) -> usize {
        if self.inner.state.is_gc_forbidden() {
            log::debug!(target: "heap", "collection skipped inside GC-forbidden scope");
            return 0;
        }
        if self.phase() == GcPhase::Idle {
            self.start_marking();
        }
        self.sweep()
    }
}

/// Strong reference to a heap object.
pub struct Member<T> {
    id: ObjectId,
    _type: PhantomData<fn() -> T>,
}

impl<T> Member<T> {
    pub(crate) fn from_id(id: ObjectId) -> Self {
        Self {
            id,
            _type: PhantomData,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn downgrade(&self) -> WeakMember<T> {
        WeakMember::from_id(self.id)
    }
}

/// Weak reference to a heap object; does not keep it alive.
pub struct WeakMember<T> {
    id: ObjectId,
    _type: PhantomData<fn() -> T>,
}

impl<T> WeakMember<T> {
    pub(crate) fn from_id(id: ObjectId) -> Self {
        Self {
            id,
            _type: PhantomData,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// A strong handle, if the object has not been swept.
    pub fn upgrade(&self, heap: &Heap) -> Option<Member<T>> {
        heap.contains(self.id).then(|| Member::from_id(self.id))
    }
}

macro_rules! impl_handle_traits {
    ($($handle:ident),*) => {
        $(
            impl<T> Clone for $handle<T> {
                fn clone(&self) -> Self {
                    *self
                }
            }

            impl<T> Copy for $handle<T> {}

            impl<T> PartialEq for $handle<T> {
                fn eq(&self, other: &Self) -> bool {
                    self.id == other.id
                }
            }

            impl<T> Eq for $handle<T> {}

            impl<T> Hash for $handle<T> {
                fn hash<H: Hasher>(&self, state: &mut H) {
                    self.id.hash(state);
                }
            }

            impl<T> fmt::Debug for $handle<T> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_tuple(stringify!($handle)).field(&self.id).finish()
                }
            }
        )*
    };
}

impl_handle_traits!(Member, WeakMember);

/// An off-heap root.
pub struct Persistent<T> {
    heap: Rc<HeapInner>,
    member: Member<T>,
}

impl<T> Persistent<T> {
    fn new(heap: Rc<HeapInner>, member: Member<T>) -> Self {
        {
            let mut roots = heap.roots.borrow_mut();
            match roots.get_mut(member.id) {
                Some(count) => *count += 1,
                None => {
                    roots.insert(member.id, 1);
                }
            }
        }
        // A root created while marking must not be missed.
        if heap.state.phase() == GcPhase::Marking {
            heap.state.marking.borrow_mut().mark(member.id);
        }
        Self { heap, member }
    }

    pub fn get(&self) -> Member<T> {
        self.member
    }
}

impl<T> Clone for Persistent<T> {
    fn clone(&self) -> Self {
        Persistent::new(Rc::clone(&self.heap), self.member)
    }
}

impl<T> Drop for Persistent<T> {
    fn drop(&mut self) {
        let mut roots = self.heap.roots.borrow_mut();
        if let Some(count) = roots.get_mut(self.member.id) {
            *count -= 1;
            if *count == 0 {
                roots.remove(self.member.id);
            }
        }
    }
}

impl<T> fmt::Debug for Persistent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Persistent").field(&self.member.id).finish()
    }
}
