//! Tracing: the `Trace` trait, the marking `Visitor`, and the liveness view
//! handed to weak processing.
//!
//! Marking is a plain grey-worklist scheme. `Visitor::mark` greys an object;
//! the heap later pops it and runs its trace callback. Ephemerons park the
//! referents of their dependent half under the weak key, and those referents
//! are greyed only once the key itself is marked.

use crate::heap::{Member, ObjectId, WeakMember};
use crate::key_value_pair::KeyValuePair;
use slotmap::SecondaryMap;

/// Mark state for one collection cycle.
#[derive(Debug, Default)]
pub(crate) struct MarkingState {
    marks: SecondaryMap<ObjectId, ()>,
    worklist: Vec<ObjectId>,
    /// Weak key -> objects to mark once the key is marked.
    ephemerons: hashbrown::HashMap<ObjectId, Vec<ObjectId>>,
    weak_callbacks: Vec<ObjectId>,
    /// Weak tables traced inside each object; all of them must be swept by
    /// that object's `process_weak`.
    weak_tables: SecondaryMap<ObjectId, usize>,
}

impl MarkingState {
    pub(crate) fn reset(&mut self) {
        self.marks.clear();
        self.worklist.clear();
        self.ephemerons.clear();
        self.weak_callbacks.clear();
        self.weak_tables.clear();
    }

    pub(crate) fn is_marked(&self, id: ObjectId) -> bool {
        self.marks.contains_key(id)
    }

    /// Mark `id` and everything parked on it. Returns whether `id` was newly
    /// marked.
    pub(crate) fn mark(&mut self, id: ObjectId) -> bool {
        if self.marks.contains_key(id) {
            return false;
        }
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            if self.marks.insert(id, ()).is_some() {
                continue;
            }
            self.worklist.push(id);
            if let Some(dependents) = self.ephemerons.remove(&id) {
                pending.extend(dependents);
            }
        }
        true
    }

    pub(crate) fn pop_worklist(&mut self) -> Option<ObjectId> {
        self.worklist.pop()
    }

    pub(crate) fn worklist_is_empty(&self) -> bool {
        self.worklist.is_empty()
    }

    /// Drop ephemeron entries whose keys never got marked. Returns how many
    /// keys were dropped.
    pub(crate) fn discard_unresolved_ephemerons(&mut self) -> usize {
        let unresolved = self.ephemerons.len();
        self.ephemerons.clear();
        unresolved
    }

    pub(crate) fn take_weak_callbacks(&mut self) -> Vec<ObjectId> {
        core::mem::take(&mut self.weak_callbacks)
    }

    pub(crate) fn take_weak_tables(&mut self) -> SecondaryMap<ObjectId, usize> {
        core::mem::take(&mut self.weak_tables)
    }

    pub(crate) fn liveness_broker(&self) -> LivenessBroker {
        LivenessBroker {
            marks: self.marks.clone(),
        }
    }
}

pub struct Visitor<'a> {
    state: &'a mut MarkingState,
    current: Option<ObjectId>,
    /// Set while collecting the referents of an unresolved ephemeron value
    /// instead of marking them.
    parked: Option<Vec<ObjectId>>,
}

impl<'a> Visitor<'a> {
    pub(crate) fn new(state: &'a mut MarkingState, current: Option<ObjectId>) -> Self {
        Self {
            state,
            current,
            parked: None,
        }
    }

    #[inline]
    pub fn trace<T: Trace + ?Sized>(&mut self, value: &T) {
        value.trace(self);
    }

    /// Strong edge to `id`.
    pub fn mark(&mut self, id: ObjectId) {
        match &mut self.parked {
            Some(parked) => parked.push(id),
            None => {
                self.state.mark(id);
            }
        }
    }

    pub fn is_marked(&self, id: ObjectId) -> bool {
        self.state.is_marked(id)
    }

    /// Trace `dependent` only if `key` is (or later becomes) marked.
    pub fn trace_ephemeron<T: Trace + ?Sized>(&mut self, key: ObjectId, dependent: &T) {
        if self.state.is_marked(key) {
            dependent.trace(self);
            return;
        }
        let mut collector = Visitor {
            state: &mut *self.state,
            current: self.current,
            parked: Some(Vec::new()),
        };
        dependent.trace(&mut collector);
        let parked = collector.parked.take().unwrap_or_default();
        if !parked.is_empty() {
            self.state.ephemerons.entry(key).or_default().extend(parked);
        }
    }

    /// Ask for the object being traced to get `process_weak` after marking.
    /// Off-heap roots have no object to call back; their owner sweeps them
    /// with the broker returned by `Heap::finish_marking`.
    pub fn register_weak_callback(&mut self) {
        if let Some(id) = self.current {
            if self.state.weak_callbacks.last() != Some(&id) {
                self.state.weak_callbacks.push(id);
            }
        }
    }

    /// Like `register_weak_callback`, and also counts a weak table the
    /// object's `process_weak` has to sweep.
    pub(crate) fn register_weak_table(&mut self) {
        self.register_weak_callback();
        if let Some(id) = self.current {
            if let Some(count) = self.state.weak_tables.entry(id) {
                *count.or_insert(0) += 1;
            }
        }
    }
}

/// Mark bits of a finished marking phase.
#[derive(Clone, Debug, Default)]
pub struct LivenessBroker {
    marks: SecondaryMap<ObjectId, ()>,
}

impl LivenessBroker {
    pub fn is_alive(&self, id: ObjectId) -> bool {
        self.marks.contains_key(id)
    }

    pub fn is_value_alive<T: Trace + ?Sized>(&self, value: &T) -> bool {
        value.is_alive(self)
    }
}

/// Values that may hold references into the heap.
pub trait Trace {
    /// The value holds at least one weak reference, so a table of such
    /// values needs weak processing.
    const IS_WEAK: bool = false;

    fn trace(&self, visitor: &mut Visitor<'_>);

    /// Whether every weak reference in the value survived marking.
    fn is_alive(&self, _broker: &LivenessBroker) -> bool {
        true
    }

    /// The object a weak value refers to, for ephemeron tracing.
    fn weak_target(&self) -> Option<ObjectId> {
        None
    }

    /// Drop dead weak entries held by the value. The heap calls this during
    /// weak processing on every object whose trace registered a weak
    /// callback; values holding weak tables forward it to them. Must not
    /// allocate.
    fn process_weak(&mut self, _broker: &LivenessBroker) {}
}

macro_rules! impl_trace_noop {
    ($($t:ty),* $(,)?) => {
        $(
            impl Trace for $t {
                #[inline]
                fn trace(&self, _visitor: &mut Visitor<'_>) {}
            }
        )*
    };
}

impl_trace_noop!(
    (), bool, char, u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64, String,
    &'static str,
);

impl<T: Trace> Trace for Option<T> {
    const IS_WEAK: bool = T::IS_WEAK;

    fn trace(&self, visitor: &mut Visitor<'_>) {
        if let Some(value) = self {
            value.trace(visitor);
        }
    }

    fn is_alive(&self, broker: &LivenessBroker) -> bool {
        self.as_ref().map_or(true, |value| value.is_alive(broker))
    }

    fn weak_target(&self) -> Option<ObjectId> {
        self.as_ref().and_then(Trace::weak_target)
    }

    fn process_weak(&mut self, broker: &LivenessBroker) {
        if let Some(value) = self {
            value.process_weak(broker);
        }
    }
}

impl<T: Trace> Trace for Vec<T> {
    fn trace(&self, visitor: &mut Visitor<'_>) {
        for value in self {
            value.trace(visitor);
        }
    }

    fn process_weak(&mut self, broker: &LivenessBroker) {
        for value in self {
            value.process_weak(broker);
        }
    }
}

impl<T> Trace for Member<T> {
    #[inline]
    fn trace(&self, visitor: &mut Visitor<'_>) {
        visitor.mark(self.id());
    }
}

impl<T> Trace for WeakMember<T> {
    const IS_WEAK: bool = true;

    #[inline]
    fn trace(&self, _visitor: &mut Visitor<'_>) {}

    fn is_alive(&self, broker: &LivenessBroker) -> bool {
        broker.is_alive(self.id())
    }

    fn weak_target(&self) -> Option<ObjectId> {
        Some(self.id())
    }
}

/// Strong/strong pairs trace both halves. A pair with exactly one weak half
/// is an ephemeron: the strong half is traced only through the weak half's
/// target. Weak/weak pairs keep nothing alive.
impl<K: Trace, V: Trace> Trace for KeyValuePair<K, V> {
    const IS_WEAK: bool = K::IS_WEAK || V::IS_WEAK;

    fn trace(&self, visitor: &mut Visitor<'_>) {
        match (K::IS_WEAK, V::IS_WEAK) {
            (false, false) => {
                self.key.trace(visitor);
                self.value.trace(visitor);
            }
            (true, false) => {
                if let Some(target) = self.key.weak_target() {
                    visitor.trace_ephemeron(target, &self.value);
                }
            }
            (false, true) => {
                if let Some(target) = self.value.weak_target() {
                    visitor.trace_ephemeron(target, &self.key);
                }
            }
            (true, true) => {}
        }
    }

    fn is_alive(&self, broker: &LivenessBroker) -> bool {
        self.key.is_alive(broker) && self.value.is_alive(broker)
    }

    fn process_weak(&mut self, broker: &LivenessBroker) {
        self.key.process_weak(broker);
        self.value.process_weak(broker);
    }
}
