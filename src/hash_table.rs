//! HashTable: the open-addressing engine shared by `HashMap` and `HashSet`.
//!
//! Layout and invariants
//! - The backing is a power-of-two array of `Bucket`s, or absent (length 0)
//!   until the first insert.
//! - Every bucket is exactly one of empty, deleted (tombstone) or live.
//! - After every insert `(live + deleted) * MAX_LOAD < capacity`, so at
//!   least one empty bucket exists and every probe sequence terminates.
//! - Erase leaves a tombstone. Tombstones are only reclaimed by reuse on
//!   insert or by a rehash, which never carries them forward.
//!
//! Probing
//! - Start at `hash & (capacity - 1)` and step by 1, 2, 3, ... (triangular
//!   offsets). With power-of-two capacities this visits every bucket.
//!
//! Memory management is delegated to a `TableAllocator`; see `allocator`
//! and `construct_traits` for the hooks the table calls and when.

use crate::allocator::{PartitionAllocator, ReserveError, TableAllocator};
use crate::bucket::Bucket;
use crate::construct_traits::{construct, construct_and_notify_element, notify_new_elements};
use crate::debug_checks::{AccessForbiddenScope, ModificationCounter, ModificationStamp};
use crate::hash_traits::{is_valid_key, HashTraits};
use crate::hash_translator::{HashTranslator, IdentityHashTranslator};
use crate::key_value_pair::Extractor;
#[cfg(feature = "dump-stats")]
use crate::stats::HashTableStats;
use core::alloc::Layout;
use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;

pub const MAX_LOAD: usize = 2;
pub const MIN_LOAD: usize = 6;

pub struct HashTable<T, X, Tr, A: TableAllocator<T> = PartitionAllocator> {
    table: Vec<Bucket<T>>,
    key_count: usize,
    deleted_count: usize,
    allocator: A,
    access: AccessForbiddenScope,
    modifications: ModificationCounter,
    #[cfg(feature = "dump-stats")]
    stats: HashTableStats,
    _policy: PhantomData<fn() -> (X, Tr)>,
}

/// Result of an insert: where the value for the key lives now, and whether
/// this call created it.
#[derive(Debug)]
pub struct AddResult<'a, T> {
    pub stored_value: &'a T,
    pub is_new_entry: bool,
}

/// A bucket index stamped with the table's modification count. Unlike a
/// borrowing iterator it can be held across mutations; using it afterwards
/// panics in debug builds.
#[derive(Clone, Copy, Debug)]
pub struct Position {
    index: usize,
    stamp: ModificationStamp,
}

impl Position {
    pub fn index(&self) -> usize {
        self.index
    }
}

pub(crate) enum WriteLookup {
    Found(usize),
    Vacant { index: usize, reuses_deleted: bool },
}

/// Smallest capacity that keeps `size` entries under the maximum load:
/// all bits below the highest set bit of `size` are set, then the result
/// is doubled twice over that mask.
pub(crate) fn calculate_capacity(size: usize) -> Option<usize> {
    let mut smeared = size;
    let mut mask = size;
    while mask != 0 {
        smeared |= mask;
        mask >>= 1;
    }
    smeared.checked_add(1)?.checked_mul(2)
}

impl<T, X, Tr, A> HashTable<T, X, Tr, A>
where
    X: Extractor<T>,
    Tr: HashTraits<Type = X::Key>,
    A: TableAllocator<T> + Default,
{
    pub fn new() -> Self {
        Self::new_in(A::default())
    }
}

impl<T, X, Tr, A> Default for HashTable<T, X, Tr, A>
where
    X: Extractor<T>,
    Tr: HashTraits<Type = X::Key>,
    A: TableAllocator<T> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, X, Tr, A> HashTable<T, X, Tr, A>
where
    X: Extractor<T>,
    Tr: HashTraits<Type = X::Key>,
    A: TableAllocator<T>,
{
    pub fn new_in(allocator: A) -> Self {
        Self {
            table: Vec::new(),
            key_count: 0,
            deleted_count: 0,
            allocator,
            access: AccessForbiddenScope::new(),
            modifications: ModificationCounter::new(),
            #[cfg(feature = "dump-stats")]
            stats: HashTableStats::default(),
            _policy: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.key_count
    }

    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// Number of buckets in the backing; zero before the first insert.
    pub fn capacity(&self) -> usize {
        self.table.len()
    }

    /// Number of tombstones currently occupying buckets.
    pub fn deleted_count(&self) -> usize {
        self.deleted_count
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    #[cfg(feature = "dump-stats")]
    pub fn stats(&self) -> &HashTableStats {
        &self.stats
    }

    #[cfg(feature = "dump-stats")]
    pub fn dump_stats(&self) {
        self.stats.dump();
    }

    pub(crate) fn buckets(&self) -> &[Bucket<T>] {
        &self.table
    }

    #[inline]
    fn record_access(&self, _probes: usize) {
        #[cfg(feature = "dump-stats")]
        self.stats.record_access(_probes);
    }

    #[inline]
    fn check_stored_key(key: &X::Key) {
        if !Tr::SAFE_TO_COMPARE_TO_EMPTY_OR_DELETED {
            debug_assert!(
                is_valid_key::<Tr>(key),
                "hash table bucket holds a reserved empty/deleted key"
            );
        }
    }

    fn live_at(&self, index: usize) -> &T {
        self.table[index]
            .as_live()
            .expect("bucket must be live at a found or stored index")
    }

    pub(crate) fn live_at_mut(&mut self, index: usize) -> &mut T {
        self.table[index]
            .as_live_mut()
            .expect("bucket must be live at a found or stored index")
    }

    // ---- lookup ----

    fn lookup<H, Q>(&self, query: &Q) -> Option<usize>
    where
        H: HashTranslator<Q, X::Key>,
        Q: ?Sized,
    {
        self.access.check_allowed();
        if self.table.is_empty() {
            return None;
        }
        let mask = self.table.len() - 1;
        let hash = self.access.forbid(|| H::hash(query));
        let mut i = hash as usize & mask;
        let mut probe_count = 0;
        loop {
            match &self.table[i] {
                Bucket::Empty => {
                    self.record_access(probe_count);
                    return None;
                }
                Bucket::Deleted => {}
                Bucket::Live(value) => {
                    let key = X::extract_key(value);
                    Self::check_stored_key(key);
                    if self.access.forbid(|| H::equal(key, query)) {
                        self.record_access(probe_count);
                        return Some(i);
                    }
                }
            }
            probe_count += 1;
            i = (i + probe_count) & mask;
        }
    }

    /// Probe for `query`, allocating the backing if needed. A vacant result
    /// names the bucket an insert should use: the first reusable tombstone on
    /// the probe path if the allocator allows reuse, otherwise the empty
    /// bucket that ended the probe.
    pub(crate) fn lookup_for_writing<H, Q>(&mut self, query: &Q) -> WriteLookup
    where
        H: HashTranslator<Q, X::Key>,
        Q: ?Sized,
    {
        self.access.check_allowed();
        debug_assert!(
            self.allocator.is_allocation_allowed(),
            "hash table insert while allocation is forbidden"
        );
        if self.table.is_empty() {
            self.expand(None);
        }

        let mask = self.table.len() - 1;
        let hash = self.access.forbid(|| H::hash(query));
        let mut i = hash as usize & mask;
        let mut probe_count = 0;
        let can_reuse_deleted = self.allocator.can_reuse_deleted_bucket();
        let mut deleted_index = None;
        loop {
            match &self.table[i] {
                Bucket::Empty => break,
                Bucket::Deleted => {
                    if can_reuse_deleted && deleted_index.is_none() {
                        deleted_index = Some(i);
                    }
                }
                Bucket::Live(value) => {
                    let key = X::extract_key(value);
                    Self::check_stored_key(key);
                    if self.access.forbid(|| H::equal(key, query)) {
                        self.record_access(probe_count);
                        return WriteLookup::Found(i);
                    }
                }
            }
            probe_count += 1;
            i = (i + probe_count) & mask;
        }
        self.record_access(probe_count);

        match deleted_index {
            Some(index) => WriteLookup::Vacant {
                index,
                reuses_deleted: true,
            },
            None => WriteLookup::Vacant {
                index: i,
                reuses_deleted: false,
            },
        }
    }

    /// Store `value` into the bucket chosen by `lookup_for_writing` and
    /// return its index after any growth or shrink the insert triggered.
    pub(crate) fn store_at(&mut self, index: usize, reuses_deleted: bool, value: T) -> usize {
        debug_assert!(
            is_valid_key::<Tr>(X::extract_key(&value)),
            "reserved empty/deleted key inserted into hash table"
        );
        self.modifications.register();

        if reuses_deleted {
            debug_assert!(self.table[index].is_deleted());
            self.table[index] = Bucket::Empty;
            self.deleted_count -= 1;
        }
        debug_assert!(self.table[index].is_empty());

        construct_and_notify_element(&self.allocator, &mut self.table[index], value);
        self.key_count += 1;

        let relocated = if self.should_expand() {
            self.expand(Some(index))
        } else if A::WEAK_ELEMENTS && self.should_shrink() {
            // Weak processing removes entries without ever shrinking, so
            // weak tables get the chance here.
            let half = self.table.len() / 2;
            self.rehash(half, Some(index))
        } else {
            Some(index)
        };
        relocated.expect("rehash must keep the entry being inserted")
    }

    /// Let the allocator know a stored value changed in place (map `set`
    /// over an existing key).
    pub(crate) fn notify_updated(&self, index: usize) {
        crate::construct_traits::notify_new_element(&self.allocator, self.live_at(index));
    }

    // ---- public operations ----

    /// Insert `value` unless an equal key is already present. The existing
    /// entry is kept and `value` is dropped in that case.
    pub fn insert(&mut self, value: T) -> AddResult<'_, T> {
        let lookup =
            self.lookup_for_writing::<IdentityHashTranslator<Tr>, X::Key>(X::extract_key(&value));
        match lookup {
            WriteLookup::Found(index) => AddResult {
                stored_value: self.live_at(index),
                is_new_entry: false,
            },
            WriteLookup::Vacant {
                index,
                reuses_deleted,
            } => {
                let index = self.store_at(index, reuses_deleted, value);
                AddResult {
                    stored_value: self.live_at(index),
                    is_new_entry: true,
                }
            }
        }
    }

    /// Insert through a translator: probe with `query`, and only if no entry
    /// matches build the stored value from it with `make`.
    pub fn insert_with<H, Q, F>(&mut self, query: &Q, make: F) -> AddResult<'_, T>
    where
        H: HashTranslator<Q, X::Key>,
        Q: ?Sized,
        F: FnOnce(&Q) -> T,
    {
        match self.lookup_for_writing::<H, Q>(query) {
            WriteLookup::Found(index) => AddResult {
                stored_value: self.live_at(index),
                is_new_entry: false,
            },
            WriteLookup::Vacant {
                index,
                reuses_deleted,
            } => {
                let value = make(query);
                debug_assert_eq!(
                    Tr::hash(X::extract_key(&value)),
                    H::hash(query),
                    "translator hashes its query differently from the stored key"
                );
                let index = self.store_at(index, reuses_deleted, value);
                AddResult {
                    stored_value: self.live_at(index),
                    is_new_entry: true,
                }
            }
        }
    }

    pub fn find(&self, key: &X::Key) -> Option<&T> {
        self.find_with::<IdentityHashTranslator<Tr>, X::Key>(key)
    }

    pub fn find_with<H, Q>(&self, query: &Q) -> Option<&T>
    where
        H: HashTranslator<Q, X::Key>,
        Q: ?Sized,
    {
        self.lookup::<H, Q>(query).map(|index| self.live_at(index))
    }

    pub(crate) fn find_index(&self, key: &X::Key) -> Option<usize> {
        self.lookup::<IdentityHashTranslator<Tr>, X::Key>(key)
    }

    pub(crate) fn find_index_with<H, Q>(&self, query: &Q) -> Option<usize>
    where
        H: HashTranslator<Q, X::Key>,
        Q: ?Sized,
    {
        self.lookup::<H, Q>(query)
    }

    pub fn contains(&self, key: &X::Key) -> bool {
        self.find_index(key).is_some()
    }

    pub fn contains_with<H, Q>(&self, query: &Q) -> bool
    where
        H: HashTranslator<Q, X::Key>,
        Q: ?Sized,
    {
        self.lookup::<H, Q>(query).is_some()
    }

    /// Remove the entry for `key`, returning it. Absent keys are a no-op.
    pub fn take(&mut self, key: &X::Key) -> Option<T> {
        let index = self.find_index(key)?;
        self.remove_at(index)
    }

    pub fn take_with<H, Q>(&mut self, query: &Q) -> Option<T>
    where
        H: HashTranslator<Q, X::Key>,
        Q: ?Sized,
    {
        let index = self.lookup::<H, Q>(query)?;
        self.remove_at(index)
    }

    /// Remove the entry for `key`; returns whether one was present.
    pub fn erase(&mut self, key: &X::Key) -> bool {
        self.take(key).is_some()
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> Option<T> {
        self.access.check_allowed();
        let value = self.table[index].delete()?;
        self.modifications.register();
        #[cfg(feature = "dump-stats")]
        self.stats.record_remove();
        self.deleted_count += 1;
        self.key_count -= 1;

        if self.should_shrink() {
            self.shrink();
        }
        Some(value)
    }

    /// Drop every entry and release the backing.
    pub fn clear(&mut self) {
        self.access.check_allowed();
        if self.table.is_empty() {
            return;
        }
        self.modifications.register();
        let old_table = core::mem::take(&mut self.table);
        self.key_count = 0;
        self.deleted_count = 0;
        self.allocator.free_backing(old_table);
    }

    /// Keep only the entries for which `keep` returns true, then shrink once
    /// to the smallest size the remaining entries allow.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.access.check_allowed();
        self.remove_entries_where(|value| !keep(value));
        let mut size = self.table.len();
        while self.key_count * MIN_LOAD < size && size > Tr::MINIMUM_TABLE_SIZE {
            size /= 2;
        }
        if size != self.table.len() && self.allocator.is_allocation_allowed() {
            self.rehash(size, None);
        }
    }

    /// Tombstone every live entry matching `dead`, walking from the last
    /// bucket to the first. Never resizes, so it is safe to call while the
    /// allocator forbids allocation.
    pub(crate) fn remove_entries_where(&mut self, mut dead: impl FnMut(&T) -> bool) -> usize {
        let mut removed = 0;
        for index in (0..self.table.len()).rev() {
            let is_dead = match &self.table[index] {
                Bucket::Live(value) => dead(value),
                _ => false,
            };
            if is_dead {
                self.modifications.register();
                drop(self.table[index].delete());
                self.deleted_count += 1;
                self.key_count -= 1;
                removed += 1;
                #[cfg(feature = "dump-stats")]
                self.stats.record_remove();
            }
        }
        removed
    }

    pub fn reserve_capacity_for_size(&mut self, size: usize) {
        if let Err(error) = self.try_reserve_capacity_for_size(size) {
            self.allocator.handle_out_of_memory(error);
        }
    }

    /// Grow so that `size` entries fit without a rehash. Only capacity
    /// overflow is reported here; an allocation failure still goes through
    /// the allocator's out-of-memory hook.
    pub fn try_reserve_capacity_for_size(&mut self, size: usize) -> Result<(), ReserveError> {
        self.access.check_allowed();
        let new_capacity = calculate_capacity(size)
            .ok_or(ReserveError::CapacityOverflow)?
            .max(Tr::MINIMUM_TABLE_SIZE);
        Layout::array::<Bucket<T>>(new_capacity).map_err(|_| ReserveError::CapacityOverflow)?;
        if new_capacity > self.table.len() {
            self.rehash(new_capacity, None);
        }
        Ok(())
    }

    // ---- positions ----

    fn position(&self, index: usize) -> Position {
        Position {
            index,
            stamp: self.modifications.stamp(),
        }
    }

    fn next_live_from(&self, start: usize) -> Option<Position> {
        (start..self.table.len())
            .find(|&i| self.table[i].is_live())
            .map(|i| self.position(i))
    }

    pub fn find_position(&self, key: &X::Key) -> Option<Position> {
        self.find_index(key).map(|index| self.position(index))
    }

    pub fn first_position(&self) -> Option<Position> {
        self.next_live_from(0)
    }

    pub fn next_position(&self, position: Position) -> Option<Position> {
        self.modifications.check(position.stamp);
        self.next_live_from(position.index + 1)
    }

    pub fn get_at(&self, position: Position) -> Option<&T> {
        self.modifications.check(position.stamp);
        self.table.get(position.index).and_then(Bucket::as_live)
    }

    pub(crate) fn get_at_mut(&mut self, position: Position) -> Option<&mut T> {
        self.modifications.check(position.stamp);
        self.table.get_mut(position.index).and_then(Bucket::as_live_mut)
    }

    pub fn erase_at(&mut self, position: Position) -> Option<T> {
        self.modifications.check(position.stamp);
        if position.index >= self.table.len() {
            return None;
        }
        self.remove_at(position.index)
    }

    // ---- iteration ----

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            buckets: self.table.iter(),
            remaining: self.key_count,
        }
    }

    /// Mutable iteration for façades that only hand out mutable access to
    /// the non-key part of the stored value.
    pub(crate) fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            buckets: self.table.iter_mut(),
            remaining: self.key_count,
        }
    }

    // ---- growth and shrink ----

    fn should_expand(&self) -> bool {
        (self.key_count + self.deleted_count) * MAX_LOAD >= self.table.len()
    }

    fn must_rehash_in_place(&self) -> bool {
        self.key_count * MIN_LOAD < self.table.len() * 2
    }

    fn should_shrink(&self) -> bool {
        // The allocator check goes last; it may consult collector state.
        self.key_count * MIN_LOAD < self.table.len()
            && self.table.len() > Tr::MINIMUM_TABLE_SIZE
            && self.allocator.is_allocation_allowed()
    }

    fn expand(&mut self, entry: Option<usize>) -> Option<usize> {
        let old_size = self.table.len();
        let new_size = if old_size == 0 {
            debug_assert!(
                Tr::MINIMUM_TABLE_SIZE.is_power_of_two(),
                "minimum table size must be a power of two"
            );
            Tr::MINIMUM_TABLE_SIZE
        } else if self.must_rehash_in_place() {
            old_size
        } else {
            match old_size.checked_mul(2) {
                Some(size) => size,
                None => self.allocator.handle_out_of_memory(ReserveError::CapacityOverflow),
            }
        };
        self.rehash(new_size, entry)
    }

    fn shrink(&mut self) {
        let half = self.table.len() / 2;
        self.rehash(half, None);
    }

    /// Move every live entry into a backing of `new_size` buckets and return
    /// the new index of `entry`.
    fn rehash(&mut self, new_size: usize, entry: Option<usize>) -> Option<usize> {
        let old_size = self.table.len();
        log::trace!(
            target: "hash_table",
            "rehash {} -> {} buckets ({} live, {} deleted)",
            old_size,
            new_size,
            self.key_count,
            self.deleted_count
        );
        #[cfg(feature = "dump-stats")]
        {
            if old_size != 0 {
                self.stats.record_rehash();
            }
        }

        if old_size != 0
            && new_size > old_size
            && self.allocator.expand_backing(&mut self.table, new_size)
        {
            return self.rehash_into_expanded_backing(new_size, entry);
        }

        let new_table = self.allocator.allocate_backing(new_size);
        self.rehash_to(new_table, entry)
    }

    /// The allocator grew the current backing in place. Park the live
    /// entries in a temporary backing at their current indices, reset the
    /// original at the new size, then re-probe everything back into it.
    fn rehash_into_expanded_backing(&mut self, new_size: usize, entry: Option<usize>) -> Option<usize> {
        let old_size = self.table.len();
        let mut temporary = self.allocator.allocate_backing(old_size);
        for (from, to) in self.table.iter_mut().zip(temporary.iter_mut()) {
            if let Some(value) = from.take_live() {
                construct(to, value);
            }
        }
        notify_new_elements(&self.allocator, &temporary);
        let mut original = core::mem::replace(&mut self.table, temporary);

        original.clear();
        original.resize_with(new_size, Bucket::default);
        self.rehash_to(original, entry)
    }

    fn rehash_to(&mut self, mut new_table: Vec<Bucket<T>>, entry: Option<usize>) -> Option<usize> {
        let mut new_entry = None;
        for index in 0..self.table.len() {
            let Some(value) = self.table[index].take_live() else {
                debug_assert_ne!(Some(index), entry);
                continue;
            };
            let new_index = self.reinsert(&mut new_table, value);
            if entry == Some(index) {
                new_entry = Some(new_index);
            }
        }

        // The new backing is fully populated before it is published, and
        // announced to the allocator before the old one goes away.
        notify_new_elements(&self.allocator, &new_table);
        self.modifications.register();
        let old_table = core::mem::replace(&mut self.table, new_table);
        self.deleted_count = 0;
        self.allocator.free_backing(old_table);
        new_entry
    }

    /// Place a value known to be absent into a backing with no tombstones.
    fn reinsert(&self, table: &mut [Bucket<T>], value: T) -> usize {
        if Tr::NEEDS_TO_FORBID_GC_ON_MOVE {
            self.allocator.enter_gc_forbidden_scope();
        }
        let mask = table.len() - 1;
        let hash = self.access.forbid(|| Tr::hash(X::extract_key(&value)));
        let mut i = hash as usize & mask;
        let mut probe_count = 0;
        while !table[i].is_empty() {
            debug_assert!(!table[i].is_deleted());
            probe_count += 1;
            i = (i + probe_count) & mask;
        }
        construct(&mut table[i], value);
        if Tr::NEEDS_TO_FORBID_GC_ON_MOVE {
            self.allocator.leave_gc_forbidden_scope();
        }
        #[cfg(feature = "dump-stats")]
        self.stats.record_reinsert();
        i
    }
}

impl<T, X, Tr, A: TableAllocator<T>> Drop for HashTable<T, X, Tr, A> {
    fn drop(&mut self) {
        if !self.table.is_empty() {
            let backing = core::mem::take(&mut self.table);
            self.allocator.free_backing(backing);
        }
    }
}

impl<T, X, Tr, A> Clone for HashTable<T, X, Tr, A>
where
    T: Clone,
    X: Extractor<T>,
    Tr: HashTraits<Type = X::Key>,
    A: TableAllocator<T> + Clone,
{
    fn clone(&self) -> Self {
        let mut copy = Self::new_in(self.allocator.clone());
        if self.is_empty() {
            return copy;
        }
        copy.reserve_capacity_for_size(self.len());
        for value in self.iter() {
            copy.insert(value.clone());
        }
        copy
    }
}

impl<T, X, Tr, A> fmt::Debug for HashTable<T, X, Tr, A>
where
    T: fmt::Debug,
    A: TableAllocator<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.table.iter().filter_map(Bucket::as_live))
            .finish()
    }
}

impl<'a, T, X, Tr, A> IntoIterator for &'a HashTable<T, X, Tr, A>
where
    X: Extractor<T>,
    Tr: HashTraits<Type = X::Key>,
    A: TableAllocator<T>,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, X, Tr, A> IntoIterator for HashTable<T, X, Tr, A>
where
    X: Extractor<T>,
    Tr: HashTraits<Type = X::Key>,
    A: TableAllocator<T>,
{
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(mut self) -> Self::IntoIter {
        let remaining = self.key_count;
        self.key_count = 0;
        self.deleted_count = 0;
        IntoIter {
            buckets: core::mem::take(&mut self.table).into_iter(),
            remaining,
        }
    }
}

/// Iterator over live values; skips empty and deleted buckets.
pub struct Iter<'a, T> {
    buckets: core::slice::Iter<'a, Bucket<T>>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let value = self.buckets.by_ref().find_map(Bucket::as_live)?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let value = self.buckets.by_ref().rev().find_map(Bucket::as_live)?;
        self.remaining -= 1;
        Some(value)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets.clone(),
            remaining: self.remaining,
        }
    }
}

pub(crate) struct IterMut<'a, T> {
    buckets: core::slice::IterMut<'a, Bucket<T>>,
    remaining: usize,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let value = self.buckets.by_ref().find_map(Bucket::as_live_mut)?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

pub struct IntoIter<T> {
    buckets: std::vec::IntoIter<Bucket<T>>,
    remaining: usize,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let value = self.buckets.by_ref().find_map(|bucket| match bucket {
            Bucket::Live(value) => Some(value),
            _ => None,
        })?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}
impl<T> FusedIterator for IntoIter<T> {}
