//! HashMap: key/value façade over `HashTable<KeyValuePair<K, V>, ..>`.
//!
//! The map adds overwrite semantics (`set`) on top of the table's
//! insert-if-absent, and presents entries as `(&K, &V)` instead of pairs.
//! Keys are never handed out mutably; values are, through `get_mut`,
//! `iter_mut` and the `AddResult` of an insert.

use crate::allocator::{PartitionAllocator, ReserveError, TableAllocator};
use crate::hash_table::{self, HashTable, Position, WriteLookup};
use crate::hash_traits::{GenericHashTraits, HashTraits};
use crate::hash_translator::{HashTranslator, IdentityHashTranslator};
use crate::key_value_pair::{KeyValuePair, KeyValuePairExtractor};
use core::fmt;
use core::iter::FusedIterator;
use core::ops::Index;

type Table<K, V, KT, A> = HashTable<KeyValuePair<K, V>, KeyValuePairExtractor, KT, A>;

pub struct HashMap<K, V, KT = GenericHashTraits<K>, A = PartitionAllocator>
where
    A: TableAllocator<KeyValuePair<K, V>>,
{
    table: Table<K, V, KT, A>,
}

/// Result of `set`/`insert`: the entry now stored for the key and whether it
/// was created by this call.
#[derive(Debug)]
pub struct AddResult<'a, K, V> {
    pub key: &'a K,
    pub value: &'a mut V,
    pub is_new_entry: bool,
}

impl<K, V, KT, A> HashMap<K, V, KT, A>
where
    KT: HashTraits<Type = K>,
    A: TableAllocator<KeyValuePair<K, V>> + Default,
{
    pub fn new() -> Self {
        Self {
            table: HashTable::new(),
        }
    }
}

impl<K, V, KT, A> HashMap<K, V, KT, A>
where
    KT: HashTraits<Type = K>,
    A: TableAllocator<KeyValuePair<K, V>>,
{
    pub fn new_in(allocator: A) -> Self {
        Self {
            table: HashTable::new_in(allocator),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn allocator(&self) -> &A {
        self.table.allocator()
    }

    pub(crate) fn table(&self) -> &Table<K, V, KT, A> {
        &self.table
    }

    pub(crate) fn table_mut(&mut self) -> &mut Table<K, V, KT, A> {
        &mut self.table
    }

    fn add_result(&mut self, index: usize, is_new_entry: bool) -> AddResult<'_, K, V> {
        let (key, value) = self.table.live_at_mut(index).split_mut();
        AddResult {
            key,
            value,
            is_new_entry,
        }
    }

    /// Store `value` under `key`, replacing the value of an existing entry.
    /// The existing key object is kept.
    pub fn set(&mut self, key: K, value: V) -> AddResult<'_, K, V> {
        match self
            .table
            .lookup_for_writing::<IdentityHashTranslator<KT>, K>(&key)
        {
            WriteLookup::Found(index) => {
                self.table.live_at_mut(index).value = value;
                self.table.notify_updated(index);
                self.add_result(index, false)
            }
            WriteLookup::Vacant {
                index,
                reuses_deleted,
            } => {
                let index = self
                    .table
                    .store_at(index, reuses_deleted, KeyValuePair::new(key, value));
                self.add_result(index, true)
            }
        }
    }

    /// Store `value` under `key` only if the key is absent. Otherwise the map
    /// is unchanged and `value` is dropped.
    pub fn insert(&mut self, key: K, value: V) -> AddResult<'_, K, V> {
        match self
            .table
            .lookup_for_writing::<IdentityHashTranslator<KT>, K>(&key)
        {
            WriteLookup::Found(index) => self.add_result(index, false),
            WriteLookup::Vacant {
                index,
                reuses_deleted,
            } => {
                let index = self
                    .table
                    .store_at(index, reuses_deleted, KeyValuePair::new(key, value));
                self.add_result(index, true)
            }
        }
    }

    /// Insert through a translator. `make` runs only when no entry matches
    /// `query`, and must build a key that `H` considers equal to it.
    pub fn insert_with<H, Q, F>(&mut self, query: &Q, make: F) -> AddResult<'_, K, V>
    where
        H: HashTranslator<Q, K>,
        Q: ?Sized,
        F: FnOnce(&Q) -> (K, V),
    {
        match self.table.lookup_for_writing::<H, Q>(query) {
            WriteLookup::Found(index) => self.add_result(index, false),
            WriteLookup::Vacant {
                index,
                reuses_deleted,
            } => {
                let pair = KeyValuePair::from(make(query));
                debug_assert!(
                    H::equal(&pair.key, query),
                    "translator built a key that does not match its query"
                );
                let index = self.table.store_at(index, reuses_deleted, pair);
                self.add_result(index, true)
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.table.find(key).map(|pair| &pair.value)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.table.find(key).map(|pair| (&pair.key, &pair.value))
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.table.find_index(key)?;
        Some(&mut self.table.live_at_mut(index).value)
    }

    pub fn find_with<H, Q>(&self, query: &Q) -> Option<(&K, &V)>
    where
        H: HashTranslator<Q, K>,
        Q: ?Sized,
    {
        self.table
            .find_with::<H, Q>(query)
            .map(|pair| (&pair.key, &pair.value))
    }

    pub fn get_mut_with<H, Q>(&mut self, query: &Q) -> Option<&mut V>
    where
        H: HashTranslator<Q, K>,
        Q: ?Sized,
    {
        let index = self.table.find_index_with::<H, Q>(query)?;
        Some(&mut self.table.live_at_mut(index).value)
    }

    /// The value for `key`.
    ///
    /// # Panics
    /// If `key` is absent.
    #[track_caller]
    pub fn at(&self, key: &K) -> &V {
        match self.get(key) {
            Some(value) => value,
            None => panic!("HashMap::at called with a key that is not in the map"),
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.table.contains(key)
    }

    pub fn contains_with<H, Q>(&self, query: &Q) -> bool
    where
        H: HashTranslator<Q, K>,
        Q: ?Sized,
    {
        self.table.contains_with::<H, Q>(query)
    }

    /// Remove `key`; returns whether it was present.
    pub fn erase(&mut self, key: &K) -> bool {
        self.table.erase(key)
    }

    /// Remove `key` and return its value.
    pub fn take(&mut self, key: &K) -> Option<V> {
        self.table.take(key).map(|pair| pair.value)
    }

    pub fn take_with<H, Q>(&mut self, query: &Q) -> Option<(K, V)>
    where
        H: HashTranslator<Q, K>,
        Q: ?Sized,
    {
        self.table.take_with::<H, Q>(query).map(KeyValuePair::into_parts)
    }

    /// Erase every key yielded by `keys`.
    pub fn remove_all<'k, I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = &'k K>,
        K: 'k,
    {
        for key in keys {
            self.table.erase(key);
        }
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&K, &V) -> bool) {
        self.table.retain(|pair| keep(&pair.key, &pair.value));
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Make room for `size` entries in total.
    pub fn reserve(&mut self, size: usize) {
        self.table.reserve_capacity_for_size(size);
    }

    pub fn try_reserve(&mut self, size: usize) -> Result<(), ReserveError> {
        self.table.try_reserve_capacity_for_size(size)
    }

    pub fn find_position(&self, key: &K) -> Option<Position> {
        self.table.find_position(key)
    }

    pub fn first_position(&self) -> Option<Position> {
        self.table.first_position()
    }

    pub fn next_position(&self, position: Position) -> Option<Position> {
        self.table.next_position(position)
    }

    pub fn get_at(&self, position: Position) -> Option<(&K, &V)> {
        self.table
            .get_at(position)
            .map(|pair| (&pair.key, &pair.value))
    }

    pub fn get_at_mut(&mut self, position: Position) -> Option<(&K, &mut V)> {
        self.table.get_at_mut(position).map(KeyValuePair::split_mut)
    }

    pub fn erase_at(&mut self, position: Position) -> Option<(K, V)> {
        self.table.erase_at(position).map(KeyValuePair::into_parts)
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.iter_mut().map(|(_, value)| value)
    }

    #[cfg(feature = "dump-stats")]
    pub fn dump_stats(&self) {
        self.table.dump_stats();
    }
}

impl<K, V, KT, A> Default for HashMap<K, V, KT, A>
where
    KT: HashTraits<Type = K>,
    A: TableAllocator<KeyValuePair<K, V>> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, KT, A> Clone for HashMap<K, V, KT, A>
where
    K: Clone,
    V: Clone,
    KT: HashTraits<Type = K>,
    A: TableAllocator<KeyValuePair<K, V>> + Clone,
{
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

/// Maps are equal when they hold the same keys mapped to equal values,
/// regardless of insertion order or capacity.
impl<K, V, KT, A> PartialEq for HashMap<K, V, KT, A>
where
    V: PartialEq,
    KT: HashTraits<Type = K>,
    A: TableAllocator<KeyValuePair<K, V>>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|v| v == value))
    }
}

impl<K, V, KT, A> Eq for HashMap<K, V, KT, A>
where
    V: Eq,
    KT: HashTraits<Type = K>,
    A: TableAllocator<KeyValuePair<K, V>>,
{
}

impl<K, V, KT, A> fmt::Debug for HashMap<K, V, KT, A>
where
    K: fmt::Debug,
    V: fmt::Debug,
    KT: HashTraits<Type = K>,
    A: TableAllocator<KeyValuePair<K, V>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, KT, A> Index<&K> for HashMap<K, V, KT, A>
where
    KT: HashTraits<Type = K>,
    A: TableAllocator<KeyValuePair<K, V>>,
{
    type Output = V;

    #[track_caller]
    fn index(&self, key: &K) -> &V {
        self.at(key)
    }
}

/// Later pairs overwrite earlier ones with the same key, like `set`.
impl<K, V, KT, A> Extend<(K, V)> for HashMap<K, V, KT, A>
where
    KT: HashTraits<Type = K>,
    A: TableAllocator<KeyValuePair<K, V>>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

impl<K, V, KT, A> FromIterator<(K, V)> for HashMap<K, V, KT, A>
where
    KT: HashTraits<Type = K>,
    A: TableAllocator<KeyValuePair<K, V>> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<'a, K, V, KT, A> IntoIterator for &'a HashMap<K, V, KT, A>
where
    KT: HashTraits<Type = K>,
    A: TableAllocator<KeyValuePair<K, V>>,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, KT, A> IntoIterator for &'a mut HashMap<K, V, KT, A>
where
    KT: HashTraits<Type = K>,
    A: TableAllocator<KeyValuePair<K, V>>,
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, KT, A> IntoIterator for HashMap<K, V, KT, A>
where
    KT: HashTraits<Type = K>,
    A: TableAllocator<KeyValuePair<K, V>>,
{
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

pub struct Iter<'a, K, V> {
    inner: hash_table::Iter<'a, KeyValuePair<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|pair| (&pair.key, &pair.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub struct IterMut<'a, K, V> {
    inner: hash_table::IterMut<'a, KeyValuePair<K, V>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(KeyValuePair::split_mut)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

pub struct IntoIter<K, V> {
    inner: hash_table::IntoIter<KeyValuePair<K, V>>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.inner.next().map(KeyValuePair::into_parts)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
