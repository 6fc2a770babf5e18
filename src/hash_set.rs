//! HashSet: the table with the stored value as its own key.

use crate::allocator::{PartitionAllocator, ReserveError, TableAllocator};
use crate::hash_table::{self, AddResult, HashTable};
use crate::hash_traits::{GenericHashTraits, HashTraits};
use crate::hash_translator::HashTranslator;
use crate::key_value_pair::IdentityExtractor;
use core::fmt;

pub struct HashSet<T, Tr = GenericHashTraits<T>, A = PartitionAllocator>
where
    A: TableAllocator<T>,
{
    table: HashTable<T, IdentityExtractor, Tr, A>,
}

impl<T, Tr, A> HashSet<T, Tr, A>
where
    Tr: HashTraits<Type = T>,
    A: TableAllocator<T> + Default,
{
    pub fn new() -> Self {
        Self {
            table: HashTable::new(),
        }
    }
}

impl<T, Tr, A> HashSet<T, Tr, A>
where
    Tr: HashTraits<Type = T>,
    A: TableAllocator<T>,
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

    pub(crate) fn table(&self) -> &HashTable<T, IdentityExtractor, Tr, A> {
        &self.table
    }

    pub(crate) fn table_mut(&mut self) -> &mut HashTable<T, IdentityExtractor, Tr, A> {
        &mut self.table
    }

    /// Add `value` unless an equal value is present.
    pub fn insert(&mut self, value: T) -> AddResult<'_, T> {
        self.table.insert(value)
    }

    pub fn insert_with<H, Q, F>(&mut self, query: &Q, make: F) -> AddResult<'_, T>
    where
        H: HashTranslator<Q, T>,
        Q: ?Sized,
        F: FnOnce(&Q) -> T,
    {
        self.table.insert_with::<H, Q, F>(query, make)
    }

    pub fn find(&self, value: &T) -> Option<&T> {
        self.table.find(value)
    }

    pub fn find_with<H, Q>(&self, query: &Q) -> Option<&T>
    where
        H: HashTranslator<Q, T>,
        Q: ?Sized,
    {
        self.table.find_with::<H, Q>(query)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.table.contains(value)
    }

    pub fn contains_with<H, Q>(&self, query: &Q) -> bool
    where
        H: HashTranslator<Q, T>,
        Q: ?Sized,
    {
        self.table.contains_with::<H, Q>(query)
    }

    pub fn erase(&mut self, value: &T) -> bool {
        self.table.erase(value)
    }

    pub fn take(&mut self, value: &T) -> Option<T> {
        self.table.take(value)
    }

    pub fn remove_all<'v, I>(&mut self, values: I)
    where
        I: IntoIterator<Item = &'v T>,
        T: 'v,
    {
        for value in values {
            self.table.erase(value);
        }
    }

    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.table.retain(keep);
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn reserve(&mut self, size: usize) {
        self.table.reserve_capacity_for_size(size);
    }

    pub fn try_reserve(&mut self, size: usize) -> Result<(), ReserveError> {
        self.table.try_reserve_capacity_for_size(size)
    }

    pub fn iter(&self) -> hash_table::Iter<'_, T> {
        self.table.iter()
    }
}

impl<T, Tr, A> Default for HashSet<T, Tr, A>
where
    Tr: HashTraits<Type = T>,
    A: TableAllocator<T> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, Tr, A> Clone for HashSet<T, Tr, A>
where
    T: Clone,
    Tr: HashTraits<Type = T>,
    A: TableAllocator<T> + Clone,
{
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<T, Tr, A> PartialEq for HashSet<T, Tr, A>
where
    Tr: HashTraits<Type = T>,
    A: TableAllocator<T>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|value| other.contains(value))
    }
}

impl<T, Tr, A> Eq for HashSet<T, Tr, A>
where
    Tr: HashTraits<Type = T>,
    A: TableAllocator<T>,
{
}

impl<T, Tr, A> fmt::Debug for HashSet<T, Tr, A>
where
    T: fmt::Debug,
    A: TableAllocator<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.table, f)
    }
}

impl<T, Tr, A> Extend<T> for HashSet<T, Tr, A>
where
    Tr: HashTraits<Type = T>,
    A: TableAllocator<T>,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.table.insert(value);
        }
    }
}

impl<T, Tr, A> FromIterator<T> for HashSet<T, Tr, A>
where
    Tr: HashTraits<Type = T>,
    A: TableAllocator<T> + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a, T, Tr, A> IntoIterator for &'a HashSet<T, Tr, A>
where
    Tr: HashTraits<Type = T>,
    A: TableAllocator<T>,
{
    type Item = &'a T;
    type IntoIter = hash_table::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, Tr, A> IntoIterator for HashSet<T, Tr, A>
where
    Tr: HashTraits<Type = T>,
    A: TableAllocator<T>,
{
    type Item = T;
    type IntoIter = hash_table::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.table.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash_traits::{IntWithZeroKeyHashTraits, PtrHashTraits};

    /// Invariant: Duplicate inserts report the existing element.
    #[test]
    fn duplicate_insert_is_not_new() {
        let mut s: HashSet<String> = HashSet::new();
        assert!(s.insert("a".to_string()).is_new_entry);
        let res = s.insert("a".to_string());
        assert!(!res.is_new_entry);
        assert_eq!(res.stored_value, "a");
        assert_eq!(s.len(), 1);
    }

    /// Invariant: Zero is a usable key under the zero-key traits.
    #[test]
    fn zero_key_traits_store_zero() {
        let mut s: HashSet<u32, IntWithZeroKeyHashTraits<u32>> = (0..10).collect();
        assert!(s.contains(&0));
        assert_eq!(s.take(&0), Some(0));
        assert!(!s.contains(&0));
        assert_eq!(s.len(), 9);
    }

    /// Invariant: Pointer sets compare addresses, not pointees.
    #[test]
    fn pointer_identity() {
        let a = 1u8;
        let b = 1u8;
        let mut s: HashSet<*const u8, PtrHashTraits<u8>> = HashSet::new();
        s.insert(&a as *const u8);
        assert!(s.contains(&(&a as *const u8)));
        assert!(!s.contains(&(&b as *const u8)));
    }

    /// Invariant: Set equality is order-independent.
    #[test]
    fn equality_and_clone() {
        let a: HashSet<u64> = [3, 1, 2].into_iter().collect();
        let b: HashSet<u64> = [1, 2, 3].into_iter().collect();
        assert_eq!(a, b);
        let mut c = a.clone();
        c.remove_all(&[1]);
        assert_ne!(a, c);
        assert_eq!(format!("{c:?}").len(), "{2, 3}".len());
    }
}
