//! The stored value type of map tables and the key extractors.

/// An ordered key/value pair. A bucket holding a pair is classified solely by
/// its key; the value never participates in hashing or equality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct KeyValuePair<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> KeyValuePair<K, V> {
    #[inline]
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    /// Borrow both fields, with only the value mutable.
    #[inline]
    pub fn split_mut(&mut self) -> (&K, &mut V) {
        (&self.key, &mut self.value)
    }

    #[inline]
    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K, V> From<(K, V)> for KeyValuePair<K, V> {
    fn from((key, value): (K, V)) -> Self {
        Self { key, value }
    }
}

/// Projects the lookup key out of a stored value.
pub trait Extractor<T> {
    type Key;

    fn extract_key(value: &T) -> &Self::Key;
}

/// Sets: the stored value is the key.
pub struct IdentityExtractor;

impl<T> Extractor<T> for IdentityExtractor {
    type Key = T;

    #[inline]
    fn extract_key(value: &T) -> &T {
        value
    }
}

/// Maps: the key is the pair's `key` field.
pub struct KeyValuePairExtractor;

impl<K, V> Extractor<KeyValuePair<K, V>> for KeyValuePairExtractor {
    type Key = K;

    #[inline]
    fn extract_key(value: &KeyValuePair<K, V>) -> &K {
        &value.key
    }
}
