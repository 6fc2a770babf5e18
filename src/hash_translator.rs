//! Translators let a table be probed with a query of a different type than
//! the stored key, e.g. a `&str` against `String` keys.
//!
//! A translator must hash a query exactly as the table's `HashTraits` would
//! hash the equal stored key; otherwise lookups silently miss.

use crate::hash_functions::hash_int64;
use crate::hash_traits::HashTraits;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use rustc_hash::FxBuildHasher;

pub trait HashTranslator<Q: ?Sized, K> {
    fn hash(query: &Q) -> u32;

    fn equal(stored: &K, query: &Q) -> bool;
}

/// Queries of the key type itself, delegating to the key traits.
pub struct IdentityHashTranslator<Tr>(PhantomData<fn() -> Tr>);

impl<Tr: HashTraits> HashTranslator<Tr::Type, Tr::Type> for IdentityHashTranslator<Tr> {
    #[inline]
    fn hash(query: &Tr::Type) -> u32 {
        Tr::hash(query)
    }

    #[inline]
    fn equal(stored: &Tr::Type, query: &Tr::Type) -> bool {
        Tr::equal(stored, query)
    }
}

/// Borrowed queries for tables using `GenericHashTraits<K>`. Relies on the
/// `Borrow` contract: `K` and `Q` hash identically.
pub struct BorrowTranslator<K>(PhantomData<fn() -> K>);

impl<K, Q> HashTranslator<Q, K> for BorrowTranslator<K>
where
    K: Borrow<Q> + Hash + Eq,
    Q: ?Sized + Hash + Eq,
{
    #[inline]
    fn hash(query: &Q) -> u32 {
        hash_int64(FxBuildHasher.hash_one(query))
    }

    #[inline]
    fn equal(stored: &K, query: &Q) -> bool {
        stored.borrow() == query
    }
}
