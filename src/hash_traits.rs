//! Per-key-type policies consumed by `HashTable`.
//!
//! A `HashTraits` implementation is a zero-sized policy type: the table never
//! holds an instance, it only calls the associated functions and reads the
//! associated constants. This keeps the probing algorithm type-agnostic.
//!
//! Buckets carry their own empty/deleted tag (see `Bucket`), so sentinel
//! values are never physically stored. They remain part of the contract:
//! a key for which `is_empty_value` or `is_deleted_value` holds is reserved
//! and must not be inserted. Debug builds check this on every insert.

use crate::hash_functions::{hash_int32, hash_int64, hash_pointer, pair_hash};
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use rustc_hash::FxBuildHasher;

pub trait HashTraits {
    type Type;

    /// Starting capacity. Must be a power of two.
    const MINIMUM_TABLE_SIZE: usize = 8;

    /// When `false`, comparing a live key against one of the reserved
    /// sentinels may misbehave, so the table checks the sentinel predicates
    /// before `equal` is ever called on a stored key.
    const SAFE_TO_COMPARE_TO_EMPTY_OR_DELETED: bool = true;

    /// Bracket every bucket move during a rehash with the allocator's
    /// GC-forbidden scope.
    const NEEDS_TO_FORBID_GC_ON_MOVE: bool = false;

    fn hash(key: &Self::Type) -> u32;

    fn equal(a: &Self::Type, b: &Self::Type) -> bool;

    /// The reserved "empty" key, when it can be expressed as a single value.
    fn empty_value() -> Option<Self::Type> {
        None
    }

    /// Override when the empty key cannot be produced by `empty_value`.
    fn is_empty_value(key: &Self::Type) -> bool {
        match Self::empty_value() {
            Some(empty) => Self::equal(&empty, key),
            None => false,
        }
    }

    /// The reserved "deleted" key, when it can be expressed as a single value.
    fn deleted_value() -> Option<Self::Type> {
        None
    }

    fn is_deleted_value(key: &Self::Type) -> bool {
        match Self::deleted_value() {
            Some(deleted) => Self::equal(&deleted, key),
            None => false,
        }
    }
}

/// True when `key` is neither of the reserved sentinels for `Tr`.
#[inline]
pub fn is_valid_key<Tr: HashTraits>(key: &Tr::Type) -> bool {
    !Tr::is_empty_value(key) && !Tr::is_deleted_value(key)
}

/// Traits for any `Hash + Eq` type. Keys are hashed with `FxBuildHasher`
/// and then mixed; no key value is reserved.
pub struct GenericHashTraits<T>(PhantomData<fn() -> T>);

impl<T: Hash + Eq> HashTraits for GenericHashTraits<T> {
    type Type = T;

    #[inline]
    fn hash(key: &T) -> u32 {
        hash_int64(FxBuildHasher.hash_one(key))
    }

    #[inline]
    fn equal(a: &T, b: &T) -> bool {
        a == b
    }
}

/// Integer types usable with `IntHashTraits` and `IntWithZeroKeyHashTraits`.
pub trait HashInt: Copy + Eq {
    const ZERO: Self;
    /// `-1` for signed types, `MAX` for unsigned ones.
    const MINUS_ONE: Self;
    const MAX: Self;
    const MAX_MINUS_ONE: Self;

    fn hash_int(self) -> u32;
}

macro_rules! impl_hash_int {
    ($mix:ident as $wide:ty => $($t:ty: $minus_one:expr),* $(,)?) => {
        $(
            impl HashInt for $t {
                const ZERO: Self = 0;
                const MINUS_ONE: Self = $minus_one;
                const MAX: Self = <$t>::MAX;
                const MAX_MINUS_ONE: Self = <$t>::MAX - 1;

                #[inline]
                fn hash_int(self) -> u32 {
                    $mix(self as $wide)
                }
            }
        )*
    };
}

impl_hash_int!(hash_int32 as u32 =>
    u8: u8::MAX, u16: u16::MAX, u32: u32::MAX,
    i8: -1, i16: -1, i32: -1,
);
impl_hash_int!(hash_int64 as u64 =>
    u64: u64::MAX, usize: usize::MAX,
    i64: -1, isize: -1,
);

/// Integer keys with `0` as the empty key and `-1` (`MAX` when unsigned) as
/// the deleted key. Neither may be inserted.
pub struct IntHashTraits<T>(PhantomData<fn() -> T>);

impl<T: HashInt> HashTraits for IntHashTraits<T> {
    type Type = T;

    #[inline]
    fn hash(key: &T) -> u32 {
        key.hash_int()
    }

    #[inline]
    fn equal(a: &T, b: &T) -> bool {
        a == b
    }

    fn empty_value() -> Option<T> {
        Some(T::ZERO)
    }

    fn deleted_value() -> Option<T> {
        Some(T::MINUS_ONE)
    }
}

/// Integer keys that allow zero; `MAX` and `MAX - 1` are reserved instead.
pub struct IntWithZeroKeyHashTraits<T>(PhantomData<fn() -> T>);

impl<T: HashInt> HashTraits for IntWithZeroKeyHashTraits<T> {
    type Type = T;

    #[inline]
    fn hash(key: &T) -> u32 {
        key.hash_int()
    }

    #[inline]
    fn equal(a: &T, b: &T) -> bool {
        a == b
    }

    fn empty_value() -> Option<T> {
        Some(T::MAX)
    }

    fn deleted_value() -> Option<T> {
        Some(T::MAX_MINUS_ONE)
    }
}

/// For `u32` keys that already are good hashes.
pub struct AlreadyHashedTraits;

impl HashTraits for AlreadyHashedTraits {
    type Type = u32;

    #[inline]
    fn hash(key: &u32) -> u32 {
        *key
    }

    #[inline]
    fn equal(a: &u32, b: &u32) -> bool {
        a == b
    }

    fn empty_value() -> Option<u32> {
        Some(0)
    }

    fn deleted_value() -> Option<u32> {
        Some(u32::MAX)
    }
}

/// Float types usable with `FloatHashTraits`.
pub trait HashFloat: Copy {
    const INFINITY: Self;
    const NEG_INFINITY: Self;

    fn hash_float(self) -> u32;
    fn bits_equal(self, other: Self) -> bool;
}

impl HashFloat for f32 {
    const INFINITY: Self = f32::INFINITY;
    const NEG_INFINITY: Self = f32::NEG_INFINITY;

    fn hash_float(self) -> u32 {
        hash_int32(self.to_bits())
    }

    fn bits_equal(self, other: Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl HashFloat for f64 {
    const INFINITY: Self = f64::INFINITY;
    const NEG_INFINITY: Self = f64::NEG_INFINITY;

    fn hash_float(self) -> u32 {
        crate::hash_functions::hash_float(self)
    }

    fn bits_equal(self, other: Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

/// Float keys compared by bit pattern, so `NaN` can be found again and
/// `0.0`/`-0.0` are distinct keys. Infinities are reserved.
pub struct FloatHashTraits<T>(PhantomData<fn() -> T>);

impl<T: HashFloat> HashTraits for FloatHashTraits<T> {
    type Type = T;

    #[inline]
    fn hash(key: &T) -> u32 {
        key.hash_float()
    }

    #[inline]
    fn equal(a: &T, b: &T) -> bool {
        a.bits_equal(*b)
    }

    fn empty_value() -> Option<T> {
        Some(T::INFINITY)
    }

    fn deleted_value() -> Option<T> {
        Some(T::NEG_INFINITY)
    }
}

/// Raw pointer keys by address. Null and the all-ones address are reserved.
pub struct PtrHashTraits<T>(PhantomData<fn() -> T>);

impl<T> HashTraits for PtrHashTraits<T> {
    type Type = *const T;

    #[inline]
    fn hash(key: &*const T) -> u32 {
        hash_pointer(*key)
    }

    #[inline]
    fn equal(a: &*const T, b: &*const T) -> bool {
        core::ptr::eq(*a, *b)
    }

    fn empty_value() -> Option<*const T> {
        Some(core::ptr::null())
    }

    fn deleted_value() -> Option<*const T> {
        Some(usize::MAX as *const T)
    }
}

/// Traits for `(A, B)` keys. The empty/deleted state of a pair is the state
/// of its first field.
pub struct PairHashTraits<A, B>(PhantomData<fn() -> (A, B)>);

impl<A: HashTraits, B: HashTraits> HashTraits for PairHashTraits<A, B> {
    type Type = (A::Type, B::Type);

    const MINIMUM_TABLE_SIZE: usize = A::MINIMUM_TABLE_SIZE;
    const SAFE_TO_COMPARE_TO_EMPTY_OR_DELETED: bool =
        A::SAFE_TO_COMPARE_TO_EMPTY_OR_DELETED && B::SAFE_TO_COMPARE_TO_EMPTY_OR_DELETED;
    const NEEDS_TO_FORBID_GC_ON_MOVE: bool =
        A::NEEDS_TO_FORBID_GC_ON_MOVE || B::NEEDS_TO_FORBID_GC_ON_MOVE;

    #[inline]
    fn hash(key: &Self::Type) -> u32 {
        pair_hash(A::hash(&key.0), B::hash(&key.1))
    }

    #[inline]
    fn equal(a: &Self::Type, b: &Self::Type) -> bool {
        A::equal(&a.0, &b.0) && B::equal(&a.1, &b.1)
    }

    fn is_empty_value(key: &Self::Type) -> bool {
        A::is_empty_value(&key.0)
    }

    fn is_deleted_value(key: &Self::Type) -> bool {
        A::is_deleted_value(&key.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_traits_reserve_zero_and_minus_one() {
        assert!(!is_valid_key::<IntHashTraits<i32>>(&0));
        assert!(!is_valid_key::<IntHashTraits<i32>>(&-1));
        assert!(!is_valid_key::<IntHashTraits<u16>>(&u16::MAX));
        assert!(is_valid_key::<IntHashTraits<i32>>(&42));
    }

    #[test]
    fn zero_key_traits_allow_zero() {
        assert!(is_valid_key::<IntWithZeroKeyHashTraits<u64>>(&0));
        assert!(!is_valid_key::<IntWithZeroKeyHashTraits<u64>>(&u64::MAX));
        assert!(!is_valid_key::<IntWithZeroKeyHashTraits<u64>>(&(u64::MAX - 1)));
    }

    #[test]
    fn generic_traits_reserve_nothing() {
        assert!(is_valid_key::<GenericHashTraits<String>>(&String::new()));
        assert_eq!(
            GenericHashTraits::<String>::hash(&"abc".to_string()),
            GenericHashTraits::<String>::hash(&"abc".to_string())
        );
    }

    #[test]
    fn float_traits_compare_bits() {
        type F = FloatHashTraits<f64>;
        assert!(F::equal(&f64::NAN, &f64::NAN));
        assert!(!F::equal(&0.0, &-0.0));
        assert!(!is_valid_key::<F>(&f64::INFINITY));
        assert!(!is_valid_key::<F>(&f64::NEG_INFINITY));
    }

    #[test]
    fn pointer_traits_reserve_null() {
        type P = PtrHashTraits<u8>;
        let x = 5u8;
        assert!(!is_valid_key::<P>(&core::ptr::null()));
        assert!(is_valid_key::<P>(&(&x as *const u8)));
    }

    #[test]
    fn pair_state_follows_first_field() {
        type P = PairHashTraits<IntHashTraits<i32>, GenericHashTraits<String>>;
        assert!(P::is_empty_value(&(0, "x".to_string())));
        assert!(P::is_deleted_value(&(-1, "x".to_string())));
        assert!(is_valid_key::<P>(&(3, String::new())));
        assert_eq!(P::MINIMUM_TABLE_SIZE, 8);
    }
}
