//! Integer, pointer and float hash mixes used by the built-in key traits.
//!
//! These are Thomas Wang's integer hash functions. They are deterministic,
//! so a key hashes to the same value for the whole lifetime of a table.

/// Mix a 32-bit integer.
#[inline]
pub fn hash_int32(key: u32) -> u32 {
    let mut key = key;
    key = key.wrapping_add(!(key << 15));
    key ^= key >> 10;
    key = key.wrapping_add(key << 3);
    key ^= key >> 6;
    key = key.wrapping_add(!(key << 11));
    key ^= key >> 16;
    key
}

/// Mix a 64-bit integer down to 32 bits.
#[inline]
pub fn hash_int64(key: u64) -> u32 {
    let mut key = key;
    key = key.wrapping_add(!(key << 32));
    key ^= key >> 22;
    key = key.wrapping_add(!(key << 13));
    key ^= key >> 8;
    key = key.wrapping_add(key << 3);
    key ^= key >> 15;
    key = key.wrapping_add(!(key << 27));
    key ^= key >> 31;
    key as u32
}

/// Combine two hashes into one. Order matters: `pair_hash(a, b)` and
/// `pair_hash(b, a)` differ.
#[inline]
pub fn pair_hash(first: u32, second: u32) -> u32 {
    hash_int64(((first as u64) << 32) | second as u64)
}

#[inline]
pub fn hash_pointer<T: ?Sized>(ptr: *const T) -> u32 {
    hash_int64(ptr as *const () as usize as u64)
}

/// Floats hash by bit pattern; see `FloatHashTraits` for the matching
/// equality.
#[inline]
pub fn hash_float(value: f64) -> u32 {
    hash_int64(value.to_bits())
}
