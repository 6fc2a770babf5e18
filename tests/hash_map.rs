// HashMap behavior through the public API.
//
// Each test documents what behavior is being verified and which
// invariants are assumed or asserted. The core invariants exercised:
// - Round-trip: a key inserted and then looked up yields its value, for
//   integer, pointer, pair and user-defined key traits.
// - Uniqueness: repeated insert/set of one key counts it once.
// - Load: capacity doubles once (live + deleted) * 2 reaches it, and
//   halves once live * 6 drops below it.
// - Tombstones: erased buckets are reused instead of growing the table.
// - Positions: using a position after a mutation panics in debug builds.
use heap_hashtable::hash_functions::pair_hash;
use heap_hashtable::{
    GenericHashTraits, HashMap, HashTraits, IntHashTraits, PairHashTraits, PtrHashTraits,
};
use std::panic::{catch_unwind, AssertUnwindSafe};

type IntMap<V> = HashMap<i32, V, IntHashTraits<i32>>;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Test: insert then find for integer keys.
// Verifies: every inserted key maps to its value; absent keys miss.
#[test]
fn round_trip_int_keys() {
    init_logging();
    let mut m: IntMap<String> = HashMap::new();
    for k in 1..=50 {
        m.insert(k, format!("v{k}"));
        assert_eq!(m.get(&k).map(String::as_str), Some(format!("v{k}").as_str()));
    }
    assert_eq!(m.len(), 50);
    assert!(m.get(&51).is_none());
}

// Test: pointer keys compare by address.
// Assumes: PtrHashTraits reserves null and the all-ones address only.
// Verifies: two equal values at different addresses are distinct keys.
#[test]
fn round_trip_pointer_keys() {
    let cells = vec![7u32, 7, 7];
    let mut m: HashMap<*const u32, usize, PtrHashTraits<u32>> = HashMap::new();
    for (i, cell) in cells.iter().enumerate() {
        m.insert(cell as *const u32, i);
    }
    assert_eq!(m.len(), 3);
    for (i, cell) in cells.iter().enumerate() {
        assert_eq!(m.get(&(cell as *const u32)), Some(&i));
    }
}

// Test: pair keys built from two field traits.
// Verifies: lookups need both halves to match.
#[test]
fn round_trip_pair_keys() {
    type Traits = PairHashTraits<IntHashTraits<i32>, GenericHashTraits<String>>;
    let mut m: HashMap<(i32, String), u8, Traits> = HashMap::new();
    m.insert((1, "a".to_string()), 1);
    m.insert((1, "b".to_string()), 2);
    m.insert((2, "a".to_string()), 3);
    assert_eq!(m.get(&(1, "b".to_string())), Some(&2));
    assert_eq!(m.get(&(2, "a".to_string())), Some(&3));
    assert!(m.get(&(2, "b".to_string())).is_none());
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Point {
    x: i32,
    y: i32,
}

// Field-delegating traits: hash and reserved keys follow the fields.
struct PointHashTraits;

impl HashTraits for PointHashTraits {
    type Type = Point;

    fn hash(key: &Point) -> u32 {
        pair_hash(
            IntHashTraits::<i32>::hash(&key.x),
            IntHashTraits::<i32>::hash(&key.y),
        )
    }

    fn equal(a: &Point, b: &Point) -> bool {
        a == b
    }

    fn empty_value() -> Option<Point> {
        Some(Point { x: i32::MIN, y: 0 })
    }

    fn deleted_value() -> Option<Point> {
        Some(Point { x: i32::MIN, y: 1 })
    }
}

// Test: user-defined traits for a struct key.
// Verifies: lookups, overwrite via set, and erase.
#[test]
fn round_trip_struct_keys() {
    let mut m: HashMap<Point, &'static str, PointHashTraits> = HashMap::new();
    m.set(Point { x: 1, y: 2 }, "a");
    m.set(Point { x: 2, y: 1 }, "b");
    m.set(Point { x: 1, y: 2 }, "c");
    assert_eq!(m.len(), 2);
    assert_eq!(m.get(&Point { x: 1, y: 2 }), Some(&"c"));
    assert!(m.erase(&Point { x: 2, y: 1 }));
    assert_eq!(m.len(), 1);
}

// Test: repeated insert and set of one key.
// Verifies: len counts the key once; insert keeps the first value, set
// replaces it.
#[test]
fn duplicate_keys_counted_once() {
    let mut m: IntMap<u32> = HashMap::new();
    for i in 0..10 {
        let added = m.insert(5, i);
        assert_eq!(added.is_new_entry, i == 0);
    }
    assert_eq!(m.len(), 1);
    assert_eq!(m.get(&5), Some(&0));
    for i in 0..10 {
        m.set(5, i);
    }
    assert_eq!(m.len(), 1);
    assert_eq!(m.get(&5), Some(&9));
}

// Test: tombstone reuse.
// Assumes: minimum table size 8.
// Verifies: insert 3, erase 3, insert 3 new keys leaves capacity at 8.
#[test]
fn erased_buckets_are_reused() {
    let mut m: IntMap<()> = HashMap::new();
    for k in 1..=3 {
        m.insert(k, ());
    }
    assert_eq!(m.capacity(), 8);
    for k in 1..=3 {
        assert!(m.erase(&k));
    }
    for k in 11..=13 {
        m.insert(k, ());
    }
    assert_eq!(m.len(), 3);
    assert_eq!(m.capacity(), 8);
}

// Test: growth threshold.
// Verifies: 8 buckets hold three entries; by the fifth insert the table
// has doubled to 16.
#[test]
fn growth_doubles_capacity() {
    let mut m: IntMap<()> = HashMap::new();
    assert_eq!(m.capacity(), 0);
    for k in 1..=3 {
        m.insert(k, ());
    }
    assert_eq!(m.capacity(), 8);
    for k in 4..=5 {
        m.insert(k, ());
    }
    assert_eq!(m.capacity(), 16);
}

// Test: shrink threshold.
// Verifies: erasing most keys halves the table, never below the minimum,
// and the survivors stay reachable.
#[test]
fn erasing_shrinks_capacity() {
    let mut m: IntMap<i32> = HashMap::new();
    for k in 1..=100 {
        m.insert(k, -k);
    }
    assert_eq!(m.capacity(), 256);
    for k in 1..=97 {
        m.erase(&k);
    }
    assert!(m.capacity() < 256);
    assert!(m.capacity() >= 8);
    for k in 98..=100 {
        assert_eq!(m.get(&k), Some(&-k));
    }
    assert!(m.len() * 6 >= m.capacity() || m.capacity() == 8);
}

// Test: erase of an absent key.
// Verifies: returns false and leaves len and capacity untouched.
#[test]
fn erase_missing_is_noop() {
    let mut m: IntMap<u8> = HashMap::new();
    assert!(!m.erase(&3));
    m.insert(1, 1);
    let capacity = m.capacity();
    assert!(!m.erase(&3));
    assert!(m.take(&3).is_none());
    assert_eq!(m.len(), 1);
    assert_eq!(m.capacity(), capacity);
}

// Test: positions are invalidated by mutation.
// Verifies: reading through a stale position panics in debug builds.
#[cfg(debug_assertions)]
#[test]
fn stale_position_panics() {
    let mut m: IntMap<u8> = HashMap::new();
    m.insert(1, 1);
    let position = m.find_position(&1).expect("present");
    assert_eq!(m.get_at(position), Some((&1, &1)));
    m.insert(2, 2);
    let res = catch_unwind(AssertUnwindSafe(|| {
        let _ = m.get_at(position);
    }));
    assert!(res.is_err());
}

// Test: equality ignores insertion order.
// Verifies: {(1,"x"),(2,"y")} == {(2,"y"),(1,"x")}, and differing values
// or sizes compare unequal.
#[test]
fn equality_is_order_independent() {
    let mut a: IntMap<&str> = HashMap::new();
    let mut b: IntMap<&str> = HashMap::new();
    a.insert(1, "x");
    a.insert(2, "y");
    b.insert(2, "y");
    b.insert(1, "x");
    assert_eq!(a, b);

    b.set(2, "z");
    assert_ne!(a, b);
    b.set(2, "y");
    b.insert(3, "w");
    assert_ne!(a, b);
}

// Test: the 1..=100 scenario.
// Verifies: len 100, capacity 256 (smallest power of two with
// 100 * 2 < capacity), every key found, 101 missing.
#[test]
fn hundred_keys_scenario() {
    init_logging();
    let mut m: IntMap<i32> = HashMap::new();
    for k in 1..=100 {
        m.insert(k, k * 10);
    }
    assert_eq!(m.len(), 100);
    assert_eq!(m.capacity(), 256);
    for k in 1..=100 {
        assert_eq!(m.get(&k), Some(&(k * 10)));
    }
    assert!(m.get(&101).is_none());
    assert!(m.find_position(&101).is_none());
}

// Test: bulk construction, iteration and removal helpers.
// Verifies: collect/extend use set semantics and remove_all drops the
// listed keys only.
#[test]
fn collect_extend_and_remove_all() {
    let mut m: IntMap<i32> = (1..=10).map(|k| (k, k)).collect();
    m.extend([(1, 100), (11, 11)]);
    assert_eq!(m.len(), 11);
    assert_eq!(m[&1], 100);

    m.remove_all(&[2, 4, 6, 42]);
    let mut keys: Vec<i32> = m.keys().copied().collect();
    keys.sort_unstable();
    assert_eq!(keys, vec![1, 3, 5, 7, 8, 9, 10, 11]);

    let total: i32 = m.values().sum();
    assert_eq!(total, 100 + 3 + 5 + 7 + 8 + 9 + 10 + 11);
}

// Test: reserve sizes the table up front.
// Verifies: no growth happens while filling up to the reserved size.
#[test]
fn reserve_avoids_growth() {
    let mut m: IntMap<()> = HashMap::new();
    m.reserve(100);
    let capacity = m.capacity();
    assert_eq!(capacity, 256);
    for k in 1..=100 {
        m.insert(k, ());
    }
    assert_eq!(m.capacity(), capacity);
    assert!(m.try_reserve(usize::MAX).is_err());
}
