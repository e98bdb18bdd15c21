//! Rough in-memory size estimation used by cache eviction.
//!
//! `malloc_size_of` gives us an allocator-aware size for the types that derive
//! `MallocSizeOf`; for plain collections of primitives we approximate with the
//! element stride, which is close enough for eviction decisions (we only need an
//! ordering between corpora, not an exact byte count).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;

pub fn size_of_btreemap<K, V>(map: &BTreeMap<K, V>) -> usize {
    map.len() * (std::mem::size_of::<K>() + std::mem::size_of::<V>())
}

pub fn size_of_hashmap<K: Eq + Hash, V>(map: &HashMap<K, V>) -> usize {
    map.capacity() * (std::mem::size_of::<K>() + std::mem::size_of::<V>())
}

pub fn size_of_hashset<K: Eq + Hash>(set: &HashSet<K>) -> usize {
    set.capacity() * std::mem::size_of::<K>()
}

pub fn size_of_vec<T>(v: &[T]) -> usize {
    v.len() * std::mem::size_of::<T>()
}
