//! Per-container (node or edge) annotation multimap with secondary indexes for the
//! search iterators in the query engine: exact-value lookup, key-only lookup, regex
//! lookup (via the shared [`StringStorage`]) and a histogram used for selectivity
//! estimates.
//!
//! Generic over the container identity (`NodeID` for node annotations, `Edge` for
//! edge annotations) the same way the upstream annotation store is, since both share
//! every operation except what they're keyed by.

use crate::errors::Result;
use crate::stringstorage::StringStorage;
use crate::types::{AnnoKey, Annotation, StringID};
use crate::util::regex_full_match;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::Hash;

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AnnoStorage<T: Ord + Hash + Clone> {
    /// Direct lookup: does `(container, key)` have a value, and which one.
    by_container: FxHashMap<(T, AnnoKey), StringID>,
    /// `key -> value id -> containers`, used by exact-value and regex search.
    by_anno: BTreeMap<AnnoKey, BTreeMap<StringID, Vec<T>>>,
    /// Interns annotation values; keys stay as plain `AnnoKey`s since there are few
    /// distinct ones compared to the number of distinct values.
    values: StringStorage,
    largest_item: Option<T>,
}

impl<T: Ord + Hash + Clone> AnnoStorage<T> {
    pub fn new() -> Self {
        AnnoStorage {
            by_container: FxHashMap::default(),
            by_anno: BTreeMap::new(),
            values: StringStorage::new(),
            largest_item: None,
        }
    }

    /// Inserts or overwrites the value for `(item, anno.key)`.
    pub fn insert(&mut self, item: T, anno: Annotation) {
        if let Some(existing) = self.largest_item.as_ref() {
            if &item > existing {
                self.largest_item = Some(item.clone());
            }
        } else {
            self.largest_item = Some(item.clone());
        }

        let value_id = self.values.intern(&anno.val);
        if let Some(old_value) = self
            .by_container
            .insert((item.clone(), anno.key.clone()), value_id)
        {
            if old_value != value_id {
                self.remove_from_index(&item, &anno.key, old_value);
            } else {
                return;
            }
        }
        self.by_anno
            .entry(anno.key)
            .or_default()
            .entry(value_id)
            .or_default()
            .push(item);
    }

    fn remove_from_index(&mut self, item: &T, key: &AnnoKey, value_id: StringID) {
        if let Some(by_value) = self.by_anno.get_mut(key) {
            if let Some(items) = by_value.get_mut(&value_id) {
                items.retain(|i| i != item);
                if items.is_empty() {
                    by_value.remove(&value_id);
                }
            }
        }
    }

    /// Removes the annotation for `(item, key)`. No-op if absent.
    pub fn remove(&mut self, item: &T, key: &AnnoKey) -> Option<String> {
        let value_id = self.by_container.remove(&(item.clone(), key.clone()))?;
        self.remove_from_index(item, key, value_id);
        self.values.str(value_id).map(|s| s.to_string())
    }

    /// Removes every annotation for `item`, returning the keys it had.
    pub fn remove_item(&mut self, item: &T) -> Vec<AnnoKey> {
        let keys: Vec<AnnoKey> = self
            .by_container
            .keys()
            .filter(|(i, _)| i == item)
            .map(|(_, k)| k.clone())
            .collect();
        for k in &keys {
            self.remove(item, k);
        }
        keys
    }

    pub fn get_value(&self, item: &T, key: &AnnoKey) -> Option<&str> {
        let value_id = self.by_container.get(&(item.clone(), key.clone()))?;
        self.values.str(*value_id)
    }

    pub fn has_value(&self, item: &T, key: &AnnoKey) -> bool {
        self.by_container.contains_key(&(item.clone(), key.clone()))
    }

    pub fn get_annotations_for_item(&self, item: &T) -> Vec<Annotation> {
        self.by_container
            .iter()
            .filter(|((i, _), _)| i == item)
            .filter_map(|((_, key), value_id)| {
                self.values.str(*value_id).map(|v| Annotation {
                    key: key.clone(),
                    val: v.to_string(),
                })
            })
            .collect()
    }

    /// All distinct `(ns, name)` pairs present in this store.
    pub fn get_qnames(&self) -> Vec<AnnoKey> {
        self.by_anno.keys().cloned().collect()
    }

    pub fn num_of_annotations(&self) -> usize {
        self.by_container.len()
    }

    /// Every container carrying `key`, independent of value.
    pub fn find_by_name(&self, key: &AnnoKey) -> Vec<T> {
        match self.by_anno.get(key) {
            Some(by_value) => by_value.values().flatten().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Every container carrying exactly `(key, value)`.
    pub fn exact_anno_search(&self, key: &AnnoKey, value: &str) -> Vec<T> {
        let Some(by_value) = self.by_anno.get(key) else {
            return Vec::new();
        };
        let Some(value_id) = self.values.find_id(value) else {
            return Vec::new();
        };
        by_value.get(&value_id).cloned().unwrap_or_default()
    }

    /// Every container whose value for `key` matches `pattern` as a full match.
    pub fn regex_anno_search(&self, key: &AnnoKey, pattern: &str) -> Vec<T> {
        let Some(by_value) = self.by_anno.get(key) else {
            return Vec::new();
        };
        let candidate_ids = self.values.find_regex(pattern);
        let mut result = Vec::new();
        for id in candidate_ids {
            if let Some(items) = by_value.get(&id) {
                result.extend(items.iter().cloned());
            }
        }
        result
    }

    /// Upper bound on the number of containers that would match `(key, value_pattern)`,
    /// using the key's histogram; `None` value_pattern means key-only.
    pub fn guess_max_count(&self, key: &AnnoKey, value_pattern: Option<&str>) -> usize {
        let Some(by_value) = self.by_anno.get(key) else {
            return 0;
        };
        match value_pattern {
            None => by_value.values().map(Vec::len).sum(),
            Some(exact) => {
                if let Some(id) = self.values.find_id(exact) {
                    by_value.get(&id).map(Vec::len).unwrap_or(0)
                } else {
                    0
                }
            }
        }
    }

    /// Like [`Self::guess_max_count`] but for a regular expression: sums the histogram
    /// buckets of every interned value currently matching, which is a lower bound if
    /// the pool hasn't interned every theoretically matching string yet but is exact
    /// for the corpus's actual vocabulary.
    pub fn guess_max_count_regex(&self, key: &AnnoKey, pattern: &str) -> usize {
        let full_match_pattern = regex_full_match(pattern);
        let re = match Regex::new(&full_match_pattern) {
            Ok(re) => re,
            Err(_) => return 0,
        };
        let Some(by_value) = self.by_anno.get(key) else {
            return 0;
        };
        let mut count = 0;
        for (value_id, items) in by_value {
            if let Some(s) = self.values.str(*value_id) {
                if re.is_match(s) {
                    count += items.len();
                }
            }
        }
        count
    }

    /// All distinct values stored for `key`.
    pub fn get_all_values(&self, key: &AnnoKey) -> Vec<String> {
        match self.by_anno.get(key) {
            Some(by_value) => by_value
                .keys()
                .filter_map(|id| self.values.str(*id).map(str::to_string))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Distinct values for `key` lexicographically within `[lower, upper]`.
    pub fn anno_range_exact(&self, key: &AnnoKey, lower: &str, upper: &str) -> Vec<String> {
        self.get_all_values(key)
            .into_iter()
            .filter(|v| v.as_str() >= lower && v.as_str() <= upper)
            .collect()
    }

    pub fn calculate_statistics(&mut self) {
        // Histograms are always accurate here since they're index-backed rather than
        // sampled; nothing to recompute beyond what insert/remove already maintain.
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()>
    where
        T: Serialize,
    {
        let f = std::fs::File::create(path)?;
        let mut buf_writer = std::io::BufWriter::new(f);
        bincode::serialize_into(&mut buf_writer, self)?;
        Ok(())
    }

    pub fn load_from_file(&mut self, path: &std::path::Path) -> Result<()>
    where
        T: for<'de> Deserialize<'de>,
    {
        let f = std::fs::File::open(path)?;
        let mut buf_reader = std::io::BufReader::new(f);
        *self = bincode::deserialize_from(&mut buf_reader)?;
        Ok(())
    }

    pub fn estimate_memory(&self) -> usize {
        self.values.estimate_memory()
            + self.by_container.len() * std::mem::size_of::<(T, AnnoKey, StringID)>()
    }

    pub fn distinct_items(&self) -> FxHashSet<T> {
        self.by_container.keys().map(|(i, _)| i.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anno(ns: &str, name: &str, val: &str) -> Annotation {
        Annotation {
            key: AnnoKey::new(ns, name),
            val: val.to_string(),
        }
    }

    #[test]
    fn insert_then_get_roundtrips() {
        let mut s: AnnoStorage<u64> = AnnoStorage::new();
        s.insert(1, anno("annis", "tok", "hello"));
        assert_eq!(s.get_value(&1, &AnnoKey::new("annis", "tok")), Some("hello"));
    }

    #[test]
    fn overwrite_replaces_value_not_duplicates() {
        let mut s: AnnoStorage<u64> = AnnoStorage::new();
        let key = AnnoKey::new("", "pos");
        s.insert(1, Annotation { key: key.clone(), val: "N".into() });
        s.insert(1, Annotation { key: key.clone(), val: "V".into() });
        assert_eq!(s.get_value(&1, &key), Some("V"));
        assert_eq!(s.exact_anno_search(&key, "N"), Vec::<u64>::new());
        assert_eq!(s.exact_anno_search(&key, "V"), vec![1]);
    }

    #[test]
    fn delete_node_label_removes_value() {
        let mut s: AnnoStorage<u64> = AnnoStorage::new();
        let key = AnnoKey::new("", "pos");
        s.insert(1, Annotation { key: key.clone(), val: "N".into() });
        s.remove(&1, &key);
        assert_eq!(s.get_value(&1, &key), None);
    }

    #[test]
    fn regex_search_matches_full_string_only() {
        let mut s: AnnoStorage<u64> = AnnoStorage::new();
        let key = AnnoKey::new("", "tok");
        s.insert(1, Annotation { key: key.clone(), val: "hello".into() });
        s.insert(2, Annotation { key: key.clone(), val: "help".into() });
        s.insert(3, Annotation { key: key.clone(), val: "world".into() });
        let mut found = s.regex_anno_search(&key, "hel.*");
        found.sort_unstable();
        assert_eq!(found, vec![1, 2]);
    }
}
