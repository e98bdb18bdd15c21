//! Interns strings into dense [`StringID`]s and back.
//!
//! Two indexes are kept in sync: `by_id` for reverse lookup and a sorted `by_value`
//! map for both exact lookup and, via [`StringStorage::find_regex`], a lexicographic
//! range scan bounded by any literal prefix the query regex has.

use crate::types::StringID;
use crate::util::{prefix_upper_bound, regex_full_match, regex_prefix};
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included, Unbounded};

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct StringStorage {
    by_id: FxHashMap<StringID, String>,
    by_value: BTreeMap<String, StringID>,
}

impl StringStorage {
    pub fn new() -> StringStorage {
        StringStorage::default()
    }

    pub fn str(&self, id: StringID) -> Option<&str> {
        self.by_id.get(&id).map(|s| s.as_str())
    }

    /// Interns `val`, returning its existing ID if already present.
    pub fn intern(&mut self, val: &str) -> StringID {
        if let Some(existing) = self.by_value.get(val) {
            return *existing;
        }
        let mut id = self.by_id.len() as StringID + 1;
        while self.by_id.contains_key(&id) {
            id += 1;
        }
        self.by_id.insert(id, val.to_string());
        self.by_value.insert(val.to_string(), id);
        id
    }

    pub fn find_id(&self, val: &str) -> Option<StringID> {
        self.by_value.get(val).copied()
    }

    /// Finds all interned strings matching `pattern` as a full match.
    ///
    /// When the pattern starts with a literal prefix, only the lexicographic range
    /// sharing that prefix is scanned; otherwise every interned value is checked.
    pub fn find_regex(&self, pattern: &str) -> Vec<StringID> {
        let full_match_pattern = regex_full_match(pattern);
        let re = match Regex::new(&full_match_pattern) {
            Ok(re) => re,
            Err(_) => return Vec::new(),
        };

        let mut result = Vec::new();
        match regex_prefix(pattern) {
            Some(prefix) if !prefix.is_empty() => {
                let upper = prefix_upper_bound(&prefix);
                let range = match &upper {
                    Some(upper) => (Included(prefix.clone()), Excluded(upper.clone())),
                    None => (Included(prefix.clone()), Unbounded),
                };
                for (s, id) in self.by_value.range::<String, _>(range) {
                    if re.is_match(s) {
                        result.push(*id);
                    }
                }
            }
            _ => {
                for (s, id) in &self.by_value {
                    if re.is_match(s) {
                        result.push(*id);
                    }
                }
            }
        }
        result
    }

    pub fn avg_length(&self) -> f64 {
        if self.by_value.is_empty() {
            return 0.0;
        }
        let sum: usize = self.by_value.keys().map(|s| s.len()).sum();
        sum as f64 / self.by_value.len() as f64
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_value.clear();
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> crate::errors::Result<()> {
        let f = std::fs::File::create(path)?;
        let mut buf_writer = std::io::BufWriter::new(f);
        bincode::serialize_into(&mut buf_writer, self)?;
        Ok(())
    }

    pub fn load_from_file(&mut self, path: &std::path::Path) -> crate::errors::Result<()> {
        self.clear();
        let f = std::fs::File::open(path)?;
        let mut buf_reader = std::io::BufReader::new(f);
        *self = bincode::deserialize_from(&mut buf_reader)?;
        Ok(())
    }

    pub fn estimate_memory(&self) -> usize {
        let mut size = 0;
        for (id, s) in &self.by_id {
            size += std::mem::size_of_val(id) + s.capacity();
        }
        for (s, id) in &self.by_value {
            size += s.capacity() + std::mem::size_of_val(id);
        }
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let mut s = StringStorage::new();
        let a = s.intern("hello");
        let b = s.intern("hello");
        assert_eq!(a, b);
        assert_eq!(s.str(a), Some("hello"));
    }

    #[test]
    fn find_regex_matches_prefix_range() {
        let mut s = StringStorage::new();
        s.intern("hello");
        s.intern("help");
        s.intern("world");
        let mut ids = s.find_regex("he.*");
        ids.sort_unstable();
        let mut expected = vec![s.find_id("hello").unwrap(), s.find_id("help").unwrap()];
        expected.sort_unstable();
        assert_eq!(ids, expected);
    }

    #[test]
    fn find_regex_invalid_pattern_is_empty() {
        let mut s = StringStorage::new();
        s.intern("x");
        assert!(s.find_regex("(unterminated").is_empty());
    }
}
