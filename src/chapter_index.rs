//! Numeric ordering of a work's chapter keys.
//!
//! Keys are numeric strings ("21", "21.5") and are ordered by value, not
//! lexicographically. Keys that do not parse to a finite number sort after
//! every numeric key, lexicographically among themselves; numerically equal
//! keys ("1" and "1.0") are ordered lexicographically. The fallback only exists
//! so malformed manifests still get a deterministic total order.

use crate::work::Work;
use std::cmp::Ordering;

/// Chapter keys of a work, ordered by numeric value ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterIndex {
    keys: Vec<String>,
}

impl ChapterIndex {
    pub fn from_work(work: &Work) -> Self {
        Self {
            keys: ordered_keys(work),
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        index_of(&self.keys, key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index_of(key).is_some()
    }

    pub fn previous(&self, key: &str) -> Option<&str> {
        let idx = self.index_of(key)?;
        idx.checked_sub(1)
            .and_then(|prev| self.keys.get(prev))
            .map(String::as_str)
    }

    pub fn next(&self, key: &str) -> Option<&str> {
        let idx = self.index_of(key)?;
        self.keys.get(idx + 1).map(String::as_str)
    }

    pub fn is_first(&self, key: &str) -> bool {
        self.index_of(key) == Some(0)
    }

    pub fn is_last(&self, key: &str) -> bool {
        self.index_of(key)
            .is_some_and(|idx| idx + 1 == self.keys.len())
    }
}

/// Sort the work's chapter keys by numeric value.
pub fn ordered_keys(work: &Work) -> Vec<String> {
    let mut keys: Vec<String> = work.chapters.keys().cloned().collect();
    keys.sort_by(|a, b| compare_keys(a, b));
    keys
}

pub fn index_of(keys: &[String], key: &str) -> Option<usize> {
    keys.iter().position(|candidate| candidate == key)
}

/// Total order over chapter keys; see the module docs for malformed keys.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    match (numeric_value(a), numeric_value(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn numeric_value(key: &str) -> Option<f64> {
    key.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}
