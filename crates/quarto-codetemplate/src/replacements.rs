/*
 * replacements.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Per-invocation replacement mappings.
//!
//! A [`ReplacementMap`] associates placeholder names with replacement
//! values for one instantiation. Maps are built fresh per call and never
//! reused across invocations. Positional bindings and named overrides are
//! merged with [`ReplacementMap::merge_disjoint`], which rejects any key
//! present in both.

use std::collections::HashMap;

use crate::error::{TemplateError, TemplateResult};

/// A mapping from placeholder name to replacement value.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplacementMap<T> {
    entries: HashMap<String, T>,
}

impl<T> ReplacementMap<T> {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Bind a placeholder name to a value, returning any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: T) -> Option<T> {
        self.entries.insert(name.into(), value)
    }

    /// Look up the value bound to a name.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }

    /// Whether a name is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of bound names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over bound names.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Union with `other`, requiring the key sets to be disjoint.
    ///
    /// On overlap the smallest offending key is reported, so the error is
    /// deterministic regardless of map iteration order.
    pub fn merge_disjoint(mut self, other: Self) -> TemplateResult<Self> {
        if let Some(name) = other
            .entries
            .keys()
            .filter(|name| self.entries.contains_key(*name))
            .min()
        {
            return Err(TemplateError::ReplacementOverlap { name: name.clone() });
        }
        self.entries.extend(other.entries);
        Ok(self)
    }
}

impl<T> Default for ReplacementMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, T> FromIterator<(K, T)> for ReplacementMap<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut map = ReplacementMap::new();
        assert!(map.is_empty());
        map.insert("$0", 1);
        assert_eq!(map.get("$0"), Some(&1));
        assert!(map.contains("$0"));
        assert!(!map.contains("$1"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_merge_disjoint_unions() {
        let positional: ReplacementMap<i32> = [("$0", 1), ("$1", 2)].into_iter().collect();
        let overrides: ReplacementMap<i32> = [("NAME", 3)].into_iter().collect();

        let merged = positional.merge_disjoint(overrides).unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get("$0"), Some(&1));
        assert_eq!(merged.get("NAME"), Some(&3));
    }

    #[test]
    fn test_merge_overlap_fails() {
        let positional: ReplacementMap<i32> = [("$0", 1)].into_iter().collect();
        let overrides: ReplacementMap<i32> = [("$0", 2)].into_iter().collect();

        let err = positional.merge_disjoint(overrides).unwrap_err();
        match err {
            TemplateError::ReplacementOverlap { name } => assert_eq!(name, "$0"),
            other => panic!("expected overlap error, got {other:?}"),
        }
    }

    #[test]
    fn test_merge_overlap_reports_smallest_key() {
        let positional: ReplacementMap<i32> = [("$0", 1), ("$1", 2), ("A", 3)].into_iter().collect();
        let overrides: ReplacementMap<i32> = [("$1", 4), ("A", 5)].into_iter().collect();

        let err = positional.merge_disjoint(overrides).unwrap_err();
        match err {
            TemplateError::ReplacementOverlap { name } => assert_eq!(name, "$1"),
            other => panic!("expected overlap error, got {other:?}"),
        }
    }

    #[test]
    fn test_merge_with_empty() {
        let positional: ReplacementMap<i32> = [("$0", 1)].into_iter().collect();
        let merged = positional.merge_disjoint(ReplacementMap::new()).unwrap();
        assert_eq!(merged.len(), 1);
    }
}
