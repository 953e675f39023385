//! Insertion-ordered set of row or column keys

use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// An ordered set of unique string keys
///
/// Keeps the keys in insertion order together with a position index, so
/// membership checks stay O(1) while iteration follows the order the keys
/// were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: Vec<String>,
    index: HashMap<String, usize>,
}

impl KeySet {
    /// Create an empty key set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a key set from a sequence, failing with the first repeated key
    pub fn from_keys<I, S>(keys: I) -> std::result::Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for key in keys {
            let key = key.into();
            if set.contains(&key) {
                return Err(key);
            }
            set.insert(key);
        }
        Ok(set)
    }

    /// Append a key if it is not present yet; returns true when it was added
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key.clone(), self.keys.len());
        self.keys.push(key);
        true
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Get the position of a key
    pub fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Get the number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate over the keys in order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// View the keys as a slice
    pub fn as_slice(&self) -> &[String] {
        &self.keys
    }
}

impl<S: Into<String>> FromIterator<S> for KeySet {
    /// Collect keys, keeping only the first occurrence of each
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

impl Serialize for KeySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_order() {
        let mut keys = KeySet::new();
        assert!(keys.insert("b"));
        assert!(keys.insert("a"));
        assert!(!keys.insert("b"));

        assert_eq!(keys.as_slice(), &["b".to_string(), "a".to_string()]);
        assert_eq!(keys.position("a"), Some(1));
        assert_eq!(keys.position("z"), None);
    }

    #[test]
    fn test_from_keys_rejects_duplicates() {
        let err = KeySet::from_keys(["x", "y", "x"]).unwrap_err();
        assert_eq!(err, "x");

        let keys = KeySet::from_keys(["x", "y"]).unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("y"));
    }
}
