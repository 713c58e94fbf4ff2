//! Stable indexing for matrix assembly.
//!
//! Maps composite keys (LinkId, OdId, PathId) to the dense row/column
//! positions used by vectors and matrices (0..N).

use std::collections::HashMap;
use std::hash::Hash;

/// Append-only bijection between keys and dense positions.
///
/// A key keeps the position it was given on insertion for the lifetime of the
/// table; positions are never reused.
#[derive(Debug, Clone)]
pub struct IndexTable<K> {
    /// Contiguous list of keys (position -> key).
    keys: Vec<K>,

    /// Reverse lookup: key -> position.
    positions: HashMap<K, usize>,
}

impl<K> Default for IndexTable<K> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> IndexTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next position to `key`. Returns `None` if the key is already present.
    pub fn insert(&mut self, key: K) -> Option<usize> {
        if self.positions.contains_key(&key) {
            return None;
        }
        let position = self.keys.len();
        self.keys.push(key);
        self.positions.insert(key, position);
        Some(position)
    }

    /// Position of a key.
    pub fn position(&self, key: &K) -> Option<usize> {
        self.positions.get(key).copied()
    }

    /// Key stored at a position.
    pub fn key(&self, position: usize) -> Option<K> {
        self.keys.get(position).copied()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.positions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in position order.
    pub fn keys(&self) -> &[K] {
        &self.keys
    }
}
