//! Random-access set with uniform sampling and O(1) delete.

use rand::Rng;
use std::collections::HashMap;
use std::hash::Hash;

/// A set supporting uniform random selection and constant-time removal.
///
/// Backed by a `Vec` of entries plus a map from entry to its slot; removal
/// swap-removes the vector and patches the moved entry's slot.
#[derive(Debug, Clone, Default)]
pub struct RandomMap<T: Copy + Eq + Hash> {
    entries: Vec<T>,
    slots: HashMap<T, usize>,
}

impl<T: Copy + Eq + Hash> RandomMap<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            slots: HashMap::new(),
        }
    }

    /// Insert an entry; no-op if already present.
    pub fn insert(&mut self, entry: T) {
        if self.slots.contains_key(&entry) {
            return;
        }
        self.slots.insert(entry, self.entries.len());
        self.entries.push(entry);
    }

    /// Remove an entry. Returns whether it was present.
    pub fn remove(&mut self, entry: T) -> bool {
        let Some(slot) = self.slots.remove(&entry) else {
            return false;
        };
        self.entries.swap_remove(slot);
        if let Some(&moved) = self.entries.get(slot) {
            self.slots.insert(moved, slot);
        }
        true
    }

    pub fn contains(&self, entry: &T) -> bool {
        self.slots.contains_key(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Up to `amount` distinct entries, uniformly at random.
    pub fn random_unique<R: Rng>(&self, rng: &mut R, amount: usize) -> Vec<T> {
        let amount = amount.min(self.entries.len());
        if amount == 0 {
            return Vec::new();
        }
        // Partial Fisher-Yates over an index view; the backing vector is
        // not disturbed.
        let mut indices: Vec<usize> = (0..self.entries.len()).collect();
        let mut picked = Vec::with_capacity(amount);
        for i in 0..amount {
            let j = rng.gen_range(i..indices.len());
            indices.swap(i, j);
            picked.push(self.entries[indices[i]]);
        }
        picked
    }

    /// Iterate entries in insertion-modified order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}
