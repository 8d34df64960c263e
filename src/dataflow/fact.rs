//! Generic fact containers used as IN/OUT facts.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

/// A map from keys to lattice values. What a missing key means is up to the analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapFact<K: Hash + Eq, V> {
    map: HashMap<K, V>,
}

impl<K: Hash + Eq, V> Default for MapFact<K, V> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq + Copy, V: Clone + PartialEq> MapFact<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    /// Returns true if the stored value changed.
    pub fn update(&mut self, key: K, value: V) -> bool {
        match self.map.insert(key, value.clone()) {
            Some(old) => old != value,
            None => true,
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.map.remove(key)
    }

    /// Replaces this fact with `other`. Returns true if anything changed.
    pub fn copy_from(&mut self, other: &Self) -> bool {
        if self.map == other.map {
            return false;
        }
        self.map = other.map.clone();
        true
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.map.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> + '_ {
        self.map.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetFact<E: Hash + Eq> {
    set: HashSet<E>,
}

impl<E: Hash + Eq> Default for SetFact<E> {
    fn default() -> Self {
        Self {
            set: HashSet::new(),
        }
    }
}

impl<E: Hash + Eq + Copy> SetFact<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, e: &E) -> bool {
        self.set.contains(e)
    }

    pub fn add(&mut self, e: E) -> bool {
        self.set.insert(e)
    }

    pub fn remove(&mut self, e: &E) -> bool {
        self.set.remove(e)
    }

    /// Adds every element of `other`. Returns true if this set grew.
    pub fn union(&mut self, other: &Self) -> bool {
        let old_len = self.set.len();
        self.set.extend(other.set.iter().copied());
        self.set.len() != old_len
    }

    pub fn copy_from(&mut self, other: &Self) -> bool {
        if self.set == other.set {
            return false;
        }
        self.set = other.set.clone();
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = E> + '_ {
        self.set.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl<E: Hash + Eq + Copy> FromIterator<E> for SetFact<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self {
            set: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_fact_update() {
        let mut fact: MapFact<u32, i32> = MapFact::new();
        assert!(fact.update(1, 10));
        assert!(!fact.update(1, 10));
        assert!(fact.update(1, 11));
        assert_eq!(fact.get(&1), Some(&11));
        assert_eq!(fact.remove(&1), Some(11));
        assert!(fact.is_empty());
    }

    #[test]
    fn test_map_fact_copy_from() {
        let mut a: MapFact<u32, i32> = MapFact::new();
        let mut b = MapFact::new();
        b.update(2, 3);
        assert!(a.copy_from(&b));
        assert!(!a.copy_from(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn test_set_fact_union() {
        let mut a: SetFact<u32> = [1, 2].iter().copied().collect();
        let b: SetFact<u32> = [2, 3].iter().copied().collect();
        assert!(a.union(&b));
        assert!(!a.union(&b));
        assert_eq!(a.len(), 3);
        assert!(a.remove(&1));
        assert!(!a.contains(&1));
    }
}
