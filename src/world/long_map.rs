use crate::world::chunk_key::{pack, ChunkKey};
use std::collections::hash_map::{self, HashMap};
use std::collections::HashSet;

/// Hash map keyed by packed chunk keys.
#[derive(Debug, Clone)]
pub struct LongObjectMap<V> {
    entries: HashMap<i64, V>,
}

impl<V> Default for LongObjectMap<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> LongObjectMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: ChunkKey) -> Option<&V> {
        self.entries.get(&key.0)
    }

    /// Inserts or replaces the value under `key`, returning the previous one.
    pub fn put(&mut self, key: ChunkKey, value: V) -> Option<V> {
        self.entries.insert(key.0, value)
    }

    pub fn remove(&mut self, key: ChunkKey) -> Option<V> {
        self.entries.remove(&key.0)
    }

    pub fn contains_key(&self, key: ChunkKey) -> bool {
        self.entries.contains_key(&key.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> hash_map::Values<'_, i64, V> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChunkKey, &V)> + '_ {
        self.entries.iter().map(|(&key, value)| (ChunkKey(key), value))
    }
}

/// Set of packed chunk keys.
#[derive(Debug, Clone, Default)]
pub struct LongHashSet {
    keys: HashSet<i64>,
}

impl LongHashSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the key was not present before.
    pub fn add(&mut self, x: i32, z: i32) -> bool {
        self.keys.insert(pack(x, z))
    }

    /// Returns true if the key was present.
    pub fn remove(&mut self, x: i32, z: i32) -> bool {
        self.keys.remove(&pack(x, z))
    }

    pub fn contains(&self, x: i32, z: i32) -> bool {
        self.keys.contains(&pack(x, z))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.keys.iter().map(|&key| ChunkKey(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_put_replace_remove() {
        let mut map = LongObjectMap::new();
        let key = ChunkKey::new(-3, 7);
        assert_eq!(map.put(key, "a"), None);
        assert_eq!(map.put(key, "b"), Some("a"));
        assert_eq!(map.get(key), Some(&"b"));
        assert_eq!(map.get(ChunkKey::new(7, -3)), None);
        assert_eq!(map.len(), 1);
        assert_eq!(map.remove(key), Some("b"));
        assert!(map.is_empty());
    }

    #[test]
    fn test_set_membership() {
        let mut set = LongHashSet::new();
        assert!(set.add(1, -1));
        assert!(!set.add(1, -1));
        assert!(set.contains(1, -1));
        assert!(!set.contains(-1, 1));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![ChunkKey::new(1, -1)]);
        assert!(set.remove(1, -1));
        assert!(!set.remove(1, -1));
        assert!(set.is_empty());
    }
}
