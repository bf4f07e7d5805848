//! Cache Store Module
//!
//! Named response caches, the equivalent of the browser's `CacheStorage`.

use std::collections::HashMap;

use crate::cache::CachedResponse;

// == Named Cache ==
/// A single cache: request key to stored response.
#[derive(Debug, Default, Clone)]
pub struct NamedCache {
    entries: HashMap<String, CachedResponse>,
}

impl NamedCache {
    /// Stores a response, replacing any previous entry for the key.
    pub fn put(&mut self, key: impl Into<String>, entry: CachedResponse) {
        self.entries.insert(key.into(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&CachedResponse> {
        self.entries.get(key)
    }

    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Cache Storage ==
/// All caches of the origin, in creation order.
#[derive(Debug, Default)]
pub struct CacheStorage {
    caches: Vec<(String, NamedCache)>,
}

impl CacheStorage {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Open ==
    /// Returns the cache called `name`, creating it if needed.
    pub fn open(&mut self, name: &str) -> &mut NamedCache {
        let index = match self.caches.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.caches.push((name.to_string(), NamedCache::default()));
                self.caches.len() - 1
            }
        };
        &mut self.caches[index].1
    }

    pub fn get(&self, name: &str) -> Option<&NamedCache> {
        self.caches
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, cache)| cache)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    // == Keys ==
    /// Cache names in creation order.
    pub fn keys(&self) -> Vec<String> {
        self.caches.iter().map(|(n, _)| n.clone()).collect()
    }

    // == Delete ==
    /// Drops a whole cache. Returns whether it existed.
    pub fn delete(&mut self, name: &str) -> bool {
        let before = self.caches.len();
        self.caches.retain(|(n, _)| n != name);
        self.caches.len() != before
    }

    // == Match ==
    /// Looks the key up in every cache, oldest first.
    pub fn match_any(&self, key: &str) -> Option<&CachedResponse> {
        self.caches.iter().find_map(|(_, cache)| cache.get(key))
    }

    /// Total entries across all caches.
    pub fn total_entries(&self) -> usize {
        self.caches.iter().map(|(_, cache)| cache.len()).sum()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Response;

    fn entry(body: &str) -> CachedResponse {
        CachedResponse::new(Response::new(200, body))
    }

    #[test]
    fn test_open_creates_once() {
        let mut storage = CacheStorage::new();
        storage.open("v1").put("/a", entry("a"));
        storage.open("v1").put("/b", entry("b"));

        assert_eq!(storage.keys(), vec!["v1".to_string()]);
        assert_eq!(storage.get("v1").unwrap().len(), 2);
    }

    #[test]
    fn test_delete_drops_entries() {
        let mut storage = CacheStorage::new();
        storage.open("old").put("/a", entry("old"));
        storage.open("new");

        assert!(storage.delete("old"));
        assert!(!storage.delete("old"));
        assert!(storage.match_any("/a").is_none());
        assert_eq!(storage.keys(), vec!["new".to_string()]);
    }

    #[test]
    fn test_match_any_prefers_oldest_cache() {
        let mut storage = CacheStorage::new();
        storage.open("first").put("/a", entry("first"));
        storage.open("second").put("/a", entry("second"));

        let found = storage.match_any("/a").unwrap();
        assert_eq!(found.response.body, b"first".to_vec());
        assert_eq!(storage.total_entries(), 2);
    }

    #[test]
    fn test_put_overwrites() {
        let mut cache = NamedCache::default();
        cache.put("/a", entry("one"));
        cache.put("/a", entry("two"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("/a").unwrap().response.body, b"two".to_vec());
        assert!(cache.delete("/a"));
        assert!(cache.is_empty());
    }
}
