//! The shared backing contract every cache layer, and the Store itself,
//! implements (§4.7: "all implementing the same map-like contract").

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

/// The map-like contract a cache layer's `next_level` must satisfy.
/// `backing_copythrough` defaults to a no-op for terminal layers (the
/// Store); cache layers override it to recurse `copythrough` into their
/// own `next` (§4.7: "copythrough additionally recurses if next_level is
/// itself a cache").
pub trait CacheBacking<K, V>: Send + Sync {
    fn backing_get(&self, key: &K) -> Option<V>;
    fn backing_set(&self, key: K, value: V);
    fn backing_copythrough(&self) {}
}

/// Unbounded in-memory realisation of the Store layer (§4.7: "Store ...
/// unbounded (in-memory) or DB-backed"). `egp-store::table::MemoryGeneTable`
/// is the GC-specific, signature-keyed sibling of this generic map; this
/// type backs cache stacks built over other cacheable objects in tests and
/// embedded/offline use.
pub struct MemoryStore<K, V> {
    entries: Mutex<HashMap<K, V>>,
}

impl<K, V> MemoryStore<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        MemoryStore {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }
}

impl<K, V> Default for MemoryStore<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl<K, V> CacheBacking<K, V> for MemoryStore<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn backing_get(&self, key: &K) -> Option<V> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn backing_set(&self, key: K, value: V) {
        self.entries.lock().unwrap().insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_value() {
        let store: MemoryStore<u64, String> = MemoryStore::new();
        store.backing_set(1, "a".to_string());
        assert_eq!(store.backing_get(&1), Some("a".to_string()));
        assert_eq!(store.backing_get(&2), None);
        assert_eq!(store.len(), 1);
    }
}
