//! Deduplicators (§4.9): weak-value interning and bounded-LRU caching,
//! both reporting hit/miss statistics for operational visibility (§4.1a).
//!
//! Grounded on `examples/original_source/egpcommon/egpcommon/object_deduplicator.py`
//! (`lru_cache`-based hit/miss/target-rate reporting), reworked for Rust's
//! `Weak`-pointer semantics rather than a GC-tied weak-value dict.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, Weak};

use indexmap::IndexMap;

/// Hit/miss counters for a deduplicator (§4.1a: "Registry statistics").
#[derive(Debug, Clone, Copy, Default)]
pub struct DedupStats {
    pub hits: u64,
    pub misses: u64,
}

impl DedupStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Weak-value dedup (§4.9): `add` returns the canonical instance for a
/// content key; entries disappear once no strong references remain. Used
/// for Interfaces, EPTs, and Connections.
pub struct WeakDedup<K, V> {
    by_key: Mutex<HashMap<K, Weak<V>>>,
    stats: Mutex<DedupStats>,
}

impl<K, V> WeakDedup<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        WeakDedup {
            by_key: Mutex::new(HashMap::new()),
            stats: Mutex::new(DedupStats::default()),
        }
    }

    /// Returns the canonical instance for `key`, calling `make` only on a
    /// miss (§4.9).
    pub fn add(&self, key: K, make: impl FnOnce() -> V) -> Arc<V> {
        let mut map = self.by_key.lock().unwrap();
        if let Some(existing) = map.get(&key).and_then(Weak::upgrade) {
            self.stats.lock().unwrap().hits += 1;
            return existing;
        }
        self.stats.lock().unwrap().misses += 1;
        let arc = Arc::new(make());
        map.insert(key, Arc::downgrade(&arc));
        arc
    }

    /// Drops weak references whose strong count has reached zero.
    /// Housekeeping only, not required for correctness.
    pub fn sweep(&self) {
        self.by_key.lock().unwrap().retain(|_, w| w.strong_count() > 0);
    }

    pub fn len(&self) -> usize {
        self.by_key.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> DedupStats {
        *self.stats.lock().unwrap()
    }
}

impl<K, V> Default for WeakDedup<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        WeakDedup::new()
    }
}

/// Bounded-LRU dedup (§4.9): keeps up to `capacity` recently-added objects
/// alive past their first strong reference, for short-lived but very hot
/// objects (e.g. endpoint references) where a weak map would re-churn
/// constantly. `target_rate` is informational: a hit rate below it is
/// logged so operators can retune `capacity`.
pub struct LruDedup<K, V> {
    capacity: usize,
    target_rate: f64,
    entries: Mutex<IndexMap<K, Arc<V>>>,
    stats: Mutex<DedupStats>,
}

impl<K, V> LruDedup<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: usize, target_rate: f64) -> Self {
        LruDedup {
            capacity,
            target_rate,
            entries: Mutex::new(IndexMap::new()),
            stats: Mutex::new(DedupStats::default()),
        }
    }

    pub fn add(&self, key: K, make: impl FnOnce() -> V) -> Arc<V> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries.shift_remove(&key) {
            entries.insert(key, existing.clone());
            self.stats.lock().unwrap().hits += 1;
            return existing;
        }
        self.stats.lock().unwrap().misses += 1;
        if self.capacity > 0 && entries.len() >= self.capacity {
            entries.shift_remove_index(0);
        }
        let arc = Arc::new(make());
        entries.insert(key, arc.clone());
        arc
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reports current hit/miss counters, logging at `tracing::warn!` if
    /// the observed hit rate has fallen below `target_rate` (§4.1a).
    pub fn stats(&self) -> DedupStats {
        let stats = *self.stats.lock().unwrap();
        if stats.hits + stats.misses > 0 && stats.hit_rate() < self.target_rate {
            tracing::warn!(
                hit_rate = stats.hit_rate(),
                target_rate = self.target_rate,
                "LruDedup hit rate below target"
            );
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weak_dedup_returns_canonical_instance_while_alive() {
        let dedup: WeakDedup<u64, String> = WeakDedup::new();
        let a = dedup.add(1, || "hello".to_string());
        let b = dedup.add(1, || "world".to_string());
        assert!(Arc::ptr_eq(&a, &b));
        let stats = dedup.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn weak_dedup_reuses_key_once_dropped() {
        let dedup: WeakDedup<u64, String> = WeakDedup::new();
        {
            let _a = dedup.add(1, || "hello".to_string());
        }
        dedup.sweep();
        assert!(dedup.is_empty());
    }

    #[test]
    fn lru_dedup_evicts_oldest_at_capacity() {
        let dedup: LruDedup<u64, u64> = LruDedup::new(2, 0.5);
        let a = dedup.add(1, || 100);
        let _b = dedup.add(2, || 200);
        let _c = dedup.add(3, || 300);
        assert_eq!(dedup.len(), 2);
        // key 1 was least-recently-used and is gone; re-adding it misses.
        let a2 = dedup.add(1, || 999);
        assert!(!Arc::ptr_eq(&a, &a2));
    }

    #[test]
    fn lru_dedup_hit_refreshes_recency() {
        let dedup: LruDedup<u64, u64> = LruDedup::new(2, 0.5);
        dedup.add(1, || 100);
        dedup.add(2, || 200);
        dedup.add(1, || 999); // touch 1, making 2 the oldest
        dedup.add(3, || 300); // evicts 2, not 1
        let a = dedup.add(1, || 111);
        let stats_before = dedup.stats();
        let a2 = dedup.add(1, || 222);
        assert!(Arc::ptr_eq(&a, &a2));
        assert!(stats_before.hits > 0);
    }
}
