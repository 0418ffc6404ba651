//! L2 "LRU" cache layer (§4.7): the main working set, bounded by
//! `max_items` and evicting `purge_count` items at a time in ascending
//! `seq_num` order.
//!
//! Grounded on `examples/original_source/egppy/egppy/storage/cache/cache_mixin.py`'s
//! LRU flavour and `cache_abc.py`'s `purge`/`copyback`/`copythrough`
//! contract.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use egp_common::Cacheable;

use crate::store_layer::CacheBacking;

pub struct LruCache<K, V> {
    max_items: usize,
    purge_count: usize,
    entries: Mutex<HashMap<K, V>>,
    next: Arc<dyn CacheBacking<K, V>>,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Cacheable + Clone + Send + Sync,
{
    pub fn new(max_items: usize, purge_count: usize, next: Arc<dyn CacheBacking<K, V>>) -> Self {
        LruCache {
            max_items,
            purge_count,
            entries: Mutex::new(HashMap::new()),
            next,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        {
            let mut entries = self.entries.lock().unwrap();
            if let Some(v) = entries.get_mut(key) {
                v.touch();
                return Some(v.clone());
            }
        }
        let mut reflavored = self.next.backing_get(key)?;
        reflavored.mark_clean();
        reflavored.touch();
        self.insert_with_purge_check(key.clone(), reflavored.clone());
        Some(reflavored)
    }

    pub fn set(&self, key: K, mut value: V) {
        value.mark_dirty();
        value.touch();
        self.insert_with_purge_check(key, value);
    }

    /// A purge-check runs before every write; insertion of a genuinely new
    /// key at capacity triggers `purge(purge_count)` first (§4.7: "Write:
    /// set(key, value) runs a purge-check first").
    fn insert_with_purge_check(&self, key: K, value: V) {
        let needs_purge = {
            let entries = self.entries.lock().unwrap();
            self.max_items > 0 && entries.len() >= self.max_items && !entries.contains_key(&key)
        };
        if needs_purge {
            self.purge(self.purge_count.max(1));
        }
        self.entries.lock().unwrap().insert(key, value);
    }

    /// Evicts the `n` items with the smallest `seq_num`, writing dirty
    /// ones to `next` first. `n >= len` degenerates to [`LruCache::flush`]
    /// (§4.7).
    pub fn purge(&self, n: usize) {
        let mut entries = self.entries.lock().unwrap();
        if n >= entries.len() {
            for (k, v) in entries.iter() {
                if v.is_dirty() {
                    self.next.backing_set(k.clone(), v.clone());
                }
            }
            entries.clear();
            return;
        }
        let mut by_seq: Vec<(K, i64)> =
            entries.iter().map(|(k, v)| (k.clone(), v.seq_num())).collect();
        by_seq.sort_by_key(|(_, seq)| *seq);
        for (k, _) in by_seq.into_iter().take(n) {
            if let Some(v) = entries.get(&k) {
                if v.is_dirty() {
                    self.next.backing_set(k.clone(), v.clone());
                }
            }
            entries.remove(&k);
        }
    }

    pub fn copyback(&self) {
        let mut entries = self.entries.lock().unwrap();
        for (k, v) in entries.iter_mut() {
            if v.is_dirty() {
                v.mark_clean();
                self.next.backing_set(k.clone(), v.clone());
            }
        }
    }

    pub fn copythrough(&self) {
        self.copyback();
        self.next.backing_copythrough();
    }

    pub fn flush(&self) {
        self.copyback();
        self.entries.lock().unwrap().clear();
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

impl<K, V> CacheBacking<K, V> for LruCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Cacheable + Clone + Send + Sync,
{
    fn backing_get(&self, key: &K) -> Option<V> {
        self.get(key)
    }

    fn backing_set(&self, key: K, value: V) {
        self.set(key, value)
    }

    fn backing_copythrough(&self) {
        self.copythrough()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store_layer::MemoryStore;
    use egp_common::DirtyState;

    #[derive(Debug, Clone)]
    struct Item {
        value: u64,
        state: DirtyState,
    }

    impl Item {
        fn new(value: u64) -> Self {
            Item {
                value,
                state: DirtyState::new(),
            }
        }
    }

    impl Cacheable for Item {
        fn is_dirty(&self) -> bool {
            self.state.is_dirty()
        }
        fn mark_dirty(&mut self) {
            self.state.mark_dirty()
        }
        fn mark_clean(&mut self) {
            self.state.mark_clean()
        }
        fn seq_num(&self) -> i64 {
            self.state.seq_num()
        }
        fn touch(&mut self) {
            self.state.touch()
        }
    }

    /// §8 property 7 — LRU fairness.
    #[test]
    fn property_7_lru_fairness() {
        let store: Arc<MemoryStore<u64, Item>> = Arc::new(MemoryStore::new());
        let l2: LruCache<u64, Item> = LruCache::new(4, 2, store.clone());
        for k in 1..=5u64 {
            l2.set(k, Item::new(k * 10));
        }
        // capacity 4 < 5 distinct keys, so at least one purge occurred.
        assert_eq!(store.len() + l2.len(), 5);
        assert!(store.len() >= 1);
    }

    /// §8 scenario S6 — LRU purge on read path.
    #[test]
    fn s6_lru_purge_on_read_path() {
        let store: Arc<MemoryStore<u64, Item>> = Arc::new(MemoryStore::new());
        let l2: LruCache<u64, Item> = LruCache::new(4, 2, store.clone());
        for k in 1..=5u64 {
            l2.set(k, Item::new(k * 10));
        }
        // Writing 5 distinct keys at capacity 4/purge 2: after the 5th
        // write, a purge evicted the two oldest (1, 2) to the store,
        // leaving {3,4,5} in L2.
        assert_eq!(l2.len(), 3);
        assert_eq!(store.len(), 2);

        // Reading the now-evicted key 1 pulls it back through L2,
        // forcing another purge (capacity 4, currently at 3 -> would be 4
        // after insert, so no purge needed yet for this one read).
        let got = l2.get(&1);
        assert!(got.is_some());
        assert!(l2.contains_key(&1));
    }

    #[test]
    fn property_6_copythrough_clears_dirty_everywhere() {
        let store: Arc<MemoryStore<u64, Item>> = Arc::new(MemoryStore::new());
        let l2: LruCache<u64, Item> = LruCache::new(0, 1, store.clone());
        l2.set(1, Item::new(42));
        assert!(l2.get(&1).unwrap().is_dirty());
        l2.copythrough();
        assert_eq!(store.backing_get(&1).unwrap().value, 42);
        assert!(!store.backing_get(&1).unwrap().is_dirty());
        assert!(!l2.get(&1).unwrap().is_dirty());
    }
}
