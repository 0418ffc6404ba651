//! L1 "dirty" cache layer (§4.7): coalesces writes in a hot loop and
//! writes them back en masse. No automatic eviction or writeback; the
//! owner calls [`DirtyCache::copyback`]/[`DirtyCache::copythrough`]
//! explicitly.
//!
//! Grounded on `examples/original_source/egppy/egppy/storage/cache/cache_mixin.py`'s
//! `DictCache` flavour.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use egp_common::Cacheable;

use crate::store_layer::CacheBacking;

pub struct DirtyCache<K, V> {
    max_items: usize,
    entries: Mutex<HashMap<K, V>>,
    next: Arc<dyn CacheBacking<K, V>>,
}

impl<K, V> DirtyCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Cacheable + Clone + Send + Sync,
{
    /// `max_items == 0` means unbounded (§4.7 table).
    pub fn new(max_items: usize, next: Arc<dyn CacheBacking<K, V>>) -> Self {
        DirtyCache {
            max_items,
            entries: Mutex::new(HashMap::new()),
            next,
        }
    }

    /// On a miss, reads through `next`, reflavors the value (marks it
    /// clean so L1's own dirty state starts fresh rather than leaking the
    /// lower layer's), and stores it. `touch` runs on every hit (§4.7).
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
        self.entries.lock().unwrap().insert(key.clone(), reflavored.clone());
        Some(reflavored)
    }

    pub fn set(&self, key: K, mut value: V) {
        value.mark_dirty();
        value.touch();
        self.entries.lock().unwrap().insert(key, value);
    }

    /// Writes every dirty item to `next` and marks it clean in L1 (§4.7).
    /// Does not remove entries from L1.
    pub fn copyback(&self) {
        let mut entries = self.entries.lock().unwrap();
        for (k, v) in entries.iter_mut() {
            if v.is_dirty() {
                v.mark_clean();
                self.next.backing_set(k.clone(), v.clone());
            }
        }
    }

    /// `copyback` plus recursing into `next` if it is itself a cache
    /// (§4.7).
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

    pub fn max_items(&self) -> usize {
        self.max_items
    }
}

impl<K, V> CacheBacking<K, V> for DirtyCache<K, V>
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

    #[test]
    fn set_then_copyback_writes_through() {
        let store: Arc<MemoryStore<u64, Item>> = Arc::new(MemoryStore::new());
        let l1: DirtyCache<u64, Item> = DirtyCache::new(0, store.clone());
        l1.set(1, Item::new(100));
        assert!(store.backing_get(&1).is_none());
        l1.copyback();
        assert_eq!(store.backing_get(&1).unwrap().value, 100);
    }

    #[test]
    fn read_through_miss_reflavors_as_clean() {
        let store: Arc<MemoryStore<u64, Item>> = Arc::new(MemoryStore::new());
        store.backing_set(1, Item::new(7));
        let l1: DirtyCache<u64, Item> = DirtyCache::new(0, store);
        let got = l1.get(&1).unwrap();
        assert_eq!(got.value, 7);
        assert!(!got.is_dirty());
    }

    #[test]
    fn flush_clears_after_writing_back() {
        let store: Arc<MemoryStore<u64, Item>> = Arc::new(MemoryStore::new());
        let l1: DirtyCache<u64, Item> = DirtyCache::new(0, store.clone());
        l1.set(1, Item::new(5));
        l1.flush();
        assert!(l1.is_empty());
        assert_eq!(store.backing_get(&1).unwrap().value, 5);
    }
}
