//! Cache hierarchy facade (§4.7): wires L1 "dirty" over L2 "LRU" over an
//! in-memory Store into the three-layer stack a worker boots for cached
//! Type Registry entries, Interfaces, and Genetic Codes.

use std::hash::Hash;
use std::sync::Arc;

use egp_common::{Cacheable, DirtyState};

use crate::l1::DirtyCache;
use crate::l2::LruCache;
use crate::store_layer::{CacheBacking, MemoryStore};

/// Wraps a plain value with the dirty-bit/seq-number state the cache
/// hierarchy requires, for payload types that do not already implement
/// `Cacheable` (Interfaces, CGraphs, and GeneticCodes do, and can be
/// cached directly without this wrapper).
#[derive(Debug, Clone)]
pub struct Cached<T> {
    pub value: T,
    state: DirtyState,
}

impl<T> Cached<T> {
    pub fn new(value: T) -> Self {
        Cached {
            value,
            state: DirtyState::new(),
        }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Cacheable for Cached<T> {
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

impl<T> std::ops::Deref for Cached<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> std::ops::DerefMut for Cached<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

/// `L1 → L2 → Store` (§4.7's three-row table).
pub struct CacheStack<K, V> {
    pub l1: Arc<DirtyCache<K, V>>,
    pub l2: Arc<LruCache<K, V>>,
    pub store: Arc<MemoryStore<K, V>>,
}

impl<K, V> CacheStack<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Cacheable + Clone + Send + Sync + 'static,
{
    pub fn new(l1_max: usize, l2_max: usize, l2_purge: usize) -> Self {
        let store: Arc<MemoryStore<K, V>> = Arc::new(MemoryStore::new());
        let l2: Arc<LruCache<K, V>> = Arc::new(LruCache::new(l2_max, l2_purge, store.clone()));
        let l1: Arc<DirtyCache<K, V>> = Arc::new(DirtyCache::new(l1_max, l2.clone()));
        CacheStack { l1, l2, store }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.l1.get(key)
    }

    pub fn set(&self, key: K, value: V) {
        self.l1.set(key, value)
    }

    /// Writes every dirty key through the whole stack to the store
    /// (§8 property 6: "cache write-through").
    pub fn copythrough(&self) {
        self.l1.copythrough();
    }
}
