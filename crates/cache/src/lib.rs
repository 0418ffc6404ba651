pub mod cache;
pub mod dedup;
pub mod l1;
pub mod l2;
pub mod store_layer;

pub use cache::{Cached, CacheStack};
pub use dedup::{DedupStats, LruDedup, WeakDedup};
pub use l1::DirtyCache;
pub use l2::LruCache;
pub use store_layer::{CacheBacking, MemoryStore};
