//! Interned connection records (§3.4, §4.4).
//!
//! Grounded on `examples/original_source/egppy/egppy/genetic_code/connection.py`:
//! a connection is just a directed `(src_row, src_idx) -> (dst_row,
//! dst_idx)` edge, but like EPTs and Interfaces it is interned so that the
//! content-addressing of a CGraph can share identical edges across graphs
//! (§8 property 1: "Same for Interfaces and Connections").

use std::sync::Arc;

use dashmap::DashMap;
use egp_interface::{EndpointRef, Row};
use once_cell::sync::Lazy;
use xxhash_rust::xxh3::xxh3_64;

/// A directed edge from a source endpoint to a destination endpoint
/// (§3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    pub src: EndpointRef,
    pub dst: EndpointRef,
}

impl Connection {
    pub fn new(src_row: Row, src_idx: u8, dst_row: Row, dst_idx: u8) -> Self {
        Connection {
            src: EndpointRef::new(src_row, src_idx),
            dst: EndpointRef::new(dst_row, dst_idx),
        }
    }

    fn key(&self) -> u64 {
        let mut bytes = Vec::with_capacity(8);
        bytes.extend_from_slice(self.src.row.as_str().as_bytes());
        bytes.push(self.src.idx);
        bytes.extend_from_slice(self.dst.row.as_str().as_bytes());
        bytes.push(self.dst.idx);
        xxh3_64(&bytes)
    }
}

/// Thread-safe interning set of [`Connection`]s (§4.4, §5).
#[derive(Default)]
pub struct ConnectionStore {
    by_key: DashMap<u64, Arc<Connection>>,
}

impl ConnectionStore {
    pub fn new() -> Self {
        ConnectionStore::default()
    }

    pub fn add(&self, conn: Connection) -> Arc<Connection> {
        let key = conn.key();
        if let Some(existing) = self.by_key.get(&key) {
            return existing.clone();
        }
        let arc = Arc::new(conn);
        self.by_key.insert(key, arc.clone());
        arc
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Process-wide connection interner (§3.4, §5).
static GLOBAL: Lazy<ConnectionStore> = Lazy::new(ConnectionStore::new);

pub fn global() -> &'static ConnectionStore {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_connections_share_one_instance() {
        let store = ConnectionStore::new();
        let a = store.add(Connection::new(Row::Is, 0, Row::Od, 0));
        let b = store.add(Connection::new(Row::Is, 0, Row::Od, 0));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn distinct_connections_are_distinct() {
        let store = ConnectionStore::new();
        let a = store.add(Connection::new(Row::Is, 0, Row::Od, 0));
        let b = store.add(Connection::new(Row::Is, 1, Row::Od, 0));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 2);
    }
}
