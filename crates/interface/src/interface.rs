//! Interface Store and frozen `Interface`/`Endpoint` records (§3.3, §4.3,
//! component C).
//!
//! Grounded on `examples/original_source/egppy/egppy/c_graph/interface.py`
//! and `gc_graph/interface_abc.py`: an ordered sequence of endpoints sharing
//! one `row`/`class`, interned by content once frozen. The owning-row /
//! owning-endpoint cyclic relationship from the original is flattened to
//! `(row, idx)` pairs per §9's arena-of-indices guidance rather than
//! pointers, so `EndpointRef` is plain data and `Interface` owns its
//! endpoints in a `Vec`.

use std::sync::Arc;

use dashmap::DashMap;
use egp_common::{Cacheable, CommonError, DirtyState, Freezable, Result};
use egp_types::Registry;
use xxhash_rust::xxh3::xxh3_64;

use crate::ept::Ept;
use crate::row::{EndpointClass, Row};

/// A reference from a destination endpoint to the source endpoint that
/// feeds it, or (post-stabilisation, on `Ud`) from a mirrored destination
/// back to its dangling source (§3.3, §3.4 invariant 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct EndpointRef {
    pub row: Row,
    pub idx: u8,
}

impl EndpointRef {
    pub fn new(row: Row, idx: u8) -> Self {
        EndpointRef { row, idx }
    }
}

/// One element of an [`Interface`] (§3.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub row: Row,
    pub idx: u8,
    pub class: EndpointClass,
    pub typ: Arc<Ept>,
    pub refs: Vec<EndpointRef>,
}

impl Endpoint {
    pub fn is_unconnected(&self) -> bool {
        self.refs.is_empty()
    }
}

/// An ordered, 0-255-length sequence of endpoints sharing one row and class
/// (§3.3). Mutable until [`Interface::freeze`]; frozen interfaces are safe
/// to share across threads and participate in content addressing.
#[derive(Debug, Clone)]
pub struct Interface {
    endpoints: Vec<Endpoint>,
    row: Row,
    class: EndpointClass,
    state: DirtyState,
    frozen: bool,
    hash: Option<u64>,
}

pub const MAX_INTERFACE_LEN: usize = 256;

impl Interface {
    /// Builds a fresh, unconnected interface from a sequence of already
    /// interned EPTs (§4.3: "a list of EPTs").
    pub fn from_epts(row: Row, class: EndpointClass, epts: Vec<Arc<Ept>>) -> Result<Self> {
        if epts.len() > MAX_INTERFACE_LEN {
            return Err(CommonError::InvariantViolation(format!(
                "interface length {} exceeds {MAX_INTERFACE_LEN}",
                epts.len()
            )));
        }
        let endpoints = epts
            .into_iter()
            .enumerate()
            .map(|(idx, typ)| Endpoint {
                row,
                idx: idx as u8,
                class,
                typ,
                refs: Vec::new(),
            })
            .collect();
        Ok(Interface {
            endpoints,
            row,
            class,
            state: DirtyState::new(),
            frozen: false,
            hash: None,
        })
    }

    /// Rebuilds an interface from endpoint records, e.g. when deserialising
    /// a stored CGraph (§4.3: "a list of endpoint records"). Validates the
    /// frozen-interface invariants of §3.3 up front.
    pub fn from_endpoints(endpoints: Vec<Endpoint>) -> Result<Self> {
        if endpoints.len() > MAX_INTERFACE_LEN {
            return Err(CommonError::InvariantViolation(format!(
                "interface length {} exceeds {MAX_INTERFACE_LEN}",
                endpoints.len()
            )));
        }
        let Some(first) = endpoints.first() else {
            return Err(CommonError::InvariantViolation(
                "interface must have at least one row/class to rebuild from".into(),
            ));
        };
        let row = first.row;
        let class = first.class;
        for (i, ep) in endpoints.iter().enumerate() {
            if ep.row != row || ep.class != class {
                return Err(CommonError::InvariantViolation(
                    "all endpoints of an interface must share row and class".into(),
                ));
            }
            if ep.idx as usize != i {
                return Err(CommonError::InvariantViolation(format!(
                    "endpoint {i} has idx {}, expected {i}",
                    ep.idx
                )));
            }
        }
        Ok(Interface {
            endpoints,
            row,
            class,
            state: DirtyState::new(),
            frozen: false,
            hash: None,
        })
    }

    pub fn row(&self) -> Row {
        self.row
    }

    pub fn class(&self) -> EndpointClass {
        self.class
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn endpoint(&self, idx: u8) -> Option<&Endpoint> {
        self.endpoints.get(idx as usize)
    }

    fn assert_mutable(&self) -> Result<()> {
        if self.frozen {
            return Err(CommonError::InvariantViolation(
                "cannot mutate a frozen interface".into(),
            ));
        }
        Ok(())
    }

    /// Appends a fresh, unconnected endpoint of type `typ`, returning its
    /// new index. Used by stabilisation when a destination needs a source
    /// row widened (§4.4 step 3, "appending is allowed").
    pub fn append(&mut self, typ: Arc<Ept>) -> Result<u8> {
        self.assert_mutable()?;
        if self.endpoints.len() >= MAX_INTERFACE_LEN {
            return Err(CommonError::InvariantViolation(format!(
                "interface length would exceed {MAX_INTERFACE_LEN}"
            )));
        }
        let idx = self.endpoints.len() as u8;
        self.endpoints.push(Endpoint {
            row: self.row,
            idx,
            class: self.class,
            typ,
            refs: Vec::new(),
        });
        self.state.mark_dirty();
        Ok(idx)
    }

    /// Sets the reference list of endpoint `idx` (§4.4's wiring steps).
    pub fn set_refs(&mut self, idx: u8, refs: Vec<EndpointRef>) -> Result<()> {
        self.assert_mutable()?;
        let ep = self
            .endpoints
            .get_mut(idx as usize)
            .ok_or_else(|| CommonError::NotFound(format!("endpoint index {idx} out of range")))?;
        ep.refs = refs;
        self.state.mark_dirty();
        Ok(())
    }

    pub fn push_ref(&mut self, idx: u8, r: EndpointRef) -> Result<()> {
        self.assert_mutable()?;
        let ep = self
            .endpoints
            .get_mut(idx as usize)
            .ok_or_else(|| CommonError::NotFound(format!("endpoint index {idx} out of range")))?;
        ep.refs.push(r);
        self.state.mark_dirty();
        Ok(())
    }

    /// Flat list of the UIDs occupying each endpoint's head type, order
    /// preserved (§4.3: "used for DB queries").
    pub fn to_td_uids(&self) -> Vec<egp_common::TypeUid> {
        self.endpoints.iter().map(|e| e.typ.head()).collect()
    }

    /// `(sorted_unique_uids, index_bytes)` — the compact `(int[], bytea)`
    /// storage encoding of §6.1's `input_types`/`inputs` columns.
    pub fn types_and_indices(&self) -> (Vec<egp_common::TypeUid>, Vec<u8>) {
        let mut sorted: Vec<egp_common::TypeUid> = self.to_td_uids();
        sorted.sort_by_key(|u| u.raw());
        sorted.dedup();
        let indices = self
            .endpoints
            .iter()
            .map(|e| {
                sorted
                    .binary_search_by_key(&e.typ.head().raw(), |u| u.raw())
                    .expect("endpoint type must be present in its own sorted set") as u8
            })
            .collect();
        (sorted, indices)
    }

    /// Deterministic ordered-unique UIDs used as an "interface shape" hash
    /// (§4.3): interfaces that differ only in endpoint order share a key.
    pub fn sorted_unique_td_uids(&self) -> Vec<egp_common::TypeUid> {
        let (sorted, _) = self.types_and_indices();
        sorted
    }

    /// Indices of endpoints with no references (§4.3).
    pub fn unconnected_eps(&self) -> Vec<u8> {
        self.endpoints
            .iter()
            .filter(|e| e.is_unconnected())
            .map(|e| e.idx)
            .collect()
    }

    /// Concatenates `self` then `other`, renumbering indices. Only permitted
    /// between interfaces sharing row and class (§4.3).
    pub fn concat(&self, other: &Interface) -> Result<Interface> {
        if self.row != other.row || self.class != other.class {
            return Err(CommonError::InvariantViolation(
                "interface addition requires matching row and class".into(),
            ));
        }
        if self.endpoints.len() + other.endpoints.len() > MAX_INTERFACE_LEN {
            return Err(CommonError::InvariantViolation(format!(
                "concatenated interface would exceed {MAX_INTERFACE_LEN}"
            )));
        }
        let mut endpoints = Vec::with_capacity(self.endpoints.len() + other.endpoints.len());
        endpoints.extend(self.endpoints.iter().cloned());
        let offset = self.endpoints.len() as u8;
        for ep in &other.endpoints {
            endpoints.push(Endpoint {
                row: ep.row,
                idx: ep.idx + offset,
                class: ep.class,
                typ: ep.typ.clone(),
                refs: ep.refs.clone(),
            });
        }
        Interface::from_endpoints(endpoints)
    }

    /// Freezes the interface, computing its persistent content hash (§3.3,
    /// §4.3). Idempotent.
    pub fn freeze_computed(&mut self) {
        if self.frozen {
            return;
        }
        self.frozen = true;
        self.hash = Some(self.content_hash());
        self.state.mark_clean();
    }

    fn content_hash(&self) -> u64 {
        let mut bytes = Vec::new();
        bytes.push(self.class as u8 as u8);
        bytes.extend_from_slice(self.row.as_str().as_bytes());
        for ep in &self.endpoints {
            for uid in ep.typ.uids() {
                bytes.extend_from_slice(&uid.raw().to_le_bytes());
            }
            for r in &ep.refs {
                bytes.extend_from_slice(r.row.as_str().as_bytes());
                bytes.push(r.idx);
            }
            bytes.push(0xff);
        }
        xxh3_64(&bytes)
    }

    pub fn content_hash_value(&self) -> Option<u64> {
        self.hash
    }
}

impl Cacheable for Interface {
    fn is_dirty(&self) -> bool {
        self.state.is_dirty()
    }

    fn mark_dirty(&mut self) {
        self.state.mark_dirty();
    }

    fn mark_clean(&mut self) {
        self.state.mark_clean();
    }

    fn seq_num(&self) -> i64 {
        self.state.seq_num()
    }

    fn touch(&mut self) {
        self.state.touch();
    }

    fn verify(&self) -> bool {
        for (i, ep) in self.endpoints.iter().enumerate() {
            if ep.row != self.row || ep.class != self.class || ep.idx as usize != i {
                return false;
            }
        }
        self.endpoints.len() <= MAX_INTERFACE_LEN
    }
}

impl Freezable for Interface {
    fn freeze(&mut self) {
        self.freeze_computed();
    }

    fn is_frozen(&self) -> bool {
        self.frozen
    }
}

impl PartialEq for Interface {
    fn eq(&self, other: &Self) -> bool {
        self.row == other.row && self.class == other.class && self.endpoints == other.endpoints
    }
}
impl Eq for Interface {}

/// Thread-safe interning set of frozen [`Interface`]s (§4.3, §5).
///
/// Mirrors [`crate::ept::EptStore`]'s content-hash-keyed sharing: two
/// interfaces built independently from the same row/class/types/refs are
/// the same `Arc` (§8 property 1).
#[derive(Default)]
pub struct InterfaceStore {
    by_key: DashMap<u64, Arc<Interface>>,
}

impl InterfaceStore {
    pub fn new() -> Self {
        InterfaceStore::default()
    }

    /// Interns a freshly built, unconnected interface from a list of EPTs
    /// (§4.3's first construction path).
    pub fn intern_types(
        &self,
        row: Row,
        class: EndpointClass,
        epts: Vec<Arc<Ept>>,
    ) -> Result<Arc<Interface>> {
        let mut iface = Interface::from_epts(row, class, epts)?;
        iface.freeze_computed();
        self.intern(iface)
    }

    /// Interns an interface rebuilt from endpoint records (§4.3's third
    /// construction path, used when loading a CGraph from JSON).
    pub fn intern_endpoints(&self, endpoints: Vec<Endpoint>) -> Result<Arc<Interface>> {
        let mut iface = Interface::from_endpoints(endpoints)?;
        iface.freeze_computed();
        self.intern(iface)
    }

    fn intern(&self, iface: Interface) -> Result<Arc<Interface>> {
        let key = iface
            .content_hash_value()
            .expect("interface must be frozen before interning");
        if let Some(existing) = self.by_key.get(&key) {
            return Ok(existing.clone());
        }
        let arc = Arc::new(iface);
        self.by_key.insert(key, arc.clone());
        Ok(arc)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
