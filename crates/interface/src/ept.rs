//! Endpoint-Type Store (§3.2, §4.2): an interning set of immutable EPTs.
//!
//! Grounded on `examples/original_source/egppy/egppy/c_graph/end_point/end_point_type.py`
//! (`EPTStore`/`ObjectSet`): canonical instances are shared by content hash,
//! and the backing map is the same weak-value intern technique the original
//! uses for its object pool.

use std::sync::Arc;

use dashmap::DashMap;
use egp_common::{CommonError, Result, TypeUid};
use egp_types::{Registry, TypesDef};
use xxhash_rust::xxh3::xxh3_64;

/// An immutable, interned endpoint-type tuple `(t0, t1, ..., tn)` (§3.2).
///
/// `t0` is the head shape; `t1..tn` are its template arguments. For a leaf
/// type (`t0.tt() == 0`) the tuple has exactly one element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ept {
    uids: Vec<TypeUid>,
}

impl Ept {
    pub fn head(&self) -> TypeUid {
        self.uids[0]
    }

    pub fn args(&self) -> &[TypeUid] {
        &self.uids[1..]
    }

    pub fn uids(&self) -> &[TypeUid] {
        &self.uids
    }

    /// Compact content-derived key for this tuple (§3.2: "a derived UID used
    /// as a compact key").
    pub fn derived_key(&self) -> u64 {
        derived_key(&self.uids)
    }

    /// `true` if `self` is ancestor-of-or-equal-to `other` (§3.4 invariant
    /// 3: "the source EPT is an ancestor of, or identical to, the
    /// destination EPT"). Compares heads via the Type Registry's DAG, then
    /// recurses pairwise over template arguments so a compound covariant
    /// match (e.g. `list[int]` feeding a `list[object]` destination) is
    /// recognised, not just an exact-tuple match.
    pub fn is_ancestor_or_equal(&self, other: &Ept, registry: &Registry) -> Result<bool> {
        if self == other {
            return Ok(true);
        }
        if self.head() != other.head() {
            let ancestors = registry.ancestors(other.head())?;
            if !ancestors.contains(&self.head()) {
                return Ok(false);
            }
        }
        if self.args().len() != other.args().len() {
            return Ok(false);
        }
        for (a, b) in self.args().iter().zip(other.args()) {
            if a != b {
                let ancestors = registry.ancestors(*b)?;
                if !ancestors.contains(a) {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Shallowest ancestor depth between `self` (as ancestor) and `other`'s
    /// head type, or `None` if `self` is not an ancestor (used for
    /// stabilisation's tie-break, §4.4).
    pub fn ancestor_depth(&self, other: &Ept, registry: &Registry) -> Result<Option<u32>> {
        registry.ancestor_depth(other.head(), self.head())
    }

    /// Canonical string form, e.g. `dict[str, list[int]]` (§3.2).
    pub fn to_canonical_string(&self, registry: &Registry) -> Result<String> {
        let head = registry.get_by_uid(self.head())?;
        if self.args().is_empty() {
            return Ok(head.name.clone());
        }
        let mut parts = Vec::with_capacity(self.args().len());
        for uid in self.args() {
            parts.push(registry.get_by_uid(*uid)?.name);
        }
        Ok(format!("{}[{}]", head.name, parts.join(", ")))
    }
}

fn derived_key(uids: &[TypeUid]) -> u64 {
    let mut bytes = Vec::with_capacity(uids.len() * 4);
    for uid in uids {
        bytes.extend_from_slice(&uid.raw().to_le_bytes());
    }
    xxh3_64(&bytes)
}

/// Thread-safe interning set of [`Ept`]s (§4.2, §5).
#[derive(Default)]
pub struct EptStore {
    by_key: DashMap<u64, Arc<Ept>>,
}

impl EptStore {
    pub fn new() -> Self {
        EptStore::default()
    }

    /// Interns `uids` as an EPT, returning the canonical shared instance.
    ///
    /// Validates that the head's template arity matches the number of
    /// tail elements; each tail element is itself a uid of an already
    /// validated `TypesDef` (recursive compound shapes are validated at the
    /// point they were synthesised by the Type Registry, so no further
    /// recursion is needed here).
    pub fn add(&self, uids: Vec<TypeUid>, registry: &Registry) -> Result<Arc<Ept>> {
        if uids.is_empty() {
            return Err(CommonError::InvariantViolation(
                "EPT must have at least one element".into(),
            ));
        }
        let head: TypesDef = registry.get_by_uid(uids[0])?;
        let expected_tail = head.tt() as usize;
        if uids.len() - 1 != expected_tail {
            return Err(CommonError::InvariantViolation(format!(
                "EPT head {:?} expects {} arguments, got {}",
                head.name,
                expected_tail,
                uids.len() - 1
            )));
        }
        let key = derived_key(&uids);
        if let Some(existing) = self.by_key.get(&key) {
            return Ok(existing.clone());
        }
        let ept = Arc::new(Ept { uids });
        self.by_key.insert(key, ept.clone());
        Ok(ept)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_registry() -> Registry {
        let reg = Registry::new();
        reg.load(vec![
            td(0, "object", vec![]),
            td(1, "int", vec!["object".into()]),
            td_template(2, "list", 1, vec!["object".into()]),
        ])
        .unwrap();
        reg
    }

    fn td(xuid: u16, name: &str, parents: Vec<String>) -> TypesDef {
        let uid = TypeUid::concrete(0, xuid).unwrap();
        TypesDef {
            uid,
            name: name.to_string(),
            default: None,
            imports: Vec::new(),
            parents,
            children: Vec::new(),
            ept: vec![uid],
            abstract_type: false,
        }
    }

    fn td_template(xuid: u16, name: &str, tt: u8, parents: Vec<String>) -> TypesDef {
        let uid = TypeUid::template(tt, xuid).unwrap();
        TypesDef {
            uid,
            name: name.to_string(),
            default: None,
            imports: Vec::new(),
            parents,
            children: Vec::new(),
            ept: vec![uid],
            abstract_type: false,
        }
    }

    #[test]
    fn equal_tuples_share_one_instance() {
        let reg = seeded_registry();
        let store = EptStore::new();
        let int_uid = reg.get_by_name("int").unwrap().uid;
        let a = store.add(vec![int_uid], &reg).unwrap();
        let b = store.add(vec![int_uid], &reg).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let reg = seeded_registry();
        let store = EptStore::new();
        let list_uid = reg.get_by_name("list").unwrap().uid;
        assert!(store.add(vec![list_uid], &reg).is_err());
    }

    #[test]
    fn ancestor_or_equal_holds_across_dag() {
        let reg = seeded_registry();
        let store = EptStore::new();
        let object_uid = reg.get_by_name("object").unwrap().uid;
        let int_uid = reg.get_by_name("int").unwrap().uid;
        let object_ept = store.add(vec![object_uid], &reg).unwrap();
        let int_ept = store.add(vec![int_uid], &reg).unwrap();
        assert!(object_ept.is_ancestor_or_equal(&int_ept, &reg).unwrap());
        assert!(!int_ept.is_ancestor_or_equal(&object_ept, &reg).unwrap());
        assert!(int_ept.is_ancestor_or_equal(&int_ept, &reg).unwrap());
    }

    #[test]
    fn canonical_string_renders_template() {
        let reg = seeded_registry();
        let store = EptStore::new();
        let list_uid = reg.get_by_name("list").unwrap().uid;
        let int_uid = reg.get_by_name("int").unwrap().uid;
        let ept = store.add(vec![list_uid, int_uid], &reg).unwrap();
        assert_eq!(ept.to_canonical_string(&reg).unwrap(), "list[int]");
    }
}
