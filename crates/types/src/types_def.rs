//! `TypesDef` — a type definition record (§3.1).
//!
//! Grounded on `examples/original_source/egpcommon/egpcommon/types_def.py`
//! and `egppy/.../types_def_db.py`: a `uid`/`name` primary-keyed record with
//! mutual parent/child lists and an EPT skeleton.

use egp_common::{is_length, is_printable_ascii, ImportDef, TypeUid};
use serde::{Deserialize, Serialize};

/// A globally unique type definition (§3.1).
///
/// `ept` holds this type's own canonical endpoint-type tuple: the first
/// element is always `uid` itself, and there are `1 + tt()` elements in
/// total — the remaining `tt()` slots are placeholders for the template's
/// element types, filled in when an EPT is synthesised from this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypesDef {
    pub uid: TypeUid,
    pub name: String,
    pub default: Option<String>,
    #[serde(default)]
    pub imports: Vec<ImportDef>,
    pub parents: Vec<String>,
    pub children: Vec<String>,
    /// `uid`s of the EPT skeleton for this shape (self first).
    pub ept: Vec<TypeUid>,
    pub abstract_type: bool,
}

impl TypesDef {
    pub fn new(uid: TypeUid, name: impl Into<String>) -> egp_common::Result<Self> {
        let name = name.into();
        is_length("name", &name, 1, 64)?;
        is_printable_ascii("name", &name)?;
        Ok(TypesDef {
            uid,
            name,
            default: None,
            imports: Vec::new(),
            parents: Vec::new(),
            children: Vec::new(),
            ept: vec![uid],
            abstract_type: false,
        })
    }

    /// Template arity. `0` ⇒ leaf shape, `>0` ⇒ template expecting that many
    /// element types (§3.1).
    pub fn tt(&self) -> u8 {
        self.uid.tt()
    }

    pub fn is_leaf(&self) -> bool {
        self.tt() == 0
    }

    /// `true` if `parents` is empty — the designated DAG root (§3.1).
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(xuid: u16) -> TypeUid {
        TypeUid::concrete(0, xuid).unwrap()
    }

    #[test]
    fn new_rejects_empty_name() {
        assert!(TypesDef::new(uid(1), "").is_err());
    }

    #[test]
    fn new_rejects_non_ascii_name() {
        assert!(TypesDef::new(uid(1), "café").is_err());
    }

    #[test]
    fn leaf_shape_has_single_element_ept() {
        let td = TypesDef::new(uid(1), "int").unwrap();
        assert!(td.is_leaf());
        assert_eq!(td.ept, vec![uid(1)]);
    }

    #[test]
    fn root_has_no_parents() {
        let td = TypesDef::new(uid(0), "object").unwrap();
        assert!(td.is_root());
    }
}
