//! Signed JSON seed bootstrap (§3.1 lifecycle, §9 open-question resolution).
//!
//! Grounded on `examples/original_source/egpcommon/egpcommon/common.py`'s
//! `load_signed_json`: the seed ships as a JSON document plus a detached
//! SHA-256 signature file, so a corrupted or tampered seed is rejected
//! before any `TypesDef` is constructed from it.

use egp_common::{CommonError, Result, Signature};
use serde::Deserialize;

use crate::types_def::TypesDef;

#[derive(Debug, Deserialize)]
struct SeedFile {
    types: Vec<TypesDef>,
}

/// Verifies `detached_signature` is the SHA-256 of `json_bytes`, then parses
/// and returns the seed's type definitions.
///
/// Returns `CommonError::InvariantViolation` on a signature mismatch (the
/// seed is load-bearing for the entire lattice; a silent mismatch would
/// corrupt every downstream UID) and `CommonError::Json` on malformed JSON.
pub fn load_signed(json_bytes: &[u8], detached_signature: &Signature) -> Result<Vec<TypesDef>> {
    let computed = Signature::of(json_bytes);
    if &computed != detached_signature {
        return Err(CommonError::InvariantViolation(format!(
            "seed signature mismatch: expected {}, computed {}",
            detached_signature.to_hex(),
            computed.to_hex()
        )));
    }
    let seed: SeedFile = serde_json::from_slice(json_bytes)?;
    Ok(seed.types)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_signature_parses_seed() {
        let json = br#"{"types": []}"#;
        let sig = Signature::of(json);
        let types = load_signed(json, &sig).unwrap();
        assert!(types.is_empty());
    }

    #[test]
    fn tampered_seed_is_rejected() {
        let json = br#"{"types": []}"#;
        let sig = Signature::of(json);
        let tampered = br#"{"types": [], "extra": 1}"#;
        assert!(load_signed(tampered, &sig).is_err());
    }

    #[test]
    fn malformed_json_is_rejected() {
        let json = b"not json";
        let sig = Signature::of(json);
        assert!(load_signed(json, &sig).is_err());
    }
}
