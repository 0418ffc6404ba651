//! Content-address signatures (§3.5, §6.5).
//!
//! A signature is always exactly 32 bytes, the SHA-256 digest of a GC's
//! canonical serialisation. The all-zero signature is the canonical NULL,
//! used in place of `Option<Signature>` at the storage boundary so that the
//! "NULL = no reference" convention of §6.1 holds without an extra tag byte.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub const SIGNATURE_LEN: usize = 32;

/// A 32-byte SHA-256 content address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "serde_bytes")] [u8; SIGNATURE_LEN]);

impl Signature {
    pub const NULL: Signature = Signature([0u8; SIGNATURE_LEN]);

    pub fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Signature(bytes)
    }

    /// Compute the signature of arbitrary canonical bytes (the caller is
    /// responsible for producing a deterministic serialisation first).
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let digest = hasher.finalize();
        let mut out = [0u8; SIGNATURE_LEN];
        out.copy_from_slice(&digest);
        Signature(out)
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; SIGNATURE_LEN]
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex_decode(s)?;
        if bytes.len() != SIGNATURE_LEN {
            return None;
        }
        let mut out = [0u8; SIGNATURE_LEN];
        out.copy_from_slice(&bytes);
        Some(Signature(out))
    }
}

impl Default for Signature {
    fn default() -> Self {
        Signature::NULL
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_all_zero() {
        assert!(Signature::NULL.is_null());
        assert_eq!(Signature::NULL.as_bytes(), &[0u8; 32]);
    }

    #[test]
    fn hex_roundtrip() {
        let sig = Signature::of(b"hello world");
        let hex = sig.to_hex();
        assert_eq!(Signature::from_hex(&hex).unwrap(), sig);
    }

    #[test]
    fn distinct_content_distinct_signature() {
        assert_ne!(Signature::of(b"a"), Signature::of(b"b"));
    }
}
