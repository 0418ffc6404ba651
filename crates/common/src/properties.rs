//! Genetic Code properties bitfield (§6.3).
//!
//! Hand-rolled against the documented bit table rather than porting the
//! original's generic `bitdict` DSL: the field layout here is fixed and
//! small, so a bitfield builder abstraction would be speculative generality
//! for a single 64-bit word.

use crate::error::{CommonError, Result};

/// `gc_type` (bits 0-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcType {
    Codon = 0,
    Ordinary = 1,
}

impl GcType {
    fn from_bits(bits: u64) -> Result<Self> {
        match bits {
            0 => Ok(GcType::Codon),
            1 => Ok(GcType::Ordinary),
            other => Err(CommonError::Encoding(format!(
                "reserved gc_type value {other}"
            ))),
        }
    }
}

/// `graph_type` (bits 2-5), per §3.4's `graph_type` enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphType {
    Primitive,
    Standard,
    IfThen,
    IfThenElse,
    ForLoop,
    WhileLoop,
    Empty,
}

impl GraphType {
    fn to_bits(self) -> u64 {
        match self {
            GraphType::IfThen => 0,
            GraphType::IfThenElse => 1,
            GraphType::Empty => 2,
            GraphType::ForLoop => 3,
            GraphType::WhileLoop => 4,
            GraphType::Standard => 5,
            GraphType::Primitive => 6,
        }
    }

    fn from_bits(bits: u64) -> Result<Self> {
        match bits {
            0 => Ok(GraphType::IfThen),
            1 => Ok(GraphType::IfThenElse),
            2 => Ok(GraphType::Empty),
            3 => Ok(GraphType::ForLoop),
            4 => Ok(GraphType::WhileLoop),
            5 => Ok(GraphType::Standard),
            6 => Ok(GraphType::Primitive),
            other => Err(CommonError::Encoding(format!(
                "reserved graph_type value {other}"
            ))),
        }
    }
}

/// GC-type-specific sub-field occupying bits 16-23 (§6.3's `gctsp`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeSpecific {
    /// CODON only: eligible for symbolic-regression simplification.
    pub simplification: bool,
    /// ORDINARY only: the output type is a literal.
    pub literal: bool,
}

/// Decoded genetic-code properties (§6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Properties {
    pub gc_type: GcType,
    pub graph_type: GraphType,
    pub constant: bool,
    pub deterministic: bool,
    pub abstract_type: bool,
    pub side_effects: bool,
    pub static_creation: bool,
    pub type_specific: TypeSpecific,
}

impl Properties {
    /// Verify invariants enforced by `verify` (§6.3):
    /// - `constant ⇒ deterministic`
    /// - `gc_type == CODON ∧ graph_type == EMPTY` is illegal.
    pub fn verify(&self) -> bool {
        if self.constant && !self.deterministic {
            return false;
        }
        if matches!(self.gc_type, GcType::Codon) && matches!(self.graph_type, GraphType::Empty) {
            return false;
        }
        true
    }

    /// Encode to the little-endian 64-bit packed representation (§6.3).
    pub fn encode(&self) -> u64 {
        let mut bits: u64 = 0;
        bits |= (self.gc_type as u64) & 0b11;
        bits |= (self.graph_type.to_bits() & 0b1111) << 2;
        bits |= (self.constant as u64) << 8;
        bits |= (self.deterministic as u64) << 9;
        bits |= (self.abstract_type as u64) << 10;
        bits |= (self.side_effects as u64) << 11;
        bits |= (self.static_creation as u64) << 12;
        let gctsp = match self.gc_type {
            GcType::Codon => self.type_specific.simplification as u64,
            GcType::Ordinary => self.type_specific.literal as u64,
        };
        bits |= gctsp << 16;
        bits
    }

    /// Decode from the packed representation, enforcing reserved-bits-zero
    /// and the `verify()` invariants.
    pub fn decode(bits: u64) -> Result<Self> {
        let reserved_6_7 = (bits >> 6) & 0b11;
        let reserved_13_15 = (bits >> 13) & 0b111;
        let reserved_24_63 = bits >> 24;
        if reserved_6_7 != 0 || reserved_13_15 != 0 || reserved_24_63 != 0 {
            return Err(CommonError::Encoding(
                "reserved bits must be zero in properties bitfield".into(),
            ));
        }

        let gc_type = GcType::from_bits(bits & 0b11)?;
        let graph_type = GraphType::from_bits((bits >> 2) & 0b1111)?;
        let gctsp_bit = ((bits >> 16) & 0xff) & 0b1 != 0;
        let type_specific = match gc_type {
            GcType::Codon => TypeSpecific {
                simplification: gctsp_bit,
                literal: false,
            },
            GcType::Ordinary => TypeSpecific {
                simplification: false,
                literal: gctsp_bit,
            },
        };

        let properties = Properties {
            gc_type,
            graph_type,
            constant: (bits >> 8) & 1 != 0,
            deterministic: (bits >> 9) & 1 != 0,
            abstract_type: (bits >> 10) & 1 != 0,
            side_effects: (bits >> 11) & 1 != 0,
            static_creation: (bits >> 12) & 1 != 0,
            type_specific,
        };

        if !properties.verify() {
            return Err(CommonError::InvariantViolation(
                "properties bitfield fails verify() invariants".into(),
            ));
        }

        Ok(properties)
    }
}

impl Default for Properties {
    fn default() -> Self {
        Properties {
            gc_type: GcType::Ordinary,
            graph_type: GraphType::Standard,
            constant: false,
            deterministic: true,
            abstract_type: false,
            side_effects: false,
            static_creation: false,
            type_specific: TypeSpecific::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_is_identity() {
        let p = Properties {
            gc_type: GcType::Codon,
            graph_type: GraphType::Primitive,
            constant: true,
            deterministic: true,
            abstract_type: false,
            side_effects: false,
            static_creation: true,
            type_specific: TypeSpecific {
                simplification: true,
                literal: false,
            },
        };
        let bits = p.encode();
        let back = Properties::decode(bits).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn constant_implies_deterministic() {
        let p = Properties {
            constant: true,
            deterministic: false,
            ..Properties::default()
        };
        assert!(!p.verify());
    }

    #[test]
    fn codon_cannot_be_empty_graph() {
        let p = Properties {
            gc_type: GcType::Codon,
            graph_type: GraphType::Empty,
            ..Properties::default()
        };
        assert!(!p.verify());
        assert!(Properties::decode(p.encode()).is_err());
    }

    #[test]
    fn reserved_bits_must_be_zero() {
        let bits = Properties::default().encode() | (1 << 24);
        assert!(Properties::decode(bits).is_err());
    }
}
