//! Graph-layer error taxonomy (§7), wrapping `egp_common::CommonError`
//! rather than redeclaring its variants, per the teacher's
//! `NaviscopeError`-wraps-`io`/`json` convention.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    /// A graph violates the row-combination rules for its `graph_type`
    /// (§4.4 step 1, §7).
    #[error("structural error: {0}")]
    Structural(String),

    /// Stabilisation could not satisfy a destination without appending to
    /// a fixed interface (§4.4 step 3, §7).
    #[error("unsatisfiable interface: {0}")]
    Unsatisfiable(String),

    /// A GC claims a signature that does not match its recomputed content
    /// address (§7).
    #[error("signature mismatch: expected {expected}, computed {computed}")]
    SignatureMismatch { expected: String, computed: String },

    #[error(transparent)]
    Common(#[from] egp_common::CommonError),
}

pub type Result<T> = std::result::Result<T, GraphError>;
