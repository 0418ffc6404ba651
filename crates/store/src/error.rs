//! Store-layer error taxonomy (§7), wrapping the lower layers' error enums
//! rather than redeclaring their variants, per the teacher's
//! `NaviscopeError`-wraps-`io`/`json` convention (mirrors `egp_graph::GraphError`).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// No row found for a signature, after walking the whole cache stack
    /// down to the table (§7: "key absent in cache hierarchy after walking
    /// to the store").
    #[error("not found: {0}")]
    NotFound(String),

    /// Failed conversion between an application type and a column type
    /// (§7: `EncodingError`).
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A `select`/`select_interface` query could not be built or executed.
    #[error("query error: {0}")]
    Query(String),

    #[error(transparent)]
    Common(#[from] egp_common::CommonError),

    #[error(transparent)]
    Graph(#[from] egp_graph::GraphError),

    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
