//! Facade-layer error taxonomy (§7), wrapping `egp_store::StoreError` rather
//! than redeclaring its variants (mirrors `egp_store::StoreError` wrapping
//! `egp_graph::GraphError`/`egp_common::CommonError`).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EgpError {
    /// A required configuration value was missing or unparsable
    /// (§1 [EXPANSION]: "a small configuration surface").
    #[error("configuration error: {0}")]
    Config(String),

    /// A seed file path was configured but could not be read from disk.
    #[error("failed to read seed file {path}: {source}")]
    SeedIo { path: String, source: std::io::Error },

    #[error(transparent)]
    Store(#[from] egp_store::StoreError),
}

pub type Result<T> = std::result::Result<T, EgpError>;
