use thiserror::Error;

/// Error taxonomy shared across the EGP core (§7).
///
/// Each higher-level crate defines its own error enum and wraps `CommonError`
/// via `#[from]` rather than re-declaring these variants, mirroring the
/// teacher's one-error-enum-per-crate convention.
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CommonError>;
