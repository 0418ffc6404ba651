//! Import descriptors carried verbatim on `TypesDef` (§3.1a).
//!
//! The core never interprets these — they exist so a type definition can be
//! round-tripped to the (out-of-scope) code generator without loss.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDef {
    /// Absolute path tuple, e.g. `["collections", "abc"]`.
    pub path: Vec<String>,
    pub symbol: String,
    pub alias: Option<String>,
}

impl ImportDef {
    pub fn new(path: Vec<String>, symbol: impl Into<String>) -> Self {
        ImportDef {
            path,
            symbol: symbol.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}
