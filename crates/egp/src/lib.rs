//! Facade crate for the EGP engineering core.
//!
//! An embedding worker process depends on `egp` alone (§2's crate-mapping
//! table: "the top-level `egp` crate wires everything together and is the
//! only crate an embedding worker process depends on directly"). It
//! re-exports the component crates' public types and adds the two things
//! none of them owns individually: process bootstrap ([`Workspace::bootstrap`])
//! and logging init ([`logging::init`]).

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{EgpError, Result};

pub use egp_cache::{CacheStack, Cached, DedupStats, DirtyCache, LruCache, LruDedup, WeakDedup};
pub use egp_common::{
    Cacheable, CommonError, DirtyState, Freezable, GcType, GraphType, ImportDef, Properties,
    Signature, TypeSpecific, TypeUid, TypeUidKind,
};
pub use egp_graph::{
    connect_all, stabilize, CGraph, Connection, ConnectionStore, GeneticCode, GraphError,
    GraphValue, StaticMetrics,
};
pub use egp_interface::{
    Endpoint, EndpointClass, EndpointRef, Ept, EptStore, Interface, InterfaceStore, Row,
    MAX_INTERFACE_LEN,
};
pub use egp_store::{
    all_match_combinations, GcRow, GeneTable, GeneTableQuery, GenePoolInterface, InterfaceMatch,
    MemoryGeneTable, StoreError, TypeMatch,
};
pub use egp_types::{load_signed as load_signed_types, parse_template, Registry, RegistryStats, TemplateExpr, TypesDef};

#[cfg(feature = "postgres")]
pub use egp_store::PgGeneTable;

use std::sync::Arc;

/// The process-wide handles a worker needs: the Type Registry, the
/// Endpoint-Type and Interface stores, and the Gene Pool Interface wired
/// over an in-memory table (§2's data-flow: "A -> B -> C -> D -> E" plus
/// "storage flow: E <-> G <-> H").
///
/// `InterfaceStore` is held here (not re-derived) because, unlike the
/// Registry and EPT store, nothing downstream of it needs a shared handle
/// today — it is kept on `Workspace` purely so an embedding worker has one
/// place to reach it rather than constructing its own.
pub struct Workspace {
    pub registry: Arc<Registry>,
    pub ept_store: Arc<EptStore>,
    pub interface_store: Arc<InterfaceStore>,
    pub gene_pool: Arc<GenePoolInterface<MemoryGeneTable>>,
}

impl Workspace {
    /// Builds a fresh, empty workspace — no seed data loaded. Useful for
    /// tests and for workers that populate the registry/gene pool
    /// themselves.
    pub fn empty(config: &Config) -> Self {
        let registry = Arc::new(Registry::new());
        let ept_store = Arc::new(EptStore::new());
        let interface_store = Arc::new(InterfaceStore::new());
        let table = Arc::new(MemoryGeneTable::new());
        let gene_pool = Arc::new(GenePoolInterface::new(
            table,
            registry.clone(),
            ept_store.clone(),
            config.l1_max,
            config.l2_max,
            config.l2_purge,
        ));
        Workspace { registry, ept_store, interface_store, gene_pool }
    }

    /// Builds a workspace and, if `config` names seed files, loads the type
    /// lattice and boots the Gene Pool from them (§3.1, §4.8: "types are
    /// loaded from a signed JSON seed at boot" / "The Gene Pool boots the
    /// library ... if the table is empty").
    ///
    /// Both seed pairs are optional independently: a worker that only needs
    /// the type lattice (e.g. to validate interfaces before talking to a
    /// remote Gene Pool) can configure `types_seed_path` alone.
    pub fn bootstrap(config: &Config) -> Result<Self> {
        let workspace = Self::empty(config);

        if let (Some(path), Some(sig_path)) = (&config.types_seed_path, &config.types_seed_sig_path) {
            let json_bytes = read_seed_file(path)?;
            let sig_bytes = read_seed_file(sig_path)?;
            let signature = Signature::from_hex(std::str::from_utf8(&sig_bytes).unwrap_or("").trim())
                .ok_or_else(|| EgpError::Config(format!("malformed seed signature at {}", sig_path.display())))?;
            let types = egp_types::load_signed(&json_bytes, &signature).map_err(|e| {
                EgpError::Config(format!("failed to load type seed {}: {e}", path.display()))
            })?;
            workspace.registry.load(types).map_err(|e| {
                EgpError::Config(format!("type seed {} failed registry invariants: {e}", path.display()))
            })?;
            tracing::info!(path = %path.display(), "loaded type lattice seed");
        }

        if let (Some(path), Some(sig_path)) =
            (&config.gene_pool_seed_path, &config.gene_pool_seed_sig_path)
        {
            let json_bytes = read_seed_file(path)?;
            let sig_bytes = read_seed_file(sig_path)?;
            let signature = Signature::from_hex(std::str::from_utf8(&sig_bytes).unwrap_or("").trim())
                .ok_or_else(|| EgpError::Config(format!("malformed seed signature at {}", sig_path.display())))?;
            let loaded = workspace.gene_pool.boot_from_seed(&json_bytes, &signature)?;
            tracing::info!(path = %path.display(), loaded, "booted gene pool from seed");
        }

        Ok(workspace)
    }
}

fn read_seed_file(path: &std::path::Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| EgpError::SeedIo { path: path.display().to_string(), source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_workspace_has_no_types_and_an_empty_gene_pool() {
        let workspace = Workspace::empty(&Config::default());
        assert!(workspace.registry.get_by_name("int").is_err());
    }

    #[test]
    fn bootstrap_without_seed_paths_is_equivalent_to_empty() {
        let workspace = Workspace::bootstrap(&Config::default()).unwrap();
        assert!(workspace.registry.get_by_name("int").is_err());
    }

    #[test]
    fn bootstrap_loads_a_valid_type_seed() {
        use std::io::Write;
        let json = br#"{"types": []}"#;
        let sig = Signature::of(json);

        let mut json_file = tempfile::NamedTempFile::new().unwrap();
        json_file.write_all(json).unwrap();
        let mut sig_file = tempfile::NamedTempFile::new().unwrap();
        sig_file.write_all(sig.to_hex().as_bytes()).unwrap();

        let config = Config {
            types_seed_path: Some(json_file.path().to_path_buf()),
            types_seed_sig_path: Some(sig_file.path().to_path_buf()),
            ..Config::default()
        };
        Workspace::bootstrap(&config).unwrap();
    }

    #[test]
    fn bootstrap_rejects_a_tampered_type_seed() {
        use std::io::Write;
        let json = br#"{"types": []}"#;
        let bogus_sig = Signature::of(b"not the seed");

        let mut json_file = tempfile::NamedTempFile::new().unwrap();
        json_file.write_all(json).unwrap();
        let mut sig_file = tempfile::NamedTempFile::new().unwrap();
        sig_file.write_all(bogus_sig.to_hex().as_bytes()).unwrap();

        let config = Config {
            types_seed_path: Some(json_file.path().to_path_buf()),
            types_seed_sig_path: Some(sig_file.path().to_path_buf()),
            ..Config::default()
        };
        assert!(Workspace::bootstrap(&config).is_err());
    }
}
