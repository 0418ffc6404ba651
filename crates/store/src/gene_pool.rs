//! The Gene Pool Interface (§4.8, component H): the worker's front door to
//! the Gene Pool, wired as an `L1 "dirty" -> L2 "LRU" -> GeneTable` cache
//! stack (§4.7) rather than the `egp-cache::CacheStack` facade, since the
//! terminal layer here must be the signature-keyed [`GeneTable`] and not
//! a generic [`egp_cache::MemoryStore`].
//!
//! Grounded on `examples/original_source/egppy/egppy/gene_pool/gene_pool_interface.py`:
//! `__init__` builds exactly this stack (`DictCache` over a `DBTableStore`)
//! and, if the table comes up empty, loads `codons.json`/`meta_codons.json`
//! through `load_signed_json_list` before copying the cache back to the
//! table.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use egp_cache::{CacheBacking, Cached, DirtyCache, LruCache};
use egp_common::{CommonError, Properties, Signature, TypeUid};
use egp_graph::{CGraph, GeneticCode, StaticMetrics};
use egp_interface::EptStore;
use egp_types::Registry;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::queries::InterfaceMatch;
use crate::table::{GcRow, GeneTable, GeneTableQuery};

/// One entry of a signed Gene Pool seed file (§4.8: "loads signed JSON
/// seeds for codons and meta-codons"). Unlike a stored [`GcRow`], the
/// cgraph here is plain canonical JSON rather than zstd-compressed bytes,
/// since seed files are meant to be readable and diffable.
#[derive(Debug, Deserialize)]
struct SeedRecord {
    cgraph: serde_json::Value,
    #[serde(default)]
    gca: Signature,
    #[serde(default)]
    gcb: Signature,
    #[serde(default)]
    ancestora: Signature,
    #[serde(default)]
    ancestorb: Signature,
    #[serde(default)]
    pgc: Signature,
    created: DateTime<Utc>,
    #[serde(default = "Uuid::nil")]
    creator: Uuid,
    properties: u64,
    #[serde(default)]
    meta_data: Option<serde_json::Value>,
    #[serde(default)]
    static_metrics: SeedStaticMetrics,
    #[serde(default)]
    hl_metrics: Option<serde_json::Value>,
    #[serde(default)]
    cl_metrics: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Default)]
struct SeedStaticMetrics {
    #[serde(default)]
    num_codons: u32,
    #[serde(default)]
    num_codes: u32,
    #[serde(default)]
    generation: u32,
    #[serde(default)]
    code_depth: u32,
}

impl SeedRecord {
    fn into_genetic_code(self, registry: &Registry, ept_store: &EptStore) -> Result<GeneticCode> {
        let properties = Properties::decode(self.properties).map_err(StoreError::Common)?;
        let cgraph = CGraph::from_canonical_json(&self.cgraph, properties.graph_type, registry, ept_store)?;
        let mut gc = GeneticCode::new(
            Arc::new(cgraph),
            self.gca,
            self.gcb,
            self.ancestora,
            self.ancestorb,
            self.pgc,
            self.created,
            self.creator,
            properties,
            self.meta_data,
        )?;
        gc.set_static_metrics(StaticMetrics {
            num_codons: self.static_metrics.num_codons,
            num_codes: self.static_metrics.num_codes,
            generation: self.static_metrics.generation,
            code_depth: self.static_metrics.code_depth,
        });
        gc.set_hl_metrics(self.hl_metrics);
        gc.set_cl_metrics(self.cl_metrics);
        gc.seal(registry)?;
        Ok(gc)
    }
}

/// Verifies `detached_signature` against `json_bytes` before parsing, same
/// tamper-evident contract as `egp_types::seed::load_signed` (§3.1, §9).
fn load_signed_seed(json_bytes: &[u8], detached_signature: &Signature) -> Result<Vec<SeedRecord>> {
    let computed = Signature::of(json_bytes);
    if &computed != detached_signature {
        return Err(StoreError::Common(CommonError::InvariantViolation(format!(
            "seed signature mismatch: expected {}, computed {}",
            detached_signature.to_hex(),
            computed.to_hex()
        ))));
    }
    #[derive(Deserialize)]
    struct SeedFile {
        codes: Vec<SeedRecord>,
    }
    let file: SeedFile = serde_json::from_slice(json_bytes).map_err(CommonError::Json)?;
    Ok(file.codes)
}

/// The worker-facing Gene Pool Interface (§4.8): `get`/`set` through a
/// two-level cache over `T`, plus the query surface (`select`,
/// `select_interface`, `initial_generation_query`) delegated straight to
/// `T`'s [`GeneTableQuery`] implementation.
pub struct GenePoolInterface<T> {
    table: Arc<T>,
    pub l1: Arc<DirtyCache<Signature, Cached<GcRow>>>,
    pub l2: Arc<LruCache<Signature, Cached<GcRow>>>,
    registry: Arc<Registry>,
    ept_store: Arc<EptStore>,
}

impl<T> GenePoolInterface<T>
where
    T: GeneTable + GeneTableQuery + CacheBacking<Signature, Cached<GcRow>> + 'static,
{
    /// Builds the cache stack over `table` (§4.7's three-row table, minus
    /// the generic Store row since `table` already plays that part).
    pub fn new(
        table: Arc<T>,
        registry: Arc<Registry>,
        ept_store: Arc<EptStore>,
        l1_max: usize,
        l2_max: usize,
        l2_purge: usize,
    ) -> Self {
        let l2: Arc<LruCache<Signature, Cached<GcRow>>> =
            Arc::new(LruCache::new(l2_max, l2_purge, table.clone()));
        let l1: Arc<DirtyCache<Signature, Cached<GcRow>>> =
            Arc::new(DirtyCache::new(l1_max, l2.clone()));
        GenePoolInterface { table, l1, l2, registry, ept_store }
    }

    /// Boots the library from a signed seed if the table is still empty
    /// (§4.8). Returns the number of codes loaded; a no-op (`Ok(0)`) if the
    /// table already has data.
    pub fn boot_from_seed(&self, json_bytes: &[u8], detached_signature: &Signature) -> Result<usize> {
        if !self.table.is_empty()? {
            return Ok(0);
        }
        let records = load_signed_seed(json_bytes, detached_signature)?;
        let mut loaded = 0;
        for record in records {
            let gc = record.into_genetic_code(&self.registry, &self.ept_store)?;
            self.set(&gc)?;
            loaded += 1;
        }
        self.l1.copyback();
        Ok(loaded)
    }

    /// `__contains__` (§4.8).
    pub fn contains(&self, signature: &Signature) -> Result<bool> {
        Ok(self.l1.get(signature).is_some())
    }

    /// `get(signature) -> GC` via the cache stack (§4.8).
    pub fn get(&self, signature: &Signature) -> Result<Option<GeneticCode>> {
        match self.l1.get(signature) {
            Some(cached) => Ok(Some(cached.into_inner().to_genetic_code(&self.registry, &self.ept_store)?)),
            None => Ok(None),
        }
    }

    /// `set(signature, gc)` writes through the cache (§4.8). `gc` must
    /// already be sealed.
    pub fn set(&self, gc: &GeneticCode) -> Result<()> {
        let row = GcRow::from_genetic_code(gc, &self.registry)?;
        self.l1.set(row.signature, Cached::new(row));
        Ok(())
    }

    /// `select(filter_sql, order_sql, limit, literals)` (§4.8), expressed
    /// as a typed match combination rather than a raw filter string.
    #[allow(clippy::too_many_arguments)]
    pub fn select(
        &self,
        match_kind: InterfaceMatch,
        input_types: &[TypeUid],
        output_types: &[TypeUid],
        input_indices: &[u8],
        output_indices: &[u8],
        exclude: &[Signature],
        limit: usize,
    ) -> Result<Vec<Signature>> {
        self.table
            .select(match_kind, input_types, output_types, input_indices, output_indices, exclude, limit)
    }

    /// `select_interface(iface) -> signature | None` (§4.8): exact match
    /// by interface shape.
    pub fn select_interface(
        &self,
        input_types: &[TypeUid],
        output_types: &[TypeUid],
        input_indices: &[u8],
        output_indices: &[u8],
    ) -> Result<Option<Signature>> {
        self.table.select_interface(input_types, output_types, input_indices, output_indices)
    }

    /// `initial_generation_query(population_config) -> [signatures]`
    /// (§4.8).
    pub fn initial_generation_query(
        &self,
        input_types: &[TypeUid],
        output_types: &[TypeUid],
        size: usize,
    ) -> Result<Vec<Signature>> {
        self.table.initial_generation_query(input_types, output_types, size)
    }

    /// Writes every dirty cached GC back to the table (§4.7: `copyback`).
    pub fn copyback(&self) {
        self.l1.copyback();
    }
}
