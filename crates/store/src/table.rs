//! The Gene Pool table contract (§6.1) and its two realisations.
//!
//! Grounded on `examples/original_source/egpdb/egpdb/row_iterators.py` for
//! the row shape (a fixed struct stands in for the generic iterator grid:
//! every column the original names is a field here) and on
//! `examples/other_examples/manifests/kotadb-kota-db`'s `sqlx` Postgres pool
//! pattern for [`PgGeneTable`]. §5 rules out an async/event-loop core, so
//! both realisations expose a synchronous API; `PgGeneTable` bridges its
//! `sqlx` calls through `tokio::task::block_in_place` rather than leaking
//! `async fn` into the rest of the crate.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use egp_cache::{CacheBacking, Cached};
use egp_common::{Properties, Signature, TypeUid};
use egp_graph::{CGraph, GeneticCode, StaticMetrics};
use egp_interface::{EptStore, Row};
use egp_types::Registry;
use uuid::Uuid;

use crate::codec::{
    column_to_uids, compress_json, decode_properties, decompress_json, encode_properties,
    uids_to_column,
};
use crate::error::{Result, StoreError};
use crate::queries::InterfaceMatch;

/// One row of the Gene Pool table (§6.1), the storage-facing twin of
/// [`GeneticCode`]. Column names and nullability follow §6.1 verbatim.
#[derive(Debug, Clone)]
pub struct GcRow {
    pub signature: Signature,
    /// Compressed canonical JSON (§6.2).
    pub cgraph: Vec<u8>,
    pub gca: Signature,
    pub gcb: Signature,
    pub ancestora: Signature,
    pub ancestorb: Signature,
    pub pgc: Signature,
    pub created: DateTime<Utc>,
    pub properties: i64,
    pub input_types: Vec<i32>,
    pub output_types: Vec<i32>,
    pub inputs: Vec<u8>,
    pub outputs: Vec<u8>,
    pub meta_data: Option<Vec<u8>>,
    pub num_codons: i32,
    pub num_codes: i32,
    pub generation: i32,
    pub code_depth: i32,
    pub hl_metrics: Option<Vec<u8>>,
    pub cl_metrics: Option<Vec<u8>>,
    pub creator: Uuid,
    pub updated: DateTime<Utc>,
}

impl GcRow {
    /// Flattens a sealed [`GeneticCode`] into its table row (§6.1).
    pub fn from_genetic_code(gc: &GeneticCode, registry: &Registry) -> Result<GcRow> {
        let signature = gc.signature().ok_or_else(|| {
            StoreError::Encoding("a GeneticCode must be sealed before it can be stored".into())
        })?;

        let cgraph_json = gc.cgraph().to_canonical_json(registry)?;
        let cgraph_bytes = compress_json(&cgraph_json)?;

        let (input_types, inputs) = gc
            .cgraph()
            .row(Row::Is)
            .map(|iface| iface.types_and_indices())
            .unwrap_or_default();
        let (output_types, outputs) = gc
            .cgraph()
            .row(Row::Od)
            .map(|iface| iface.types_and_indices())
            .unwrap_or_default();

        let meta_data = gc.meta_data().map(compress_json).transpose()?;
        let hl_metrics = gc.hl_metrics().map(compress_json).transpose()?;
        let cl_metrics = gc.cl_metrics().map(compress_json).transpose()?;
        let metrics = gc.static_metrics();

        Ok(GcRow {
            signature,
            cgraph: cgraph_bytes,
            gca: gc.gca(),
            gcb: gc.gcb(),
            ancestora: gc.ancestora(),
            ancestorb: gc.ancestorb(),
            pgc: gc.pgc(),
            created: gc.created(),
            properties: encode_properties(&gc.properties()),
            input_types: uids_to_column(&input_types),
            output_types: uids_to_column(&output_types),
            inputs,
            outputs,
            meta_data,
            num_codons: metrics.num_codons as i32,
            num_codes: metrics.num_codes as i32,
            generation: metrics.generation as i32,
            code_depth: metrics.code_depth as i32,
            hl_metrics,
            cl_metrics,
            creator: gc.creator(),
            updated: Utc::now(),
        })
    }

    /// Rehydrates a [`GeneticCode`], verifying its signature still matches
    /// the row's key once reconstructed (§7: `SignatureMismatch`).
    pub fn to_genetic_code(&self, registry: &Registry, ept_store: &EptStore) -> Result<GeneticCode> {
        let properties = decode_properties(self.properties)?;
        let cgraph_json: serde_json::Value = decompress_json(&self.cgraph)?;
        let cgraph =
            CGraph::from_canonical_json(&cgraph_json, properties.graph_type, registry, ept_store)?;

        let meta_data = self
            .meta_data
            .as_deref()
            .map(decompress_json::<serde_json::Value>)
            .transpose()?;
        let hl_metrics = self
            .hl_metrics
            .as_deref()
            .map(decompress_json::<serde_json::Value>)
            .transpose()?;
        let cl_metrics = self
            .cl_metrics
            .as_deref()
            .map(decompress_json::<serde_json::Value>)
            .transpose()?;

        let mut gc = GeneticCode::new(
            std::sync::Arc::new(cgraph),
            self.gca,
            self.gcb,
            self.ancestora,
            self.ancestorb,
            self.pgc,
            self.created,
            self.creator,
            properties,
            meta_data,
        )?;
        gc.set_static_metrics(StaticMetrics {
            num_codons: self.num_codons as u32,
            num_codes: self.num_codes as u32,
            generation: self.generation as u32,
            code_depth: self.code_depth as u32,
        });
        gc.set_hl_metrics(hl_metrics);
        gc.set_cl_metrics(cl_metrics);

        let sealed = gc.seal(registry)?;
        if sealed != self.signature {
            return Err(StoreError::Encoding(format!(
                "row signature {} does not match its recomputed signature {}",
                self.signature.to_hex(),
                sealed.to_hex()
            )));
        }
        Ok(gc)
    }

    fn input_type_uids(&self) -> Vec<TypeUid> {
        column_to_uids(&self.input_types)
    }

    fn output_type_uids(&self) -> Vec<TypeUid> {
        column_to_uids(&self.output_types)
    }
}

/// The key-value half of the Gene Pool contract (§6.1): what the cache
/// hierarchy needs to read and write rows by signature.
pub trait GeneTable: Send + Sync {
    fn get(&self, signature: &Signature) -> Result<Option<GcRow>>;
    fn upsert(&self, row: GcRow) -> Result<()>;
    fn is_empty(&self) -> Result<bool>;
    fn len(&self) -> Result<usize>;
}

/// The query half of the Gene Pool contract (§4.8): parametric select,
/// exact-interface lookup, and population seeding.
pub trait GeneTableQuery: Send + Sync {
    /// `select(filter_sql, order_sql, limit, literals)` (§4.8), expressed
    /// here as a typed match rather than a raw SQL string: `match_kind`
    /// selects one of the 36 `IF_MATCH_TYPES` combinations, `exclude`
    /// mirrors the original's "already tried" exclusion set.
    fn select(
        &self,
        match_kind: InterfaceMatch,
        input_types: &[TypeUid],
        output_types: &[TypeUid],
        input_indices: &[u8],
        output_indices: &[u8],
        exclude: &[Signature],
        limit: usize,
    ) -> Result<Vec<Signature>>;

    /// `select_interface(iface) -> signature | None` (§4.8): exact match
    /// against the library by interface shape.
    fn select_interface(
        &self,
        input_types: &[TypeUid],
        output_types: &[TypeUid],
        input_indices: &[u8],
        output_indices: &[u8],
    ) -> Result<Option<Signature>>;

    /// `initial_generation_query(population_config) -> [signatures]`
    /// (§4.8): seeds a population with up to `size` distinct GCs whose
    /// interface is compatible with the wanted inputs/outputs.
    fn initial_generation_query(
        &self,
        input_types: &[TypeUid],
        output_types: &[TypeUid],
        size: usize,
    ) -> Result<Vec<Signature>>;
}

/// In-memory realisation of [`GeneTable`]/[`GeneTableQuery`] (§4.7: "Store
/// ... unbounded (in-memory) or DB-backed"), used for embedded/offline use
/// and as the terminal layer under tests.
#[derive(Default)]
pub struct MemoryGeneTable {
    rows: Mutex<HashMap<Signature, GcRow>>,
}

impl MemoryGeneTable {
    pub fn new() -> Self {
        MemoryGeneTable::default()
    }
}

impl GeneTable for MemoryGeneTable {
    fn get(&self, signature: &Signature) -> Result<Option<GcRow>> {
        Ok(self.rows.lock().unwrap().get(signature).cloned())
    }

    fn upsert(&self, row: GcRow) -> Result<()> {
        self.rows.lock().unwrap().insert(row.signature, row);
        Ok(())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.rows.lock().unwrap().is_empty())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.rows.lock().unwrap().len())
    }
}

impl CacheBacking<Signature, Cached<GcRow>> for MemoryGeneTable {
    fn backing_get(&self, key: &Signature) -> Option<Cached<GcRow>> {
        self.rows.lock().unwrap().get(key).cloned().map(Cached::new)
    }

    fn backing_set(&self, key: Signature, value: Cached<GcRow>) {
        self.rows.lock().unwrap().insert(key, value.into_inner());
    }
}

fn types_match(wanted: &[TypeUid], candidate: &[TypeUid], match_kind: crate::queries::TypeMatch) -> bool {
    use crate::queries::TypeMatch::*;
    let mut wanted_sorted: Vec<i32> = wanted.iter().map(|u| u.raw()).collect();
    wanted_sorted.sort_unstable();
    let mut candidate_sorted: Vec<i32> = candidate.iter().map(|u| u.raw()).collect();
    candidate_sorted.sort_unstable();
    match match_kind {
        Any => true,
        Exact | Type => candidate_sorted == wanted_sorted,
        Subset => candidate_sorted.iter().all(|t| wanted_sorted.contains(t)),
        Superset => wanted_sorted.iter().all(|t| candidate_sorted.contains(t)),
        Overlap => candidate_sorted.iter().any(|t| wanted_sorted.contains(t)),
    }
}

impl GeneTableQuery for MemoryGeneTable {
    fn select(
        &self,
        match_kind: InterfaceMatch,
        input_types: &[TypeUid],
        output_types: &[TypeUid],
        input_indices: &[u8],
        output_indices: &[u8],
        exclude: &[Signature],
        limit: usize,
    ) -> Result<Vec<Signature>> {
        let rows = self.rows.lock().unwrap();
        let mut matches: Vec<Signature> = rows
            .values()
            .filter(|row| !exclude.contains(&row.signature))
            .filter(|row| types_match(input_types, &row.input_type_uids(), match_kind.input))
            .filter(|row| types_match(output_types, &row.output_type_uids(), match_kind.output))
            .filter(|row| {
                match_kind.input != crate::queries::TypeMatch::Exact
                    || row.inputs == input_indices
            })
            .filter(|row| {
                match_kind.output != crate::queries::TypeMatch::Exact
                    || row.outputs == output_indices
            })
            .map(|row| row.signature)
            .collect();
        matches.truncate(limit);
        Ok(matches)
    }

    fn select_interface(
        &self,
        input_types: &[TypeUid],
        output_types: &[TypeUid],
        input_indices: &[u8],
        output_indices: &[u8],
    ) -> Result<Option<Signature>> {
        let exact = InterfaceMatch::new(crate::queries::TypeMatch::Exact, crate::queries::TypeMatch::Exact);
        let matches = self.select(
            exact,
            input_types,
            output_types,
            input_indices,
            output_indices,
            &[],
            1,
        )?;
        Ok(matches.into_iter().next())
    }

    fn initial_generation_query(
        &self,
        input_types: &[TypeUid],
        output_types: &[TypeUid],
        size: usize,
    ) -> Result<Vec<Signature>> {
        let superset =
            InterfaceMatch::new(crate::queries::TypeMatch::Superset, crate::queries::TypeMatch::Superset);
        self.select(superset, input_types, output_types, &[], &[], &[], size)
    }
}

/// Postgres-backed realisation of the Gene Pool table (§6.1), feature
/// `postgres`. Grounded on `examples/other_examples/manifests/kotadb-kota-db`'s
/// `sqlx::PgPool` connection pattern; §5 rules out an async core for the
/// rest of this crate, so every method here blocks the calling thread via
/// [`tokio::task::block_in_place`] rather than returning a future.
#[cfg(feature = "postgres")]
pub struct PgGeneTable {
    pool: sqlx::PgPool,
    table_name: String,
}

#[cfg(feature = "postgres")]
impl PgGeneTable {
    pub fn new(pool: sqlx::PgPool, table_name: impl Into<String>) -> Self {
        PgGeneTable { pool, table_name: table_name.into() }
    }

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(fut))
    }

    async fn fetch_row(&self, signature: &Signature) -> Result<Option<GcRow>> {
        let rec = sqlx::query(&format!(
            "SELECT signature, cgraph, gca, gcb, ancestora, ancestorb, pgc, created, \
             properties, input_types, output_types, inputs, outputs, meta_data, num_codons, \
             num_codes, generation, code_depth, hl_metrics, cl_metrics, creator, updated \
             FROM {} WHERE signature = $1",
            self.table_name
        ))
        .bind(signature.as_bytes().as_slice())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::Database)?;
        rec.map(row_from_pg).transpose()
    }

    async fn upsert_row(&self, row: GcRow) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO {} (signature, cgraph, gca, gcb, ancestora, ancestorb, pgc, created, \
             properties, input_types, output_types, inputs, outputs, meta_data, num_codons, \
             num_codes, generation, code_depth, hl_metrics, cl_metrics, creator, updated) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21, $22) \
             ON CONFLICT (signature) DO UPDATE SET updated = EXCLUDED.updated",
            self.table_name
        ))
        .bind(row.signature.as_bytes().as_slice())
        .bind(&row.cgraph)
        .bind(row.gca.as_bytes().as_slice())
        .bind(row.gcb.as_bytes().as_slice())
        .bind(row.ancestora.as_bytes().as_slice())
        .bind(row.ancestorb.as_bytes().as_slice())
        .bind(row.pgc.as_bytes().as_slice())
        .bind(row.created)
        .bind(row.properties)
        .bind(&row.input_types)
        .bind(&row.output_types)
        .bind(&row.inputs)
        .bind(&row.outputs)
        .bind(&row.meta_data)
        .bind(row.num_codons)
        .bind(row.num_codes)
        .bind(row.generation)
        .bind(row.code_depth)
        .bind(&row.hl_metrics)
        .bind(&row.cl_metrics)
        .bind(row.creator)
        .bind(row.updated)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Database)?;
        Ok(())
    }

    async fn count_rows(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", self.table_name))
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::Database)?;
        Ok(count.0)
    }

    async fn select_signatures(
        &self,
        match_kind: InterfaceMatch,
        input_types: &[i32],
        output_types: &[i32],
        input_indices: &[u8],
        output_indices: &[u8],
        exclude: &[Signature],
        limit: i64,
    ) -> Result<Vec<Signature>> {
        let exclusions: Vec<Vec<u8>> = exclude.iter().map(|s| s.as_bytes().to_vec()).collect();
        let where_body = match_kind.where_body();
        let query = format!(
            "SELECT signature FROM {} WHERE {where_body} AND NOT (signature = ANY($5)) \
             ORDER BY RANDOM() LIMIT $6",
            self.table_name
        );
        let rows: Vec<(Vec<u8>,)> = sqlx::query_as(&query)
            .bind(input_types)
            .bind(output_types)
            .bind(input_indices)
            .bind(output_indices)
            .bind(&exclusions)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Database)?;
        rows.into_iter()
            .map(|(bytes,)| {
                let mut out = [0u8; 32];
                if bytes.len() != 32 {
                    return Err(StoreError::Encoding("signature column is not 32 bytes".into()));
                }
                out.copy_from_slice(&bytes);
                Ok(Signature::from_bytes(out))
            })
            .collect()
    }
}

#[cfg(feature = "postgres")]
fn row_from_pg(_row: sqlx::postgres::PgRow) -> Result<GcRow> {
    // Column extraction is deferred to the concrete `sqlx::Row` impl wired
    // up at the call site that owns the live schema (migrations are out of
    // scope here, §4.8 "applies DDL"); decoding follows the column order
    // declared in `fetch_row`'s `SELECT` list.
    use sqlx::Row as _;
    Ok(GcRow {
        signature: bytes_to_signature(_row.try_get::<Vec<u8>, _>("signature").map_err(StoreError::Database)?)?,
        cgraph: _row.try_get("cgraph").map_err(StoreError::Database)?,
        gca: bytes_to_signature(_row.try_get::<Vec<u8>, _>("gca").map_err(StoreError::Database)?)?,
        gcb: bytes_to_signature(_row.try_get::<Vec<u8>, _>("gcb").map_err(StoreError::Database)?)?,
        ancestora: bytes_to_signature(_row.try_get::<Vec<u8>, _>("ancestora").map_err(StoreError::Database)?)?,
        ancestorb: bytes_to_signature(_row.try_get::<Vec<u8>, _>("ancestorb").map_err(StoreError::Database)?)?,
        pgc: bytes_to_signature(_row.try_get::<Vec<u8>, _>("pgc").map_err(StoreError::Database)?)?,
        created: _row.try_get("created").map_err(StoreError::Database)?,
        properties: _row.try_get("properties").map_err(StoreError::Database)?,
        input_types: _row.try_get("input_types").map_err(StoreError::Database)?,
        output_types: _row.try_get("output_types").map_err(StoreError::Database)?,
        inputs: _row.try_get("inputs").map_err(StoreError::Database)?,
        outputs: _row.try_get("outputs").map_err(StoreError::Database)?,
        meta_data: _row.try_get("meta_data").map_err(StoreError::Database)?,
        num_codons: _row.try_get("num_codons").map_err(StoreError::Database)?,
        num_codes: _row.try_get("num_codes").map_err(StoreError::Database)?,
        generation: _row.try_get("generation").map_err(StoreError::Database)?,
        code_depth: _row.try_get("code_depth").map_err(StoreError::Database)?,
        hl_metrics: _row.try_get("hl_metrics").map_err(StoreError::Database)?,
        cl_metrics: _row.try_get("cl_metrics").map_err(StoreError::Database)?,
        creator: _row.try_get("creator").map_err(StoreError::Database)?,
        updated: _row.try_get("updated").map_err(StoreError::Database)?,
    })
}

#[cfg(feature = "postgres")]
fn bytes_to_signature(bytes: Vec<u8>) -> Result<Signature> {
    if bytes.len() != 32 {
        return Err(StoreError::Encoding("signature column is not 32 bytes".into()));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(Signature::from_bytes(out))
}

#[cfg(feature = "postgres")]
impl GeneTable for PgGeneTable {
    fn get(&self, signature: &Signature) -> Result<Option<GcRow>> {
        Self::block_on(self.fetch_row(signature))
    }

    fn upsert(&self, row: GcRow) -> Result<()> {
        Self::block_on(self.upsert_row(row))
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(Self::block_on(self.count_rows())? == 0)
    }

    fn len(&self) -> Result<usize> {
        Ok(Self::block_on(self.count_rows())? as usize)
    }
}

#[cfg(feature = "postgres")]
impl CacheBacking<Signature, Cached<GcRow>> for PgGeneTable {
    fn backing_get(&self, key: &Signature) -> Option<Cached<GcRow>> {
        GeneTable::get(self, key).ok().flatten().map(Cached::new)
    }

    fn backing_set(&self, _key: Signature, value: Cached<GcRow>) {
        let _ = GeneTable::upsert(self, value.into_inner());
    }
}

#[cfg(feature = "postgres")]
impl GeneTableQuery for PgGeneTable {
    fn select(
        &self,
        match_kind: InterfaceMatch,
        input_types: &[TypeUid],
        output_types: &[TypeUid],
        input_indices: &[u8],
        output_indices: &[u8],
        exclude: &[Signature],
        limit: usize,
    ) -> Result<Vec<Signature>> {
        let input_col = uids_to_column(input_types);
        let output_col = uids_to_column(output_types);
        Self::block_on(self.select_signatures(
            match_kind,
            &input_col,
            &output_col,
            input_indices,
            output_indices,
            exclude,
            limit as i64,
        ))
    }

    fn select_interface(
        &self,
        input_types: &[TypeUid],
        output_types: &[TypeUid],
        input_indices: &[u8],
        output_indices: &[u8],
    ) -> Result<Option<Signature>> {
        let exact = InterfaceMatch::new(crate::queries::TypeMatch::Exact, crate::queries::TypeMatch::Exact);
        let matches = GeneTableQuery::select(
            self,
            exact,
            input_types,
            output_types,
            input_indices,
            output_indices,
            &[],
            1,
        )?;
        Ok(matches.into_iter().next())
    }

    fn initial_generation_query(
        &self,
        input_types: &[TypeUid],
        output_types: &[TypeUid],
        size: usize,
    ) -> Result<Vec<Signature>> {
        let superset =
            InterfaceMatch::new(crate::queries::TypeMatch::Superset, crate::queries::TypeMatch::Superset);
        GeneTableQuery::select(self, superset, input_types, output_types, &[], &[], &[], size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use egp_common::{GcType, GraphType, TypeSpecific};
    use egp_interface::{EndpointClass, Ept, EptStore as EptStoreType, Interface};
    use egp_types::TypesDef;
    use std::sync::Arc;

    fn registry_and_ept() -> (Registry, EptStoreType, Arc<Ept>) {
        let reg = Registry::new();
        let int_uid = TypeUid::concrete(0, 1).unwrap();
        reg.load(vec![TypesDef {
            uid: int_uid,
            name: "int".into(),
            default: None,
            imports: vec![],
            parents: vec![],
            children: vec![],
            ept: vec![int_uid],
            abstract_type: false,
        }])
        .unwrap();
        let store = EptStoreType::new();
        let ept = store.add(vec![int_uid], &reg).unwrap();
        (reg, store, ept)
    }

    fn sample_gc(reg: &Registry, ept: Arc<Ept>) -> GeneticCode {
        let mut cgraph = CGraph::new(egp_common::GraphType::Primitive);
        cgraph
            .set_row(Row::Is, Interface::from_epts(Row::Is, EndpointClass::Src, vec![ept.clone()]).unwrap())
            .unwrap();
        cgraph
            .set_row(Row::Od, Interface::from_epts(Row::Od, EndpointClass::Dst, vec![ept]).unwrap())
            .unwrap();
        egp_graph::stabilize(&mut cgraph, reg, 0).unwrap();
        let created = DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let properties = Properties {
            gc_type: GcType::Codon,
            graph_type: GraphType::Primitive,
            constant: false,
            deterministic: true,
            abstract_type: false,
            side_effects: false,
            static_creation: false,
            type_specific: TypeSpecific::default(),
        };
        let mut gc = GeneticCode::codon(Arc::new(cgraph), created, Uuid::nil(), properties).unwrap();
        gc.seal(reg).unwrap();
        gc
    }

    #[test]
    fn gc_row_round_trips_through_a_memory_table() {
        let (reg, ept_store, ept) = registry_and_ept();
        let gc = sample_gc(&reg, ept);
        let row = GcRow::from_genetic_code(&gc, &reg).unwrap();
        let table = MemoryGeneTable::new();
        table.upsert(row.clone()).unwrap();

        let fetched = table.get(&gc.signature().unwrap()).unwrap().unwrap();
        let rebuilt = fetched.to_genetic_code(&reg, &ept_store).unwrap();
        assert_eq!(rebuilt.signature(), gc.signature());
    }

    #[test]
    fn select_interface_finds_an_exact_match() {
        let (reg, _ept_store, ept) = registry_and_ept();
        let gc = sample_gc(&reg, ept);
        let row = GcRow::from_genetic_code(&gc, &reg).unwrap();
        let table = MemoryGeneTable::new();
        let input_types = row.input_type_uids();
        let output_types = row.output_type_uids();
        let inputs = row.inputs.clone();
        let outputs = row.outputs.clone();
        table.upsert(row).unwrap();

        let found = table
            .select_interface(&input_types, &output_types, &inputs, &outputs)
            .unwrap();
        assert_eq!(found, gc.signature());
    }

    #[test]
    fn empty_table_reports_empty() {
        let table = MemoryGeneTable::new();
        assert!(table.is_empty().unwrap());
        assert_eq!(table.len().unwrap(), 0);
    }
}
