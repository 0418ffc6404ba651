//! The Genetic Code record (§3.5, §4.5): a content-addressed computation
//! unit bundling a stable [`CGraph`] with provenance and derived metrics.
//!
//! Grounded on `examples/original_source/egppy/egppy/genetic_code/genetic_code.py`
//! and `egc_class_factory.py`: construction normalises timestamps and
//! installs default NULL signatures, the content address is a SHA-256 over
//! a fixed serialisation of the graph plus its provenance fields.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use egp_common::{Properties, Signature};
use egp_types::Registry;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::cgraph::CGraph;
use crate::error::{GraphError, Result};

/// Static, cheap-to-compute metrics derived at construction time (§6.1:
/// "static metrics").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StaticMetrics {
    pub num_codons: u32,
    pub num_codes: u32,
    pub generation: u32,
    pub code_depth: u32,
}

/// A Genetic Code record (§3.5). Immutable once [`GeneticCode::seal`] has
/// computed its signature; `meta_data`, reference counts, and the dynamic
/// HL/CL metric layers are the documented exception and may still change
/// under the owning cache's lock (§4.5, open question 3).
#[derive(Debug, Clone)]
pub struct GeneticCode {
    cgraph: Arc<CGraph>,
    gca: Signature,
    gcb: Signature,
    ancestora: Signature,
    ancestorb: Signature,
    pgc: Signature,
    created: DateTime<Utc>,
    creator: Uuid,
    properties: Properties,
    meta_data: Option<serde_json::Value>,
    static_metrics: StaticMetrics,
    /// Deferred to the physics/worker layer; carried opaquely (open
    /// question 3).
    hl_metrics: Option<serde_json::Value>,
    cl_metrics: Option<serde_json::Value>,
    signature: Option<Signature>,
}

impl GeneticCode {
    /// Builds an un-sealed GC. `cgraph` must already be stable
    /// (`CGraph::is_stable`); the signature is computed lazily by
    /// [`GeneticCode::seal`] once all provenance fields are final.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cgraph: Arc<CGraph>,
        gca: Signature,
        gcb: Signature,
        ancestora: Signature,
        ancestorb: Signature,
        pgc: Signature,
        created: DateTime<Utc>,
        creator: Uuid,
        properties: Properties,
        meta_data: Option<serde_json::Value>,
    ) -> Result<Self> {
        if !cgraph.is_stable() {
            return Err(GraphError::Structural(
                "GeneticCode requires a stabilised CGraph".into(),
            ));
        }
        if !properties.verify() {
            return Err(GraphError::Common(egp_common::CommonError::InvariantViolation(
                "properties fail verify() invariants".into(),
            )));
        }
        Ok(GeneticCode {
            cgraph,
            gca,
            gcb,
            ancestora,
            ancestorb,
            pgc,
            created,
            creator,
            properties,
            meta_data,
            static_metrics: StaticMetrics::default(),
            hl_metrics: None,
            cl_metrics: None,
            signature: None,
        })
    }

    /// A codon: a primitive GC with no sub-graph or ancestry references
    /// (§3.5: "a GC whose cgraph is primitive and whose `gca`, `gcb`,
    /// `ancestora`, `pgc` are all NULL").
    pub fn codon(
        cgraph: Arc<CGraph>,
        created: DateTime<Utc>,
        creator: Uuid,
        properties: Properties,
    ) -> Result<Self> {
        if cgraph.graph_type() != egp_common::GraphType::Primitive {
            return Err(GraphError::Structural(
                "a codon's cgraph must be PRIMITIVE".into(),
            ));
        }
        GeneticCode::new(
            cgraph,
            Signature::NULL,
            Signature::NULL,
            Signature::NULL,
            Signature::NULL,
            Signature::NULL,
            created,
            creator,
            properties,
            None,
        )
    }

    pub fn cgraph(&self) -> &Arc<CGraph> {
        &self.cgraph
    }

    pub fn gca(&self) -> Signature {
        self.gca
    }

    pub fn gcb(&self) -> Signature {
        self.gcb
    }

    pub fn ancestora(&self) -> Signature {
        self.ancestora
    }

    pub fn ancestorb(&self) -> Signature {
        self.ancestorb
    }

    pub fn pgc(&self) -> Signature {
        self.pgc
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn creator(&self) -> Uuid {
        self.creator
    }

    pub fn properties(&self) -> Properties {
        self.properties
    }

    pub fn meta_data(&self) -> Option<&serde_json::Value> {
        self.meta_data.as_ref()
    }

    pub fn static_metrics(&self) -> StaticMetrics {
        self.static_metrics
    }

    pub fn set_static_metrics(&mut self, metrics: StaticMetrics) {
        self.static_metrics = metrics;
    }

    pub fn hl_metrics(&self) -> Option<&serde_json::Value> {
        self.hl_metrics.as_ref()
    }

    pub fn set_hl_metrics(&mut self, value: Option<serde_json::Value>) {
        self.hl_metrics = value;
    }

    pub fn cl_metrics(&self) -> Option<&serde_json::Value> {
        self.cl_metrics.as_ref()
    }

    pub fn set_cl_metrics(&mut self, value: Option<serde_json::Value>) {
        self.cl_metrics = value;
    }

    /// `true` once [`GeneticCode::seal`] has fixed the content address.
    pub fn is_sealed(&self) -> bool {
        self.signature.is_some()
    }

    pub fn signature(&self) -> Option<Signature> {
        self.signature
    }

    /// Computes and fixes the content address (§4.5). A fixed,
    /// little-endian serialisation concatenating: the cgraph's canonical
    /// JSON, the five reference signatures (`gca, gcb, ancestora,
    /// ancestorb, pgc`; NULLs as 32 zero bytes each), the meta-data as
    /// compressed JSON, a 64-bit microsecond `created`, and the 16-byte
    /// creator UUID.
    ///
    /// spec.md §4.5 describes "the nine 32-byte reference signatures", but
    /// only five are named anywhere in the record (`gca`, `gcb`,
    /// `ancestora`, `ancestorb`, `pgc`); this implementation hashes exactly
    /// those five and treats the "nine" figure as a drafting artefact (see
    /// DESIGN.md).
    pub fn seal(&mut self, registry: &Registry) -> Result<Signature> {
        if let Some(sig) = self.signature {
            return Ok(sig);
        }
        let sig = self.compute_signature(registry)?;
        self.signature = Some(sig);
        Ok(sig)
    }

    fn compute_signature(&self, registry: &Registry) -> Result<Signature> {
        let cgraph_json = self.cgraph.to_canonical_json(registry)?;
        let cgraph_bytes = serde_json::to_vec(&cgraph_json)
            .map_err(|e| GraphError::Common(egp_common::CommonError::Json(e)))?;

        let mut bytes = Vec::with_capacity(cgraph_bytes.len() + 256);
        bytes.extend_from_slice(&cgraph_bytes);
        for sig in [self.gca, self.gcb, self.ancestora, self.ancestorb, self.pgc] {
            bytes.extend_from_slice(sig.as_bytes());
        }

        let meta_bytes = match &self.meta_data {
            Some(v) => {
                let raw = serde_json::to_vec(v)
                    .map_err(|e| GraphError::Common(egp_common::CommonError::Json(e)))?;
                zstd::encode_all(raw.as_slice(), 0)
                    .map_err(|e| GraphError::Structural(format!("meta_data compression failed: {e}")))?
            }
            None => Vec::new(),
        };
        bytes.extend_from_slice(&meta_bytes);

        let micros = self.created.timestamp_micros();
        bytes.extend_from_slice(&micros.to_le_bytes());
        bytes.extend_from_slice(self.creator.as_bytes());

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Ok(Signature::from_bytes(out))
    }

    /// Verifies a claimed signature against a freshly recomputed one
    /// (§7: `SignatureMismatch`).
    pub fn verify_signature(&self, registry: &Registry) -> Result<()> {
        let Some(claimed) = self.signature else {
            return Err(GraphError::Structural("GeneticCode is not sealed".into()));
        };
        let computed = self.compute_signature(registry)?;
        if claimed != computed {
            return Err(GraphError::SignatureMismatch {
                expected: claimed.to_hex(),
                computed: computed.to_hex(),
            });
        }
        Ok(())
    }

    /// A codon is the atomic unit of computation (§3.5): primitive graph
    /// with no sub-graph or ancestry references.
    pub fn is_codon(&self) -> bool {
        self.cgraph.graph_type() == egp_common::GraphType::Primitive
            && self.gca.is_null()
            && self.gcb.is_null()
            && self.ancestora.is_null()
            && self.pgc.is_null()
    }

    /// `true` if this GC carries meta-data (§4.5: "is_meta").
    pub fn is_meta(&self) -> bool {
        self.meta_data.is_some()
    }

    /// `true` if this GC is itself a physical GC, i.e. was produced by
    /// applying a physical GC (`pgc`) to its parents (§4.5: "is_pgc").
    pub fn is_pgc(&self) -> bool {
        !self.pgc.is_null()
    }

    /// `true` for conditional graph shapes (`IF_THEN`/`IF_THEN_ELSE`).
    pub fn is_conditional(&self) -> bool {
        matches!(
            self.cgraph.graph_type(),
            egp_common::GraphType::IfThen | egp_common::GraphType::IfThenElse
        )
    }

    /// Renders the cgraph as a Mermaid flowchart for debugging (§4.5a
    /// expansion). Each destination endpoint is a node, each connection an
    /// edge labelled with its EPT.
    pub fn to_mermaid(&self, registry: &Registry) -> Result<String> {
        let mut out = String::from("flowchart LR\n");
        for conn in self.cgraph.connections() {
            let src_ep = self
                .cgraph
                .row(conn.src.row)
                .and_then(|iface| iface.endpoint(conn.src.idx));
            let label = match src_ep {
                Some(ep) => ep.typ.to_canonical_string(registry)?,
                None => String::from("?"),
            };
            out.push_str(&format!(
                "    {}{:03}[\"{}{}\"] -->|{}| {}{:03}[\"{}{}\"]\n",
                conn.src.row,
                conn.src.idx,
                conn.src.row,
                conn.src.idx,
                label,
                conn.dst.row,
                conn.dst.idx,
                conn.dst.row,
                conn.dst.idx,
            ));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egp_common::{GcType, GraphType as PropsGraphType, TypeSpecific, TypeUid};
    use egp_interface::{EndpointClass, Ept, EptStore, Interface, Row};
    use egp_types::TypesDef;
    use std::sync::Arc;

    fn registry_and_ept() -> (Registry, Arc<Ept>) {
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
        let store = EptStore::new();
        let ept = store.add(vec![int_uid], &reg).unwrap();
        (reg, ept)
    }

    fn codon_properties() -> Properties {
        Properties {
            gc_type: GcType::Codon,
            graph_type: PropsGraphType::Primitive,
            constant: false,
            deterministic: true,
            abstract_type: false,
            side_effects: false,
            static_creation: false,
            type_specific: TypeSpecific::default(),
        }
    }

    /// S1 — codon round-trip (§8 scenario 1).
    #[test]
    fn s1_codon_signature_is_stable_and_reproducible() {
        let (reg, ept) = registry_and_ept();
        let mut cgraph = CGraph::new(egp_common::GraphType::Primitive);
        cgraph
            .set_row(
                Row::Is,
                Interface::from_epts(Row::Is, EndpointClass::Src, vec![ept.clone(), ept.clone()])
                    .unwrap(),
            )
            .unwrap();
        cgraph
            .set_row(
                Row::Od,
                Interface::from_epts(Row::Od, EndpointClass::Dst, vec![ept]).unwrap(),
            )
            .unwrap();
        crate::stabilize::stabilize(&mut cgraph, &reg, 0).unwrap();

        let created = DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let creator = Uuid::nil();

        let mut gc = GeneticCode::codon(Arc::new(cgraph), created, creator, codon_properties())
            .unwrap();
        assert!(gc.is_codon());
        let sig1 = gc.seal(&reg).unwrap();

        // Rebuilding the same inputs independently must reproduce the GC's
        // content address (§8 property 2).
        let sig2 = gc.compute_signature(&reg).unwrap();
        assert_eq!(sig1, sig2);
        gc.verify_signature(&reg).unwrap();
    }

    #[test]
    fn tampering_with_created_changes_signature() {
        let (reg, ept) = registry_and_ept();
        let mut cgraph = CGraph::new(egp_common::GraphType::Primitive);
        cgraph
            .set_row(Row::Is, Interface::from_epts(Row::Is, EndpointClass::Src, vec![ept.clone()]).unwrap())
            .unwrap();
        cgraph
            .set_row(Row::Od, Interface::from_epts(Row::Od, EndpointClass::Dst, vec![ept]).unwrap())
            .unwrap();
        crate::stabilize::stabilize(&mut cgraph, &reg, 0).unwrap();
        let cgraph = Arc::new(cgraph);

        let t1 = DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let t2 = DateTime::parse_from_rfc3339("2021-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let creator = Uuid::nil();

        let mut a = GeneticCode::codon(cgraph.clone(), t1, creator, codon_properties()).unwrap();
        let mut b = GeneticCode::codon(cgraph, t2, creator, codon_properties()).unwrap();
        assert_ne!(a.seal(&reg).unwrap(), b.seal(&reg).unwrap());
    }

    #[test]
    fn non_primitive_graph_cannot_be_a_codon() {
        let (reg, ept) = registry_and_ept();
        let mut cgraph = CGraph::new(egp_common::GraphType::Standard);
        cgraph
            .set_row(Row::Is, Interface::from_epts(Row::Is, EndpointClass::Src, vec![ept.clone()]).unwrap())
            .unwrap();
        cgraph
            .set_row(Row::Od, Interface::from_epts(Row::Od, EndpointClass::Dst, vec![ept.clone()]).unwrap())
            .unwrap();
        cgraph
            .set_row(Row::Ad, Interface::from_epts(Row::Ad, EndpointClass::Dst, vec![ept.clone()]).unwrap())
            .unwrap();
        cgraph
            .set_row(Row::As, Interface::from_epts(Row::As, EndpointClass::Src, vec![ept.clone()]).unwrap())
            .unwrap();
        cgraph
            .set_row(Row::Bd, Interface::from_epts(Row::Bd, EndpointClass::Dst, vec![ept.clone()]).unwrap())
            .unwrap();
        cgraph.set_row(Row::Bs, Interface::from_epts(Row::Bs, EndpointClass::Src, vec![ept]).unwrap()).unwrap();
        crate::stabilize::stabilize(&mut cgraph, &reg, 0).unwrap();

        let created = Utc::now();
        let res = GeneticCode::codon(Arc::new(cgraph), created, Uuid::nil(), codon_properties());
        assert!(res.is_err());
    }
}
