//! Connection Graph (§3.4, §4.4, component D): the row-structured,
//! typed directed graph carried by every GC.
//!
//! Grounded on `examples/original_source/egppy/egppy/c_graph/c_graph_abc.py`
//! and `c_graph_constants.py` for the row/graph-type semantics, with the
//! arena-of-`(row, idx)`-indices technique from
//! `examples/biuld-naviscope/crates/core/src/model/graph.rs`'s
//! `CodeGraphInner { topology, fqn_index, ... }` shape (§9: "implement with
//! an arena per graph plus integer indices, not pointers").

use std::collections::HashMap;

use egp_common::{Cacheable, DirtyState, Freezable, GraphType};
use egp_interface::{Endpoint, EndpointClass, EndpointRef, Ept, EptStore, Interface, Row};

use crate::connection::{self, Connection};
use crate::error::{GraphError, Result};

/// The permitted row set for a given `graph_type` (§3.4 table, §4.4 step 1).
pub fn permitted_rows(gt: GraphType) -> &'static [Row] {
    use Row::*;
    match gt {
        GraphType::Primitive | GraphType::Empty => &[Is, Od],
        GraphType::Standard => &[Is, Od, Ad, As, Bd, Bs],
        GraphType::IfThen => &[Is, Od, Ad, As, Bd, Bs, Fd],
        GraphType::IfThenElse => &[Is, Od, Ad, As, Bd, Bs, Fd, Pd, Ps],
        GraphType::ForLoop => &[Is, Od, Ad, As, Ls, Ld],
        GraphType::WhileLoop => &[Is, Od, Ad, As, Ls, Ld, Wd],
    }
}

/// Source rows legal for a given destination row under `graph_type` (§4.4
/// step 3: "in rows permitted to feed `Od`").
pub fn permitted_sources(dst: Row, gt: GraphType) -> &'static [Row] {
    use Row::*;
    match (gt, dst) {
        (GraphType::Standard, Ad) => &[Is],
        (GraphType::Standard, Bd) => &[Is, As],
        (GraphType::Standard, Od) => &[Is, As, Bs],

        (GraphType::IfThen, Fd) => &[Is],
        (GraphType::IfThen, Ad) => &[Is],
        (GraphType::IfThen, Bd) => &[Is, As],
        (GraphType::IfThen, Od) => &[Is, As, Bs],

        (GraphType::IfThenElse, Fd) => &[Is],
        (GraphType::IfThenElse, Ad) => &[Is],
        (GraphType::IfThenElse, Bd) => &[Is, As],
        (GraphType::IfThenElse, Pd) => &[Is],
        (GraphType::IfThenElse, Od) => &[Is, As, Bs, Ps],

        (GraphType::ForLoop, Ld) => &[Is, As],
        (GraphType::ForLoop, Ad) => &[Is, Ls],
        (GraphType::ForLoop, Od) => &[Is, As],

        (GraphType::WhileLoop, Ld) => &[Is, As],
        (GraphType::WhileLoop, Ad) => &[Is, Ls],
        (GraphType::WhileLoop, Wd) => &[Is, As],
        (GraphType::WhileLoop, Od) => &[Is, As],

        (GraphType::Empty, Od) => &[Is],
        (GraphType::Primitive, _) => &[],

        _ => &[],
    }
}

/// Rows whose width is externally constrained: stabilisation may not widen
/// them by appending a fresh endpoint (§4.4 step 3, "the `fixed_interface`
/// flag").
pub fn is_fixed_row(row: Row) -> bool {
    matches!(row, Row::Is | Row::Od)
}

/// The destination-row wiring order used by [`crate::stabilize::stabilize`]
/// (§4.4 steps 3-4: outputs first, then sub-graph destinations in
/// declaration order). `Fd`/`Wd` gate their branch/loop and are wired
/// before `Od` so a downstream type-cast meta-codon could, in principle,
/// consult the selector — spec.md's explicit step list only names
/// `Od, Ad, Bd, Pd`, so this ordering is this implementation's resolution
/// of that gap (see DESIGN.md).
pub fn stabilize_order(gt: GraphType) -> &'static [Row] {
    use Row::*;
    match gt {
        GraphType::Standard => &[Od, Ad, Bd],
        GraphType::IfThen => &[Fd, Od, Ad, Bd],
        GraphType::IfThenElse => &[Fd, Od, Ad, Bd, Pd],
        GraphType::ForLoop => &[Od, Ad, Ld],
        GraphType::WhileLoop => &[Wd, Od, Ad, Ld],
        GraphType::Empty => &[Od],
        GraphType::Primitive => &[],
    }
}

/// A map-like read accessor result for [`CGraph::get`]'s small key grammar
/// (§4.4: `"A"` / `"Ad"` / `"Adc"` / `"A003d"`).
#[derive(Debug)]
pub enum GraphValue<'a> {
    Interface(&'a Interface),
    Connections(Vec<&'a Connection>),
    Endpoint(&'a Endpoint),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraphKey {
    Interface(Row),
    Connections(Row),
    Endpoint(Row, u8),
}

fn row_from_letter_dir(letter: u8, dir: u8) -> Result<Row> {
    use Row::*;
    Ok(match (letter as char, dir as char) {
        ('I', 's') => Is,
        ('A', 'd') => Ad,
        ('B', 'd') => Bd,
        ('A', 's') => As,
        ('B', 's') => Bs,
        ('F', 'd') => Fd,
        ('L', 's') => Ls,
        ('L', 'd') => Ld,
        ('W', 'd') => Wd,
        ('P', 'd') => Pd,
        ('P', 's') => Ps,
        ('O', 'd') => Od,
        ('U', 'd') => Ud,
        (l, d) => {
            return Err(GraphError::Common(egp_common::CommonError::Parse(format!(
                "invalid row code {l}{d}"
            ))))
        }
    })
}

fn parse_key(key: &str) -> Result<GraphKey> {
    let bytes = key.as_bytes();
    match bytes.len() {
        2 => Ok(GraphKey::Interface(row_from_letter_dir(bytes[0], bytes[1])?)),
        3 if bytes[2] == b'c' => {
            Ok(GraphKey::Connections(row_from_letter_dir(bytes[0], bytes[1])?))
        }
        5 if bytes[1..4].iter().all(u8::is_ascii_digit) => {
            let idx: u8 = std::str::from_utf8(&bytes[1..4])
                .unwrap()
                .parse()
                .map_err(|_| {
                    GraphError::Common(egp_common::CommonError::Parse(format!(
                        "invalid endpoint index in key {key:?}"
                    )))
                })?;
            Ok(GraphKey::Endpoint(row_from_letter_dir(bytes[0], bytes[4])?, idx))
        }
        _ => Err(GraphError::Common(egp_common::CommonError::Parse(format!(
            "malformed graph key {key:?}"
        )))),
    }
}

/// The Connection Graph (§3.4, §3.5's `cgraph` field).
#[derive(Debug, Clone)]
pub struct CGraph {
    graph_type: GraphType,
    rows: HashMap<Row, Interface>,
    connections: Vec<std::sync::Arc<Connection>>,
    frozen: bool,
    state: DirtyState,
}

impl CGraph {
    pub fn new(graph_type: GraphType) -> Self {
        CGraph {
            graph_type,
            rows: HashMap::new(),
            connections: Vec::new(),
            frozen: false,
            state: DirtyState::new(),
        }
    }

    pub fn graph_type(&self) -> GraphType {
        self.graph_type
    }

    pub fn is_stable(&self) -> bool {
        self.frozen
    }

    pub fn connections(&self) -> &[std::sync::Arc<Connection>] {
        &self.connections
    }

    pub fn rows(&self) -> &HashMap<Row, Interface> {
        &self.rows
    }

    /// Sets (or replaces) a row's interface. Only permitted before freezing
    /// (§3.4 lifecycle: "constructed mutable, then explicitly stabilized").
    pub fn set_row(&mut self, row: Row, interface: Interface) -> Result<()> {
        if self.frozen {
            return Err(GraphError::Common(egp_common::CommonError::InvariantViolation(
                "cannot mutate a frozen CGraph".into(),
            )));
        }
        if interface.row() != row {
            return Err(GraphError::Structural(format!(
                "interface declares row {} but is being installed at {row}",
                interface.row()
            )));
        }
        self.rows.insert(row, interface);
        self.state.mark_dirty();
        Ok(())
    }

    pub fn row(&self, row: Row) -> Option<&Interface> {
        self.rows.get(&row)
    }

    pub(crate) fn row_mut(&mut self, row: Row) -> Option<&mut Interface> {
        self.rows.get_mut(&row)
    }

    /// Returns the row's interface, creating an empty one of the given
    /// class if absent (used to materialise `Ud` on demand, §4.4 step 5).
    pub(crate) fn ensure_row(&mut self, row: Row, class: EndpointClass) -> &mut Interface {
        self.rows
            .entry(row)
            .or_insert_with(|| Interface::from_epts(row, class, Vec::new()).unwrap())
    }

    /// The small map-like key grammar of §4.4: `"Ad"` (interface), `"Adc"`
    /// (connections into `Ad`), `"A003d"` (single endpoint).
    pub fn get(&self, key: &str) -> Result<GraphValue<'_>> {
        match parse_key(key)? {
            GraphKey::Interface(row) => {
                let iface = self.rows.get(&row).ok_or_else(|| {
                    GraphError::Common(egp_common::CommonError::NotFound(format!(
                        "row {row} is not present in this graph"
                    )))
                })?;
                Ok(GraphValue::Interface(iface))
            }
            GraphKey::Connections(row) => Ok(GraphValue::Connections(
                self.connections.iter().filter(|c| c.dst.row == row).map(AsRef::as_ref).collect(),
            )),
            GraphKey::Endpoint(row, idx) => {
                let iface = self.rows.get(&row).ok_or_else(|| {
                    GraphError::Common(egp_common::CommonError::NotFound(format!(
                        "row {row} is not present in this graph"
                    )))
                })?;
                let ep = iface.endpoint(idx).ok_or_else(|| {
                    GraphError::Common(egp_common::CommonError::NotFound(format!(
                        "endpoint {row}{idx:03} out of range"
                    )))
                })?;
                Ok(GraphValue::Endpoint(ep))
            }
        }
    }

    /// Row-combination validation (§4.4 step 1).
    pub(crate) fn validate_rows(&self) -> Result<()> {
        let permitted: std::collections::HashSet<Row> =
            permitted_rows(self.graph_type).iter().copied().collect();
        for row in self.rows.keys() {
            if !permitted.contains(row) && *row != Row::Ud {
                return Err(GraphError::Structural(format!(
                    "row {row} is not permitted for graph type {:?}",
                    self.graph_type
                )));
            }
        }
        if !self.rows.contains_key(&Row::Is) || !self.rows.contains_key(&Row::Od) {
            return Err(GraphError::Structural(
                "Is and Od must be set before stabilisation".into(),
            ));
        }
        for (d, s) in [(Row::Ad, Row::As), (Row::Bd, Row::Bs), (Row::Pd, Row::Ps)] {
            if self.rows.contains_key(&d) != self.rows.contains_key(&s) {
                return Err(GraphError::Structural(format!(
                    "{d} and {s} must be present together"
                )));
            }
        }
        match self.graph_type {
            GraphType::IfThen | GraphType::IfThenElse if !self.rows.contains_key(&Row::Fd) => {
                return Err(GraphError::Structural(
                    "Fd is required for conditional graph types".into(),
                ));
            }
            GraphType::IfThen if self.rows.contains_key(&Row::Pd) => {
                return Err(GraphError::Structural(
                    "Pd is only permitted for IF_THEN_ELSE".into(),
                ));
            }
            GraphType::WhileLoop if !self.rows.contains_key(&Row::Wd) => {
                return Err(GraphError::Structural(
                    "Wd is required for WHILE_LOOP".into(),
                ));
            }
            _ => {}
        }
        Ok(())
    }

    /// Invalid-reference sweep (§4.4 step 2): drop refs pointing at rows
    /// that are not legal sources for the referencing row.
    pub(crate) fn sweep_invalid_refs(&mut self) {
        let dst_rows: Vec<Row> = self.rows.keys().copied().collect();
        for dst_row in dst_rows {
            let legal = permitted_sources(dst_row, self.graph_type);
            if let Some(iface) = self.rows.get_mut(&dst_row) {
                if iface.class() != EndpointClass::Dst {
                    continue;
                }
                for idx in 0..iface.len() as u8 {
                    let bad = iface
                        .endpoint(idx)
                        .map(|ep| ep.refs.iter().any(|r| !legal.contains(&r.row)))
                        .unwrap_or(false);
                    if bad {
                        let kept: Vec<EndpointRef> = iface
                            .endpoint(idx)
                            .unwrap()
                            .refs
                            .iter()
                            .filter(|r| legal.contains(&r.row))
                            .copied()
                            .collect();
                        let _ = iface.set_refs(idx, kept);
                    }
                }
            }
        }
    }

    /// Finalises the frozen state: freezes every row's interface and
    /// derives the interned connection list from destination refs (§4.4
    /// step 7).
    pub(crate) fn freeze_all(&mut self) -> Result<()> {
        for iface in self.rows.values_mut() {
            iface.freeze();
        }
        let store = connection::global();
        let mut conns = Vec::new();
        for iface in self.rows.values() {
            if iface.class() != EndpointClass::Dst {
                continue;
            }
            for ep in iface.endpoints() {
                for r in &ep.refs {
                    conns.push(store.add(Connection::new(r.row, r.idx, ep.row, ep.idx)));
                }
            }
        }
        self.connections = conns;
        self.frozen = true;
        self.state.mark_clean();
        Ok(())
    }

    /// Canonical JSON encoding (§6.2): `{ "<DstRow>": [[src_row, src_idx,
    /// ept_string], ...], ... }`, one entry per destination endpoint in
    /// index order (`null` if still unconnected), every permitted
    /// destination row present, `Ud` included when non-empty.
    pub fn to_canonical_json(
        &self,
        registry: &egp_types::Registry,
    ) -> Result<serde_json::Value> {
        let mut map = serde_json::Map::new();
        let mut dst_rows: Vec<Row> = permitted_rows(self.graph_type)
            .iter()
            .copied()
            .filter(|r| r.class() == EndpointClass::Dst)
            .collect();
        if self.rows.contains_key(&Row::Ud) {
            dst_rows.push(Row::Ud);
        }
        for row in dst_rows {
            let mut arr = Vec::new();
            if let Some(iface) = self.rows.get(&row) {
                for ep in iface.endpoints() {
                    match ep.refs.first() {
                        Some(r) => {
                            let src_iface = self.rows.get(&r.row).ok_or_else(|| {
                                GraphError::Structural(format!(
                                    "connection references unknown row {}",
                                    r.row
                                ))
                            })?;
                            let src_ep = src_iface.endpoint(r.idx).ok_or_else(|| {
                                GraphError::Structural(
                                    "connection references unknown endpoint".into(),
                                )
                            })?;
                            let ept_str = src_ep.typ.to_canonical_string(registry)?;
                            arr.push(serde_json::json!([r.row.as_str(), r.idx, ept_str]));
                        }
                        None => arr.push(serde_json::Value::Null),
                    }
                }
            }
            map.insert(row.as_str().to_string(), serde_json::Value::Array(arr));
        }
        Ok(serde_json::Value::Object(map))
    }

    /// Reconstructs a stabilised `CGraph` from its canonical JSON encoding
    /// (§6.2), the inverse of [`CGraph::to_canonical_json`]. The canonical
    /// form does not separately record a destination endpoint's own type, so
    /// each destination endpoint's type is taken from its connected source's
    /// EPT; this is exact for graphs produced by this crate's own
    /// stabilisation (invariant 1 guarantees no unconnected `Ad`/`Bd`/`Od`/
    /// `Pd` entries survive it) and is treated as an error otherwise rather
    /// than guessed at.
    pub fn from_canonical_json(
        json: &serde_json::Value,
        graph_type: GraphType,
        registry: &egp_types::Registry,
        ept_store: &EptStore,
    ) -> Result<CGraph> {
        let obj = json.as_object().ok_or_else(|| {
            GraphError::Structural("canonical graph encoding must be a JSON object".into())
        })?;

        let mut src_epts: HashMap<Row, HashMap<u8, std::sync::Arc<Ept>>> = HashMap::new();
        let mut dst_endpoints: HashMap<Row, Vec<Option<(Row, u8, std::sync::Arc<Ept>)>>> =
            HashMap::new();

        for (dst_row_str, arr) in obj {
            let dst_row = Row::from_str(dst_row_str).ok_or_else(|| {
                GraphError::Common(egp_common::CommonError::Parse(format!(
                    "unknown row code {dst_row_str:?}"
                )))
            })?;
            let arr = arr.as_array().ok_or_else(|| {
                GraphError::Structural(format!("row {dst_row} entry must be an array"))
            })?;
            let mut endpoints = Vec::with_capacity(arr.len());
            for (idx, entry) in arr.iter().enumerate() {
                if entry.is_null() {
                    endpoints.push(None);
                    continue;
                }
                let triple = entry.as_array().ok_or_else(|| {
                    GraphError::Structural(format!(
                        "{dst_row}{idx:03} entry must be an array or null"
                    ))
                })?;
                if triple.len() != 3 {
                    return Err(GraphError::Structural(format!(
                        "{dst_row}{idx:03} entry must have exactly 3 elements"
                    )));
                }
                let src_row_str = triple[0].as_str().ok_or_else(|| {
                    GraphError::Structural(format!(
                        "{dst_row}{idx:03} source row must be a string"
                    ))
                })?;
                let src_row = Row::from_str(src_row_str).ok_or_else(|| {
                    GraphError::Common(egp_common::CommonError::Parse(format!(
                        "unknown row code {src_row_str:?}"
                    )))
                })?;
                let src_idx = triple[1].as_u64().ok_or_else(|| {
                    GraphError::Structural(format!(
                        "{dst_row}{idx:03} source index must be a number"
                    ))
                })? as u8;
                let ept_str = triple[2].as_str().ok_or_else(|| {
                    GraphError::Structural(format!("{dst_row}{idx:03} EPT must be a string"))
                })?;
                let td = registry.resolve(ept_str)?;
                let ept = ept_store.add(td.ept.clone(), registry)?;

                src_epts.entry(src_row).or_default().insert(src_idx, ept.clone());
                endpoints.push(Some((src_row, src_idx, ept)));
            }
            dst_endpoints.insert(dst_row, endpoints);
        }

        let mut graph = CGraph::new(graph_type);

        // Source rows are only implicitly present in the canonical form (as
        // the targets of destination refs), so rebuild them first, requiring
        // contiguous 0..=max index coverage: a successfully stabilised graph
        // mirrors every dangling source onto `Ud`, so every source endpoint
        // ends up referenced by something.
        let mut src_rows: Vec<Row> = src_epts.keys().copied().collect();
        src_rows.sort();
        for row in src_rows {
            let by_idx = &src_epts[&row];
            let max_idx = *by_idx.keys().max().unwrap();
            let mut epts = Vec::with_capacity(max_idx as usize + 1);
            for i in 0..=max_idx {
                let ept = by_idx.get(&i).ok_or_else(|| {
                    GraphError::Structural(format!(
                        "row {row} is missing endpoint index {i}, source indices must be contiguous"
                    ))
                })?;
                epts.push(ept.clone());
            }
            let iface = Interface::from_epts(row, EndpointClass::Src, epts)?;
            graph.set_row(row, iface)?;
        }

        let mut dst_rows: Vec<Row> = dst_endpoints.keys().copied().collect();
        dst_rows.sort();
        for row in dst_rows {
            let entries = &dst_endpoints[&row];
            if entries.is_empty() {
                continue;
            }
            let endpoints: Vec<Endpoint> = entries
                .iter()
                .enumerate()
                .map(|(idx, entry)| {
                    let (refs, typ) = match entry {
                        Some((src_row, src_idx, ept)) => {
                            (vec![EndpointRef::new(*src_row, *src_idx)], ept.clone())
                        }
                        None => {
                            return Err(GraphError::Structural(format!(
                                "{row}{idx:03} is unconnected; canonical JSON cannot recover \
                                 its type without a connected source"
                            )));
                        }
                    };
                    Ok(Endpoint { row, idx: idx as u8, class: EndpointClass::Dst, typ, refs })
                })
                .collect::<Result<_>>()?;
            let iface = Interface::from_endpoints(endpoints)?;
            graph.set_row(row, iface)?;
        }

        graph.validate_rows()?;
        graph.freeze_all()?;
        Ok(graph)
    }
}

impl Cacheable for CGraph {
    fn is_dirty(&self) -> bool {
        self.state.is_dirty()
    }
    fn mark_dirty(&mut self) {
        self.state.mark_dirty();
    }
    fn mark_clean(&mut self) {
        self.state.mark_clean();
    }
    fn seq_num(&self) -> i64 {
        self.state.seq_num()
    }
    fn touch(&mut self) {
        self.state.touch();
    }
    fn verify(&self) -> bool {
        self.validate_rows().is_ok()
    }
    fn consistency(&self) -> bool {
        self.frozen && self.verify()
    }
}

impl Freezable for CGraph {
    fn freeze(&mut self) {
        let _ = self.freeze_all();
    }
    fn is_frozen(&self) -> bool {
        self.frozen
    }
}
