//! Type Registry (§4.1, component A): canonicalises type definitions,
//! resolves template types, and answers ancestor/descendant queries.
//!
//! The parent/child DAG shape and the node-index/value split are grounded on
//! `examples/biuld-naviscope/crates/core/src/model/graph.rs`'s
//! `CodeGraphInner { topology: StableDiGraph<..>, fqn_index: HashMap<..> }`
//! pattern; the BFS ancestor/descendant walk follows
//! `examples/biuld-naviscope/crates/plugin/src/type_system.rs`'s `is_subtype`
//! traversal style.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use egp_common::{CommonError, Result, TypeUid};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{Bfs, IntoNeighbors};
use petgraph::Direction;
use sha2::{Digest, Sha256};

use crate::template::{self, TemplateExpr};
use crate::types_def::TypesDef;

/// Hit/miss counters for the ancestor/descendant memoisation (§4.1a).
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryStats {
    pub hits: u64,
    pub misses: u64,
}

impl RegistryStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Process-wide, thread-safe type lattice (§4.1, §5).
pub struct Registry {
    by_uid: DashMap<TypeUid, TypesDef>,
    by_name: DashMap<String, TypeUid>,
    dag: std::sync::RwLock<StableDiGraph<TypeUid, ()>>,
    node_of: DashMap<TypeUid, NodeIndex>,
    ancestors_cache: DashMap<TypeUid, Arc<HashSet<TypeUid>>>,
    descendants_cache: DashMap<TypeUid, Arc<HashSet<TypeUid>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            by_uid: DashMap::new(),
            by_name: DashMap::new(),
            dag: std::sync::RwLock::new(StableDiGraph::new()),
            node_of: DashMap::new(),
            ancestors_cache: DashMap::new(),
            descendants_cache: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Loads a batch of type definitions, wiring up the parent/child DAG.
    /// Detects cycles eagerly (§4.1: "cycle detected while loading DAG →
    /// `InvariantViolation`").
    pub fn load(&self, types: Vec<TypesDef>) -> Result<()> {
        {
            let mut dag = self.dag.write().unwrap();
            for td in &types {
                let idx = dag.add_node(td.uid);
                self.node_of.insert(td.uid, idx);
                self.by_name.insert(td.name.clone(), td.uid);
            }
            for td in &types {
                let child_idx = *self.node_of.get(&td.uid).unwrap();
                for parent_name in &td.parents {
                    let parent_uid = *self.by_name.get(parent_name).ok_or_else(|| {
                        CommonError::NotFound(format!("parent type {parent_name:?} not loaded"))
                    })?;
                    let parent_idx = *self.node_of.get(&parent_uid).unwrap();
                    dag.add_edge(parent_idx, child_idx, ());
                }
            }
            if petgraph::algo::is_cyclic_directed(&*dag) {
                return Err(CommonError::InvariantViolation(
                    "type relation DAG contains a cycle".into(),
                ));
            }
        }
        for td in types {
            self.by_uid.insert(td.uid, td);
        }
        Ok(())
    }

    pub fn get_by_uid(&self, uid: TypeUid) -> Result<TypesDef> {
        self.by_uid
            .get(&uid)
            .map(|r| r.clone())
            .ok_or_else(|| CommonError::NotFound(format!("type uid {:?} not found", uid.raw())))
    }

    pub fn get_by_name(&self, name: &str) -> Result<TypesDef> {
        let uid = *self
            .by_name
            .get(name)
            .ok_or_else(|| CommonError::NotFound(format!("type {name:?} not found")))?;
        self.get_by_uid(uid)
    }

    /// Ancestor closure over the parent/child DAG, memoised (§4.1, §4.1a).
    pub fn ancestors(&self, uid: TypeUid) -> Result<Arc<HashSet<TypeUid>>> {
        self.closure(uid, Direction::Incoming, &self.ancestors_cache)
    }

    /// Descendant closure, memoised.
    pub fn descendants(&self, uid: TypeUid) -> Result<Arc<HashSet<TypeUid>>> {
        self.closure(uid, Direction::Outgoing, &self.descendants_cache)
    }

    fn closure(
        &self,
        uid: TypeUid,
        dir: Direction,
        cache: &DashMap<TypeUid, Arc<HashSet<TypeUid>>>,
    ) -> Result<Arc<HashSet<TypeUid>>> {
        if let Some(hit) = cache.get(&uid) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let start = *self
            .node_of
            .get(&uid)
            .ok_or_else(|| CommonError::NotFound(format!("type uid {:?} not found", uid.raw())))?;
        let dag = self.dag.read().unwrap();
        let mut set = HashSet::new();
        let mut bfs = Bfs::new(&*dag, start);
        // Bfs only walks outgoing edges; walk the reversed view for ancestors.
        match dir {
            Direction::Outgoing => {
                while let Some(node) = bfs.next(&*dag) {
                    if node != start {
                        set.insert(dag[node]);
                    }
                }
            }
            Direction::Incoming => {
                let reversed = petgraph::visit::Reversed(&*dag);
                let mut bfs = Bfs::new(reversed, start);
                while let Some(node) = bfs.next(reversed) {
                    if node != start {
                        set.insert(dag[node]);
                    }
                }
            }
        }
        let set = Arc::new(set);
        cache.insert(uid, set.clone());
        Ok(set)
    }

    /// Shortest-path distance from `descendant` up to `ancestor` along the
    /// parent DAG, or `None` if `ancestor` is not actually an ancestor of
    /// `descendant`. Used by stabilisation's "shallowest ancestor" tie-break
    /// (§4.4, §9 open question 1).
    pub fn ancestor_depth(&self, descendant: TypeUid, ancestor: TypeUid) -> Result<Option<u32>> {
        if descendant == ancestor {
            return Ok(Some(0));
        }
        let start = *self.node_of.get(&descendant).ok_or_else(|| {
            CommonError::NotFound(format!("type uid {:?} not found", descendant.raw()))
        })?;
        let target = *self.node_of.get(&ancestor).ok_or_else(|| {
            CommonError::NotFound(format!("type uid {:?} not found", ancestor.raw()))
        })?;
        let dag = self.dag.read().unwrap();
        let reversed = petgraph::visit::Reversed(&*dag);
        let mut depth_of = std::collections::HashMap::new();
        depth_of.insert(start, 0u32);
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(start);
        while let Some(node) = queue.pop_front() {
            let depth = depth_of[&node];
            if node == target {
                return Ok(Some(depth));
            }
            for next in reversed.neighbors(node) {
                if let std::collections::hash_map::Entry::Vacant(e) = depth_of.entry(next) {
                    e.insert(depth + 1);
                    queue.push_back(next);
                }
            }
        }
        Ok(None)
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Resolves a template string like `"list[int]"`, synthesising the
    /// compound `TypesDef` on demand if not already registered (§4.1).
    pub fn resolve(&self, expr_str: &str) -> Result<TypesDef> {
        let expr = template::parse(expr_str)?;
        self.resolve_expr(&expr)
    }

    fn resolve_expr(&self, expr: &TemplateExpr) -> Result<TypesDef> {
        let base = self.get_by_name(&expr.base)?;
        if expr.args.is_empty() {
            return Ok(base);
        }
        let children: Vec<TypesDef> = expr
            .args
            .iter()
            .map(|a| self.resolve_expr(a))
            .collect::<Result<_>>()?;

        let synthesised_name = format!(
            "{}[{}]",
            base.name,
            children
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        if let Ok(existing) = self.get_by_name(&synthesised_name) {
            return Ok(existing);
        }

        let uid = synthesise_uid(base.uid, &children)?;
        let mut ept = vec![uid];
        ept.extend(children.iter().map(|c| c.uid));

        let td = TypesDef {
            uid,
            name: synthesised_name.clone(),
            default: None,
            imports: Vec::new(),
            parents: vec![base.name.clone()],
            children: Vec::new(),
            ept,
            abstract_type: children.iter().any(|c| c.abstract_type),
        };

        self.load(vec![td.clone()])?;
        Ok(td)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

/// Deterministic UID synthesis for a template instantiation, keyed on
/// `(base.uid, child.uid, ...)` per §4.1.
fn synthesise_uid(base: TypeUid, children: &[TypesDef]) -> Result<TypeUid> {
    let mut hasher = Sha256::new();
    hasher.update(base.raw().to_le_bytes());
    for c in children {
        hasher.update(c.uid.raw().to_le_bytes());
    }
    let digest = hasher.finalize();
    let xuid = u16::from_le_bytes([digest[0], digest[1]]);
    let tt = children.len().min(7) as u8;
    TypeUid::template(tt.max(1), xuid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(xuid: u16, name: &str, parents: Vec<String>) -> TypesDef {
        TypesDef {
            uid: TypeUid::concrete(0, xuid).unwrap(),
            name: name.to_string(),
            default: None,
            imports: Vec::new(),
            parents,
            children: Vec::new(),
            ept: vec![TypeUid::concrete(0, xuid).unwrap()],
            abstract_type: false,
        }
    }

    fn seeded_registry() -> Registry {
        let reg = Registry::new();
        reg.load(vec![
            leaf(0, "object", vec![]),
            leaf(1, "int", vec!["object".into()]),
            leaf(2, "list", vec!["object".into()]),
        ])
        .unwrap();
        reg
    }

    #[test]
    fn get_by_name_and_uid_agree() {
        let reg = seeded_registry();
        let by_name = reg.get_by_name("int").unwrap();
        let by_uid = reg.get_by_uid(by_name.uid).unwrap();
        assert_eq!(by_name, by_uid);
    }

    #[test]
    fn ancestors_include_root() {
        let reg = seeded_registry();
        let int_uid = reg.get_by_name("int").unwrap().uid;
        let ancestors = reg.ancestors(int_uid).unwrap();
        let object_uid = reg.get_by_name("object").unwrap().uid;
        assert!(ancestors.contains(&object_uid));
    }

    #[test]
    fn descendants_of_root_include_leaves() {
        let reg = seeded_registry();
        let object_uid = reg.get_by_name("object").unwrap().uid;
        let descendants = reg.descendants(object_uid).unwrap();
        assert_eq!(descendants.len(), 2);
    }

    #[test]
    fn closure_is_memoised() {
        let reg = seeded_registry();
        let int_uid = reg.get_by_name("int").unwrap().uid;
        reg.ancestors(int_uid).unwrap();
        reg.ancestors(int_uid).unwrap();
        let stats = reg.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn cycle_is_rejected() {
        let reg = Registry::new();
        let a = leaf(10, "a", vec!["b".into()]);
        let b = leaf(11, "b", vec!["a".into()]);
        assert!(reg.load(vec![a, b]).is_err());
    }

    #[test]
    fn resolve_synthesises_template_type() {
        let reg = seeded_registry();
        let td = reg.resolve("list[int]").unwrap();
        assert_eq!(td.tt(), 1);
        assert_eq!(td.name, "list[int]");
        let again = reg.resolve("list[int]").unwrap();
        assert_eq!(td.uid, again.uid);
    }

    #[test]
    fn resolve_unknown_base_is_not_found() {
        let reg = seeded_registry();
        assert!(reg.resolve("frobnicator[int]").is_err());
    }

    #[test]
    fn ancestor_depth_counts_hops() {
        let reg = seeded_registry();
        let object_uid = reg.get_by_name("object").unwrap().uid;
        let int_uid = reg.get_by_name("int").unwrap().uid;
        assert_eq!(reg.ancestor_depth(int_uid, object_uid).unwrap(), Some(1));
        assert_eq!(reg.ancestor_depth(int_uid, int_uid).unwrap(), Some(0));
        assert_eq!(reg.ancestor_depth(object_uid, int_uid).unwrap(), None);
    }

    #[test]
    fn resolve_malformed_template_is_parse_error() {
        let reg = seeded_registry();
        assert!(reg.resolve("list[").is_err());
    }
}
