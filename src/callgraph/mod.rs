//! # callgraph
//!
//! Call graph over methods. Nodes are `MethodId`s, each edge is labelled with the
//! call kind and the call site it comes from.
//! The same structure is filled by the CHA builder (`cha`) and on the fly by the
//! pointer analysis.
//! Edge (A, B, [(K, S)]) means method A calls method B with kind K at call site S;
//! several call sites between the same pair of methods share one `GraphMap` edge.

pub mod cha;

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::dot::{Config, Dot};
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Bfs;
use petgraph::{Directed, Graph};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::ir::{CallKind, MethodId, Program, StmtRef};

/// The method a whole-program analysis starts from: the `entry` option when given,
/// the program's main method otherwise.
pub fn entry_method(program: &Program, config: &AnalysisConfig) -> Result<MethodId> {
    match config.options.get("entry") {
        Some(signature) => program.method_by_signature(signature),
        None => program.main_method().ok_or(AnalysisError::MissingEntry),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub kind: CallKind,
    pub call_site: StmtRef,
    pub callee: MethodId,
}

impl Edge {
    pub fn new(kind: CallKind, call_site: StmtRef, callee: MethodId) -> Self {
        Self {
            kind,
            call_site,
            callee,
        }
    }

    pub fn caller(&self) -> MethodId {
        self.call_site.method
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    entry_methods: Vec<MethodId>,
    /// Reachable methods in discovery order.
    reachable: Vec<MethodId>,
    reachable_set: HashSet<MethodId>,
    edges: Vec<Edge>,
    edge_set: HashSet<Edge>,
    callees: HashMap<StmtRef, BTreeSet<MethodId>>,
    callers: HashMap<MethodId, BTreeSet<StmtRef>>,
    graph: DiGraphMap<MethodId, Vec<(CallKind, StmtRef)>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry_method(&mut self, method: MethodId) {
        if !self.entry_methods.contains(&method) {
            self.entry_methods.push(method);
        }
    }

    pub fn entry_methods(&self) -> &[MethodId] {
        &self.entry_methods
    }

    /// Returns true if `method` was not reachable before.
    pub fn add_reachable_method(&mut self, method: MethodId) -> bool {
        if !self.reachable_set.insert(method) {
            return false;
        }
        self.reachable.push(method);
        self.graph.add_node(method);
        true
    }

    pub fn contains(&self, method: MethodId) -> bool {
        self.reachable_set.contains(&method)
    }

    pub fn reachable_methods(&self) -> impl Iterator<Item = MethodId> + '_ {
        self.reachable.iter().copied()
    }

    pub fn num_reachable_methods(&self) -> usize {
        self.reachable.len()
    }

    /// Returns true if the edge is new. Adding an edge does not make the callee
    /// reachable.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if !self.edge_set.insert(edge) {
            return false;
        }
        self.edges.push(edge);
        self.callees
            .entry(edge.call_site)
            .or_default()
            .insert(edge.callee);
        self.callers
            .entry(edge.callee)
            .or_default()
            .insert(edge.call_site);
        let caller = edge.caller();
        if let Some(weight) = self.graph.edge_weight_mut(caller, edge.callee) {
            weight.push((edge.kind, edge.call_site));
        } else {
            self.graph
                .add_edge(caller, edge.callee, vec![(edge.kind, edge.call_site)]);
        }
        true
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn callees_of(&self, call_site: StmtRef) -> impl Iterator<Item = MethodId> + '_ {
        self.callees.get(&call_site).into_iter().flatten().copied()
    }

    /// Call sites that may invoke `method`.
    pub fn callers_of(&self, method: MethodId) -> impl Iterator<Item = StmtRef> + '_ {
        self.callers.get(&method).into_iter().flatten().copied()
    }

    pub fn edges_out_of(&self, call_site: StmtRef) -> Vec<Edge> {
        self.edges
            .iter()
            .filter(|e| e.call_site == call_site)
            .copied()
            .collect()
    }

    pub fn edges_into(&self, method: MethodId) -> Vec<Edge> {
        self.edges
            .iter()
            .filter(|e| e.callee == method)
            .copied()
            .collect()
    }

    /// Methods called from anywhere in `method`.
    pub fn callee_methods_of(&self, method: MethodId) -> BTreeSet<MethodId> {
        if !self.graph.contains_node(method) {
            return BTreeSet::new();
        }
        self.graph.neighbors(method).collect()
    }

    /// Methods transitively callable from `root`, in BFS order, `root` included.
    pub fn reachable_from(&self, root: MethodId) -> Vec<MethodId> {
        if !self.graph.contains_node(root) {
            return vec![];
        }
        let mut methods = Vec::new();
        let mut bfs = Bfs::new(&self.graph, root);
        while let Some(method) = bfs.next(&self.graph) {
            methods.push(method);
        }
        methods
    }

    /// Print the call graph in dot format, nodes labelled with method signatures.
    pub fn dot(&self, program: &Program) -> String {
        let mut graph: Graph<String, String, Directed> = Graph::new();
        let mut indices = HashMap::new();
        for method in self.reachable.iter() {
            indices.insert(*method, graph.add_node(program.method_signature(*method)));
        }
        for (caller, callee, sites) in self.graph.all_edges() {
            if let (Some(&from), Some(&to)) = (indices.get(&caller), indices.get(&callee)) {
                let label: Vec<String> = sites
                    .iter()
                    .map(|(kind, site)| format!("{:?}@{}", kind, site.index))
                    .collect();
                graph.add_edge(from, to, label.join(","));
            }
        }
        format!("{:?}", Dot::with_config(&graph, &[Config::GraphContentOnly]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn m(i: usize) -> MethodId {
        MethodId(i)
    }

    #[test]
    fn test_add_edge_is_idempotent() {
        let mut cg = CallGraph::new();
        cg.add_entry_method(m(0));
        assert!(cg.add_reachable_method(m(0)));
        assert!(!cg.add_reachable_method(m(0)));

        let site = StmtRef::new(m(0), 3);
        let edge = Edge::new(CallKind::Virtual, site, m(1));
        assert!(cg.add_edge(edge));
        assert!(!cg.add_edge(edge));
        assert!(cg.add_edge(Edge::new(CallKind::Virtual, site, m(2))));
        assert!(cg.add_edge(Edge::new(CallKind::Static, StmtRef::new(m(0), 5), m(1))));

        assert_eq!(cg.num_edges(), 3);
        assert_eq!(cg.callees_of(site).collect::<Vec<_>>(), vec![m(1), m(2)]);
        assert_eq!(cg.edges_out_of(site).len(), 2);
        assert_eq!(cg.callers_of(m(1)).count(), 2);
        assert_eq!(cg.edges_into(m(1)).len(), 2);
        assert_eq!(
            cg.callee_methods_of(m(0)).into_iter().collect::<Vec<_>>(),
            vec![m(1), m(2)]
        );
        // edges alone do not make methods reachable
        assert!(!cg.contains(m(1)));
        assert_eq!(cg.entry_methods(), &[m(0)]);
    }

    #[test]
    fn test_reachable_from() {
        let mut cg = CallGraph::new();
        for i in 0..4 {
            cg.add_reachable_method(m(i));
        }
        cg.add_edge(Edge::new(CallKind::Static, StmtRef::new(m(0), 0), m(1)));
        cg.add_edge(Edge::new(CallKind::Static, StmtRef::new(m(1), 0), m(2)));
        cg.add_edge(Edge::new(CallKind::Static, StmtRef::new(m(2), 0), m(0)));
        assert_eq!(cg.reachable_from(m(1)).len(), 3);
        assert_eq!(cg.reachable_from(m(3)), vec![m(3)]);
        assert!(cg.reachable_from(m(9)).is_empty());
        assert_eq!(cg.reachable_methods().count(), 4);
    }
}
