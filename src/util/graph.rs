use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

/// Directed graph stored as successor sets. Insertion is idempotent: adding an
/// existing edge changes nothing and reports `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph<N: Hash + Eq + Copy + Debug> {
    pub nodes: HashSet<N>,
    pub edges: HashMap<N, HashSet<N>>,
}

impl<N: Hash + Eq + Copy + Debug> Default for Graph<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Hash + Eq + Copy + Debug> Graph<N> {
    pub fn new() -> Self {
        Self {
            nodes: HashSet::new(),
            edges: HashMap::new(),
        }
    }

    pub fn add_node(&mut self, node: N) -> bool {
        self.nodes.insert(node)
    }

    /// Returns true iff the edge `from -> to` was not present before.
    pub fn add_edge(&mut self, from: N, to: N) -> bool {
        self.nodes.insert(from);
        self.nodes.insert(to);
        self.edges.entry(from).or_default().insert(to)
    }

    pub fn contains_edge(&self, from: N, to: N) -> bool {
        self.edges
            .get(&from)
            .map(|tos| tos.contains(&to))
            .unwrap_or(false)
    }

    pub fn succs_of(&self, node: N) -> impl Iterator<Item = N> + '_ {
        self.edges.get(&node).into_iter().flatten().copied()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(HashSet::len).sum()
    }

    pub fn debug_print(&self) {
        for (from, tos) in self.edges.iter() {
            log::trace!("{:?}: {:?}", from, tos);
        }
    }
}
