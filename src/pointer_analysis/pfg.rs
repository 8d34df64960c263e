//! Pointer flow graph and the propagation work list.
//!
//! An edge `s -> t` means every object `s` may point to, `t` may point to as well.

use std::collections::{HashMap, VecDeque};

use super::heap::ObjId;
use super::pts::PointsToSet;
use crate::ir::{FieldId, VarId};
use crate::util::Graph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pointer {
    Var(VarId),
    StaticField(FieldId),
    InstanceField(ObjId, FieldId),
    /// All elements of an array object share one pointer.
    ArrayIndex(ObjId),
}

#[derive(Debug, Default)]
pub struct PointerFlowGraph {
    graph: Graph<Pointer>,
    pts: HashMap<Pointer, PointsToSet>,
}

impl PointerFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the edge was not present before.
    pub fn add_edge(&mut self, source: Pointer, target: Pointer) -> bool {
        self.graph.add_edge(source, target)
    }

    pub fn contains_edge(&self, source: Pointer, target: Pointer) -> bool {
        self.graph.contains_edge(source, target)
    }

    pub fn succs_of(&self, pointer: Pointer) -> Vec<Pointer> {
        self.graph.succs_of(pointer).collect()
    }

    pub fn num_edges(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn points_to_set_of(&self, pointer: Pointer) -> Option<&PointsToSet> {
        self.pts.get(&pointer)
    }

    pub fn points_to_set_mut(&mut self, pointer: Pointer) -> &mut PointsToSet {
        self.graph.add_node(pointer);
        self.pts.entry(pointer).or_default()
    }

    pub fn debug_print(&self) {
        self.graph.debug_print();
    }

    pub(crate) fn into_points_to_sets(self) -> HashMap<Pointer, PointsToSet> {
        self.pts
    }
}

#[derive(Debug, Default)]
pub struct WorkList {
    entries: VecDeque<(Pointer, PointsToSet)>,
}

impl WorkList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, pointer: Pointer, pts: PointsToSet) {
        self.entries.push_back((pointer, pts));
    }

    pub fn poll_entry(&mut self) -> Option<(Pointer, PointsToSet)> {
        self.entries.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pfg_edges_are_unique() {
        let mut pfg = PointerFlowGraph::new();
        let (a, b) = (Pointer::Var(VarId(0)), Pointer::Var(VarId(1)));
        let field = Pointer::InstanceField(ObjId(0), FieldId(0));
        assert!(pfg.add_edge(a, b));
        assert!(!pfg.add_edge(a, b));
        assert!(pfg.add_edge(a, field));
        assert!(pfg.contains_edge(a, field));
        assert!(!pfg.contains_edge(b, a));
        assert_eq!(pfg.num_edges(), 2);
        let mut succs = pfg.succs_of(a);
        succs.sort();
        assert_eq!(succs, vec![b, field]);
        assert!(pfg.points_to_set_of(a).is_none());
        pfg.points_to_set_mut(a).add_object(ObjId(3));
        assert!(pfg.points_to_set_of(a).unwrap().contains(ObjId(3)));
    }

    #[test]
    fn test_work_list_is_fifo() {
        let mut work_list = WorkList::new();
        let p = Pointer::StaticField(FieldId(1));
        work_list.add_entry(p, PointsToSet::singleton(ObjId(0)));
        work_list.add_entry(p, PointsToSet::singleton(ObjId(1)));
        assert_eq!(work_list.len(), 2);
        assert_eq!(work_list.poll_entry().unwrap().1, PointsToSet::singleton(ObjId(0)));
        assert_eq!(work_list.poll_entry().unwrap().1, PointsToSet::singleton(ObjId(1)));
        assert!(work_list.is_empty());
    }
}
