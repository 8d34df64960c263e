//! What a finished pointer analysis exposes to its clients.

use std::collections::HashMap;

use super::heap::{Obj, ObjId};
use super::pfg::Pointer;
use super::pts::PointsToSet;
use crate::callgraph::CallGraph;
use crate::ir::VarId;

#[derive(Debug)]
pub struct PointerAnalysisResult {
    call_graph: CallGraph,
    pts: HashMap<Pointer, PointsToSet>,
    objs: Vec<Obj>,
    empty: PointsToSet,
}

impl PointerAnalysisResult {
    pub(crate) fn new(
        call_graph: CallGraph,
        pts: HashMap<Pointer, PointsToSet>,
        objs: Vec<Obj>,
    ) -> Self {
        Self {
            call_graph,
            pts,
            objs,
            empty: PointsToSet::new(),
        }
    }

    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    /// Empty for pointers nothing ever flowed into.
    pub fn points_to_set_of(&self, pointer: Pointer) -> &PointsToSet {
        self.pts.get(&pointer).unwrap_or(&self.empty)
    }

    pub fn points_to_of_var(&self, var: VarId) -> &PointsToSet {
        self.points_to_set_of(Pointer::Var(var))
    }

    /// Pointers with a non-empty points-to set, sorted.
    pub fn pointers(&self) -> Vec<Pointer> {
        let mut pointers: Vec<Pointer> = self
            .pts
            .iter()
            .filter(|(_, pts)| !pts.is_empty())
            .map(|(pointer, _)| *pointer)
            .collect();
        pointers.sort();
        pointers
    }

    pub fn may_alias(&self, a: VarId, b: VarId) -> bool {
        self.points_to_of_var(a).intersects(self.points_to_of_var(b))
    }

    pub fn obj(&self, id: ObjId) -> &Obj {
        &self.objs[id.0]
    }

    pub fn objs(&self) -> &[Obj] {
        &self.objs
    }
}
