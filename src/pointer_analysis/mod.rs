//! # pointer_analysis
//!
//! Context-insensitive, flow-insensitive inclusion-based (Andersen) pointer analysis
//! that builds the call graph on the fly.
//!
//! Reachable methods are translated into pointer flow graph (PFG) edges and points-to
//! seeds. Points-to sets are then propagated along the PFG through a work list.
//! Whenever a new object reaches a variable, the field and array accesses and the
//! call sites using that variable as base are resolved against the object, which may
//! add PFG edges and make more methods reachable.
//! Method bodies and the work list are drained in one loop, so call graph discovery
//! and propagation reach their fixpoint together.
//!
//! Casts are treated as copies. Calls to methods without a body add a call edge and
//! mark the callee reachable, but bind nothing.

pub mod heap;
pub mod pfg;
pub mod pts;
pub mod result;

use std::collections::VecDeque;

use log::{debug, info, trace};

pub use heap::{AllocationSiteBasedModel, HeapModel, Obj, ObjId};
pub use pfg::{Pointer, PointerFlowGraph, WorkList};
pub use pts::PointsToSet;
pub use result::PointerAnalysisResult;

use crate::callgraph::cha::{invoke_exp, resolve_callee};
use crate::callgraph::{entry_method, CallGraph, Edge};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::ir::{
    CallKind, Exp, FieldAccess, MethodId, NewExp, Program, StmtKind, StmtRef, VarId,
};

pub struct Solver<'p, H: HeapModel = AllocationSiteBasedModel> {
    program: &'p Program,
    heap_model: H,
    call_graph: CallGraph,
    pfg: PointerFlowGraph,
    work_list: WorkList,
    /// Reachable methods whose statements are not processed yet.
    pending: VecDeque<MethodId>,
}

impl<'p> Solver<'p, AllocationSiteBasedModel> {
    pub const ID: &'static str = "cipta";

    pub fn new(program: &'p Program) -> Self {
        Self::with_heap_model(program, AllocationSiteBasedModel::new())
    }

    /// Analyzes `program` from the entry method named by `config`.
    pub fn run(program: &'p Program, config: &AnalysisConfig) -> Result<PointerAnalysisResult> {
        let entry = entry_method(program, config)?;
        Ok(Self::new(program).solve(entry))
    }
}

impl<'p, H: HeapModel> Solver<'p, H> {
    pub fn with_heap_model(program: &'p Program, heap_model: H) -> Self {
        Self {
            program,
            heap_model,
            call_graph: CallGraph::new(),
            pfg: PointerFlowGraph::new(),
            work_list: WorkList::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn solve(mut self, entry: MethodId) -> PointerAnalysisResult {
        self.initialize(entry);
        self.analyze();
        info!(
            "pointer analysis: {} reachable methods, {} call edges, {} PFG edges, {} objects",
            self.call_graph.num_reachable_methods(),
            self.call_graph.num_edges(),
            self.pfg.num_edges(),
            self.heap_model.objs().len()
        );
        self.pfg.debug_print();
        PointerAnalysisResult::new(
            self.call_graph,
            self.pfg.into_points_to_sets(),
            self.heap_model.objs().to_vec(),
        )
    }

    fn initialize(&mut self, entry: MethodId) {
        self.call_graph.add_entry_method(entry);
        self.add_reachable(entry);
    }

    fn add_reachable(&mut self, method: MethodId) {
        if self.call_graph.add_reachable_method(method) {
            debug!("reachable: {}", self.program.method_signature(method));
            self.pending.push_back(method);
        }
    }

    /// Translates the statements of a newly reachable method. Instance field and
    /// array accesses and instance calls wait until their base variable points to
    /// something.
    fn process_method(&mut self, method: MethodId) {
        let program = self.program;
        let ir = match program.ir(method) {
            Some(ir) => ir,
            None => return,
        };
        for stmt in ir.stmts.iter() {
            match &stmt.kind {
                StmtKind::Assign { lvalue, rvalue } => match rvalue {
                    Exp::New(NewExp { ty }) => {
                        let obj = self
                            .heap_model
                            .get_obj(StmtRef::new(method, stmt.index), ty);
                        self.work_list
                            .add_entry(Pointer::Var(*lvalue), PointsToSet::singleton(obj));
                    }
                    Exp::Var(source) => {
                        self.add_pfg_edge(Pointer::Var(*source), Pointer::Var(*lvalue))
                    }
                    Exp::Cast(cast) => {
                        self.add_pfg_edge(Pointer::Var(cast.value), Pointer::Var(*lvalue))
                    }
                    Exp::FieldAccess(FieldAccess::Static(field)) => {
                        self.add_pfg_edge(Pointer::StaticField(*field), Pointer::Var(*lvalue))
                    }
                    _ => {}
                },
                StmtKind::StoreField {
                    access: FieldAccess::Static(field),
                    rvalue,
                } => self.add_pfg_edge(Pointer::Var(*rvalue), Pointer::StaticField(*field)),
                StmtKind::Invoke { exp, .. } if exp.kind == CallKind::Static => {
                    let call_site = StmtRef::new(method, stmt.index);
                    match resolve_callee(program, None, call_site) {
                        Some(callee) => {
                            self.add_call_edge(Edge::new(CallKind::Static, call_site, callee))
                        }
                        None => debug!(
                            "no target for static call {} in {}",
                            stmt.index,
                            program.method_signature(method)
                        ),
                    }
                }
                _ => {}
            }
        }
    }

    /// Inserts `source -> target`; a new edge replays what `source` already points to.
    fn add_pfg_edge(&mut self, source: Pointer, target: Pointer) {
        if self.pfg.add_edge(source, target) {
            if let Some(pts) = self.pfg.points_to_set_of(source) {
                if !pts.is_empty() {
                    let pts = pts.clone();
                    self.work_list.add_entry(target, pts);
                }
            }
        }
    }

    fn analyze(&mut self) {
        loop {
            while let Some(method) = self.pending.pop_front() {
                self.process_method(method);
            }
            let (pointer, pts) = match self.work_list.poll_entry() {
                Some(entry) => entry,
                None => break,
            };
            trace!("propagate {:?} into {:?}", pts, pointer);
            let delta = self.propagate(pointer, &pts);
            if let Pointer::Var(var) = pointer {
                for obj in delta.iter() {
                    self.process_instance_accesses(var, obj);
                    self.process_call(var, obj);
                }
            }
        }
    }

    /// Merges `pts` into `pointer` and forwards only the new objects to its successors.
    fn propagate(&mut self, pointer: Pointer, pts: &PointsToSet) -> PointsToSet {
        if pts.is_empty() {
            return PointsToSet::new();
        }
        let delta = self.pfg.points_to_set_mut(pointer).add_all(pts);
        if !delta.is_empty() {
            for succ in self.pfg.succs_of(pointer) {
                self.work_list.add_entry(succ, delta.clone());
            }
        }
        delta
    }

    /// Connects the field and array accesses based on `var` to the fields and
    /// elements of the newly discovered `obj`.
    fn process_instance_accesses(&mut self, var: VarId, obj: ObjId) {
        let program = self.program;
        let info = program.var(var);
        for &site in info.load_fields.iter() {
            if let Some(StmtKind::Assign {
                lvalue,
                rvalue: Exp::FieldAccess(FieldAccess::Instance { field, .. }),
            }) = program.stmt(site).map(|stmt| &stmt.kind)
            {
                self.add_pfg_edge(Pointer::InstanceField(obj, *field), Pointer::Var(*lvalue));
            }
        }
        for &site in info.store_fields.iter() {
            if let Some(StmtKind::StoreField {
                access: FieldAccess::Instance { field, .. },
                rvalue,
            }) = program.stmt(site).map(|stmt| &stmt.kind)
            {
                self.add_pfg_edge(Pointer::Var(*rvalue), Pointer::InstanceField(obj, *field));
            }
        }
        for &site in info.load_arrays.iter() {
            if let Some(StmtKind::Assign {
                lvalue,
                rvalue: Exp::ArrayAccess(_),
            }) = program.stmt(site).map(|stmt| &stmt.kind)
            {
                self.add_pfg_edge(Pointer::ArrayIndex(obj), Pointer::Var(*lvalue));
            }
        }
        for &site in info.store_arrays.iter() {
            if let Some(StmtKind::StoreArray { rvalue, .. }) =
                program.stmt(site).map(|stmt| &stmt.kind)
            {
                self.add_pfg_edge(Pointer::Var(*rvalue), Pointer::ArrayIndex(obj));
            }
        }
    }

    /// Resolves the call sites with receiver `var` against the new receiver `recv`.
    fn process_call(&mut self, var: VarId, recv: ObjId) {
        let program = self.program;
        let recv_class = program.class_of_type(&self.heap_model.obj(recv).ty);
        for &call_site in program.var(var).invokes.iter() {
            let kind = match invoke_exp(program, call_site) {
                Some(exp) => exp.kind,
                None => continue,
            };
            let callee = match resolve_callee(program, recv_class, call_site) {
                Some(callee) => callee,
                None => {
                    debug!(
                        "no target for call {} in {} on {:?}",
                        call_site.index,
                        program.method_signature(call_site.method),
                        recv
                    );
                    continue;
                }
            };
            if let Some(this) = program.ir(callee).and_then(|ir| ir.this) {
                self.work_list
                    .add_entry(Pointer::Var(this), PointsToSet::singleton(recv));
            }
            self.add_call_edge(Edge::new(kind, call_site, callee));
        }
    }

    fn add_call_edge(&mut self, edge: Edge) {
        if self.call_graph.add_edge(edge) {
            debug!(
                "call edge: {}@{} -> {}",
                self.program.method_signature(edge.caller()),
                edge.call_site.index,
                self.program.method_signature(edge.callee)
            );
            self.add_reachable(edge.callee);
            self.pass_args(edge.callee, edge.call_site);
        }
    }

    /// Arguments flow into parameters, returned values into the call's result.
    fn pass_args(&mut self, callee: MethodId, call_site: StmtRef) {
        let program = self.program;
        let ir = match program.ir(callee) {
            Some(ir) => ir,
            None => return,
        };
        let (result, exp) = match program.stmt(call_site).map(|stmt| &stmt.kind) {
            Some(StmtKind::Invoke { result, exp }) => (*result, exp),
            _ => return,
        };
        for (&arg, &param) in exp.args.iter().zip(ir.params.iter()) {
            self.add_pfg_edge(Pointer::Var(arg), Pointer::Var(param));
        }
        if let Some(result) = result {
            for &ret in ir.return_vars.iter() {
                self.add_pfg_edge(Pointer::Var(ret), Pointer::Var(result));
            }
        }
    }
}
