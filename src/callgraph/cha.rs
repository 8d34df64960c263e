//! Class hierarchy analysis: call targets from declared types only.

use std::collections::{BTreeSet, HashSet, VecDeque};

use log::{debug, info};

use super::{entry_method, CallGraph, Edge};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::ir::{
    CallKind, ClassHierarchy, ClassId, InvokeExp, MethodId, Program, StmtKind, StmtRef,
    Subsignature,
};

/// Looks up the concrete method `subsignature` resolves to on an object of `class`:
/// the first non-abstract declaration found walking up the superclass chain.
pub fn dispatch<H: ClassHierarchy>(
    hierarchy: &H,
    class: ClassId,
    subsignature: &Subsignature,
) -> Option<MethodId> {
    let mut current = Some(class);
    while let Some(class) = current {
        if let Some(method) = hierarchy.declared_method(class, subsignature) {
            if !hierarchy.method(method).is_abstract {
                return Some(method);
            }
        }
        current = hierarchy.superclass_of(class);
    }
    None
}

/// `class` and all its transitive subclasses, or for an interface all its
/// subinterfaces and their implementors (with their subclasses). Each class is
/// returned once, in BFS order.
pub fn subtypes_of<H: ClassHierarchy>(hierarchy: &H, class: ClassId) -> Vec<ClassId> {
    let mut visited = HashSet::new();
    let mut subtypes = Vec::new();
    let mut worklist = VecDeque::new();
    visited.insert(class);
    worklist.push_back(class);
    while let Some(class) = worklist.pop_front() {
        subtypes.push(class);
        let next: Vec<ClassId> = if hierarchy.class(class).is_interface {
            hierarchy
                .direct_implementors_of(class)
                .iter()
                .chain(hierarchy.direct_subinterfaces_of(class).iter())
                .copied()
                .collect()
        } else {
            hierarchy.direct_subclasses_of(class).to_vec()
        };
        for sub in next {
            if visited.insert(sub) {
                worklist.push_back(sub);
            }
        }
    }
    subtypes
}

pub(crate) fn invoke_exp(program: &Program, call_site: StmtRef) -> Option<&InvokeExp> {
    match program.stmt(call_site).map(|stmt| &stmt.kind) {
        Some(StmtKind::Invoke { exp, .. }) => Some(exp),
        _ => None,
    }
}

/// Resolves `call_site` to a single callee. Static calls go to the declared method,
/// special calls dispatch on the declared class, virtual and interface calls on
/// `receiver`. Returns `None` when nothing concrete matches, or when an instance
/// call has no receiver class.
pub fn resolve_callee(
    program: &Program,
    receiver: Option<ClassId>,
    call_site: StmtRef,
) -> Option<MethodId> {
    let exp = invoke_exp(program, call_site)?;
    let method_ref = &exp.method_ref;
    match exp.kind {
        CallKind::Static => program.declared_method(method_ref.class, &method_ref.subsignature),
        CallKind::Special => dispatch(program, method_ref.class, &method_ref.subsignature),
        CallKind::Virtual | CallKind::Interface => {
            dispatch(program, receiver?, &method_ref.subsignature)
        }
    }
}

pub struct ChaBuilder<'p> {
    program: &'p Program,
}

impl<'p> ChaBuilder<'p> {
    pub const ID: &'static str = "cg";

    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    /// Builds the call graph from the entry method named by `config`.
    pub fn build(&self, config: &AnalysisConfig) -> Result<CallGraph> {
        let entry = entry_method(self.program, config)?;
        Ok(self.build_call_graph(entry))
    }

    pub fn build_call_graph(&self, entry: MethodId) -> CallGraph {
        let mut call_graph = CallGraph::new();
        call_graph.add_entry_method(entry);
        let mut worklist = VecDeque::new();
        worklist.push_back(entry);
        while let Some(method) = worklist.pop_front() {
            if !call_graph.add_reachable_method(method) {
                continue;
            }
            debug!("reachable: {}", self.program.method_signature(method));
            for call_site in self.program.call_sites_in(method) {
                let kind = match invoke_exp(self.program, call_site) {
                    Some(exp) => exp.kind,
                    None => continue,
                };
                let callees = self.resolve(call_site);
                if callees.is_empty() {
                    debug!(
                        "no target for call site {} in {}",
                        call_site.index,
                        self.program.method_signature(method)
                    );
                }
                for callee in callees {
                    call_graph.add_edge(Edge::new(kind, call_site, callee));
                    if !call_graph.contains(callee) {
                        worklist.push_back(callee);
                    }
                }
            }
        }
        info!(
            "CHA call graph: {} reachable methods, {} edges",
            call_graph.num_reachable_methods(),
            call_graph.num_edges()
        );
        call_graph
    }

    /// All possible callees of `call_site` by class hierarchy analysis.
    pub fn resolve(&self, call_site: StmtRef) -> BTreeSet<MethodId> {
        let mut targets = BTreeSet::new();
        let exp = match invoke_exp(self.program, call_site) {
            Some(exp) => exp,
            None => return targets,
        };
        let method_ref = &exp.method_ref;
        match exp.kind {
            CallKind::Static | CallKind::Special => {
                targets.extend(resolve_callee(self.program, None, call_site));
            }
            CallKind::Virtual | CallKind::Interface => {
                for class in subtypes_of(self.program, method_ref.class) {
                    targets.extend(dispatch(self.program, class, &method_ref.subsignature));
                }
            }
        }
        targets
    }
}
