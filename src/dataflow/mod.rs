//! # dataflow
//!
//! Monotone-framework dataflow analysis over a `ControlFlowGraph`.
//! An analysis supplies the direction, the boundary and initial facts, an in-place
//! meet and a per-node transfer function; a solver iterates them to a fixpoint.
//! Termination relies on the analysis being monotone over a lattice of finite height,
//! which is not checked here.

pub mod constprop;
pub mod fact;
pub mod live_vars;
mod solver;

use std::collections::HashMap;
use std::hash::Hash;

pub use solver::{IterativeSolver, Solver, WorkListSolver};

use crate::cfg::ControlFlowGraph;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};

pub trait DataflowAnalysis<G: ControlFlowGraph> {
    type Fact: Clone + PartialEq + std::fmt::Debug;

    fn is_forward(&self) -> bool;

    /// Fact at the entry (forward) or exit (backward) of the CFG.
    fn new_boundary_fact(&self, cfg: &G) -> Self::Fact;

    /// Fact every other node starts with, usually bottom.
    fn new_initial_fact(&self) -> Self::Fact;

    /// Accumulates `fact` into `target`.
    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact);

    /// Computes `output` from `input` for `node`. For a forward analysis `input` is the
    /// IN fact and `output` the OUT fact, for a backward analysis the other way round.
    /// Returns true if `output` changed.
    fn transfer_node(&self, node: G::Node, input: &Self::Fact, output: &mut Self::Fact) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataflowResult<N: Hash + Eq, F> {
    forward: bool,
    in_facts: HashMap<N, F>,
    out_facts: HashMap<N, F>,
}

impl<N: Hash + Eq + Copy, F> DataflowResult<N, F> {
    pub fn new(forward: bool) -> Self {
        Self {
            forward,
            in_facts: HashMap::new(),
            out_facts: HashMap::new(),
        }
    }

    pub fn in_fact_of(&self, node: N) -> Option<&F> {
        self.in_facts.get(&node)
    }

    pub fn out_fact_of(&self, node: N) -> Option<&F> {
        self.out_facts.get(&node)
    }

    /// The fact holding right after `node` executes. IN and OUT always mean before and
    /// after the node, whatever the direction, so this is the OUT fact.
    pub fn result_of(&self, node: N) -> Option<&F> {
        self.out_fact_of(node)
    }

    pub fn is_forward(&self) -> bool {
        self.forward
    }

    pub fn set_in_fact(&mut self, node: N, fact: F) {
        self.in_facts.insert(node, fact);
    }

    pub fn set_out_fact(&mut self, node: N, fact: F) {
        self.out_facts.insert(node, fact);
    }

    pub fn nodes(&self) -> impl Iterator<Item = N> + '_ {
        self.in_facts.keys().copied()
    }

    pub(crate) fn facts_mut(&mut self) -> (&mut HashMap<N, F>, &mut HashMap<N, F>) {
        (&mut self.in_facts, &mut self.out_facts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    WorkList,
    Iterative,
}

impl SolverKind {
    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        match config.options.get_str("solver", "worklist") {
            "worklist" => Ok(SolverKind::WorkList),
            "iterative" => Ok(SolverKind::Iterative),
            other => Err(AnalysisError::InvalidOptionValue {
                key: "solver".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Runs `analysis` on `cfg` with the solver chosen by `kind`.
pub fn solve<G, A>(analysis: &A, cfg: &G, kind: SolverKind) -> DataflowResult<G::Node, A::Fact>
where
    G: ControlFlowGraph,
    A: DataflowAnalysis<G>,
{
    match kind {
        SolverKind::WorkList => WorkListSolver::new(analysis).solve(cfg),
        SolverKind::Iterative => IterativeSolver::new(analysis).solve(cfg),
    }
}
