//! Dead code detection.
//!
//! A statement is dead if it is unreachable once branches with constant conditions
//! are resolved, or if it assigns a variable that is not live afterwards and its
//! right-hand side has no side effect.
//! Constant propagation decides the branches, live variable analysis the assignments.

use std::collections::{BTreeSet, HashSet, VecDeque};

use log::debug;

use crate::cfg::{Cfg, CfgEdge, CfgNode, EdgeKind};
use crate::config::AnalysisConfig;
use crate::dataflow::constprop::{ConstantPropagation, CpFact};
use crate::dataflow::live_vars::{LiveVariableAnalysis, LiveVars};
use crate::dataflow::{solve, SolverKind};
use crate::error::Result;
use crate::ir::{ArithmeticOp, BinaryExp, BinaryOp, Exp, Ir, MethodId, Program, Stmt, StmtKind};

pub struct DeadCodeDetection<'p> {
    program: &'p Program,
    solver: SolverKind,
}

impl<'p> DeadCodeDetection<'p> {
    pub const ID: &'static str = "deadcode";

    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            solver: SolverKind::WorkList,
        }
    }

    pub fn from_config(program: &'p Program, config: &AnalysisConfig) -> Result<Self> {
        Ok(Self {
            program,
            solver: SolverKind::from_config(config)?,
        })
    }

    /// Indices of the dead statements of `method` in ascending order.
    /// Methods without a body have no dead code.
    pub fn analyze(&self, method: MethodId) -> Vec<usize> {
        match self.program.ir(method) {
            Some(ir) => {
                let dead = self.analyze_ir(ir);
                if !dead.is_empty() {
                    debug!(
                        "{}: dead statements {:?}",
                        self.program.method_signature(method),
                        dead
                    );
                }
                dead
            }
            None => vec![],
        }
    }

    pub fn analyze_ir(&self, ir: &Ir) -> Vec<usize> {
        let cfg = Cfg::build(ir);
        let cp = ConstantPropagation::new(self.program, ir);
        let constants = solve(&cp, &cfg, self.solver);
        let live_vars = solve(&LiveVariableAnalysis::new(ir), &cfg, self.solver);

        let mut dead = BTreeSet::new();
        let mut reached = HashSet::new();
        let mut queue = VecDeque::new();
        reached.insert(CfgNode::Entry);
        queue.push_back(CfgNode::Entry);
        while let Some(node) = queue.pop_front() {
            for edge in feasible_edges(&cp, &cfg, node, constants.in_fact_of(node)) {
                if reached.insert(edge.target) {
                    queue.push_back(edge.target);
                }
            }
            if let Some(stmt) = cfg.stmt_of(node) {
                if is_dead_assignment(stmt, live_vars.result_of(node)) {
                    dead.insert(stmt.index);
                }
            }
        }
        for stmt in ir.stmts.iter() {
            if !reached.contains(&CfgNode::Stmt(stmt.index)) {
                dead.insert(stmt.index);
            }
        }
        dead.into_iter().collect()
    }
}

/// Out edges of `node` that can be taken given the constants flowing into it.
fn feasible_edges(
    cp: &ConstantPropagation,
    cfg: &Cfg,
    node: CfgNode,
    fact: Option<&CpFact>,
) -> Vec<CfgEdge> {
    let edges = cfg.out_edges_of(node);
    let (stmt, fact) = match (cfg.stmt_of(node), fact) {
        (Some(stmt), Some(fact)) => (stmt, fact),
        _ => return edges,
    };
    match &stmt.kind {
        StmtKind::If { cond, .. } => {
            let value = cp.evaluate_binary(&BinaryExp::from(*cond), fact);
            match value.constant() {
                Some(value) => {
                    let taken = if value != 0 {
                        EdgeKind::IfTrue
                    } else {
                        EdgeKind::IfFalse
                    };
                    edges.into_iter().filter(|e| e.kind == taken).collect()
                }
                None => edges,
            }
        }
        StmtKind::Switch { var, cases, .. } => {
            match cp.evaluate(&Exp::Var(*var), fact).constant() {
                Some(value) => {
                    let matched = cases.iter().any(|(case, _)| *case == value);
                    edges
                        .into_iter()
                        .filter(|e| match e.kind {
                            EdgeKind::SwitchCase(case) => case == value,
                            EdgeKind::SwitchDefault => !matched,
                            _ => false,
                        })
                        .collect()
                }
                None => edges,
            }
        }
        _ => edges,
    }
}

fn is_dead_assignment(stmt: &Stmt, live_out: Option<&LiveVars>) -> bool {
    match &stmt.kind {
        StmtKind::Assign { lvalue, rvalue } => {
            let live = live_out.map_or(false, |live| live.contains(lvalue));
            !live && has_no_side_effect(rvalue)
        }
        _ => false,
    }
}

fn has_no_side_effect(rvalue: &Exp) -> bool {
    match rvalue {
        // allocation, failing casts, NPEs and class initialization
        Exp::New(_) | Exp::Cast(_) | Exp::FieldAccess(_) | Exp::ArrayAccess(_) => false,
        // division by zero
        Exp::Binary(BinaryExp {
            op: BinaryOp::Arithmetic(ArithmeticOp::Div | ArithmeticOp::Rem),
            ..
        }) => false,
        _ => true,
    }
}
