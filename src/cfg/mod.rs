//! # cfg
//!
//! Statement-level control-flow graph of one method body.
//! Nodes are the statements plus a synthetic entry and exit.
//! A `petgraph::Graph` is used rather than a `GraphMap` because two edges may connect the
//! same pair of nodes, e.g. `if (..) goto L; L: ...` gives both `IfTrue` and `IfFalse`.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use petgraph::dot::{Config, Dot};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction, Graph};

use crate::ir::{Ir, Stmt, StmtKind};

/// What the dataflow solvers need from a control-flow graph.
pub trait ControlFlowGraph {
    type Node: Copy + Eq + Hash + Debug;

    fn entry(&self) -> Self::Node;
    fn exit(&self) -> Self::Node;
    /// All nodes, entry first and exit last.
    fn nodes(&self) -> Vec<Self::Node>;
    fn preds_of(&self, node: Self::Node) -> Vec<Self::Node>;
    fn succs_of(&self, node: Self::Node) -> Vec<Self::Node>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CfgNode {
    Entry,
    Stmt(usize),
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Entry,
    FallThrough,
    Goto,
    IfTrue,
    IfFalse,
    SwitchCase(i64),
    SwitchDefault,
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CfgEdge {
    pub kind: EdgeKind,
    pub source: CfgNode,
    pub target: CfgNode,
}

pub struct Cfg<'ir> {
    ir: &'ir Ir,
    graph: Graph<CfgNode, EdgeKind, Directed>,
    indices: HashMap<CfgNode, NodeIndex>,
}

impl<'ir> Cfg<'ir> {
    pub fn build(ir: &'ir Ir) -> Self {
        let mut cfg = Cfg {
            ir,
            graph: Graph::new(),
            indices: HashMap::new(),
        };
        cfg.add_node(CfgNode::Entry);
        for stmt in ir.stmts.iter() {
            cfg.add_node(CfgNode::Stmt(stmt.index));
        }
        cfg.add_node(CfgNode::Exit);

        let len = ir.stmts.len();
        let next = |i: usize| {
            if i + 1 < len {
                CfgNode::Stmt(i + 1)
            } else {
                CfgNode::Exit
            }
        };
        if len == 0 {
            cfg.add_edge(CfgNode::Entry, CfgNode::Exit, EdgeKind::Entry);
        } else {
            cfg.add_edge(CfgNode::Entry, CfgNode::Stmt(0), EdgeKind::Entry);
        }
        for stmt in ir.stmts.iter() {
            let node = CfgNode::Stmt(stmt.index);
            match &stmt.kind {
                StmtKind::Goto { target } => {
                    cfg.add_edge(node, CfgNode::Stmt(*target), EdgeKind::Goto)
                }
                StmtKind::If { target, .. } => {
                    cfg.add_edge(node, CfgNode::Stmt(*target), EdgeKind::IfTrue);
                    cfg.add_edge(node, next(stmt.index), EdgeKind::IfFalse);
                }
                StmtKind::Switch { cases, default, .. } => {
                    for (value, target) in cases.iter() {
                        cfg.add_edge(node, CfgNode::Stmt(*target), EdgeKind::SwitchCase(*value));
                    }
                    cfg.add_edge(node, CfgNode::Stmt(*default), EdgeKind::SwitchDefault);
                }
                StmtKind::Return { .. } => cfg.add_edge(node, CfgNode::Exit, EdgeKind::Return),
                _ => cfg.add_edge(node, next(stmt.index), EdgeKind::FallThrough),
            }
        }
        cfg
    }

    fn add_node(&mut self, node: CfgNode) {
        let idx = self.graph.add_node(node);
        self.indices.insert(node, idx);
    }

    fn add_edge(&mut self, source: CfgNode, target: CfgNode, kind: EdgeKind) {
        // targets are validated when the program is built
        if let (Some(&s), Some(&t)) = (self.indices.get(&source), self.indices.get(&target)) {
            self.graph.add_edge(s, t, kind);
        }
    }

    pub fn ir(&self) -> &'ir Ir {
        self.ir
    }

    pub fn stmt_of(&self, node: CfgNode) -> Option<&'ir Stmt> {
        match node {
            CfgNode::Stmt(i) => self.ir.stmts.get(i),
            CfgNode::Entry | CfgNode::Exit => None,
        }
    }

    pub fn is_entry(&self, node: CfgNode) -> bool {
        node == CfgNode::Entry
    }

    pub fn is_exit(&self, node: CfgNode) -> bool {
        node == CfgNode::Exit
    }

    fn edges(&self, node: CfgNode, direction: Direction) -> Vec<CfgEdge> {
        let idx = match self.indices.get(&node) {
            Some(idx) => *idx,
            None => return vec![],
        };
        let mut edges: Vec<CfgEdge> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| CfgEdge {
                kind: *e.weight(),
                source: self.graph[e.source()],
                target: self.graph[e.target()],
            })
            .collect();
        // petgraph yields edges newest first
        edges.reverse();
        edges
    }

    pub fn out_edges_of(&self, node: CfgNode) -> Vec<CfgEdge> {
        self.edges(node, Direction::Outgoing)
    }

    pub fn in_edges_of(&self, node: CfgNode) -> Vec<CfgEdge> {
        self.edges(node, Direction::Incoming)
    }

    /// Print the CFG in dot format.
    pub fn dot(&self) -> String {
        format!(
            "{:?}",
            Dot::with_config(&self.graph, &[Config::GraphContentOnly])
        )
    }
}

impl<'ir> ControlFlowGraph for Cfg<'ir> {
    type Node = CfgNode;

    fn entry(&self) -> CfgNode {
        CfgNode::Entry
    }

    fn exit(&self) -> CfgNode {
        CfgNode::Exit
    }

    fn nodes(&self) -> Vec<CfgNode> {
        self.graph.node_indices().map(|i| self.graph[i]).collect()
    }

    fn preds_of(&self, node: CfgNode) -> Vec<CfgNode> {
        self.in_edges_of(node).into_iter().map(|e| e.source).collect()
    }

    fn succs_of(&self, node: CfgNode) -> Vec<CfgNode> {
        self.out_edges_of(node).into_iter().map(|e| e.target).collect()
    }
}
