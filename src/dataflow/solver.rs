use std::collections::{HashSet, VecDeque};

use log::{debug, trace};

use super::{DataflowAnalysis, DataflowResult};
use crate::cfg::ControlFlowGraph;

pub trait Solver<G: ControlFlowGraph, A: DataflowAnalysis<G>> {
    fn analysis(&self) -> &A;

    fn solve(&self, cfg: &G) -> DataflowResult<G::Node, A::Fact> {
        let mut result = self.initialize(cfg);
        if self.analysis().is_forward() {
            self.do_solve_forward(cfg, &mut result);
        } else {
            self.do_solve_backward(cfg, &mut result);
        }
        result
    }

    /// Boundary fact on the entry (exit) node, initial facts everywhere else.
    fn initialize(&self, cfg: &G) -> DataflowResult<G::Node, A::Fact> {
        let analysis = self.analysis();
        let forward = analysis.is_forward();
        let boundary_node = if forward { cfg.entry() } else { cfg.exit() };
        let mut result = DataflowResult::new(forward);
        for node in cfg.nodes() {
            if node == boundary_node {
                let boundary = analysis.new_boundary_fact(cfg);
                result.set_in_fact(node, boundary.clone());
                result.set_out_fact(node, boundary);
            } else {
                result.set_in_fact(node, analysis.new_initial_fact());
                result.set_out_fact(node, analysis.new_initial_fact());
            }
        }
        result
    }

    fn do_solve_forward(&self, cfg: &G, result: &mut DataflowResult<G::Node, A::Fact>);

    fn do_solve_backward(&self, cfg: &G, result: &mut DataflowResult<G::Node, A::Fact>);
}

/// Revisits only the nodes whose inputs may have changed.
pub struct WorkListSolver<'a, A> {
    analysis: &'a A,
}

impl<'a, A> WorkListSolver<'a, A> {
    pub fn new(analysis: &'a A) -> Self {
        Self { analysis }
    }
}

impl<'a, G, A> Solver<G, A> for WorkListSolver<'a, A>
where
    G: ControlFlowGraph,
    A: DataflowAnalysis<G>,
{
    fn analysis(&self) -> &A {
        self.analysis
    }

    fn do_solve_forward(&self, cfg: &G, result: &mut DataflowResult<G::Node, A::Fact>) {
        let entry = cfg.entry();
        let mut worklist: VecDeque<G::Node> =
            cfg.nodes().into_iter().filter(|n| *n != entry).collect();
        let mut queued: HashSet<G::Node> = worklist.iter().copied().collect();
        let (in_facts, out_facts) = result.facts_mut();
        let mut iterations = 0usize;
        while let Some(node) = worklist.pop_front() {
            queued.remove(&node);
            iterations += 1;
            trace!("forward: visit {:?}", node);
            let in_fact = match in_facts.get_mut(&node) {
                Some(fact) => fact,
                None => continue,
            };
            for pred in cfg.preds_of(node) {
                if let Some(pred_out) = out_facts.get(&pred) {
                    self.analysis.meet_into(pred_out, in_fact);
                }
            }
            let out_fact = match out_facts.get_mut(&node) {
                Some(fact) => fact,
                None => continue,
            };
            if self.analysis.transfer_node(node, in_fact, out_fact) {
                for succ in cfg.succs_of(node) {
                    if queued.insert(succ) {
                        worklist.push_back(succ);
                    }
                }
            }
        }
        debug!("forward worklist solver converged after {} visits", iterations);
    }

    fn do_solve_backward(&self, cfg: &G, result: &mut DataflowResult<G::Node, A::Fact>) {
        let exit = cfg.exit();
        let mut worklist: VecDeque<G::Node> = cfg
            .nodes()
            .into_iter()
            .rev()
            .filter(|n| *n != exit)
            .collect();
        let mut queued: HashSet<G::Node> = worklist.iter().copied().collect();
        let (in_facts, out_facts) = result.facts_mut();
        let mut iterations = 0usize;
        while let Some(node) = worklist.pop_front() {
            queued.remove(&node);
            iterations += 1;
            trace!("backward: visit {:?}", node);
            let out_fact = match out_facts.get_mut(&node) {
                Some(fact) => fact,
                None => continue,
            };
            for succ in cfg.succs_of(node) {
                if let Some(succ_in) = in_facts.get(&succ) {
                    self.analysis.meet_into(succ_in, out_fact);
                }
            }
            let in_fact = match in_facts.get_mut(&node) {
                Some(fact) => fact,
                None => continue,
            };
            if self.analysis.transfer_node(node, out_fact, in_fact) {
                for pred in cfg.preds_of(node) {
                    if queued.insert(pred) {
                        worklist.push_back(pred);
                    }
                }
            }
        }
        debug!("backward worklist solver converged after {} visits", iterations);
    }
}

/// Sweeps over all nodes until one full pass changes nothing.
pub struct IterativeSolver<'a, A> {
    analysis: &'a A,
}

impl<'a, A> IterativeSolver<'a, A> {
    pub fn new(analysis: &'a A) -> Self {
        Self { analysis }
    }
}

impl<'a, G, A> Solver<G, A> for IterativeSolver<'a, A>
where
    G: ControlFlowGraph,
    A: DataflowAnalysis<G>,
{
    fn analysis(&self) -> &A {
        self.analysis
    }

    fn do_solve_forward(&self, cfg: &G, result: &mut DataflowResult<G::Node, A::Fact>) {
        let entry = cfg.entry();
        let nodes: Vec<G::Node> = cfg.nodes().into_iter().filter(|n| *n != entry).collect();
        let (in_facts, out_facts) = result.facts_mut();
        let mut rounds = 0usize;
        let mut changed = true;
        while changed {
            changed = false;
            rounds += 1;
            for &node in nodes.iter() {
                let mut in_fact = self.analysis.new_initial_fact();
                for pred in cfg.preds_of(node) {
                    if let Some(pred_out) = out_facts.get(&pred) {
                        self.analysis.meet_into(pred_out, &mut in_fact);
                    }
                }
                if let Some(out_fact) = out_facts.get_mut(&node) {
                    changed |= self.analysis.transfer_node(node, &in_fact, out_fact);
                }
                in_facts.insert(node, in_fact);
            }
        }
        debug!("forward iterative solver converged after {} rounds", rounds);
    }

    fn do_solve_backward(&self, cfg: &G, result: &mut DataflowResult<G::Node, A::Fact>) {
        let exit = cfg.exit();
        let nodes: Vec<G::Node> = cfg.nodes().into_iter().rev().filter(|n| *n != exit).collect();
        let (in_facts, out_facts) = result.facts_mut();
        let mut rounds = 0usize;
        let mut changed = true;
        while changed {
            changed = false;
            rounds += 1;
            for &node in nodes.iter() {
                let mut out_fact = self.analysis.new_initial_fact();
                for succ in cfg.succs_of(node) {
                    if let Some(succ_in) = in_facts.get(&succ) {
                        self.analysis.meet_into(succ_in, &mut out_fact);
                    }
                }
                if let Some(in_fact) = in_facts.get_mut(&node) {
                    changed |= self.analysis.transfer_node(node, &out_fact, in_fact);
                }
                out_facts.insert(node, out_fact);
            }
        }
        debug!("backward iterative solver converged after {} rounds", rounds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::fact::SetFact;
    use std::collections::HashMap;
    use test_log::test;

    /// Diamond with a back edge: 0 -> 1 -> {2, 3} -> 4 -> 1, 4 -> 5.
    struct ToyCfg {
        succs: HashMap<u32, Vec<u32>>,
    }

    impl ToyCfg {
        fn new() -> Self {
            let mut succs = HashMap::new();
            succs.insert(0, vec![1]);
            succs.insert(1, vec![2, 3]);
            succs.insert(2, vec![4]);
            succs.insert(3, vec![4]);
            succs.insert(4, vec![1, 5]);
            succs.insert(5, vec![]);
            Self { succs }
        }
    }

    impl ControlFlowGraph for ToyCfg {
        type Node = u32;

        fn entry(&self) -> u32 {
            0
        }

        fn exit(&self) -> u32 {
            5
        }

        fn nodes(&self) -> Vec<u32> {
            (0..=5).collect()
        }

        fn preds_of(&self, node: u32) -> Vec<u32> {
            let mut preds: Vec<u32> = self
                .succs
                .iter()
                .filter(|(_, ss)| ss.contains(&node))
                .map(|(p, _)| *p)
                .collect();
            preds.sort();
            preds
        }

        fn succs_of(&self, node: u32) -> Vec<u32> {
            self.succs.get(&node).cloned().unwrap_or_default()
        }
    }

    /// Forward "which nodes may have executed before": OUT = IN ∪ {node}.
    struct Visited;

    impl DataflowAnalysis<ToyCfg> for Visited {
        type Fact = SetFact<u32>;

        fn is_forward(&self) -> bool {
            true
        }

        fn new_boundary_fact(&self, _cfg: &ToyCfg) -> SetFact<u32> {
            [0].iter().copied().collect()
        }

        fn new_initial_fact(&self) -> SetFact<u32> {
            SetFact::new()
        }

        fn meet_into(&self, fact: &SetFact<u32>, target: &mut SetFact<u32>) {
            target.union(fact);
        }

        fn transfer_node(
            &self,
            node: u32,
            input: &SetFact<u32>,
            output: &mut SetFact<u32>,
        ) -> bool {
            let mut new_out = input.clone();
            new_out.add(node);
            output.copy_from(&new_out)
        }
    }

    /// Backward "which nodes may still execute": IN = OUT ∪ {node}.
    struct Remaining;

    impl DataflowAnalysis<ToyCfg> for Remaining {
        type Fact = SetFact<u32>;

        fn is_forward(&self) -> bool {
            false
        }

        fn new_boundary_fact(&self, _cfg: &ToyCfg) -> SetFact<u32> {
            SetFact::new()
        }

        fn new_initial_fact(&self) -> SetFact<u32> {
            SetFact::new()
        }

        fn meet_into(&self, fact: &SetFact<u32>, target: &mut SetFact<u32>) {
            target.union(fact);
        }

        fn transfer_node(
            &self,
            node: u32,
            input: &SetFact<u32>,
            output: &mut SetFact<u32>,
        ) -> bool {
            let mut new_in = input.clone();
            new_in.add(node);
            output.copy_from(&new_in)
        }
    }

    fn sorted(fact: &SetFact<u32>) -> Vec<u32> {
        let mut v: Vec<u32> = fact.iter().collect();
        v.sort();
        v
    }

    #[test]
    fn test_forward_worklist() {
        let cfg = ToyCfg::new();
        let result = WorkListSolver::new(&Visited).solve(&cfg);
        // the loop makes every loop node reach every other
        assert_eq!(sorted(result.in_fact_of(1).unwrap()), vec![0, 1, 2, 3, 4]);
        assert_eq!(sorted(result.out_fact_of(2).unwrap()), vec![0, 1, 2, 3, 4]);
        assert_eq!(sorted(result.out_fact_of(5).unwrap()), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_backward_worklist() {
        let cfg = ToyCfg::new();
        let result = WorkListSolver::new(&Remaining).solve(&cfg);
        assert_eq!(sorted(result.in_fact_of(0).unwrap()), vec![0, 1, 2, 3, 4]);
        assert_eq!(sorted(result.out_fact_of(4).unwrap()), vec![1, 2, 3, 4]);
        assert!(result.in_fact_of(5).unwrap().is_empty());
    }

    #[test]
    fn test_iterative_agrees_with_worklist() {
        let cfg = ToyCfg::new();
        let a = WorkListSolver::new(&Visited).solve(&cfg);
        let b = IterativeSolver::new(&Visited).solve(&cfg);
        for node in cfg.nodes() {
            assert_eq!(a.out_fact_of(node), b.out_fact_of(node));
        }
        let a = WorkListSolver::new(&Remaining).solve(&cfg);
        let b = IterativeSolver::new(&Remaining).solve(&cfg);
        for node in cfg.nodes() {
            assert_eq!(a.in_fact_of(node), b.in_fact_of(node));
        }
    }

    #[test]
    fn test_fixpoint_is_stable() {
        let cfg = ToyCfg::new();
        let result = WorkListSolver::new(&Visited).solve(&cfg);
        for node in cfg.nodes().into_iter().filter(|n| *n != cfg.entry()) {
            let mut in_fact = result.in_fact_of(node).unwrap().clone();
            for pred in cfg.preds_of(node) {
                Visited.meet_into(result.out_fact_of(pred).unwrap(), &mut in_fact);
            }
            assert_eq!(&in_fact, result.in_fact_of(node).unwrap());
            let mut out_fact = result.out_fact_of(node).unwrap().clone();
            assert!(!Visited.transfer_node(node, &in_fact, &mut out_fact));
        }
    }
}
