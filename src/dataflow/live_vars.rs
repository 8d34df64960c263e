//! Live variable analysis: a variable is live at a point if some path from that
//! point reads it before redefining it.

use super::fact::SetFact;
use super::DataflowAnalysis;
use crate::cfg::{Cfg, CfgNode};
use crate::ir::{Ir, VarId};

pub type LiveVars = SetFact<VarId>;

pub struct LiveVariableAnalysis<'ir> {
    ir: &'ir Ir,
}

impl<'ir> LiveVariableAnalysis<'ir> {
    pub const ID: &'static str = "livevar";

    pub fn new(ir: &'ir Ir) -> Self {
        Self { ir }
    }
}

impl<'a, 'ir> DataflowAnalysis<Cfg<'a>> for LiveVariableAnalysis<'ir> {
    type Fact = LiveVars;

    fn is_forward(&self) -> bool {
        false
    }

    fn new_boundary_fact(&self, _cfg: &Cfg<'a>) -> LiveVars {
        LiveVars::new()
    }

    fn new_initial_fact(&self) -> LiveVars {
        LiveVars::new()
    }

    fn meet_into(&self, fact: &LiveVars, target: &mut LiveVars) {
        target.union(fact);
    }

    /// IN = uses ∪ (OUT - def)
    fn transfer_node(&self, node: CfgNode, input: &LiveVars, output: &mut LiveVars) -> bool {
        let mut live_in = input.clone();
        if let CfgNode::Stmt(index) = node {
            if let Some(stmt) = self.ir.stmt(index) {
                if let Some(def) = stmt.def() {
                    live_in.remove(&def);
                }
                for var in stmt.uses() {
                    live_in.add(var);
                }
            }
        }
        output.copy_from(&live_in)
    }
}
