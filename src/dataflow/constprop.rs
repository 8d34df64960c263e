//! Intraprocedural constant propagation over int-like variables.

use std::fmt;

use super::fact::MapFact;
use super::DataflowAnalysis;
use crate::cfg::{Cfg, CfgNode};
use crate::ir::{
    ArithmeticOp, BinaryExp, BinaryOp, BitwiseOp, ConditionOp, Exp, Ir, Literal, Program, ShiftOp,
    VarId,
};

/// `Undef < Constant(c) < Nac`; distinct constants are incomparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Undef,
    Constant(i64),
    Nac,
}

impl Value {
    pub fn is_undef(self) -> bool {
        self == Value::Undef
    }

    pub fn is_nac(self) -> bool {
        self == Value::Nac
    }

    pub fn constant(self) -> Option<i64> {
        match self {
            Value::Constant(c) => Some(c),
            _ => None,
        }
    }

    /// Least upper bound of two values.
    pub fn meet(self, other: Value) -> Value {
        match (self, other) {
            (Value::Nac, _) | (_, Value::Nac) => Value::Nac,
            (Value::Undef, v) | (v, Value::Undef) => v,
            (Value::Constant(a), Value::Constant(b)) if a == b => Value::Constant(a),
            _ => Value::Nac,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undef => write!(f, "UNDEF"),
            Value::Constant(c) => write!(f, "{}", c),
            Value::Nac => write!(f, "NAC"),
        }
    }
}

/// Variable to value. A missing variable is `Undef`, and storing `Undef` removes
/// the entry so that equality never tells the two apart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpFact {
    map: MapFact<VarId, Value>,
}

impl CpFact {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, var: VarId) -> Value {
        self.map.get(&var).copied().unwrap_or(Value::Undef)
    }

    /// Returns true if the value of `var` changed.
    pub fn update(&mut self, var: VarId, value: Value) -> bool {
        if value.is_undef() {
            self.map.remove(&var).is_some()
        } else {
            self.map.update(var, value)
        }
    }

    pub fn copy_from(&mut self, other: &CpFact) -> bool {
        self.map.copy_from(&other.map)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, Value)> + '_ {
        self.map.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

pub struct ConstantPropagation<'p> {
    program: &'p Program,
    ir: &'p Ir,
}

impl<'p> ConstantPropagation<'p> {
    pub const ID: &'static str = "constprop";

    pub fn new(program: &'p Program, ir: &'p Ir) -> Self {
        Self { program, ir }
    }

    pub fn can_hold_int(&self, var: VarId) -> bool {
        self.program.var(var).ty.can_hold_int()
    }

    /// Evaluates `exp` under `fact`. Anything other than variables, int literals and
    /// binary expressions is `Nac`.
    pub fn evaluate(&self, exp: &Exp, fact: &CpFact) -> Value {
        match exp {
            Exp::Var(var) => self.evaluate_var(*var, fact),
            Exp::Literal(Literal::Int(i)) => Value::Constant(*i),
            Exp::Binary(binary) => self.evaluate_binary(binary, fact),
            Exp::Literal(_)
            | Exp::Neg(_)
            | Exp::ArrayLength(_)
            | Exp::New(_)
            | Exp::Cast(_)
            | Exp::InstanceOf { .. }
            | Exp::FieldAccess(_)
            | Exp::ArrayAccess(_) => Value::Nac,
        }
    }

    fn evaluate_var(&self, var: VarId, fact: &CpFact) -> Value {
        if self.can_hold_int(var) {
            fact.get(var)
        } else {
            Value::Nac
        }
    }

    pub fn evaluate_binary(&self, exp: &BinaryExp, fact: &CpFact) -> Value {
        let v1 = self.evaluate_var(exp.lhs, fact);
        let v2 = self.evaluate_var(exp.rhs, fact);
        // division by zero never produces a value, whatever the dividend
        if let (BinaryOp::Arithmetic(ArithmeticOp::Div | ArithmeticOp::Rem), Value::Constant(0)) =
            (exp.op, v2)
        {
            return Value::Undef;
        }
        match (v1, v2) {
            (Value::Constant(a), Value::Constant(b)) => Value::Constant(compute(exp.op, a, b)),
            (Value::Nac, _) | (_, Value::Nac) => Value::Nac,
            _ => Value::Undef,
        }
    }
}

fn compute(op: BinaryOp, a: i64, b: i64) -> i64 {
    match op {
        BinaryOp::Arithmetic(op) => match op {
            ArithmeticOp::Add => a.wrapping_add(b),
            ArithmeticOp::Sub => a.wrapping_sub(b),
            ArithmeticOp::Mul => a.wrapping_mul(b),
            ArithmeticOp::Div => a.wrapping_div(b),
            ArithmeticOp::Rem => a.wrapping_rem(b),
        },
        BinaryOp::Condition(op) => {
            let holds = match op {
                ConditionOp::Eq => a == b,
                ConditionOp::Ne => a != b,
                ConditionOp::Lt => a < b,
                ConditionOp::Gt => a > b,
                ConditionOp::Le => a <= b,
                ConditionOp::Ge => a >= b,
            };
            holds as i64
        }
        BinaryOp::Shift(op) => {
            let shift = (b & 63) as u32;
            match op {
                ShiftOp::Shl => a.wrapping_shl(shift),
                ShiftOp::Shr => a.wrapping_shr(shift),
                ShiftOp::Ushr => ((a as u64) >> shift) as i64,
            }
        }
        BinaryOp::Bitwise(op) => match op {
            BitwiseOp::Or => a | b,
            BitwiseOp::And => a & b,
            BitwiseOp::Xor => a ^ b,
        },
    }
}

impl<'p, 'ir> DataflowAnalysis<Cfg<'ir>> for ConstantPropagation<'p> {
    type Fact = CpFact;

    fn is_forward(&self) -> bool {
        true
    }

    /// Int parameters may hold anything.
    fn new_boundary_fact(&self, cfg: &Cfg<'ir>) -> CpFact {
        let mut fact = CpFact::new();
        for &param in cfg.ir().params.iter() {
            if self.can_hold_int(param) {
                fact.update(param, Value::Nac);
            }
        }
        fact
    }

    fn new_initial_fact(&self) -> CpFact {
        CpFact::new()
    }

    fn meet_into(&self, fact: &CpFact, target: &mut CpFact) {
        for (var, value) in fact.iter() {
            let met = value.meet(target.get(var));
            target.update(var, met);
        }
    }

    fn transfer_node(&self, node: CfgNode, input: &CpFact, output: &mut CpFact) -> bool {
        let mut new_out = input.clone();
        let stmt = match node {
            CfgNode::Stmt(index) => self.ir.stmt(index),
            CfgNode::Entry | CfgNode::Exit => None,
        };
        if let Some(stmt) = stmt {
            if let Some(def) = stmt.def() {
                if self.can_hold_int(def) {
                    let value = match stmt.rvalue() {
                        Some(rvalue) => self.evaluate(rvalue, input),
                        // call results are unknown
                        None => Value::Nac,
                    };
                    new_out.update(def, value);
                }
            }
        }
        output.copy_from(&new_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::Cfg;
    use crate::dataflow::{solve, SolverKind};
    use crate::ir::{MethodId, ProgramBuilder, Type};
    use test_log::test;

    #[test]
    fn test_meet_value() {
        assert_eq!(Value::Constant(3).meet(Value::Constant(3)), Value::Constant(3));
        assert_eq!(Value::Constant(3).meet(Value::Constant(4)), Value::Nac);
        assert_eq!(Value::Undef.meet(Value::Constant(5)), Value::Constant(5));
        assert_eq!(Value::Constant(5).meet(Value::Undef), Value::Constant(5));
        assert_eq!(Value::Nac.meet(Value::Undef), Value::Nac);
        assert_eq!(Value::Undef.meet(Value::Undef), Value::Undef);
    }

    #[test]
    fn test_meet_is_monotone_and_idempotent() {
        let values = [
            Value::Undef,
            Value::Constant(-1),
            Value::Constant(0),
            Value::Constant(7),
            Value::Nac,
        ];
        let le = |a: Value, b: Value| a.meet(b) == b;
        for &a in values.iter() {
            assert_eq!(a.meet(a), a);
            for &b in values.iter() {
                assert_eq!(a.meet(b), b.meet(a));
                if le(a, b) {
                    for &c in values.iter() {
                        assert!(le(a.meet(c), b.meet(c)));
                    }
                }
            }
        }
    }

    #[test]
    fn test_cp_fact_undef_is_absent() {
        let mut fact = CpFact::new();
        let x = VarId(0);
        assert_eq!(fact.get(x), Value::Undef);
        assert!(!fact.update(x, Value::Undef));
        assert!(fact.update(x, Value::Constant(1)));
        assert!(fact.update(x, Value::Undef));
        assert_eq!(fact, CpFact::new());
    }

    fn int_program() -> (Program, MethodId) {
        let mut pb = ProgramBuilder::new();
        let c = pb.add_class("C", None, &[]).unwrap();
        let m = pb.add_method(c, "m", &[Type::INT], Type::INT, true).unwrap();
        {
            let mut body = pb.body(m).unwrap();
            let p = body.param(0).unwrap();
            let a = body.var("a", Type::INT);
            let b = body.var("b", Type::INT);
            let z = body.var("z", Type::INT);
            let q = body.var("q", Type::INT);
            let r = body.var("r", Type::INT);
            let s = body.var("s", Type::INT);
            let t = body.var("t", Type::INT);
            body.assign_int(a, 6); // 0
            body.assign_int(b, 3); // 1
            body.assign_int(z, 0); // 2
            body.binary(q, BinaryOp::Arithmetic(ArithmeticOp::Div), a, b); // 3
            body.binary(r, BinaryOp::Arithmetic(ArithmeticOp::Div), a, z); // 4
            body.binary(s, BinaryOp::Arithmetic(ArithmeticOp::Add), p, a); // 5
            body.binary(t, BinaryOp::Arithmetic(ArithmeticOp::Rem), p, z); // 6
            body.ret(Some(q)); // 7
        }
        (pb.build().unwrap(), m)
    }

    fn var_named(program: &Program, ir: &Ir, name: &str) -> VarId {
        *ir.vars
            .iter()
            .find(|v| program.var(**v).name == name)
            .unwrap()
    }

    #[test]
    fn test_straight_line() {
        let (program, m) = int_program();
        let ir = program.ir(m).unwrap();
        let cfg = Cfg::build(ir);
        let cp = ConstantPropagation::new(&program, ir);
        let result = solve(&cp, &cfg, SolverKind::WorkList);
        let out = result.out_fact_of(CfgNode::Stmt(7)).unwrap();
        assert_eq!(out.get(var_named(&program, ir, "q")), Value::Constant(2));
        // division by zero is UNDEF, not NAC
        assert_eq!(out.get(var_named(&program, ir, "r")), Value::Undef);
        assert_eq!(out.get(var_named(&program, ir, "t")), Value::Undef);
        assert_eq!(out.get(var_named(&program, ir, "s")), Value::Nac);
        assert_eq!(out.get(var_named(&program, ir, "p0")), Value::Nac);
    }

    #[test]
    fn test_merge_at_join() {
        // 0: x = 1; 1: if p == x goto 4; 2: y = 2; 3: goto 5; 4: y = 3; 5: z = x; 6: return
        let mut pb = ProgramBuilder::new();
        let c = pb.add_class("C", None, &[]).unwrap();
        let m = pb.add_method(c, "m", &[Type::INT], Type::Void, true).unwrap();
        let (x, y, z) = {
            let mut body = pb.body(m).unwrap();
            let p = body.param(0).unwrap();
            let x = body.var("x", Type::INT);
            let y = body.var("y", Type::INT);
            let z = body.var("z", Type::INT);
            body.assign_int(x, 1);
            body.if_(ConditionOp::Eq, p, x, 4);
            body.assign_int(y, 2);
            body.goto(5);
            body.assign_int(y, 3);
            body.copy(z, x);
            body.ret(None);
            (x, y, z)
        };
        let program = pb.build().unwrap();
        let ir = program.ir(m).unwrap();
        let cfg = Cfg::build(ir);
        let cp = ConstantPropagation::new(&program, ir);
        for kind in [SolverKind::WorkList, SolverKind::Iterative].iter() {
            let result = solve(&cp, &cfg, *kind);
            let in5 = result.in_fact_of(CfgNode::Stmt(5)).unwrap();
            assert_eq!(in5.get(x), Value::Constant(1));
            assert_eq!(in5.get(y), Value::Nac);
            let out5 = result.out_fact_of(CfgNode::Stmt(5)).unwrap();
            assert_eq!(out5.get(z), Value::Constant(1));
        }
    }

    #[test]
    fn test_non_int_definitions_untracked() {
        let mut pb = ProgramBuilder::new();
        let c = pb.add_class("C", None, &[]).unwrap();
        let m = pb.add_method(c, "m", &[], Type::Void, true).unwrap();
        let callee = pb.add_method(c, "f", &[], Type::INT, true).unwrap();
        let callee_ref = pb.method_ref_of(callee);
        let (o, n, l) = {
            let mut body = pb.body(m).unwrap();
            let o = body.var("o", Type::Class(c));
            let n = body.var("n", Type::INT);
            let l = body.var("l", Type::Primitive(crate::ir::PrimitiveType::Long));
            body.new_obj(o, Type::Class(c));
            body.invoke_static(Some(n), callee_ref, &[]);
            body.assign_int(l, 5);
            body.ret(None);
            (o, n, l)
        };
        let program = pb.build().unwrap();
        let ir = program.ir(m).unwrap();
        let cfg = Cfg::build(ir);
        let cp = ConstantPropagation::new(&program, ir);
        let result = solve(&cp, &cfg, SolverKind::WorkList);
        let out = result.out_fact_of(CfgNode::Stmt(3)).unwrap();
        assert_eq!(out.get(o), Value::Undef);
        assert_eq!(out.get(n), Value::Nac);
        assert_eq!(out.get(l), Value::Undef);
    }

    #[test]
    fn test_evaluate_ops() {
        let (program, m) = int_program();
        let ir = program.ir(m).unwrap();
        let cp = ConstantPropagation::new(&program, ir);
        let a = var_named(&program, ir, "a");
        let b = var_named(&program, ir, "b");
        let mut fact = CpFact::new();
        fact.update(a, Value::Constant(-8));
        fact.update(b, Value::Constant(2));
        let eval = |op| cp.evaluate(&Exp::Binary(BinaryExp { op, lhs: a, rhs: b }), &fact);
        assert_eq!(eval(BinaryOp::Shift(ShiftOp::Shl)), Value::Constant(-32));
        assert_eq!(eval(BinaryOp::Shift(ShiftOp::Shr)), Value::Constant(-2));
        assert_eq!(
            eval(BinaryOp::Shift(ShiftOp::Ushr)),
            Value::Constant(((-8i64 as u64) >> 2) as i64)
        );
        assert_eq!(eval(BinaryOp::Condition(ConditionOp::Lt)), Value::Constant(1));
        assert_eq!(eval(BinaryOp::Condition(ConditionOp::Eq)), Value::Constant(0));
        assert_eq!(eval(BinaryOp::Bitwise(BitwiseOp::Xor)), Value::Constant(-8 ^ 2));
        assert_eq!(eval(BinaryOp::Arithmetic(ArithmeticOp::Rem)), Value::Constant(0));
        assert_eq!(cp.evaluate(&Exp::Literal(Literal::Null), &fact), Value::Nac);
        assert_eq!(cp.evaluate(&Exp::Neg(a), &fact), Value::Nac);
    }
}
