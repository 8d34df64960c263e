//! Three-address statements and expressions.
//!
//! Operands of compound expressions are always variables, so evaluating an
//! expression never recurses deeper than one level.

use super::signature::MethodRef;
use super::{FieldId, Type, VarId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConditionOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShiftOp {
    Shl,
    Shr,
    Ushr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BitwiseOp {
    Or,
    And,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinaryOp {
    Arithmetic(ArithmeticOp),
    Condition(ConditionOp),
    Shift(ShiftOp),
    Bitwise(BitwiseOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinaryExp {
    pub op: BinaryOp,
    pub lhs: VarId,
    pub rhs: VarId,
}

/// Condition of an `if`. Always a comparison of two variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConditionExp {
    pub op: ConditionOp,
    pub lhs: VarId,
    pub rhs: VarId,
}

impl From<ConditionExp> for BinaryExp {
    fn from(cond: ConditionExp) -> Self {
        BinaryExp {
            op: BinaryOp::Condition(cond.op),
            lhs: cond.lhs,
            rhs: cond.rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Int(i64),
    Null,
    Str(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NewExp {
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CastExp {
    pub ty: Type,
    pub value: VarId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldAccess {
    Static(FieldId),
    Instance { base: VarId, field: FieldId },
}

impl FieldAccess {
    pub fn field(&self) -> FieldId {
        match *self {
            FieldAccess::Static(field) | FieldAccess::Instance { field, .. } => field,
        }
    }

    pub fn base(&self) -> Option<VarId> {
        match *self {
            FieldAccess::Static(_) => None,
            FieldAccess::Instance { base, .. } => Some(base),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayAccess {
    pub base: VarId,
    pub index: VarId,
}

/// Right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Exp {
    Var(VarId),
    Literal(Literal),
    Binary(BinaryExp),
    Neg(VarId),
    ArrayLength(VarId),
    New(NewExp),
    Cast(CastExp),
    InstanceOf { value: VarId, ty: Type },
    FieldAccess(FieldAccess),
    ArrayAccess(ArrayAccess),
}

impl Exp {
    /// Variables read when evaluating this expression.
    pub fn uses(&self) -> Vec<VarId> {
        match self {
            Exp::Var(v) | Exp::Neg(v) | Exp::ArrayLength(v) => vec![*v],
            Exp::Literal(_) | Exp::New(_) => vec![],
            Exp::Binary(b) => vec![b.lhs, b.rhs],
            Exp::Cast(c) => vec![c.value],
            Exp::InstanceOf { value, .. } => vec![*value],
            Exp::FieldAccess(access) => access.base().into_iter().collect(),
            Exp::ArrayAccess(access) => vec![access.base, access.index],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallKind {
    Static,
    Special,
    Virtual,
    Interface,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvokeExp {
    pub kind: CallKind,
    pub method_ref: MethodRef,
    /// Receiver, absent for static calls.
    pub base: Option<VarId>,
    pub args: Vec<VarId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StmtKind {
    Assign { lvalue: VarId, rvalue: Exp },
    StoreField { access: FieldAccess, rvalue: VarId },
    StoreArray { access: ArrayAccess, rvalue: VarId },
    Invoke { result: Option<VarId>, exp: InvokeExp },
    If { cond: ConditionExp, target: usize },
    Switch {
        var: VarId,
        cases: Vec<(i64, usize)>,
        default: usize,
    },
    Goto { target: usize },
    Return { value: Option<VarId> },
    Nop,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Stmt {
    pub index: usize,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(index: usize, kind: StmtKind) -> Self {
        Self { index, kind }
    }

    /// The variable this statement defines, if any.
    pub fn def(&self) -> Option<VarId> {
        match &self.kind {
            StmtKind::Assign { lvalue, .. } => Some(*lvalue),
            StmtKind::Invoke { result, .. } => *result,
            _ => None,
        }
    }

    /// The assigned expression of an `Assign`.
    pub fn rvalue(&self) -> Option<&Exp> {
        match &self.kind {
            StmtKind::Assign { rvalue, .. } => Some(rvalue),
            _ => None,
        }
    }

    pub fn uses(&self) -> Vec<VarId> {
        match &self.kind {
            StmtKind::Assign { rvalue, .. } => rvalue.uses(),
            StmtKind::StoreField { access, rvalue } => {
                let mut uses: Vec<VarId> = access.base().into_iter().collect();
                uses.push(*rvalue);
                uses
            }
            StmtKind::StoreArray { access, rvalue } => vec![access.base, access.index, *rvalue],
            StmtKind::Invoke { exp, .. } => {
                let mut uses: Vec<VarId> = exp.base.into_iter().collect();
                uses.extend(exp.args.iter().copied());
                uses
            }
            StmtKind::If { cond, .. } => vec![cond.lhs, cond.rhs],
            StmtKind::Switch { var, .. } => vec![*var],
            StmtKind::Return { value } => value.iter().copied().collect(),
            StmtKind::Goto { .. } | StmtKind::Nop => vec![],
        }
    }

    /// Jump targets other than the fall-through successor.
    pub fn targets(&self) -> Vec<usize> {
        match &self.kind {
            StmtKind::If { target, .. } | StmtKind::Goto { target } => vec![*target],
            StmtKind::Switch { cases, default, .. } => {
                let mut targets: Vec<usize> = cases.iter().map(|(_, t)| *t).collect();
                targets.push(*default);
                targets
            }
            _ => vec![],
        }
    }

    pub fn is_invoke(&self) -> bool {
        matches!(self.kind, StmtKind::Invoke { .. })
    }
}
