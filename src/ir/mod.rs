//! # ir
//!
//! In-memory intermediate representation of an object-oriented program:
//! classes, fields, methods with three-address bodies, and the class hierarchy.
//! A `Program` is built once by `ProgramBuilder` and is read-only afterwards, so
//! every analysis borrows it as `&Program`.

mod builder;
mod signature;
mod stmt;

use std::collections::HashMap;
use std::fmt;

pub use builder::{BodyBuilder, ProgramBuilder};
pub use signature::{parse_signature, MethodRef, Subsignature};
pub use stmt::{
    ArithmeticOp, ArrayAccess, BinaryExp, BinaryOp, BitwiseOp, CallKind, CastExp, ConditionExp,
    ConditionOp, Exp, FieldAccess, InvokeExp, Literal, NewExp, ShiftOp, Stmt, StmtKind,
};

use crate::error::{AnalysisError, Result};

/// Superclass of every class and the dispatch class of arrays.
pub const ROOT_CLASS: &str = "java.lang.Object";

macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

arena_id!(ClassId);
arena_id!(MethodId);
arena_id!(FieldId);
arena_id!(VarId);

/// A statement identified program-wide. Used for call sites and allocation sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtRef {
    pub method: MethodId,
    pub index: usize,
}

impl StmtRef {
    pub fn new(method: MethodId, index: usize) -> Self {
        Self { method, index }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Char => "char",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Type {
    Primitive(PrimitiveType),
    Class(ClassId),
    Array(Box<Type>),
    Null,
    Void,
}

impl Type {
    pub const INT: Type = Type::Primitive(PrimitiveType::Int);
    pub const BOOLEAN: Type = Type::Primitive(PrimitiveType::Boolean);

    /// Whether a variable of this type is tracked by constant propagation.
    pub fn can_hold_int(&self) -> bool {
        matches!(
            self,
            Type::Primitive(
                PrimitiveType::Byte
                    | PrimitiveType::Short
                    | PrimitiveType::Int
                    | PrimitiveType::Char
                    | PrimitiveType::Boolean
            )
        )
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Class(_) | Type::Array(_) | Type::Null)
    }

    pub fn array_of(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }
}

#[derive(Debug, Clone)]
pub struct Var {
    pub name: String,
    pub ty: Type,
    pub method: MethodId,
    /// `x = v.f` statements with this variable as `v`.
    pub load_fields: Vec<StmtRef>,
    /// `v.f = x` statements with this variable as `v`.
    pub store_fields: Vec<StmtRef>,
    pub load_arrays: Vec<StmtRef>,
    pub store_arrays: Vec<StmtRef>,
    /// Instance invocations with this variable as receiver.
    pub invokes: Vec<StmtRef>,
}

#[derive(Debug, Clone)]
pub struct JField {
    pub name: String,
    pub class: ClassId,
    pub ty: Type,
    pub is_static: bool,
}

#[derive(Debug, Clone)]
pub struct JClass {
    pub name: String,
    pub super_class: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub(crate) methods: HashMap<Subsignature, MethodId>,
}

impl JClass {
    pub fn declared_methods(&self) -> impl Iterator<Item = MethodId> + '_ {
        self.methods.values().copied()
    }
}

/// Body of a method.
#[derive(Debug, Clone, Default)]
pub struct Ir {
    pub this: Option<VarId>,
    pub params: Vec<VarId>,
    pub return_vars: Vec<VarId>,
    pub vars: Vec<VarId>,
    pub stmts: Vec<Stmt>,
}

impl Ir {
    pub fn stmt(&self, index: usize) -> Option<&Stmt> {
        self.stmts.get(index)
    }
}

#[derive(Debug, Clone)]
pub struct JMethod {
    pub name: String,
    pub class: ClassId,
    pub subsignature: Subsignature,
    pub param_types: Vec<Type>,
    pub return_type: Type,
    pub is_static: bool,
    pub is_abstract: bool,
    /// `None` for abstract and native methods.
    pub ir: Option<Ir>,
}

/// Queries over the class hierarchy needed by call resolution.
pub trait ClassHierarchy {
    fn class(&self, class: ClassId) -> &JClass;
    fn method(&self, method: MethodId) -> &JMethod;
    fn superclass_of(&self, class: ClassId) -> Option<ClassId>;
    fn direct_subclasses_of(&self, class: ClassId) -> &[ClassId];
    fn direct_subinterfaces_of(&self, class: ClassId) -> &[ClassId];
    fn direct_implementors_of(&self, class: ClassId) -> &[ClassId];
    fn declared_method(&self, class: ClassId, subsignature: &Subsignature) -> Option<MethodId>;
}

#[derive(Debug, Clone, Default)]
pub(crate) struct HierarchyIndex {
    pub(crate) subclasses: HashMap<ClassId, Vec<ClassId>>,
    pub(crate) subinterfaces: HashMap<ClassId, Vec<ClassId>>,
    pub(crate) implementors: HashMap<ClassId, Vec<ClassId>>,
}

#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) classes: Vec<JClass>,
    pub(crate) class_names: HashMap<String, ClassId>,
    pub(crate) fields: Vec<JField>,
    pub(crate) methods: Vec<JMethod>,
    pub(crate) vars: Vec<Var>,
    pub(crate) main: Option<MethodId>,
    pub(crate) hierarchy: HierarchyIndex,
}

impl Program {
    pub fn main_method(&self) -> Option<MethodId> {
        self.main
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.class_names.get(name).copied()
    }

    pub fn classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        (0..self.classes.len()).map(ClassId)
    }

    pub fn methods(&self) -> impl Iterator<Item = MethodId> + '_ {
        (0..self.methods.len()).map(MethodId)
    }

    pub fn field(&self, field: FieldId) -> &JField {
        &self.fields[field.0]
    }

    pub fn var(&self, var: VarId) -> &Var {
        &self.vars[var.0]
    }

    pub fn ir(&self, method: MethodId) -> Option<&Ir> {
        self.method(method).ir.as_ref()
    }

    pub fn stmt(&self, stmt: StmtRef) -> Option<&Stmt> {
        self.ir(stmt.method).and_then(|ir| ir.stmt(stmt.index))
    }

    /// Looks up a method by its full signature, e.g. `<A: void foo(int)>`.
    pub fn method_by_signature(&self, signature: &str) -> Result<MethodId> {
        let (class_name, subsignature) = parse_signature(signature)?;
        let class = self
            .class_by_name(&class_name)
            .ok_or_else(|| AnalysisError::UnknownClass(class_name.clone()))?;
        self.declared_method(class, &subsignature)
            .ok_or_else(|| AnalysisError::UnknownMethod(signature.to_string()))
    }

    /// Invocation statements in the body of `method`, in statement order.
    pub fn call_sites_in(&self, method: MethodId) -> Vec<StmtRef> {
        match self.ir(method) {
            None => vec![],
            Some(ir) => ir
                .stmts
                .iter()
                .filter(|stmt| stmt.is_invoke())
                .map(|stmt| StmtRef::new(method, stmt.index))
                .collect(),
        }
    }

    /// The class to dispatch on for a receiver of type `ty`. Arrays dispatch on
    /// [`ROOT_CLASS`] when the program declares it, and have no class otherwise.
    pub fn class_of_type(&self, ty: &Type) -> Option<ClassId> {
        match ty {
            Type::Class(class) => Some(*class),
            Type::Array(_) => self.class_by_name(ROOT_CLASS),
            _ => None,
        }
    }

    pub fn type_name(&self, ty: &Type) -> String {
        match ty {
            Type::Primitive(p) => p.name().to_string(),
            Type::Class(class) => self.class(*class).name.clone(),
            Type::Array(elem) => format!("{}[]", self.type_name(elem)),
            Type::Null => "null".to_string(),
            Type::Void => "void".to_string(),
        }
    }

    pub fn method_signature(&self, method: MethodId) -> String {
        let m = self.method(method);
        format!("<{}: {}>", self.class(m.class).name, m.subsignature)
    }
}

impl ClassHierarchy for Program {
    fn class(&self, class: ClassId) -> &JClass {
        &self.classes[class.0]
    }

    fn method(&self, method: MethodId) -> &JMethod {
        &self.methods[method.0]
    }

    fn superclass_of(&self, class: ClassId) -> Option<ClassId> {
        self.class(class).super_class
    }

    fn direct_subclasses_of(&self, class: ClassId) -> &[ClassId] {
        self.hierarchy
            .subclasses
            .get(&class)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn direct_subinterfaces_of(&self, class: ClassId) -> &[ClassId] {
        self.hierarchy
            .subinterfaces
            .get(&class)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn direct_implementors_of(&self, class: ClassId) -> &[ClassId] {
        self.hierarchy
            .implementors
            .get(&class)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn declared_method(&self, class: ClassId, subsignature: &Subsignature) -> Option<MethodId> {
        self.class(class).methods.get(subsignature).copied()
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_of_array_type() {
        let mut pb = ProgramBuilder::new();
        let a = pb.add_class("A", None, &[]).unwrap();
        let program = pb.build().unwrap();
        assert_eq!(program.class_of_type(&Type::Class(a)), Some(a));
        assert_eq!(
            program.class_of_type(&Type::array_of(Type::Class(a))),
            None
        );
        assert_eq!(program.class_of_type(&Type::INT), None);

        let mut pb = ProgramBuilder::new();
        let object = pb.add_class(ROOT_CLASS, None, &[]).unwrap();
        pb.add_class("A", Some(object), &[]).unwrap();
        let program = pb.build().unwrap();
        assert_eq!(
            program.class_of_type(&Type::array_of(Type::INT)),
            Some(object)
        );
    }
}
