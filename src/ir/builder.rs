//! Programmatic construction of a `Program`.
//!
//! Classes, fields and method declarations are added first, then bodies are filled
//! statement by statement through `BodyBuilder`. `ProgramBuilder::build` validates
//! the bodies and computes the per-variable statement indices and the hierarchy.

use std::collections::HashMap;

use super::signature::{parse_signature, MethodRef, Subsignature};
use super::stmt::*;
use super::{
    ClassId, FieldId, HierarchyIndex, Ir, JClass, JField, JMethod, MethodId, Program, StmtRef,
    Type, Var, VarId,
};
use crate::error::{AnalysisError, Result};

#[derive(Debug, Default)]
pub struct ProgramBuilder {
    classes: Vec<JClass>,
    class_names: HashMap<String, ClassId>,
    fields: Vec<JField>,
    methods: Vec<JMethod>,
    vars: Vec<Var>,
    main: Option<MethodId>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_class_decl(
        &mut self,
        name: &str,
        super_class: Option<ClassId>,
        interfaces: &[ClassId],
        is_interface: bool,
    ) -> Result<ClassId> {
        if self.class_names.contains_key(name) {
            return Err(AnalysisError::DuplicateClass(name.to_string()));
        }
        let id = ClassId(self.classes.len());
        self.classes.push(JClass {
            name: name.to_string(),
            super_class,
            interfaces: interfaces.to_vec(),
            is_interface,
            is_abstract: is_interface,
            methods: HashMap::new(),
        });
        self.class_names.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn add_class(
        &mut self,
        name: &str,
        super_class: Option<ClassId>,
        interfaces: &[ClassId],
    ) -> Result<ClassId> {
        self.add_class_decl(name, super_class, interfaces, false)
    }

    pub fn add_interface(&mut self, name: &str, super_interfaces: &[ClassId]) -> Result<ClassId> {
        self.add_class_decl(name, None, super_interfaces, true)
    }

    pub fn set_abstract(&mut self, class: ClassId) {
        self.classes[class.0].is_abstract = true;
    }

    pub fn class_id(&self, name: &str) -> Result<ClassId> {
        self.class_names
            .get(name)
            .copied()
            .ok_or_else(|| AnalysisError::UnknownClass(name.to_string()))
    }

    pub fn add_field(&mut self, class: ClassId, name: &str, ty: Type, is_static: bool) -> FieldId {
        let id = FieldId(self.fields.len());
        self.fields.push(JField {
            name: name.to_string(),
            class,
            ty,
            is_static,
        });
        id
    }

    fn type_name(&self, ty: &Type) -> String {
        match ty {
            Type::Primitive(p) => p.name().to_string(),
            Type::Class(class) => self.classes[class.0].name.clone(),
            Type::Array(elem) => format!("{}[]", self.type_name(elem)),
            Type::Null => "null".to_string(),
            Type::Void => "void".to_string(),
        }
    }

    fn new_var(&mut self, method: MethodId, name: &str, ty: Type) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(Var {
            name: name.to_string(),
            ty,
            method,
            load_fields: vec![],
            store_fields: vec![],
            load_arrays: vec![],
            store_arrays: vec![],
            invokes: vec![],
        });
        id
    }

    fn declare_method(
        &mut self,
        class: ClassId,
        name: &str,
        params: &[Type],
        ret: Type,
        is_static: bool,
        is_abstract: bool,
    ) -> Result<MethodId> {
        let param_names: Vec<String> = params.iter().map(|t| self.type_name(t)).collect();
        let param_names: Vec<&str> = param_names.iter().map(String::as_str).collect();
        let subsignature = Subsignature::new(&self.type_name(&ret), name, &param_names);
        if self.classes[class.0].methods.contains_key(&subsignature) {
            return Err(AnalysisError::DuplicateMethod {
                class: self.classes[class.0].name.clone(),
                subsignature: subsignature.to_string(),
            });
        }
        let id = MethodId(self.methods.len());
        let ir = if is_abstract {
            None
        } else {
            let mut ir = Ir::default();
            if !is_static {
                let this = self.new_var(id, "this", Type::Class(class));
                ir.this = Some(this);
                ir.vars.push(this);
            }
            for (i, ty) in params.iter().enumerate() {
                let param = self.new_var(id, &format!("p{}", i), ty.clone());
                ir.params.push(param);
                ir.vars.push(param);
            }
            Some(ir)
        };
        self.methods.push(JMethod {
            name: name.to_string(),
            class,
            subsignature: subsignature.clone(),
            param_types: params.to_vec(),
            return_type: ret,
            is_static,
            is_abstract,
            ir,
        });
        self.classes[class.0].methods.insert(subsignature, id);
        Ok(id)
    }

    /// Declares a method with an (initially empty) body.
    pub fn add_method(
        &mut self,
        class: ClassId,
        name: &str,
        params: &[Type],
        ret: Type,
        is_static: bool,
    ) -> Result<MethodId> {
        self.declare_method(class, name, params, ret, is_static, false)
    }

    pub fn add_abstract_method(
        &mut self,
        class: ClassId,
        name: &str,
        params: &[Type],
        ret: Type,
    ) -> Result<MethodId> {
        self.declare_method(class, name, params, ret, false, true)
    }

    pub fn body(&mut self, method: MethodId) -> Result<BodyBuilder<'_>> {
        let m = &self.methods[method.0];
        if m.ir.is_none() {
            return Err(AnalysisError::MissingBody(format!(
                "<{}: {}>",
                self.classes[m.class.0].name, m.subsignature
            )));
        }
        Ok(BodyBuilder {
            builder: self,
            method,
        })
    }

    /// Resolves `<Class: ret name(params)>` to a reference. The method itself need not be
    /// declared yet, only the class.
    pub fn method_ref(&self, signature: &str) -> Result<MethodRef> {
        let (class_name, subsignature) = parse_signature(signature)?;
        Ok(MethodRef::new(self.class_id(&class_name)?, subsignature))
    }

    pub fn method_ref_of(&self, method: MethodId) -> MethodRef {
        let m = &self.methods[method.0];
        MethodRef::new(m.class, m.subsignature.clone())
    }

    pub fn set_main(&mut self, method: MethodId) {
        self.main = Some(method);
    }

    pub fn build(mut self) -> Result<Program> {
        if let Some(main) = self.main {
            let m = &self.methods[main.0];
            if !m.is_static || m.ir.is_none() {
                return Err(AnalysisError::InvalidMain(format!(
                    "<{}: {}>",
                    self.classes[m.class.0].name, m.subsignature
                )));
            }
        }
        for (m, method) in self.methods.iter_mut().enumerate() {
            let ir = match method.ir.as_mut() {
                Some(ir) => ir,
                None => continue,
            };
            let len = ir.stmts.len();
            for stmt in ir.stmts.iter() {
                for target in stmt.targets() {
                    if target >= len {
                        return Err(AnalysisError::InvalidJumpTarget {
                            method: format!(
                                "<{}: {}>",
                                self.classes[method.class.0].name, method.subsignature
                            ),
                            stmt: stmt.index,
                            target,
                            len,
                        });
                    }
                }
                let site = StmtRef::new(MethodId(m), stmt.index);
                match &stmt.kind {
                    StmtKind::Assign { rvalue, .. } => match rvalue {
                        Exp::FieldAccess(FieldAccess::Instance { base, .. }) => {
                            self.vars[base.0].load_fields.push(site)
                        }
                        Exp::ArrayAccess(access) => self.vars[access.base.0].load_arrays.push(site),
                        _ => {}
                    },
                    StmtKind::StoreField {
                        access: FieldAccess::Instance { base, .. },
                        ..
                    } => self.vars[base.0].store_fields.push(site),
                    StmtKind::StoreArray { access, .. } => {
                        self.vars[access.base.0].store_arrays.push(site)
                    }
                    StmtKind::Invoke { exp, .. } => {
                        if let Some(base) = exp.base {
                            self.vars[base.0].invokes.push(site);
                        }
                    }
                    _ => {}
                }
                if let StmtKind::Return { value: Some(v) } = stmt.kind {
                    if !ir.return_vars.contains(&v) {
                        ir.return_vars.push(v);
                    }
                }
            }
        }

        let mut hierarchy = HierarchyIndex::default();
        for (c, class) in self.classes.iter().enumerate() {
            let id = ClassId(c);
            if class.is_interface {
                for &sup in class.interfaces.iter() {
                    hierarchy.subinterfaces.entry(sup).or_default().push(id);
                }
            } else {
                if let Some(sup) = class.super_class {
                    hierarchy.subclasses.entry(sup).or_default().push(id);
                }
                for &iface in class.interfaces.iter() {
                    hierarchy.implementors.entry(iface).or_default().push(id);
                }
            }
        }

        Ok(Program {
            classes: self.classes,
            class_names: self.class_names,
            fields: self.fields,
            methods: self.methods,
            vars: self.vars,
            main: self.main,
            hierarchy,
        })
    }
}

/// Appends statements to one method body. Every helper returns the index of the
/// statement it added, which is also what jump targets refer to.
pub struct BodyBuilder<'a> {
    builder: &'a mut ProgramBuilder,
    method: MethodId,
}

impl<'a> BodyBuilder<'a> {
    fn ir(&self) -> &Ir {
        // body() only hands out builders for methods with an IR
        self.builder.methods[self.method.0]
            .ir
            .as_ref()
            .expect("body builder on a method without IR")
    }

    fn ir_mut(&mut self) -> &mut Ir {
        self.builder.methods[self.method.0]
            .ir
            .as_mut()
            .expect("body builder on a method without IR")
    }

    pub fn method(&self) -> MethodId {
        self.method
    }

    pub fn this(&self) -> Option<VarId> {
        self.ir().this
    }

    pub fn param(&self, i: usize) -> Option<VarId> {
        self.ir().params.get(i).copied()
    }

    pub fn var(&mut self, name: &str, ty: Type) -> VarId {
        let var = self.builder.new_var(self.method, name, ty);
        self.ir_mut().vars.push(var);
        var
    }

    /// Index the next pushed statement will get.
    pub fn next_index(&self) -> usize {
        self.ir().stmts.len()
    }

    pub fn push(&mut self, kind: StmtKind) -> usize {
        let ir = self.ir_mut();
        let index = ir.stmts.len();
        ir.stmts.push(Stmt::new(index, kind));
        index
    }

    pub fn assign(&mut self, lvalue: VarId, rvalue: Exp) -> usize {
        self.push(StmtKind::Assign { lvalue, rvalue })
    }

    pub fn new_obj(&mut self, lvalue: VarId, ty: Type) -> usize {
        self.assign(lvalue, Exp::New(NewExp { ty }))
    }

    pub fn assign_int(&mut self, lvalue: VarId, value: i64) -> usize {
        self.assign(lvalue, Exp::Literal(Literal::Int(value)))
    }

    pub fn copy(&mut self, lvalue: VarId, rvalue: VarId) -> usize {
        self.assign(lvalue, Exp::Var(rvalue))
    }

    pub fn binary(&mut self, lvalue: VarId, op: BinaryOp, lhs: VarId, rhs: VarId) -> usize {
        self.assign(lvalue, Exp::Binary(BinaryExp { op, lhs, rhs }))
    }

    pub fn cast(&mut self, lvalue: VarId, ty: Type, value: VarId) -> usize {
        self.assign(lvalue, Exp::Cast(CastExp { ty, value }))
    }

    pub fn load_field(&mut self, lvalue: VarId, base: VarId, field: FieldId) -> usize {
        self.assign(lvalue, Exp::FieldAccess(FieldAccess::Instance { base, field }))
    }

    pub fn store_field(&mut self, base: VarId, field: FieldId, rvalue: VarId) -> usize {
        self.push(StmtKind::StoreField {
            access: FieldAccess::Instance { base, field },
            rvalue,
        })
    }

    pub fn load_static(&mut self, lvalue: VarId, field: FieldId) -> usize {
        self.assign(lvalue, Exp::FieldAccess(FieldAccess::Static(field)))
    }

    pub fn store_static(&mut self, field: FieldId, rvalue: VarId) -> usize {
        self.push(StmtKind::StoreField {
            access: FieldAccess::Static(field),
            rvalue,
        })
    }

    pub fn load_array(&mut self, lvalue: VarId, base: VarId, index: VarId) -> usize {
        self.assign(lvalue, Exp::ArrayAccess(ArrayAccess { base, index }))
    }

    pub fn store_array(&mut self, base: VarId, index: VarId, rvalue: VarId) -> usize {
        self.push(StmtKind::StoreArray {
            access: ArrayAccess { base, index },
            rvalue,
        })
    }

    pub fn invoke(
        &mut self,
        result: Option<VarId>,
        kind: CallKind,
        method_ref: MethodRef,
        base: Option<VarId>,
        args: &[VarId],
    ) -> usize {
        self.push(StmtKind::Invoke {
            result,
            exp: InvokeExp {
                kind,
                method_ref,
                base,
                args: args.to_vec(),
            },
        })
    }

    pub fn invoke_static(
        &mut self,
        result: Option<VarId>,
        method_ref: MethodRef,
        args: &[VarId],
    ) -> usize {
        self.invoke(result, CallKind::Static, method_ref, None, args)
    }

    pub fn invoke_virtual(
        &mut self,
        result: Option<VarId>,
        base: VarId,
        method_ref: MethodRef,
        args: &[VarId],
    ) -> usize {
        self.invoke(result, CallKind::Virtual, method_ref, Some(base), args)
    }

    pub fn invoke_interface(
        &mut self,
        result: Option<VarId>,
        base: VarId,
        method_ref: MethodRef,
        args: &[VarId],
    ) -> usize {
        self.invoke(result, CallKind::Interface, method_ref, Some(base), args)
    }

    pub fn invoke_special(
        &mut self,
        result: Option<VarId>,
        base: VarId,
        method_ref: MethodRef,
        args: &[VarId],
    ) -> usize {
        self.invoke(result, CallKind::Special, method_ref, Some(base), args)
    }

    pub fn if_(&mut self, op: ConditionOp, lhs: VarId, rhs: VarId, target: usize) -> usize {
        self.push(StmtKind::If {
            cond: ConditionExp { op, lhs, rhs },
            target,
        })
    }

    pub fn goto(&mut self, target: usize) -> usize {
        self.push(StmtKind::Goto { target })
    }

    pub fn switch(&mut self, var: VarId, cases: &[(i64, usize)], default: usize) -> usize {
        self.push(StmtKind::Switch {
            var,
            cases: cases.to_vec(),
            default,
        })
    }

    pub fn ret(&mut self, value: Option<VarId>) -> usize {
        self.push(StmtKind::Return { value })
    }

    pub fn nop(&mut self) -> usize {
        self.push(StmtKind::Nop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ClassHierarchy;

    #[test]
    fn test_build_records_var_statements() {
        let mut pb = ProgramBuilder::new();
        let object = pb.add_class("java.lang.Object", None, &[]).unwrap();
        let a = pb.add_class("A", Some(object), &[]).unwrap();
        let f = pb.add_field(a, "f", Type::Class(object), false);
        let foo = pb.add_method(a, "foo", &[], Type::Void, false).unwrap();
        let main = pb.add_method(a, "main", &[], Type::Void, true).unwrap();
        let foo_ref = pb.method_ref("<A: void foo()>").unwrap();
        let (x, y) = {
            let mut body = pb.body(main).unwrap();
            let x = body.var("x", Type::Class(a));
            let y = body.var("y", Type::Class(object));
            body.new_obj(x, Type::Class(a));
            body.store_field(x, f, y);
            body.load_field(y, x, f);
            body.invoke_virtual(None, x, foo_ref, &[]);
            body.ret(None);
            (x, y)
        };
        pb.set_main(main);
        let program = pb.build().unwrap();

        let var = program.var(x);
        assert_eq!(var.store_fields, vec![StmtRef::new(main, 1)]);
        assert_eq!(var.load_fields, vec![StmtRef::new(main, 2)]);
        assert_eq!(var.invokes, vec![StmtRef::new(main, 3)]);
        assert!(program.var(y).load_fields.is_empty());
        assert_eq!(program.call_sites_in(main), vec![StmtRef::new(main, 3)]);
        assert_eq!(program.method_by_signature("<A: void foo()>").unwrap(), foo);
        assert!(program.method(foo).ir.as_ref().unwrap().this.is_some());
        assert_eq!(program.main_method(), Some(main));
    }

    #[test]
    fn test_hierarchy_index() {
        let mut pb = ProgramBuilder::new();
        let object = pb.add_class("java.lang.Object", None, &[]).unwrap();
        let i = pb.add_interface("I", &[]).unwrap();
        let j = pb.add_interface("J", &[i]).unwrap();
        let a = pb.add_class("A", Some(object), &[j]).unwrap();
        let b = pb.add_class("B", Some(a), &[]).unwrap();
        let program = pb.build().unwrap();

        assert_eq!(program.direct_subinterfaces_of(i), &[j]);
        assert_eq!(program.direct_implementors_of(j), &[a]);
        assert_eq!(program.direct_subclasses_of(a), &[b]);
        assert_eq!(program.direct_subclasses_of(object), &[a]);
        assert!(program.direct_implementors_of(i).is_empty());
        assert_eq!(program.superclass_of(b), Some(a));
    }

    #[test]
    fn test_build_errors() {
        let mut pb = ProgramBuilder::new();
        let a = pb.add_class("A", None, &[]).unwrap();
        assert_eq!(
            pb.add_class("A", None, &[]),
            Err(AnalysisError::DuplicateClass("A".to_string()))
        );
        assert!(pb.method_ref("<Missing: void m()>").is_err());
        let abs = pb.add_abstract_method(a, "m", &[], Type::Void).unwrap();
        assert!(matches!(pb.body(abs), Err(AnalysisError::MissingBody(_))));
        assert!(matches!(
            pb.add_method(a, "m", &[], Type::Void, false),
            Err(AnalysisError::DuplicateMethod { .. })
        ));

        let m = pb.add_method(a, "n", &[Type::INT], Type::Void, true).unwrap();
        pb.body(m).unwrap().goto(7);
        assert!(matches!(
            pb.build(),
            Err(AnalysisError::InvalidJumpTarget { target: 7, len: 1, .. })
        ));
    }

    #[test]
    fn test_main_must_be_static_with_body() {
        let mut pb = ProgramBuilder::new();
        let c = pb.add_class("C", None, &[]).unwrap();
        let abs = pb.add_abstract_method(c, "main", &[], Type::Void).unwrap();
        pb.set_main(abs);
        assert_eq!(
            pb.build().err(),
            Some(AnalysisError::InvalidMain("<C: void main()>".to_string()))
        );

        let mut pb = ProgramBuilder::new();
        let c = pb.add_class("C", None, &[]).unwrap();
        let instance = pb.add_method(c, "main", &[], Type::Void, false).unwrap();
        pb.set_main(instance);
        assert!(matches!(pb.build(), Err(AnalysisError::InvalidMain(_))));

        let mut pb = ProgramBuilder::new();
        let c = pb.add_class("C", None, &[]).unwrap();
        let main = pb.add_method(c, "main", &[], Type::Void, true).unwrap();
        pb.body(main).unwrap().ret(None);
        pb.set_main(main);
        assert_eq!(pb.build().unwrap().main_method(), Some(main));
    }
}
