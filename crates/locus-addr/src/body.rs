// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Statement lowering: straight-line function bodies of memory accesses.

use std::collections::HashMap;

use locus_lir::BinOp;
use locus_types::{Repr, TypeId, TypeKind, ValTy};
use tracing::{debug, instrument};

use crate::emit::Emitter;
use crate::{AddrState, Address, CodegenContext, CodegenError, CodegenResult, Lowerer, Materialized, WidePtr};

/// An expression that names storage.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceExpr {
    Var(String),
    Field(Box<PlaceExpr>, String),
    Index(Box<PlaceExpr>, Box<ValueExpr>),
    Deref(Box<PlaceExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueExpr {
    Place(PlaceExpr),
    Int(i64),
    Nil,
    Binary(BinOp, Box<ValueExpr>, Box<ValueExpr>),
    /// Class downcast; nil when the object is not an instance of the class.
    DynamicCast(Box<ValueExpr>, TypeId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccessStmt {
    Assign { dst: PlaceExpr, src: ValueExpr },
    OpAssign { dst: PlaceExpr, op: BinOp, src: ValueExpr },
    UnorderedAssign { dst: PlaceExpr, src: ValueExpr },
    Fence,
    Prefetch(PlaceExpr),
    CheckNil(PlaceExpr),
    Location { line: u32, file: u32 },
    Return(Option<ValueExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSig {
    pub name: String,
    pub params: Vec<VarDecl>,
    pub locals: Vec<VarDecl>,
    pub ret: Option<TypeId>,
}

/// Lower `body` into `em`. Parameters are values (wide ones split into
/// `<name>_locale` and `<name>_addr` in immediate mode; aggregates passed
/// by address) and locals are stack slots named after the variable.
#[instrument(skip_all, fields(func = %sig.name))]
pub fn lower_function<E: Emitter>(
    cx: &mut CodegenContext,
    em: &mut E,
    sig: &FunctionSig,
    body: &[AccessStmt],
) -> CodegenResult<()> {
    let mut lowerer = BodyLowerer { lw: Lowerer::new(cx, em), vars: HashMap::new() };
    for param in &sig.params {
        lowerer.declare_param(param);
    }
    for local in &sig.locals {
        lowerer.declare_local(local);
    }
    for stmt in body {
        lowerer.lower_stmt(stmt)?;
    }
    debug!(stmts = body.len(), comm_ids = lowerer.lw.cx.comm_ids(), "lowered function body");
    Ok(())
}

struct BodyLowerer<'a, E: Emitter> {
    lw: Lowerer<'a, E>,
    vars: HashMap<String, Address<E::Val>>,
}

impl<E: Emitter> BodyLowerer<'_, E> {
    fn declare_param(&mut self, param: &VarDecl) {
        let vt = self.lw.val_ty(param.ty);
        let addr = match vt.repr {
            Repr::Wide if self.lw.cx.is_deferred() => {
                let v = self.lw.em.emit_param(&param.name, &vt);
                Address::wide_value(WidePtr::Opaque(v), param.ty)
            }
            Repr::Wide => {
                let locale = self.lw.em.emit_param(&format!("{}_locale", param.name), &ValTy::locale());
                let addr = self.lw.em.emit_param(&format!("{}_addr", param.name), &ValTy::ptr());
                Address::wide_value(WidePtr::Parts { locale, addr }, param.ty)
            }
            Repr::Memory => {
                let by_ref = ValTy { c_name: format!("{}*", vt.c_name), ..ValTy::ptr() };
                let p = self.lw.em.emit_param(&param.name, &by_ref);
                Address::local(p, param.ty)
            }
            _ => {
                let v = self.lw.em.emit_param(&param.name, &vt);
                Address::value(v, param.ty)
            }
        };
        self.vars.insert(param.name.clone(), addr);
    }

    fn declare_local(&mut self, local: &VarDecl) {
        let vt = self.lw.val_ty(local.ty);
        let p = self.lw.em.emit_alloca(&vt, &local.name);
        self.vars.insert(local.name.clone(), Address::local(p, local.ty));
    }

    fn lower_stmt(&mut self, stmt: &AccessStmt) -> CodegenResult<()> {
        match stmt {
            AccessStmt::Assign { dst, src } => {
                let (dst, src) = self.operands(dst, src)?;
                self.lw.assign(&dst, src)
            }
            AccessStmt::OpAssign { dst, op, src } => {
                let (dst, src) = self.operands(dst, src)?;
                self.lw.op_assign(&dst, *op, src)
            }
            AccessStmt::UnorderedAssign { dst, src } => {
                let (dst, src) = self.operands(dst, src)?;
                self.lw.unordered_assign(&dst, src)
            }
            AccessStmt::Fence => {
                self.lw.unordered_fence();
                Ok(())
            }
            AccessStmt::Prefetch(place) => {
                let addr = self.place(place)?;
                self.lw.prefetch(&addr)
            }
            AccessStmt::CheckNil(place) => {
                let addr = self.place(place)?;
                self.lw.check_nil(&addr)
            }
            AccessStmt::Location { line, file } => {
                self.lw.cx.set_location(*line, *file);
                self.lw.em.emit_location(*line, *file);
                Ok(())
            }
            AccessStmt::Return(None) => {
                self.lw.em.emit_return(None);
                Ok(())
            }
            AccessStmt::Return(Some(value)) => {
                let mut addr = self.value(value)?;
                if self.is_ref(addr.ty) {
                    addr = self.lw.deref(addr)?;
                }
                match self.lw.materialize(addr)?.state {
                    AddrState::Value(Materialized::Plain(v)) => {
                        self.lw.em.emit_return(Some(&v));
                        Ok(())
                    }
                    _ => Err(CodegenError::UnsupportedTarget {
                        target: self.lw.em.caps().name,
                        what: "returning wide or aggregate values".to_string(),
                    }),
                }
            }
        }
    }

    /// Resolve both sides of an assignment, dereferencing a reference on
    /// one side when the other side is not a reference.
    fn operands(&mut self, dst: &PlaceExpr, src: &ValueExpr) -> CodegenResult<(Address<E::Val>, Address<E::Val>)> {
        let mut dst = self.place(dst)?;
        let mut src = self.value(src)?;
        let dst_ref = self.is_ref(dst.ty);
        let src_ref = self.is_ref(src.ty);
        let src_nil = matches!(self.lw.kind(src.ty), TypeKind::Nil);
        if src_ref && !dst_ref {
            src = self.lw.deref(src)?;
        } else if dst_ref && !src_ref && !src_nil {
            dst = self.lw.deref(dst)?;
        }
        Ok((dst, src))
    }

    fn is_ref(&self, ty: TypeId) -> bool {
        self.lw.cx.types.get(ty).is_ref()
    }

    fn place(&mut self, place: &PlaceExpr) -> CodegenResult<Address<E::Val>> {
        match place {
            PlaceExpr::Var(name) => self
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| CodegenError::UnknownVariable(name.clone())),
            PlaceExpr::Field(base, field) => {
                let base = self.place(base)?;
                self.lw.field_ptr(base, field)
            }
            PlaceExpr::Index(base, index) => {
                let base = self.place(base)?;
                let index = self.value(index)?;
                self.lw.element_ptr(base, index)
            }
            PlaceExpr::Deref(inner) => {
                let inner = self.place(inner)?;
                self.lw.deref(inner)
            }
        }
    }

    fn value(&mut self, value: &ValueExpr) -> CodegenResult<Address<E::Val>> {
        match value {
            ValueExpr::Place(place) => self.place(place),
            ValueExpr::Int(v) => Ok(self.lw.int_address(*v)),
            ValueExpr::Nil => {
                let null = self.lw.em.emit_null();
                Ok(Address::value(null, self.lw.cx.types.builtins().nil))
            }
            ValueExpr::Binary(op, lhs, rhs) => {
                let lhs = self.scalar(lhs)?;
                let rhs = self.scalar(rhs)?;
                let vt = self.lw.val_ty(lhs.ty);
                let (AddrState::Value(Materialized::Plain(l)), AddrState::Value(Materialized::Plain(r))) =
                    (&lhs.state, &rhs.state)
                else {
                    return Err(CodegenError::invariant("binary operands must be plain scalars"));
                };
                let result = self.lw.em.emit_binary(*op, &vt, l, r);
                let ty = if op.is_compare() { self.lw.cx.types.builtins().bool } else { lhs.ty };
                Ok(Address::value(result, ty))
            }
            ValueExpr::DynamicCast(obj, target) => {
                let obj = self.value(obj)?;
                self.lw.dynamic_cast(obj, *target)
            }
        }
    }

    /// A materialized scalar operand; references are read through.
    fn scalar(&mut self, value: &ValueExpr) -> CodegenResult<Address<E::Val>> {
        let mut addr = self.value(value)?;
        if self.is_ref(addr.ty) {
            addr = self.lw.deref(addr)?;
        }
        self.lw.materialize(addr)
    }
}
