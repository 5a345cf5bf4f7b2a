// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! LIR emitter - appends instructions to a [`LirBuilder`].

use locus_lir::{BinOp, LirBuilder, LirConst, LirFunction, LirType, MemAttrs, Operand, RuntimeFn};
use locus_types::{Repr, ValTy};

use super::{Emitter, FieldSel, TargetCaps};
use crate::{AccessAttrs, CodegenResult};

/// LIR type holding a value of `ty`. Aggregates are passed by address.
pub fn lir_type(ty: &ValTy) -> LirType {
    match ty.repr {
        Repr::Int(bits) => LirType::int_bits(bits).unwrap_or(LirType::I64),
        Repr::Float(32) => LirType::F32,
        Repr::Float(_) => LirType::F64,
        Repr::Ptr | Repr::Memory => LirType::Ptr,
        Repr::Wide => LirType::WidePtr,
    }
}

fn mem_attrs(attrs: &AccessAttrs) -> MemAttrs {
    MemAttrs {
        alias_scope: attrs.alias_scope,
        outside_independent_loop: attrs.outside_independent_loop,
    }
}

pub struct LirEmitter {
    builder: LirBuilder,
}

impl LirEmitter {
    pub fn new(name: impl Into<String>, ret: Option<LirType>) -> Self {
        LirEmitter { builder: LirBuilder::new(name, ret) }
    }

    pub fn function(&self) -> &LirFunction {
        self.builder.function()
    }

    pub fn finish(self) -> LirFunction {
        self.builder.finish()
    }
}

impl Emitter for LirEmitter {
    type Val = Operand;

    fn caps(&self) -> TargetCaps {
        TargetCaps { name: "lir", opaque_wide: true }
    }

    fn emit_int(&mut self, value: i64, ty: &ValTy) -> Operand {
        match lir_type(ty) {
            float @ (LirType::F32 | LirType::F64) => {
                Operand::Const(LirConst::Float { value: value as f64, ty: float })
            }
            int => Operand::int(value, int),
        }
    }

    fn emit_null(&mut self) -> Operand {
        Operand::null()
    }

    fn emit_param(&mut self, name: &str, ty: &ValTy) -> Operand {
        self.builder.add_param(name, lir_type(ty)).into()
    }

    fn emit_alloca(&mut self, ty: &ValTy, name: &str) -> Operand {
        self.builder.alloca(ty.size.max(1), ty.align.max(1), Some(name.to_string())).into()
    }

    fn emit_load(&mut self, ty: &ValTy, ptr: &Operand, attrs: &AccessAttrs) -> Operand {
        self.builder.load(lir_type(ty), *ptr, mem_attrs(attrs)).into()
    }

    fn emit_store(&mut self, _ty: &ValTy, value: &Operand, ptr: &Operand, attrs: &AccessAttrs) {
        self.builder.store(*ptr, *value, mem_attrs(attrs));
    }

    fn emit_field_gep(&mut self, base: &Operand, field: &FieldSel<'_>) -> Operand {
        self.builder.gep(*base, i64::from(field.offset), None).into()
    }

    fn emit_elem_gep(&mut self, base: &Operand, index: &Operand, elem: &ValTy) -> Operand {
        self.builder.gep(*base, 0, Some((*index, elem.size))).into()
    }

    fn emit_memcpy(&mut self, dst: &Operand, src: &Operand, size: u64) {
        self.builder.memcpy(*dst, *src, size);
    }

    fn emit_memcpy_n(&mut self, dst: &Operand, src: &Operand, size: &Operand) {
        self.builder.memcpy_n(*dst, *src, *size);
    }

    fn emit_call(&mut self, func: RuntimeFn, args: &[Operand]) -> Option<Operand> {
        self.builder.call_runtime(func, args.to_vec()).map(Operand::from)
    }

    fn emit_binary(&mut self, op: BinOp, _ty: &ValTy, lhs: &Operand, rhs: &Operand) -> Operand {
        self.builder.binary(op, *lhs, *rhs).into()
    }

    fn emit_select(&mut self, _ty: &ValTy, cond: &Operand, if_true: &Operand, if_false: &Operand) -> Operand {
        self.builder.select(*cond, *if_true, *if_false).into()
    }

    fn emit_cast(&mut self, value: &Operand, from: &ValTy, to: &ValTy) -> Operand {
        self.builder.cast(*value, lir_type(to), from.signed).into()
    }

    fn emit_wide_make(&mut self, locale: &Operand, addr: &Operand) -> CodegenResult<Operand> {
        Ok(self.builder.wide_make(*locale, *addr).into())
    }

    fn emit_wide_locale(&mut self, wide: &Operand) -> CodegenResult<Operand> {
        Ok(self.builder.wide_locale(*wide).into())
    }

    fn emit_wide_addr(&mut self, wide: &Operand) -> CodegenResult<Operand> {
        Ok(self.builder.wide_addr(*wide).into())
    }

    fn emit_location(&mut self, line: u32, file: u32) {
        self.builder.loc(line, file);
    }

    fn emit_return(&mut self, value: Option<&Operand>) {
        self.builder.ret(value.copied());
    }
}
