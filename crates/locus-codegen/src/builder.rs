// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Function builder - lowers straight-line LIR to Cranelift IR.

use std::collections::HashMap;

use cranelift::prelude::*;
use cranelift_codegen::ir::condcodes::{FloatCC, IntCC};
use cranelift_codegen::ir::{FuncRef, Function, InstBuilder, MemFlags, SourceLoc, StackSlotData, StackSlotKind};
use cranelift_codegen::isa::TargetFrontendConfig;
use cranelift_frontend::{FunctionBuilder as ClifFunctionBuilder, FunctionBuilderContext};
use locus_lir::{BinOp, LirConst, LirFunction, LirInst, LirType, Operand, ValueId};

use crate::types::{int_imm, lir_to_cranelift_type};
use crate::{CodegenError, CodegenResult};

pub struct FunctionBuilder<'a> {
    func: &'a mut Function,
    builder_ctx: FunctionBuilderContext,
    lir: &'a LirFunction,
    /// Pre-imported callees, by symbol.
    func_refs: &'a HashMap<String, FuncRef>,
    config: TargetFrontendConfig,
}

impl<'a> FunctionBuilder<'a> {
    pub fn new(
        func: &'a mut Function,
        lir: &'a LirFunction,
        func_refs: &'a HashMap<String, FuncRef>,
        config: TargetFrontendConfig,
    ) -> Self {
        FunctionBuilder { func, builder_ctx: FunctionBuilderContext::new(), lir, func_refs, config }
    }

    /// Build the Cranelift IR. The whole body is one block.
    pub fn build(self) -> CodegenResult<()> {
        let FunctionBuilder { func, mut builder_ctx, lir, func_refs, config } = self;
        if lir.has_wide_ops() {
            return Err(CodegenError::WideOperation { func: lir.name.clone(), what: "unlowered wide operations" });
        }

        let mut builder = ClifFunctionBuilder::new(func, &mut builder_ctx);
        let entry = builder.create_block();
        builder.append_block_params_for_function_params(entry);
        builder.switch_to_block(entry);
        builder.seal_block(entry);

        let mut values = vec![None; lir.values.len()];
        for (param, value) in lir.params.iter().zip(builder.block_params(entry).to_vec()) {
            values[param.id.0 as usize] = Some(value);
        }

        let mut lower = Lower { b: builder, lir, func_refs, config, values };
        let mut returned = false;
        for inst in &lir.body {
            if lower.inst(inst)? {
                returned = true;
                break;
            }
        }
        if !returned {
            if lir.ret_ty.is_some() {
                return Err(CodegenError::MissingReturn(lir.name.clone()));
            }
            lower.b.ins().return_(&[]);
        }

        lower.b.seal_all_blocks();
        lower.b.finalize();
        Ok(())
    }
}

struct Lower<'f, 'b> {
    b: ClifFunctionBuilder<'b>,
    lir: &'f LirFunction,
    func_refs: &'f HashMap<String, FuncRef>,
    config: TargetFrontendConfig,
    values: Vec<Option<Value>>,
}

impl Lower<'_, '_> {
    fn clif_type(&self, ty: LirType) -> CodegenResult<Type> {
        lir_to_cranelift_type(ty, &self.lir.name)
    }

    fn define(&mut self, dst: ValueId, value: Value) {
        if let Some(slot) = self.values.get_mut(dst.0 as usize) {
            *slot = Some(value);
        }
    }

    fn operand(&mut self, op: &Operand) -> CodegenResult<Value> {
        match op {
            Operand::Value(id) => self
                .values
                .get(id.0 as usize)
                .copied()
                .flatten()
                .ok_or(CodegenError::UndefinedValue(id.0)),
            Operand::Const(LirConst::Int { value, ty }) => {
                let ty = self.clif_type(*ty)?;
                Ok(if ty == types::F32 {
                    self.b.ins().f32const(*value as f32)
                } else if ty == types::F64 {
                    self.b.ins().f64const(*value as f64)
                } else {
                    self.b.ins().iconst(ty, int_imm(*value, ty))
                })
            }
            Operand::Const(LirConst::Float { value, ty }) => Ok(match ty {
                LirType::F32 => self.b.ins().f32const(*value as f32),
                _ => self.b.ins().f64const(*value),
            }),
            Operand::Const(LirConst::Null) => Ok(self.b.ins().iconst(types::I64, 0)),
        }
    }

    fn wide(&self, what: &'static str) -> CodegenError {
        CodegenError::WideOperation { func: self.lir.name.clone(), what }
    }

    /// Lower one instruction. Returns true once the function has returned.
    fn inst(&mut self, inst: &LirInst) -> CodegenResult<bool> {
        match inst {
            LirInst::Alloca { dst, size, align, .. } => {
                let align_shift = (*align).max(1).trailing_zeros() as u8;
                let ss = self
                    .b
                    .create_sized_stack_slot(StackSlotData::new(StackSlotKind::ExplicitSlot, *size, align_shift));
                let addr = self.b.ins().stack_addr(types::I64, ss, 0);
                self.define(*dst, addr);
            }
            LirInst::Load { dst, addr, .. } => {
                let ty = self.clif_type(self.lir.value_type(*dst))?;
                let addr = self.operand(addr)?;
                let value = self.b.ins().load(ty, MemFlags::new(), addr, 0);
                self.define(*dst, value);
            }
            LirInst::Store { addr, value, .. } => {
                let addr = self.operand(addr)?;
                let value = self.operand(value)?;
                self.b.ins().store(MemFlags::new(), value, addr, 0);
            }
            LirInst::Gep { dst, base, offset, index } => {
                let mut addr = self.operand(base)?;
                if *offset != 0 {
                    addr = self.b.ins().iadd_imm(addr, *offset);
                }
                if let Some((idx, scale)) = index {
                    let idx_ty = self.clif_type(self.lir.operand_type(idx))?;
                    let mut idx = self.operand(idx)?;
                    if idx_ty.bits() < 64 {
                        idx = self.b.ins().sextend(types::I64, idx);
                    }
                    let scaled = self.b.ins().imul_imm(idx, i64::from(*scale));
                    addr = self.b.ins().iadd(addr, scaled);
                }
                self.define(*dst, addr);
            }
            LirInst::Memcpy { dst, src, size } => {
                let dst = self.operand(dst)?;
                let src = self.operand(src)?;
                let size = self.operand(size)?;
                self.b.call_memcpy(self.config, dst, src, size);
            }
            LirInst::Call { dst, func, args } => {
                let func_ref = *self.func_refs.get(func).ok_or_else(|| CodegenError::UnknownCallee(func.clone()))?;
                let args = args.iter().map(|a| self.operand(a)).collect::<CodegenResult<Vec<_>>>()?;
                let call = self.b.ins().call(func_ref, &args);
                if let Some(dst) = dst {
                    let result = self
                        .b
                        .inst_results(call)
                        .first()
                        .copied()
                        .ok_or_else(|| CodegenError::Unsupported(format!("`{func}` returns no value")))?;
                    self.define(*dst, result);
                }
            }
            LirInst::Binary { dst, op, lhs, rhs } => {
                let float = self.lir.operand_type(lhs).is_float();
                let l = self.operand(lhs)?;
                let r = self.operand(rhs)?;
                let value = if float { self.float_binary(*op, l, r)? } else { self.int_binary(*op, l, r) };
                self.define(*dst, value);
            }
            LirInst::Cast { dst, value, signed } => {
                let from = self.clif_type(self.lir.operand_type(value))?;
                let to = self.clif_type(self.lir.value_type(*dst))?;
                let v = self.operand(value)?;
                let cast = self.cast(v, from, to, *signed);
                self.define(*dst, cast);
            }
            LirInst::Select { dst, cond, if_true, if_false } => {
                let cond = self.operand(cond)?;
                let t = self.operand(if_true)?;
                let f = self.operand(if_false)?;
                let value = self.b.ins().select(cond, t, f);
                self.define(*dst, value);
            }
            LirInst::WideMake { .. } => return Err(self.wide("wideptr construction")),
            LirInst::WideLocale { .. } | LirInst::WideAddr { .. } => return Err(self.wide("wideptr extraction")),
            LirInst::Loc { line, .. } => self.b.set_srcloc(SourceLoc::new(*line)),
            LirInst::Return { value } => {
                match (value, self.lir.ret_ty) {
                    (Some(v), Some(_)) => {
                        let v = self.operand(v)?;
                        self.b.ins().return_(&[v]);
                    }
                    (None, None) => {
                        self.b.ins().return_(&[]);
                    }
                    (None, Some(_)) => return Err(CodegenError::MissingReturn(self.lir.name.clone())),
                    (Some(_), None) => {
                        return Err(CodegenError::Unsupported(format!(
                            "value returned from `{}`, which has no return type",
                            self.lir.name
                        )))
                    }
                }
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn int_binary(&mut self, op: BinOp, l: Value, r: Value) -> Value {
        let ins = self.b.ins();
        match op {
            BinOp::Add => ins.iadd(l, r),
            BinOp::Sub => ins.isub(l, r),
            BinOp::Mul => ins.imul(l, r),
            BinOp::And => ins.band(l, r),
            BinOp::Or => ins.bor(l, r),
            BinOp::Xor => ins.bxor(l, r),
            BinOp::Eq => ins.icmp(IntCC::Equal, l, r),
            BinOp::Ne => ins.icmp(IntCC::NotEqual, l, r),
            BinOp::Lt => ins.icmp(IntCC::SignedLessThan, l, r),
            BinOp::Le => ins.icmp(IntCC::SignedLessThanOrEqual, l, r),
            BinOp::Gt => ins.icmp(IntCC::SignedGreaterThan, l, r),
            BinOp::Ge => ins.icmp(IntCC::SignedGreaterThanOrEqual, l, r),
        }
    }

    fn float_binary(&mut self, op: BinOp, l: Value, r: Value) -> CodegenResult<Value> {
        let ins = self.b.ins();
        Ok(match op {
            BinOp::Add => ins.fadd(l, r),
            BinOp::Sub => ins.fsub(l, r),
            BinOp::Mul => ins.fmul(l, r),
            BinOp::Eq => ins.fcmp(FloatCC::Equal, l, r),
            BinOp::Ne => ins.fcmp(FloatCC::NotEqual, l, r),
            BinOp::Lt => ins.fcmp(FloatCC::LessThan, l, r),
            BinOp::Le => ins.fcmp(FloatCC::LessThanOrEqual, l, r),
            BinOp::Gt => ins.fcmp(FloatCC::GreaterThan, l, r),
            BinOp::Ge => ins.fcmp(FloatCC::GreaterThanOrEqual, l, r),
            BinOp::And | BinOp::Or | BinOp::Xor => {
                return Err(CodegenError::Unsupported(format!("bitwise {op:?} on floating point operands")))
            }
        })
    }

    fn cast(&mut self, v: Value, from: Type, to: Type, signed: bool) -> Value {
        if from == to {
            return v;
        }
        let ins = self.b.ins();
        match (from.is_float(), to.is_float()) {
            (false, false) if to.bits() < from.bits() => ins.ireduce(to, v),
            (false, false) if signed => ins.sextend(to, v),
            (false, false) => ins.uextend(to, v),
            (false, true) if signed => ins.fcvt_from_sint(to, v),
            (false, true) => ins.fcvt_from_uint(to, v),
            (true, false) if signed => ins.fcvt_to_sint_sat(to, v),
            (true, false) => ins.fcvt_to_uint_sat(to, v),
            (true, true) if to.bits() > from.bits() => ins.fpromote(to, v),
            (true, true) => ins.fdemote(to, v),
        }
    }
}
