// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! LirBuilder - helper for emitting straight-line LIR.

use crate::{
    BinOp, LirFunction, LirInst, LirParam, LirType, MemAttrs, Operand, RuntimeFn, ValueId,
};

pub struct LirBuilder {
    function: LirFunction,
}

impl LirBuilder {
    pub fn new(name: impl Into<String>, ret_ty: Option<LirType>) -> Self {
        Self {
            function: LirFunction {
                name: name.into(),
                params: Vec::new(),
                ret_ty,
                values: Vec::new(),
                body: Vec::new(),
            },
        }
    }

    pub fn new_value(&mut self, ty: LirType) -> ValueId {
        let id = ValueId(self.function.values.len() as u32);
        self.function.values.push(ty);
        id
    }

    pub fn add_param(&mut self, name: impl Into<String>, ty: LirType) -> ValueId {
        let id = self.new_value(ty);
        self.function.params.push(LirParam { id, name: name.into(), ty });
        id
    }

    pub fn push(&mut self, inst: LirInst) {
        self.function.body.push(inst);
    }

    pub fn operand_type(&self, op: &Operand) -> LirType {
        self.function.operand_type(op)
    }

    pub fn alloca(&mut self, size: u32, align: u32, name: Option<String>) -> ValueId {
        let dst = self.new_value(LirType::Ptr);
        self.push(LirInst::Alloca { dst, size, align, name });
        dst
    }

    pub fn load(&mut self, ty: LirType, addr: Operand, attrs: MemAttrs) -> ValueId {
        let dst = self.new_value(ty);
        self.push(LirInst::Load { dst, addr, attrs });
        dst
    }

    pub fn store(&mut self, addr: Operand, value: Operand, attrs: MemAttrs) {
        self.push(LirInst::Store { addr, value, attrs });
    }

    pub fn gep(&mut self, base: Operand, offset: i64, index: Option<(Operand, u32)>) -> ValueId {
        let ty = self.operand_type(&base);
        let dst = self.new_value(ty);
        self.push(LirInst::Gep { dst, base, offset, index });
        dst
    }

    pub fn memcpy(&mut self, dst: Operand, src: Operand, size: u64) {
        self.memcpy_n(dst, src, Operand::i64(size as i64));
    }

    /// Block copy whose byte count is only known at run time.
    pub fn memcpy_n(&mut self, dst: Operand, src: Operand, size: Operand) {
        self.push(LirInst::Memcpy { dst, src, size });
    }

    pub fn call(&mut self, func: &str, args: Vec<Operand>, ret: Option<LirType>) -> Option<ValueId> {
        let dst = ret.map(|ty| self.new_value(ty));
        self.push(LirInst::Call { dst, func: func.to_string(), args });
        dst
    }

    pub fn call_runtime(&mut self, func: RuntimeFn, args: Vec<Operand>) -> Option<ValueId> {
        self.call(func.symbol(), args, func.ret())
    }

    pub fn binary(&mut self, op: BinOp, lhs: Operand, rhs: Operand) -> ValueId {
        let ty = if op.is_compare() { LirType::I8 } else { self.operand_type(&lhs) };
        let dst = self.new_value(ty);
        self.push(LirInst::Binary { dst, op, lhs, rhs });
        dst
    }

    pub fn cast(&mut self, value: Operand, to: LirType, signed: bool) -> ValueId {
        let dst = self.new_value(to);
        self.push(LirInst::Cast { dst, value, signed });
        dst
    }

    pub fn select(&mut self, cond: Operand, if_true: Operand, if_false: Operand) -> ValueId {
        let ty = self.operand_type(&if_true);
        let dst = self.new_value(ty);
        self.push(LirInst::Select { dst, cond, if_true, if_false });
        dst
    }

    pub fn wide_make(&mut self, locale: Operand, addr: Operand) -> ValueId {
        let dst = self.new_value(LirType::WidePtr);
        self.push(LirInst::WideMake { dst, locale, addr });
        dst
    }

    pub fn wide_locale(&mut self, wide: Operand) -> ValueId {
        let dst = self.new_value(LirType::I64);
        self.push(LirInst::WideLocale { dst, wide });
        dst
    }

    pub fn wide_addr(&mut self, wide: Operand) -> ValueId {
        let dst = self.new_value(LirType::Ptr);
        self.push(LirInst::WideAddr { dst, wide });
        dst
    }

    pub fn loc(&mut self, line: u32, file: u32) {
        self.push(LirInst::Loc { line, file });
    }

    pub fn ret(&mut self, value: Option<Operand>) {
        self.push(LirInst::Return { value });
    }

    /// Check if the body already ends in a return.
    pub fn is_terminated(&self) -> bool {
        matches!(self.function.body.last(), Some(LirInst::Return { .. }))
    }

    pub fn function(&self) -> &LirFunction {
        &self.function
    }

    pub fn finish(mut self) -> LirFunction {
        if !self.is_terminated() {
            self.ret(None);
        }
        self.function
    }
}
