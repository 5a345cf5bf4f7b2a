// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! LIR function representation - a straight-line instruction list.

use crate::{LirInst, LirType, Operand, ValueId};

#[derive(Debug, Clone)]
pub struct LirFunction {
    pub name: String,
    pub params: Vec<LirParam>,
    pub ret_ty: Option<LirType>,
    /// Type of every value, indexed by `ValueId`.
    pub values: Vec<LirType>,
    pub body: Vec<LirInst>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LirParam {
    pub id: ValueId,
    pub name: String,
    pub ty: LirType,
}

impl LirFunction {
    pub fn value_type(&self, id: ValueId) -> LirType {
        self.values[id.0 as usize]
    }

    pub fn operand_type(&self, op: &Operand) -> LirType {
        match op {
            Operand::Value(id) => self.value_type(*id),
            Operand::Const(c) => c.ty(),
        }
    }

    /// True while any instruction still touches an opaque wide value.
    pub fn has_wide_ops(&self) -> bool {
        let is_wide = |op: &Operand| self.operand_type(op) == LirType::WidePtr;
        self.params.iter().any(|p| p.ty == LirType::WidePtr)
            || self.body.iter().any(|inst| {
                if inst.dst().map(|d| self.value_type(d)) == Some(LirType::WidePtr) {
                    return true;
                }
                let mut wide = false;
                let mut scratch = inst.clone();
                scratch.for_each_operand_mut(|op| wide |= is_wide(&*op));
                wide
            })
    }

    pub fn count_calls(&self, func: &str) -> usize {
        self.body
            .iter()
            .filter(|inst| matches!(inst, LirInst::Call { func: f, .. } if f == func))
            .count()
    }
}
