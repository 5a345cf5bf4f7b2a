// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! LIR operands and instruction attributes.

use crate::LirType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Value(ValueId),
    Const(LirConst),
}

impl Operand {
    pub fn int(value: i64, ty: LirType) -> Self {
        Operand::Const(LirConst::Int { value, ty })
    }

    pub fn i64(value: i64) -> Self {
        Operand::int(value, LirType::I64)
    }

    pub fn i32(value: i32) -> Self {
        Operand::int(i64::from(value), LirType::I32)
    }

    pub fn null() -> Self {
        Operand::Const(LirConst::Null)
    }

    /// Value of an integer constant.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Operand::Const(LirConst::Int { value, .. }) => Some(*value),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<ValueId> {
        match self {
            Operand::Value(id) => Some(*id),
            Operand::Const(_) => None,
        }
    }
}

impl From<ValueId> for Operand {
    fn from(id: ValueId) -> Self {
        Operand::Value(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LirConst {
    Int { value: i64, ty: LirType },
    Float { value: f64, ty: LirType },
    /// Null local pointer.
    Null,
}

impl LirConst {
    pub fn ty(&self) -> LirType {
        match self {
            LirConst::Int { ty, .. } | LirConst::Float { ty, .. } => *ty,
            LirConst::Null => LirType::Ptr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    /// Comparisons produce an `i8` truth value.
    pub fn is_compare(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }
}

/// Memory access metadata carried on loads and stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MemAttrs {
    pub alias_scope: Option<u32>,
    /// The access sits outside any order-independent loop, so it must not
    /// join that loop's parallel access group.
    pub outside_independent_loop: bool,
}
