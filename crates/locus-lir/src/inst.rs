// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! LIR instructions. The result type of every instruction with a `dst` is
//! recorded in the owning function's value table.

use crate::{BinOp, MemAttrs, Operand, ValueId};

#[derive(Debug, Clone, PartialEq)]
pub enum LirInst {
    /// Stack slot; `dst` is a local pointer to it.
    Alloca {
        dst: ValueId,
        size: u32,
        align: u32,
        name: Option<String>,
    },
    Load {
        dst: ValueId,
        addr: Operand,
        attrs: MemAttrs,
    },
    Store {
        addr: Operand,
        value: Operand,
        attrs: MemAttrs,
    },
    /// `dst = base + offset + index * scale`. Keeps the address space of
    /// `base`: a GEP on a wide pointer yields a wide pointer.
    Gep {
        dst: ValueId,
        base: Operand,
        offset: i64,
        index: Option<(Operand, u32)>,
    },
    /// Block copy of `size` bytes (an `i64`). Either side may be wide
    /// before wide lowering.
    Memcpy {
        dst: Operand,
        src: Operand,
        size: Operand,
    },
    Call {
        dst: Option<ValueId>,
        func: String,
        args: Vec<Operand>,
    },
    Binary {
        dst: ValueId,
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
    },
    /// Integer resize or pointer/integer reinterpretation to the type of `dst`.
    Cast {
        dst: ValueId,
        value: Operand,
        signed: bool,
    },
    Select {
        dst: ValueId,
        cond: Operand,
        if_true: Operand,
        if_false: Operand,
    },
    WideMake {
        dst: ValueId,
        locale: Operand,
        addr: Operand,
    },
    WideLocale {
        dst: ValueId,
        wide: Operand,
    },
    WideAddr {
        dst: ValueId,
        wide: Operand,
    },
    /// Source position for the instructions that follow.
    Loc {
        line: u32,
        file: u32,
    },
    Return {
        value: Option<Operand>,
    },
}

impl LirInst {
    pub fn dst(&self) -> Option<ValueId> {
        match self {
            LirInst::Alloca { dst, .. }
            | LirInst::Load { dst, .. }
            | LirInst::Gep { dst, .. }
            | LirInst::Binary { dst, .. }
            | LirInst::Cast { dst, .. }
            | LirInst::Select { dst, .. }
            | LirInst::WideMake { dst, .. }
            | LirInst::WideLocale { dst, .. }
            | LirInst::WideAddr { dst, .. } => Some(*dst),
            LirInst::Call { dst, .. } => *dst,
            LirInst::Store { .. } | LirInst::Memcpy { .. } | LirInst::Loc { .. } | LirInst::Return { .. } => None,
        }
    }

    pub fn for_each_operand_mut(&mut self, mut f: impl FnMut(&mut Operand)) {
        match self {
            LirInst::Alloca { .. } | LirInst::Loc { .. } => {}
            LirInst::Load { addr, .. } => f(addr),
            LirInst::Store { addr, value, .. } => {
                f(addr);
                f(value);
            }
            LirInst::Gep { base, index, .. } => {
                f(base);
                if let Some((idx, _)) = index {
                    f(idx);
                }
            }
            LirInst::Memcpy { dst, src, size } => {
                f(dst);
                f(src);
                f(size);
            }
            LirInst::Call { args, .. } => args.iter_mut().for_each(f),
            LirInst::Binary { lhs, rhs, .. } => {
                f(lhs);
                f(rhs);
            }
            LirInst::Cast { value, .. } => f(value),
            LirInst::Select { cond, if_true, if_false, .. } => {
                f(cond);
                f(if_true);
                f(if_false);
            }
            LirInst::WideMake { locale, addr, .. } => {
                f(locale);
                f(addr);
            }
            LirInst::WideLocale { wide, .. } | LirInst::WideAddr { wide, .. } => f(wide),
            LirInst::Return { value } => {
                if let Some(v) = value {
                    f(v);
                }
            }
        }
    }

    /// May write memory visible to other loads.
    pub fn clobbers_memory(&self) -> bool {
        matches!(self, LirInst::Store { .. } | LirInst::Memcpy { .. } | LirInst::Call { .. })
    }
}
