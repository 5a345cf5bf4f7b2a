// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! LirType → Cranelift type translation.

use cranelift::prelude::*;
use locus_lir::LirType;

use crate::{CodegenError, CodegenResult};

/// Pointers are 64-bit integers.
pub fn lir_to_cranelift_type(ty: LirType, func: &str) -> CodegenResult<Type> {
    match ty {
        LirType::I8 => Ok(types::I8),
        LirType::I16 => Ok(types::I16),
        LirType::I32 => Ok(types::I32),
        LirType::I64 | LirType::Ptr => Ok(types::I64),
        LirType::F32 => Ok(types::F32),
        LirType::F64 => Ok(types::F64),
        LirType::WidePtr => Err(CodegenError::WideOperation { func: func.to_string(), what: "wideptr value" }),
    }
}

/// Integer constants are encoded zero-extended to the width of their type.
pub fn int_imm(value: i64, ty: Type) -> i64 {
    match ty.bits() {
        bits @ 1..=63 => value & ((1i64 << bits) - 1),
        _ => value,
    }
}
