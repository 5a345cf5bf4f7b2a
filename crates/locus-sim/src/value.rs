// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Runtime values.

use locus_lir::{LirConst, LirType};

/// A value held by the simulated program.
///
/// Integers narrower than 64 bits are kept sign-extended; `Cast` decides
/// how they widen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    /// Address on the executing locale.
    Ptr(u64),
}

impl Value {
    pub fn as_int(self) -> i64 {
        match self {
            Value::Int(i) => i,
            Value::Ptr(p) => p as i64,
            Value::Float(f) => f as i64,
        }
    }

    pub fn as_ptr(self) -> u64 {
        match self {
            Value::Ptr(p) => p,
            Value::Int(i) => i as u64,
            Value::Float(f) => f as u64,
        }
    }

    pub fn as_float(self) -> f64 {
        match self {
            Value::Float(f) => f,
            Value::Int(i) => i as f64,
            Value::Ptr(p) => p as f64,
        }
    }

    pub(crate) fn from_const(c: LirConst) -> Value {
        match c {
            LirConst::Int { value, ty: LirType::Ptr } => Value::Ptr(value as u64),
            LirConst::Int { value, ty } if ty.is_float() => Value::Float(value as f64),
            LirConst::Int { value, ty } => Value::Int(sign_extend(value, ty)),
            LirConst::Float { value, .. } => Value::Float(value),
            LirConst::Null => Value::Ptr(0),
        }
    }

    /// Reinterpret as a value of type `ty`.
    pub(crate) fn coerce(self, ty: LirType) -> Value {
        match ty {
            LirType::Ptr => Value::Ptr(self.as_ptr()),
            LirType::F32 | LirType::F64 => Value::Float(self.as_float()),
            _ => Value::Int(sign_extend(self.as_int(), ty)),
        }
    }
}

/// Truncate to the width of `ty` and sign-extend back to 64 bits.
pub(crate) fn sign_extend(v: i64, ty: LirType) -> i64 {
    match ty {
        LirType::I8 => v as i8 as i64,
        LirType::I16 => v as i16 as i64,
        LirType::I32 => v as i32 as i64,
        _ => v,
    }
}

/// Truncate to the width of `ty` and zero-extend back to 64 bits.
pub(crate) fn zero_extend(v: i64, ty: LirType) -> i64 {
    match ty {
        LirType::I8 => v as u8 as i64,
        LirType::I16 => v as u16 as i64,
        LirType::I32 => v as u32 as i64,
        _ => v,
    }
}
