// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! How a value of a type is held by generated code.

/// Machine representation of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Repr {
    Int(u8),
    Float(u8),
    /// Address on the current locale.
    Ptr,
    /// Locale plus address.
    Wide,
    /// Only ever addressed, never held in a register.
    Memory,
}

/// Value descriptor handed to emitters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValTy {
    pub repr: Repr,
    pub size: u32,
    pub align: u32,
    pub c_name: String,
    pub signed: bool,
}

impl ValTy {
    pub fn int(bits: u8, signed: bool) -> Self {
        let c_name = if signed { format!("int{}_t", bits) } else { format!("uint{}_t", bits) };
        ValTy {
            repr: Repr::Int(bits),
            size: u32::from(bits) / 8,
            align: u32::from(bits) / 8,
            c_name,
            signed,
        }
    }

    /// `int64_t`, used for sizes and scaled indices.
    pub fn i64() -> Self {
        ValTy::int(64, true)
    }

    /// The runtime locale id.
    pub fn locale() -> Self {
        ValTy { c_name: "locus_locale_t".to_string(), ..ValTy::int(64, true) }
    }

    pub fn bool() -> Self {
        ValTy { c_name: "bool".to_string(), ..ValTy::int(8, false) }
    }

    /// Untyped local pointer.
    pub fn ptr() -> Self {
        ValTy { repr: Repr::Ptr, size: 8, align: 8, c_name: "void*".to_string(), signed: false }
    }

    pub fn is_memory(&self) -> bool {
        self.repr == Repr::Memory
    }
}
