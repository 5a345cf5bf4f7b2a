// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! LIR value types.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LirType {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    /// Address on the current locale.
    Ptr,
    /// Opaque global address. Only present before wide lowering.
    WidePtr,
}

impl LirType {
    pub fn size(self) -> u32 {
        match self {
            LirType::I8 => 1,
            LirType::I16 => 2,
            LirType::I32 | LirType::F32 => 4,
            LirType::I64 | LirType::F64 | LirType::Ptr => 8,
            LirType::WidePtr => 16,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, LirType::F32 | LirType::F64)
    }

    pub fn is_int(self) -> bool {
        matches!(self, LirType::I8 | LirType::I16 | LirType::I32 | LirType::I64)
    }

    pub fn int_bits(bits: u8) -> Option<LirType> {
        match bits {
            8 => Some(LirType::I8),
            16 => Some(LirType::I16),
            32 => Some(LirType::I32),
            64 => Some(LirType::I64),
            _ => None,
        }
    }
}
