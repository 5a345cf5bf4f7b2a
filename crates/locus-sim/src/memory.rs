// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Per-locale memory. Each locale owns a flat byte array; an address is
//! only meaningful together with the locale it belongs to.

use locus_lir::LirType;

use crate::value::sign_extend;
use crate::{SimError, SimResult, Value};

pub const LOCALE_MEMORY_SIZE: usize = 1 << 20;
/// Accesses below this address fault as null dereferences.
pub const NULL_GUARD: u64 = 0x100;
/// First address handed out by the heap allocator.
pub const HEAP_BASE: u64 = NULL_GUARD;
/// Stack slots for the executing function start here.
pub const STACK_BASE: u64 = 0x8_0000;

#[derive(Debug, Clone)]
pub(crate) struct LocaleMemory {
    id: i64,
    bytes: Vec<u8>,
    heap_top: u64,
}

impl LocaleMemory {
    pub(crate) fn new(id: i64) -> Self {
        LocaleMemory { id, bytes: vec![0; LOCALE_MEMORY_SIZE], heap_top: HEAP_BASE }
    }

    fn range(&self, addr: u64, size: u64) -> SimResult<std::ops::Range<usize>> {
        if addr < NULL_GUARD {
            return Err(SimError::NullAccess { locale: self.id, addr });
        }
        let end = addr.checked_add(size).filter(|&end| end <= self.bytes.len() as u64);
        match end {
            Some(end) => Ok(addr as usize..end as usize),
            None => Err(SimError::OutOfBounds { locale: self.id, addr, size }),
        }
    }

    pub(crate) fn read(&self, addr: u64, size: u64) -> SimResult<&[u8]> {
        if size == 0 {
            return Ok(&[]);
        }
        let range = self.range(addr, size)?;
        Ok(&self.bytes[range])
    }

    pub(crate) fn write(&mut self, addr: u64, data: &[u8]) -> SimResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let range = self.range(addr, data.len() as u64)?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    pub(crate) fn fill(&mut self, addr: u64, size: u64, byte: u8) -> SimResult<()> {
        if size == 0 {
            return Ok(());
        }
        let range = self.range(addr, size)?;
        self.bytes[range].fill(byte);
        Ok(())
    }

    pub(crate) fn load(&self, addr: u64, ty: LirType) -> SimResult<Value> {
        let bytes = self.read(addr, u64::from(ty.size()))?;
        let mut buf = [0u8; 8];
        match ty {
            LirType::WidePtr => Err(SimError::Unlowered("load of a wide value")),
            LirType::F32 => {
                buf[..4].copy_from_slice(bytes);
                let bits = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
                Ok(Value::Float(f64::from(f32::from_bits(bits))))
            }
            LirType::F64 => {
                buf.copy_from_slice(bytes);
                Ok(Value::Float(f64::from_bits(u64::from_le_bytes(buf))))
            }
            LirType::Ptr => {
                buf.copy_from_slice(bytes);
                Ok(Value::Ptr(u64::from_le_bytes(buf)))
            }
            _ => {
                buf[..bytes.len()].copy_from_slice(bytes);
                Ok(Value::Int(sign_extend(i64::from_le_bytes(buf), ty)))
            }
        }
    }

    pub(crate) fn store(&mut self, addr: u64, ty: LirType, value: Value) -> SimResult<()> {
        let size = ty.size() as usize;
        let bytes = match ty {
            LirType::WidePtr => return Err(SimError::Unlowered("store of a wide value")),
            LirType::F32 => (value.as_float() as f32).to_bits().to_le_bytes().to_vec(),
            LirType::F64 => value.as_float().to_bits().to_le_bytes().to_vec(),
            LirType::Ptr => value.as_ptr().to_le_bytes().to_vec(),
            _ => value.as_int().to_le_bytes()[..size].to_vec(),
        };
        self.write(addr, &bytes)
    }

    /// Bump allocation from the heap region.
    pub(crate) fn alloc(&mut self, size: u64, align: u64) -> SimResult<u64> {
        let align = align.max(1);
        let addr = self.heap_top.div_ceil(align) * align;
        let end = addr.checked_add(size).ok_or(SimError::OutOfMemory(self.id))?;
        if end > STACK_BASE {
            return Err(SimError::OutOfMemory(self.id));
        }
        self.heap_top = end;
        Ok(addr)
    }
}
