// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! The simulated machine and the LIR executor.

use locus_lir::{BinOp, LirFunction, LirInst, LirType, Operand, RuntimeFn};
use tracing::{debug, trace};

use crate::memory::{LocaleMemory, LOCALE_MEMORY_SIZE, STACK_BASE};
use crate::value::zero_extend;
use crate::{SimError, SimResult, Value};

/// One runtime communication call, as issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommEvent {
    pub func: RuntimeFn,
    /// Remote side of the transfer (zero for the fence).
    pub locale: i64,
    pub raddr: u64,
    pub size: u64,
    pub comm_id: i32,
}

/// An unordered transfer waiting for the next fence. The source bytes are
/// captured at issue time.
#[derive(Debug, Clone)]
pub(crate) struct Pending {
    pub(crate) locale: i64,
    pub(crate) addr: u64,
    pub(crate) data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Machine {
    pub(crate) locales: Vec<LocaleMemory>,
    pub(crate) events: Vec<CommEvent>,
    pub(crate) pending: Vec<Pending>,
    pub(crate) here: i64,
}

/// Execution state of one function activation.
struct Frame<'f> {
    func: &'f LirFunction,
    values: Vec<Option<Value>>,
    sp: u64,
}

impl Frame<'_> {
    fn get(&self, op: &Operand) -> SimResult<Value> {
        match op {
            Operand::Const(c) => Ok(Value::from_const(*c)),
            Operand::Value(id) => self
                .values
                .get(id.0 as usize)
                .copied()
                .flatten()
                .ok_or(SimError::UndefinedValue(id.0)),
        }
    }

    fn set(&mut self, dst: locus_lir::ValueId, value: Value) {
        if let Some(slot) = self.values.get_mut(dst.0 as usize) {
            *slot = Some(value);
        }
    }

    fn ty(&self, op: &Operand) -> LirType {
        self.func.operand_type(op)
    }
}

impl Machine {
    pub fn new(num_locales: u32) -> Self {
        Machine {
            locales: (0..i64::from(num_locales)).map(LocaleMemory::new).collect(),
            events: Vec::new(),
            pending: Vec::new(),
            here: 0,
        }
    }

    pub fn num_locales(&self) -> u32 {
        self.locales.len() as u32
    }

    pub(crate) fn locale(&self, id: i64) -> SimResult<&LocaleMemory> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.locales.get(i))
            .ok_or(SimError::BadLocale(id))
    }

    pub(crate) fn locale_mut(&mut self, id: i64) -> SimResult<&mut LocaleMemory> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.locales.get_mut(i))
            .ok_or(SimError::BadLocale(id))
    }

    /// Communication calls issued so far, in order.
    pub fn events(&self) -> &[CommEvent] {
        &self.events
    }

    pub fn count_events(&self, func: RuntimeFn) -> usize {
        self.events.iter().filter(|e| e.func == func).count()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Unordered transfers not yet applied by a fence.
    pub fn pending_transfers(&self) -> usize {
        self.pending.len()
    }

    pub fn alloc(&mut self, locale: i64, size: u64, align: u64) -> SimResult<u64> {
        self.locale_mut(locale)?.alloc(size, align)
    }

    pub fn read_bytes(&self, locale: i64, addr: u64, size: u64) -> SimResult<Vec<u8>> {
        Ok(self.locale(locale)?.read(addr, size)?.to_vec())
    }

    pub fn write_bytes(&mut self, locale: i64, addr: u64, data: &[u8]) -> SimResult<()> {
        self.locale_mut(locale)?.write(addr, data)
    }

    pub fn fill(&mut self, locale: i64, addr: u64, size: u64, byte: u8) -> SimResult<()> {
        self.locale_mut(locale)?.fill(addr, size, byte)
    }

    pub fn read_i64(&self, locale: i64, addr: u64) -> SimResult<i64> {
        self.locale(locale)?.load(addr, LirType::I64).map(Value::as_int)
    }

    pub fn write_i64(&mut self, locale: i64, addr: u64, value: i64) -> SimResult<()> {
        self.locale_mut(locale)?.store(addr, LirType::I64, Value::Int(value))
    }

    pub fn read_value(&self, locale: i64, addr: u64, ty: LirType) -> SimResult<Value> {
        self.locale(locale)?.load(addr, ty)
    }

    pub fn write_value(&mut self, locale: i64, addr: u64, ty: LirType, value: Value) -> SimResult<()> {
        self.locale_mut(locale)?.store(addr, ty, value)
    }

    /// Run `func` on locale `here`. The function must already be free of
    /// wide operations.
    pub fn run(&mut self, func: &LirFunction, here: i64, args: &[Value]) -> SimResult<Option<Value>> {
        self.locale(here)?;
        if func.params.len() != args.len() {
            return Err(SimError::ArityMismatch { expected: func.params.len(), got: args.len() });
        }
        self.here = here;
        let mut frame = Frame { func, values: vec![None; func.values.len()], sp: STACK_BASE };
        for (param, arg) in func.params.iter().zip(args) {
            if param.ty == LirType::WidePtr {
                return Err(SimError::Unlowered("wide parameter"));
            }
            frame.set(param.id, arg.coerce(param.ty));
        }
        debug!(function = %func.name, here, "running");

        for inst in &func.body {
            trace!(?inst, "exec");
            if let Some(ret) = self.step(&mut frame, inst)? {
                return Ok(ret);
            }
        }
        Ok(None)
    }

    /// Execute one instruction. `Some` means the function returned.
    fn step(&mut self, frame: &mut Frame<'_>, inst: &LirInst) -> SimResult<Option<Option<Value>>> {
        let here = self.here;
        match inst {
            LirInst::Alloca { dst, size, align, .. } => {
                let align = u64::from((*align).max(1));
                let addr = frame.sp.div_ceil(align) * align;
                let end = addr + u64::from(*size);
                if end > LOCALE_MEMORY_SIZE as u64 {
                    return Err(SimError::StackOverflow);
                }
                self.locale_mut(here)?.fill(addr, u64::from(*size), 0)?;
                frame.sp = end;
                frame.set(*dst, Value::Ptr(addr));
            }
            LirInst::Load { dst, addr, .. } => {
                let ty = frame.func.value_type(*dst);
                if frame.ty(addr) == LirType::WidePtr {
                    return Err(SimError::Unlowered("load through a wide address"));
                }
                let ptr = frame.get(addr)?.as_ptr();
                let value = self.locale(here)?.load(ptr, ty)?;
                frame.set(*dst, value);
            }
            LirInst::Store { addr, value, .. } => {
                if frame.ty(addr) == LirType::WidePtr {
                    return Err(SimError::Unlowered("store through a wide address"));
                }
                let ty = frame.ty(value);
                let ptr = frame.get(addr)?.as_ptr();
                let value = frame.get(value)?;
                self.locale_mut(here)?.store(ptr, ty, value)?;
            }
            LirInst::Gep { dst, base, offset, index } => {
                if frame.ty(base) == LirType::WidePtr {
                    return Err(SimError::Unlowered("address arithmetic on a wide address"));
                }
                let mut addr = frame.get(base)?.as_ptr().wrapping_add(*offset as u64);
                if let Some((idx, scale)) = index {
                    let idx = frame.get(idx)?.as_int();
                    addr = addr.wrapping_add(idx.wrapping_mul(i64::from(*scale)) as u64);
                }
                frame.set(*dst, Value::Ptr(addr));
            }
            LirInst::Memcpy { dst, src, size } => {
                if frame.ty(dst) == LirType::WidePtr || frame.ty(src) == LirType::WidePtr {
                    return Err(SimError::Unlowered("block copy with a wide side"));
                }
                let from = frame.get(src)?.as_ptr();
                let to = frame.get(dst)?.as_ptr();
                let size = frame.get(size)?.as_int() as u64;
                let mem = self.locale_mut(here)?;
                let data = mem.read(from, size)?.to_vec();
                mem.write(to, &data)?;
            }
            LirInst::Call { dst, func, args } => {
                let f = RuntimeFn::from_symbol(func).ok_or_else(|| SimError::UndefinedFunction(func.clone()))?;
                let args = args.iter().map(|a| frame.get(a)).collect::<SimResult<Vec<_>>>()?;
                if args.len() != f.params().len() {
                    return Err(SimError::ArityMismatch { expected: f.params().len(), got: args.len() });
                }
                let result = self.call_runtime(f, &args)?;
                if let (Some(dst), Some(value)) = (dst, result) {
                    frame.set(*dst, value);
                }
            }
            LirInst::Binary { dst, op, lhs, rhs } => {
                let ty = frame.ty(lhs);
                let l = frame.get(lhs)?;
                let r = frame.get(rhs)?;
                let result = binary(*op, ty, l, r);
                frame.set(*dst, result.coerce(frame.func.value_type(*dst)));
            }
            LirInst::Cast { dst, value, signed } => {
                let from = frame.ty(value);
                let to = frame.func.value_type(*dst);
                let v = frame.get(value)?;
                frame.set(*dst, cast(v, from, to, *signed));
            }
            LirInst::Select { dst, cond, if_true, if_false } => {
                let chosen = if frame.get(cond)?.as_int() != 0 { if_true } else { if_false };
                let value = frame.get(chosen)?;
                frame.set(*dst, value);
            }
            LirInst::WideMake { .. } | LirInst::WideLocale { .. } | LirInst::WideAddr { .. } => {
                return Err(SimError::Unlowered("wide value construction or extraction"));
            }
            LirInst::Loc { .. } => {}
            LirInst::Return { value } => {
                let value = value.as_ref().map(|v| frame.get(v)).transpose()?;
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

fn binary(op: BinOp, ty: LirType, l: Value, r: Value) -> Value {
    if ty.is_float() {
        let (a, b) = (l.as_float(), r.as_float());
        return match op {
            BinOp::Add => Value::Float(a + b),
            BinOp::Sub => Value::Float(a - b),
            BinOp::Mul => Value::Float(a * b),
            BinOp::Eq => Value::Int(i64::from(a == b)),
            BinOp::Ne => Value::Int(i64::from(a != b)),
            BinOp::Lt => Value::Int(i64::from(a < b)),
            BinOp::Le => Value::Int(i64::from(a <= b)),
            BinOp::Gt => Value::Int(i64::from(a > b)),
            BinOp::Ge => Value::Int(i64::from(a >= b)),
            // bitwise ops on floats work on the integer parts
            BinOp::And | BinOp::Or | BinOp::Xor => binary(op, LirType::I64, l, r),
        };
    }
    let (a, b) = (l.as_int(), r.as_int());
    let result = match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::And => a & b,
        BinOp::Or => a | b,
        BinOp::Xor => a ^ b,
        BinOp::Eq => i64::from(a == b),
        BinOp::Ne => i64::from(a != b),
        BinOp::Lt => i64::from(a < b),
        BinOp::Le => i64::from(a <= b),
        BinOp::Gt => i64::from(a > b),
        BinOp::Ge => i64::from(a >= b),
    };
    Value::Int(result)
}

fn cast(v: Value, from: LirType, to: LirType, signed: bool) -> Value {
    match (from.is_float(), to.is_float()) {
        (true, true) => Value::Float(v.as_float()),
        (true, false) => Value::Int(v.as_float() as i64).coerce(to),
        (false, true) if signed => Value::Float(v.as_int() as f64),
        (false, true) => Value::Float(zero_extend(v.as_int(), from) as u64 as f64),
        (false, false) => {
            let widened = if signed { v.as_int() } else { zero_extend(v.as_int(), from) };
            Value::Int(widened).coerce(to)
        }
    }
}
