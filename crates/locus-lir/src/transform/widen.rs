// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Wide lowering - turn opaque wide values into (locale, address) pairs.
//!
//! Deferred-mode code reads and writes remote memory with plain loads,
//! stores and block copies on `wideptr` operands. This pass splits every
//! wide value into its two halves and replaces each access through a wide
//! address with a runtime transfer:
//!
//! - `wide.make` / `wide.locale` / `wide.addr` become substitutions
//! - a GEP on a wide base becomes a local GEP that keeps the locale
//! - `load` through a wide address becomes `get` into a stack temporary
//! - `store` through a wide address becomes `put` from a stack temporary
//! - `memcpy` with a wide side becomes `get` / `put` (wide to wide via a temporary)
//! - wide values held in local memory are loaded and stored as two halves
//! - wide parameters become two parameters
//!
//! A wide value that leaves the function through a call result or a
//! return cannot be split and is rejected.

use std::collections::HashMap;

use tracing::debug;

use crate::{
    LirFunction, LirInst, LirParam, LirType, MemAttrs, Operand, RuntimeFn, ValueId,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WidenError {
    #[error("wide value escapes through {0} in `{1}`")]
    Escape(&'static str, String),
    #[error("wide operand {0} has no known locale/address halves")]
    Unsplit(String),
    #[error("wide operand used by `{0}`")]
    Unsupported(&'static str),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WidenStats {
    pub gets: usize,
    pub puts: usize,
}

type Halves = (Operand, Operand);

struct Widener {
    name: String,
    values: Vec<LirType>,
    body: Vec<LirInst>,
    halves: HashMap<ValueId, Halves>,
    subst: HashMap<ValueId, Operand>,
    line: u32,
    file: u32,
    comm_ids: u32,
    stats: WidenStats,
}

/// Lower every wide operation in `func`. `comm_ids` is the next free
/// communication-site id and is advanced past the ids used.
pub fn lower_wide_ops(func: &mut LirFunction, comm_ids: &mut u32) -> Result<WidenStats, WidenError> {
    let mut w = Widener {
        name: func.name.clone(),
        values: std::mem::take(&mut func.values),
        body: Vec::with_capacity(func.body.len()),
        halves: HashMap::new(),
        subst: HashMap::new(),
        line: 0,
        file: 0,
        comm_ids: *comm_ids,
        stats: WidenStats::default(),
    };

    let mut params = Vec::with_capacity(func.params.len());
    for p in std::mem::take(&mut func.params) {
        if p.ty == LirType::WidePtr {
            let locale = w.new_value(LirType::I64);
            let addr = w.new_value(LirType::Ptr);
            params.push(LirParam { id: locale, name: format!("{}_locale", p.name), ty: LirType::I64 });
            params.push(LirParam { id: addr, name: format!("{}_addr", p.name), ty: LirType::Ptr });
            w.halves.insert(p.id, (locale.into(), addr.into()));
        } else {
            params.push(p);
        }
    }

    for inst in std::mem::take(&mut func.body) {
        w.lower(inst)?;
    }

    func.params = params;
    func.values = w.values;
    func.body = w.body;
    *comm_ids = w.comm_ids;
    debug!(function = %func.name, gets = w.stats.gets, puts = w.stats.puts, "lowered wide operations");
    Ok(w.stats)
}

impl Widener {
    fn new_value(&mut self, ty: LirType) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(ty);
        id
    }

    fn ty(&self, op: &Operand) -> LirType {
        match op {
            Operand::Value(id) => self.values[id.0 as usize],
            Operand::Const(c) => c.ty(),
        }
    }

    fn is_wide(&self, op: &Operand) -> bool {
        self.ty(op) == LirType::WidePtr
    }

    fn resolve(&self, op: Operand) -> Operand {
        match op {
            Operand::Value(id) => self.subst.get(&id).copied().unwrap_or(op),
            Operand::Const(_) => op,
        }
    }

    fn halves(&self, op: &Operand) -> Result<Halves, WidenError> {
        op.as_value()
            .and_then(|id| self.halves.get(&id).copied())
            .ok_or_else(|| WidenError::Unsplit(op.to_string()))
    }

    fn emit(&mut self, inst: LirInst) {
        self.body.push(inst);
    }

    fn alloca(&mut self, size: u32) -> Operand {
        let dst = self.new_value(LirType::Ptr);
        self.emit(LirInst::Alloca { dst, size, align: 8, name: None });
        dst.into()
    }

    fn gep(&mut self, base: Operand, offset: i64) -> Operand {
        let dst = self.new_value(LirType::Ptr);
        self.emit(LirInst::Gep { dst, base, offset, index: None });
        dst.into()
    }

    fn transfer(&mut self, func: RuntimeFn, local: Operand, (locale, raddr): Halves, size: Operand) {
        let comm_id = self.comm_ids;
        self.comm_ids += 1;
        match func {
            RuntimeFn::Get => self.stats.gets += 1,
            _ => self.stats.puts += 1,
        }
        let args = vec![
            local,
            locale,
            raddr,
            size,
            Operand::i32(comm_id as i32),
            Operand::i32(self.line as i32),
            Operand::i32(self.file as i32),
        ];
        self.emit(LirInst::Call { dst: None, func: func.symbol().to_string(), args });
    }

    /// Load `dst` from local memory, splitting wide values into halves.
    fn read_local(&mut self, dst: ValueId, ptr: Operand, attrs: MemAttrs) {
        if self.values[dst.0 as usize] == LirType::WidePtr {
            let locale = self.new_value(LirType::I64);
            self.emit(LirInst::Load { dst: locale, addr: ptr, attrs });
            let addr_ptr = self.gep(ptr, 8);
            let addr = self.new_value(LirType::Ptr);
            self.emit(LirInst::Load { dst: addr, addr: addr_ptr, attrs });
            self.halves.insert(dst, (locale.into(), addr.into()));
        } else {
            self.emit(LirInst::Load { dst, addr: ptr, attrs });
        }
    }

    fn write_local(&mut self, ptr: Operand, value: Operand, attrs: MemAttrs) -> Result<(), WidenError> {
        if self.is_wide(&value) {
            let (locale, addr) = self.halves(&value)?;
            self.emit(LirInst::Store { addr: ptr, value: locale, attrs });
            let addr_ptr = self.gep(ptr, 8);
            self.emit(LirInst::Store { addr: addr_ptr, value: addr, attrs });
        } else {
            self.emit(LirInst::Store { addr: ptr, value, attrs });
        }
        Ok(())
    }

    fn lower(&mut self, mut inst: LirInst) -> Result<(), WidenError> {
        inst.for_each_operand_mut(|op| *op = self.resolve(*op));

        match inst {
            LirInst::WideMake { dst, locale, addr } => {
                self.halves.insert(dst, (locale, addr));
            }
            LirInst::WideLocale { dst, wide } => {
                let (locale, _) = self.halves(&wide)?;
                self.subst.insert(dst, locale);
            }
            LirInst::WideAddr { dst, wide } => {
                let (_, addr) = self.halves(&wide)?;
                self.subst.insert(dst, addr);
            }
            LirInst::Gep { dst, base, offset, index } if self.is_wide(&base) => {
                let (locale, addr) = self.halves(&base)?;
                let local = self.new_value(LirType::Ptr);
                self.emit(LirInst::Gep { dst: local, base: addr, offset, index });
                self.halves.insert(dst, (locale, local.into()));
            }
            LirInst::Load { dst, addr, attrs } => {
                if self.is_wide(&addr) {
                    let remote = self.halves(&addr)?;
                    let size = self.values[dst.0 as usize].size();
                    let tmp = self.alloca(size);
                    self.transfer(RuntimeFn::Get, tmp, remote, Operand::i64(i64::from(size)));
                    self.read_local(dst, tmp, attrs);
                } else {
                    self.read_local(dst, addr, attrs);
                }
            }
            LirInst::Store { addr, value, attrs } => {
                if self.is_wide(&addr) {
                    let remote = self.halves(&addr)?;
                    let size = self.ty(&value).size();
                    let tmp = self.alloca(size);
                    self.write_local(tmp, value, MemAttrs::default())?;
                    self.transfer(RuntimeFn::Put, tmp, remote, Operand::i64(i64::from(size)));
                } else {
                    self.write_local(addr, value, attrs)?;
                }
            }
            LirInst::Memcpy { dst, src, size } => match (self.is_wide(&dst), self.is_wide(&src)) {
                (false, false) => self.emit(LirInst::Memcpy { dst, src, size }),
                (false, true) => {
                    let remote = self.halves(&src)?;
                    self.transfer(RuntimeFn::Get, dst, remote, size);
                }
                (true, false) => {
                    let remote = self.halves(&dst)?;
                    self.transfer(RuntimeFn::Put, src, remote, size);
                }
                (true, true) => {
                    let from = self.halves(&src)?;
                    let to = self.halves(&dst)?;
                    let bytes = size
                        .as_int()
                        .and_then(|n| u32::try_from(n).ok())
                        .ok_or(WidenError::Unsupported("remote to remote copy of run-time size"))?;
                    let tmp = self.alloca(bytes);
                    self.transfer(RuntimeFn::Get, tmp, from, size);
                    self.transfer(RuntimeFn::Put, tmp, to, size);
                }
            },
            LirInst::Select { dst, cond, if_true, if_false } if self.is_wide(&if_true) => {
                let (lt, at) = self.halves(&if_true)?;
                let (lf, af) = self.halves(&if_false)?;
                let locale = self.new_value(LirType::I64);
                self.emit(LirInst::Select { dst: locale, cond, if_true: lt, if_false: lf });
                let addr = self.new_value(LirType::Ptr);
                self.emit(LirInst::Select { dst: addr, cond, if_true: at, if_false: af });
                self.halves.insert(dst, (locale.into(), addr.into()));
            }
            LirInst::Call { dst, func, args } => {
                if dst.map(|d| self.values[d.0 as usize]) == Some(LirType::WidePtr) {
                    return Err(WidenError::Escape("a call result", self.name.clone()));
                }
                let mut split = Vec::with_capacity(args.len());
                for arg in args {
                    if self.is_wide(&arg) {
                        let (locale, addr) = self.halves(&arg)?;
                        split.push(locale);
                        split.push(addr);
                    } else {
                        split.push(arg);
                    }
                }
                self.emit(LirInst::Call { dst, func, args: split });
            }
            LirInst::Return { value: Some(v) } if self.is_wide(&v) => {
                return Err(WidenError::Escape("a return", self.name.clone()));
            }
            LirInst::Binary { lhs, rhs, .. } if self.is_wide(&lhs) || self.is_wide(&rhs) => {
                return Err(WidenError::Unsupported("binary"));
            }
            LirInst::Cast { value, .. } if self.is_wide(&value) => {
                return Err(WidenError::Unsupported("cast"));
            }
            LirInst::Loc { line, file } => {
                self.line = line;
                self.file = file;
                self.emit(LirInst::Loc { line, file });
            }
            other => self.emit(other),
        }
        Ok(())
    }
}
