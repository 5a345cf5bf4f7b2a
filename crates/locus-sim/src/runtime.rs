// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Runtime entry points, implemented against simulated memory.

use locus_lir::{LirType, RuntimeFn};
use tracing::{debug, trace};

use crate::machine::Pending;
use crate::{CommEvent, Machine, SimError, SimResult, Value};

impl Machine {
    pub(crate) fn call_runtime(&mut self, f: RuntimeFn, args: &[Value]) -> SimResult<Option<Value>> {
        let int = |i: usize| args[i].as_int();
        let ptr = |i: usize| args[i].as_ptr();
        let here = self.here;

        match f {
            RuntimeFn::Get | RuntimeFn::Put | RuntimeFn::GetUnordered | RuntimeFn::PutUnordered => {
                let (local, locale, raddr, size) = (ptr(0), int(1), ptr(2), ptr(3));
                self.record(f, locale, raddr, size, int(4) as i32);
                match f {
                    RuntimeFn::Get => self.copy(locale, raddr, here, local, size)?,
                    RuntimeFn::Put => self.copy(here, local, locale, raddr, size)?,
                    RuntimeFn::GetUnordered => self.defer(locale, raddr, here, local, size)?,
                    _ => self.defer(here, local, locale, raddr, size)?,
                }
                Ok(None)
            }
            RuntimeFn::GetPutUnordered => {
                let (dst_locale, dst_addr, src_locale, src_addr, size) = (int(0), ptr(1), int(2), ptr(3), ptr(4));
                self.record(f, src_locale, src_addr, size, int(5) as i32);
                self.defer(src_locale, src_addr, dst_locale, dst_addr, size)?;
                Ok(None)
            }
            RuntimeFn::GetStrided | RuntimeFn::PutStrided => {
                let transfer = Strided {
                    local: ptr(0),
                    local_strides: ptr(1),
                    locale: int(2),
                    remote: ptr(3),
                    remote_strides: ptr(4),
                    counts: ptr(5),
                    levels: int(6),
                    elem_size: ptr(7),
                };
                self.record(f, transfer.locale, transfer.remote, 0, int(8) as i32);
                self.strided(f == RuntimeFn::GetStrided, &transfer)?;
                Ok(None)
            }
            RuntimeFn::Prefetch => {
                let (locale, raddr, size) = (int(0), ptr(1), ptr(2));
                self.locale(locale)?;
                self.record(f, locale, raddr, size, int(3) as i32);
                Ok(None)
            }
            RuntimeFn::UnorderedFence => {
                self.record(f, 0, 0, 0, 0);
                let pending = std::mem::take(&mut self.pending);
                debug!(applied = pending.len(), "unordered fence");
                for p in pending {
                    self.locale_mut(p.locale)?.write(p.addr, &p.data)?;
                }
                Ok(None)
            }
            RuntimeFn::LocaleHere => Ok(Some(Value::Int(here))),
            // one locale per node
            RuntimeFn::NodeId => Ok(Some(Value::Int(here))),
            RuntimeFn::NodeFromLocale => {
                let locale = int(0);
                self.locale(locale)?;
                Ok(Some(Value::Int(locale)))
            }
            RuntimeFn::CheckNil => {
                if ptr(0) == 0 {
                    return Err(SimError::NilDereference { line: int(1) as i32, file: int(2) as i32 });
                }
                Ok(None)
            }
            RuntimeFn::CheckLocal => {
                let locale = int(0);
                if locale != here {
                    return Err(SimError::NotLocal { locale, here, line: int(1) as i32, file: int(2) as i32 });
                }
                Ok(None)
            }
            RuntimeFn::IsLocal => Ok(Some(Value::Int(i64::from(int(0) == here)))),
        }
    }

    fn record(&mut self, func: RuntimeFn, locale: i64, raddr: u64, size: u64, comm_id: i32) {
        trace!(symbol = func.symbol(), locale, raddr, size, comm_id, "comm");
        self.events.push(CommEvent { func, locale, raddr, size, comm_id });
    }

    fn copy(&mut self, from_locale: i64, from: u64, to_locale: i64, to: u64, size: u64) -> SimResult<()> {
        let data = self.locale(from_locale)?.read(from, size)?.to_vec();
        self.locale_mut(to_locale)?.write(to, &data)
    }

    /// Capture the source now; write the destination at the next fence.
    fn defer(&mut self, from_locale: i64, from: u64, to_locale: i64, to: u64, size: u64) -> SimResult<()> {
        let data = self.locale(from_locale)?.read(from, size)?.to_vec();
        self.locale(to_locale)?;
        self.pending.push(Pending { locale: to_locale, addr: to, data });
        Ok(())
    }

    fn read_array(&self, addr: u64, len: usize) -> SimResult<Vec<u64>> {
        let mem = self.locale(self.here)?;
        (0..len)
            .map(|i| mem.load(addr + 8 * i as u64, LirType::I64).map(|v| v.as_ptr()))
            .collect()
    }

    /// `counts[0]` contiguous elements per chunk; level `i` repeats the
    /// level below `counts[i]` times, `strides[i - 1]` elements apart.
    fn strided(&mut self, get: bool, t: &Strided) -> SimResult<()> {
        let levels = usize::try_from(t.levels).map_err(|_| SimError::TypeError("negative stride levels".into()))?;
        let counts = self.read_array(t.counts, levels + 1)?;
        let local_strides = self.read_array(t.local_strides, levels)?;
        let remote_strides = self.read_array(t.remote_strides, levels)?;
        let chunk = counts[0].wrapping_mul(t.elem_size);
        let here = self.here;
        if counts.iter().any(|&c| c == 0) {
            return Ok(());
        }

        let mut index = vec![0u64; levels];
        loop {
            let mut local = t.local;
            let mut remote = t.remote;
            for (level, &i) in index.iter().enumerate() {
                local = local.wrapping_add(i.wrapping_mul(local_strides[level]).wrapping_mul(t.elem_size));
                remote = remote.wrapping_add(i.wrapping_mul(remote_strides[level]).wrapping_mul(t.elem_size));
            }
            if get {
                self.copy(t.locale, remote, here, local, chunk)?;
            } else {
                self.copy(here, local, t.locale, remote, chunk)?;
            }

            // odometer over levels 1..=levels
            let mut level = 0;
            loop {
                if level == levels {
                    return Ok(());
                }
                index[level] += 1;
                if index[level] < counts[level + 1] {
                    break;
                }
                index[level] = 0;
                level += 1;
            }
        }
    }
}

struct Strided {
    local: u64,
    local_strides: u64,
    locale: i64,
    remote: u64,
    remote_strides: u64,
    counts: u64,
    levels: i64,
    elem_size: u64,
}
