// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Communication lowering: runtime transfer calls and the helpers built on
//! them (bulk array transfers, strided transfers, prefetch, locality and
//! nil checks).

use locus_lir::{BinOp, RuntimeFn};
use locus_types::{TypeId, ValTy};
use tracing::debug;

use crate::emit::Emitter;
use crate::{AddrState, Address, CodegenError, CodegenResult, Lowerer, Materialized, WidePtr};

/// A multi-level strided copy between local memory and the storage named
/// by `remote`. Strides and counts are pointers to arrays in local memory:
/// `counts` holds `levels + 1` entries, each stride array `levels`.
#[derive(Debug, Clone)]
pub struct StridedTransfer<V> {
    pub local: V,
    pub local_strides: V,
    /// Element storage on the remote side; its type gives the element size.
    pub remote: Address<V>,
    pub remote_strides: V,
    pub counts: V,
    pub levels: u32,
}

impl<E: Emitter> Lowerer<'_, E> {
    fn size_arg(&mut self, size: u64) -> E::Val {
        self.em.emit_int(size as i64, &ValTy::i64())
    }

    fn transfer(&mut self, func: RuntimeFn, mut args: Vec<E::Val>) {
        args.extend(self.comm_debug_args());
        self.em.emit_call(func, &args);
    }

    pub fn comm_get(&mut self, dst: &E::Val, locale: &E::Val, raddr: &E::Val, size: u64) {
        let size = self.size_arg(size);
        self.transfer(RuntimeFn::Get, vec![dst.clone(), locale.clone(), raddr.clone(), size]);
    }

    pub fn comm_put(&mut self, src: &E::Val, locale: &E::Val, raddr: &E::Val, size: u64) {
        let size = self.size_arg(size);
        self.transfer(RuntimeFn::Put, vec![src.clone(), locale.clone(), raddr.clone(), size]);
    }

    pub fn comm_unordered_get(&mut self, dst: &E::Val, locale: &E::Val, raddr: &E::Val, size: u64) {
        let size = self.size_arg(size);
        self.transfer(RuntimeFn::GetUnordered, vec![dst.clone(), locale.clone(), raddr.clone(), size]);
    }

    pub fn comm_unordered_put(&mut self, src: &E::Val, locale: &E::Val, raddr: &E::Val, size: u64) {
        let size = self.size_arg(size);
        self.transfer(RuntimeFn::PutUnordered, vec![src.clone(), locale.clone(), raddr.clone(), size]);
    }

    pub fn comm_unordered_getput(
        &mut self,
        dst_locale: &E::Val,
        dst_addr: &E::Val,
        src_locale: &E::Val,
        src_addr: &E::Val,
        size: u64,
    ) {
        let size = self.size_arg(size);
        let args = vec![dst_locale.clone(), dst_addr.clone(), src_locale.clone(), src_addr.clone(), size];
        self.transfer(RuntimeFn::GetPutUnordered, args);
    }

    /// Wait for all outstanding unordered transfers of this task.
    pub fn unordered_fence(&mut self) {
        self.em.emit_call(RuntimeFn::UnorderedFence, &[]);
    }

    pub fn get_strided(&mut self, t: &StridedTransfer<E::Val>) -> CodegenResult<()> {
        self.strided(RuntimeFn::GetStrided, t)
    }

    pub fn put_strided(&mut self, t: &StridedTransfer<E::Val>) -> CodegenResult<()> {
        self.strided(RuntimeFn::PutStrided, t)
    }

    fn strided(&mut self, func: RuntimeFn, t: &StridedTransfer<E::Val>) -> CodegenResult<()> {
        if t.remote.is_value() {
            return Err(CodegenError::invariant("strided transfer needs addressed remote storage"));
        }
        let locale = self.locale_of(&t.remote)?;
        let raddr = self.addr_of(&t.remote)?;
        let levels = self.em.emit_int(i64::from(t.levels), &ValTy::int(32, true));
        let elem_size = u64::from(self.cx.types.size_of(t.remote.ty));
        let elem_size = self.size_arg(elem_size);
        debug!(levels = t.levels, symbol = func.symbol(), "emitting strided transfer");
        self.transfer(
            func,
            vec![
                t.local.clone(),
                t.local_strides.clone(),
                locale,
                raddr,
                t.remote_strides.clone(),
                t.counts.clone(),
                levels,
                elem_size,
            ],
        );
        Ok(())
    }

    /// Hint that the storage `addr` names will be read soon. Nothing is
    /// emitted for local storage.
    pub fn prefetch(&mut self, addr: &Address<E::Val>) -> CodegenResult<()> {
        let AddrState::WidePointer(w) = &addr.state else {
            return Ok(());
        };
        if self.cx.comm_is_local() {
            return Ok(());
        }
        let locale = self.wide_locale(w)?;
        let raddr = self.wide_addr(w)?;
        let size = u64::from(self.cx.types.size_of(addr.ty));
        let size = self.size_arg(size);
        self.transfer(RuntimeFn::Prefetch, vec![locale, raddr, size]);
        Ok(())
    }

    fn array_bytes(&mut self, elem: TypeId, len: &E::Val) -> E::Val {
        let elem_size = u64::from(self.cx.types.size_of(elem));
        let elem_size = self.size_arg(elem_size);
        self.em.emit_binary(BinOp::Mul, &ValTy::i64(), len, &elem_size)
    }

    /// Copy `len` elements starting at `src` into local memory at `dst`.
    /// `src.ty` is the element type.
    pub fn array_get(&mut self, dst: &E::Val, src: &Address<E::Val>, len: &E::Val) -> CodegenResult<()> {
        let bytes = self.array_bytes(src.ty, len);
        match &src.state {
            AddrState::LocalPointer(p) => self.em.emit_memcpy_n(dst, p, &bytes),
            AddrState::WidePointer(w) if self.cx.comm_is_local() => {
                let p = self.wide_addr(w)?;
                self.em.emit_memcpy_n(dst, &p, &bytes);
            }
            AddrState::WidePointer(WidePtr::Opaque(v)) => self.em.emit_memcpy_n(dst, v, &bytes),
            AddrState::WidePointer(WidePtr::Parts { locale, addr }) => {
                debug!("emitting array get");
                self.transfer(RuntimeFn::Get, vec![dst.clone(), locale.clone(), addr.clone(), bytes]);
            }
            AddrState::Value(_) => return Err(CodegenError::invariant("array get from a value")),
        }
        Ok(())
    }

    /// Copy `len` elements from local memory at `src` to the storage `dst`
    /// names. `dst.ty` is the element type.
    pub fn array_put(&mut self, dst: &Address<E::Val>, src: &E::Val, len: &E::Val) -> CodegenResult<()> {
        let bytes = self.array_bytes(dst.ty, len);
        match &dst.state {
            AddrState::LocalPointer(p) => self.em.emit_memcpy_n(p, src, &bytes),
            AddrState::WidePointer(w) if self.cx.comm_is_local() => {
                let p = self.wide_addr(w)?;
                self.em.emit_memcpy_n(&p, src, &bytes);
            }
            AddrState::WidePointer(WidePtr::Opaque(v)) => self.em.emit_memcpy_n(v, src, &bytes),
            AddrState::WidePointer(WidePtr::Parts { locale, addr }) => {
                debug!("emitting array put");
                self.transfer(RuntimeFn::Put, vec![src.clone(), locale.clone(), addr.clone(), bytes]);
            }
            AddrState::Value(_) => return Err(CodegenError::invariant("array put to a value")),
        }
        Ok(())
    }

    /// Whether the pointer value (or storage) `addr` lives on the current
    /// locale. Always true for narrow addresses.
    pub fn is_local(&mut self, addr: &Address<E::Val>) -> CodegenResult<E::Val> {
        match &addr.state {
            AddrState::WidePointer(w) | AddrState::Value(Materialized::Wide(w)) => {
                let locale = self.wide_locale(w)?;
                self.call_value(RuntimeFn::IsLocal, &[locale])
            }
            _ => Ok(self.em.emit_int(1, &ValTy::bool())),
        }
    }

    /// Runtime nil check on the pointer value `addr` holds.
    pub fn check_nil(&mut self, addr: &Address<E::Val>) -> CodegenResult<()> {
        let value = self.materialize(addr.clone())?;
        let ptr = self.addr_of(&value)?;
        let [line, file] = self.location_args();
        self.em.emit_call(RuntimeFn::CheckNil, &[ptr, line, file]);
        Ok(())
    }
}
