// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! The assignment engine. Every data movement in generated code goes
//! through [`Lowerer::assign`].

use locus_lir::BinOp;
use locus_types::{Repr, TypeId, TypeKind};
use tracing::debug;

use crate::emit::Emitter;
use crate::{AccessAttrs, AddrState, Address, CodegenError, CodegenResult, Lowerer, Materialized, WidePtr};

type Addr<E> = Address<<E as Emitter>::Val>;

impl<E: Emitter> Lowerer<'_, E> {
    /// Copy `src` into the storage `dst` names.
    ///
    /// | dst   | src   | lowering                                   |
    /// |-------|-------|--------------------------------------------|
    /// | local | local | load/store, element-wise or block copy     |
    /// | local | wide  | get (block copy on opaque wide in deferred) |
    /// | wide  | local | put (block copy on opaque wide in deferred) |
    /// | wide  | wide  | get into a temporary, then put             |
    pub fn assign(&mut self, dst: &Addr<E>, src: Addr<E>) -> CodegenResult<()> {
        if dst.is_value() {
            return Err(CodegenError::invariant(format!(
                "assignment to a value of type `{}`",
                self.type_name(dst.ty)
            )));
        }
        let src = self.coerce_source(dst.ty, src)?;

        match dst.state.clone() {
            AddrState::LocalPointer(d) => match src.state.clone() {
                AddrState::WidePointer(w) => self.get_into(&d, &w, dst.ty, &dst.attrs),
                _ => self.copy_local(&d, src, dst.ty, &dst.attrs),
            },
            AddrState::WidePointer(w) => {
                if src.is_wide_pointer() {
                    debug!(ty = %self.type_name(dst.ty), "remote to remote copy through a temporary");
                    let tmp = self.localize_copy(src)?;
                    return self.assign(dst, tmp);
                }
                self.put_from(&w, &src, dst.ty, &dst.attrs)
            }
            AddrState::Value(_) => Err(CodegenError::invariant("assignment to a value")),
        }
    }

    /// Bring `src` to the representation of `dst_ty`: nil becomes a null of
    /// the destination's width and narrow pointer values gain the current
    /// locale.
    fn coerce_source(&mut self, dst_ty: TypeId, src: Addr<E>) -> CodegenResult<Addr<E>> {
        let dst_repr = self.val_ty(dst_ty).repr;
        let src_ty = self.cx.types.get(src.ty);

        if matches!(src_ty.kind, TypeKind::Nil) {
            let null = self.em.emit_null();
            return match dst_repr {
                Repr::Wide => {
                    let here = self.here()?;
                    let w = self.pack_wide(here, null)?;
                    Ok(Address::wide_value(w, dst_ty))
                }
                Repr::Ptr => Ok(Address::value(null, dst_ty)),
                _ => Err(CodegenError::invariant(format!(
                    "nil assigned to non-pointer type `{}`",
                    self.type_name(dst_ty)
                ))),
            };
        }

        let src_repr = self.val_ty(src.ty).repr;
        match (dst_repr, src_repr) {
            (Repr::Wide, Repr::Ptr) => {
                let value = self.materialize(src)?;
                let AddrState::Value(Materialized::Plain(p)) = value.state else {
                    return Err(CodegenError::invariant("narrow pointer did not materialize to a plain value"));
                };
                let here = self.here()?;
                let w = self.pack_wide(here, p)?;
                Ok(Address::wide_value(w, dst_ty).with_attrs(value.attrs))
            }
            (Repr::Ptr, Repr::Wide) => Err(CodegenError::invariant(format!(
                "wide `{}` assigned to narrow `{}` without localization",
                self.type_name(src.ty),
                self.type_name(dst_ty)
            ))),
            _ => Ok(src),
        }
    }

    /// Both sides on the current locale.
    fn copy_local(&mut self, dst: &E::Val, src: Addr<E>, ty: TypeId, attrs: &AccessAttrs) -> CodegenResult<()> {
        match self.kind(ty) {
            TypeKind::Tuple { len, .. } if self.elementwise_tuple(ty, len) => {
                for i in 0..len {
                    let index = self.int_address(i64::from(i));
                    let d = self.element_ptr(Address::local(dst.clone(), ty).with_attrs(*attrs), index.clone())?;
                    let s = self.element_ptr(src.clone(), index)?;
                    self.assign(&d, s)?;
                }
                Ok(())
            }
            TypeKind::Tuple { .. } | TypeKind::Record(_) | TypeKind::Union(_) => {
                let s = self.addr_of(&src)?;
                let size = u64::from(self.cx.types.size_of(ty));
                self.em.emit_memcpy(dst, &s, size);
                Ok(())
            }
            _ => {
                let value = self.materialize(src)?;
                let AddrState::Value(m) = &value.state else {
                    return Err(CodegenError::invariant("scalar did not materialize to a value"));
                };
                self.store_value(dst, m, ty, attrs);
                Ok(())
            }
        }
    }

    fn elementwise_tuple(&self, ty: TypeId, len: u32) -> bool {
        let config = self.cx.config();
        config.tuple_copy_opt && len <= config.tuple_copy_limit && !self.cx.types.is_tuple_of_tuple(ty)
    }

    fn get_into(&mut self, dst: &E::Val, src: &WidePtr<E::Val>, ty: TypeId, attrs: &AccessAttrs) -> CodegenResult<()> {
        let size = u64::from(self.cx.types.size_of(ty));
        if self.cx.comm_is_local() {
            debug!(size, "get degraded to a local copy");
            let raddr = self.wide_addr(src)?;
            return self.copy_local(dst, Address::local(raddr, ty).with_attrs(*attrs), ty, attrs);
        }
        match src {
            WidePtr::Opaque(v) => {
                self.em.emit_memcpy(dst, v, size);
                Ok(())
            }
            WidePtr::Parts { locale, addr } => {
                debug!(size, "emitting get");
                self.comm_get(dst, locale, addr, size);
                Ok(())
            }
        }
    }

    fn put_from(&mut self, dst: &WidePtr<E::Val>, src: &Addr<E>, ty: TypeId, attrs: &AccessAttrs) -> CodegenResult<()> {
        let size = u64::from(self.cx.types.size_of(ty));
        if self.cx.comm_is_local() {
            debug!(size, "put degraded to a local copy");
            let raddr = self.wide_addr(dst)?;
            return self.copy_local(&raddr, src.clone(), ty, attrs);
        }
        let local = self.value_ptr(src)?;
        match dst {
            WidePtr::Opaque(v) => {
                self.em.emit_memcpy(v, &local, size);
                Ok(())
            }
            WidePtr::Parts { locale, addr } => {
                debug!(size, "emitting put");
                self.comm_put(&local, locale, addr, size);
                Ok(())
            }
        }
    }

    /// Compound assignment `dst = dst <op> rhs` on a scalar. A remote
    /// destination is copied in, updated, and copied back out.
    pub fn op_assign(&mut self, dst: &Addr<E>, op: BinOp, rhs: Addr<E>) -> CodegenResult<()> {
        let vt = self.val_ty(dst.ty);
        if !matches!(vt.repr, Repr::Int(_) | Repr::Float(_)) {
            return Err(CodegenError::invariant(format!(
                "compound assignment on non-scalar `{}`",
                self.type_name(dst.ty)
            )));
        }
        match &dst.state {
            AddrState::Value(_) => Err(CodegenError::invariant("compound assignment to a value")),
            AddrState::WidePointer(_) => {
                let local = self.localize_copy(dst.clone())?;
                self.op_assign(&local, op, rhs)?;
                self.assign(dst, local)
            }
            AddrState::LocalPointer(p) => {
                let p = p.clone();
                let cur = self.plain_value(dst.clone())?;
                let rhs = self.plain_value(rhs)?;
                let result = self.em.emit_binary(op, &vt, &cur, &rhs);
                self.em.emit_store(&vt, &result, &p, &dst.attrs);
                Ok(())
            }
        }
    }

    pub(crate) fn plain_value(&mut self, addr: Addr<E>) -> CodegenResult<E::Val> {
        match self.materialize(addr)?.state {
            AddrState::Value(Materialized::Plain(v)) => Ok(v),
            _ => Err(CodegenError::invariant("expected a plain scalar value")),
        }
    }

    /// Assignment whose completion may be delayed until the next
    /// [`Lowerer::unordered_fence`]. Falls back to [`Lowerer::assign`] when
    /// no transfer is involved.
    pub fn unordered_assign(&mut self, dst: &Addr<E>, src: Addr<E>) -> CodegenResult<()> {
        if self.cx.comm_is_local() || src.ty != dst.ty {
            return self.assign(dst, src);
        }
        let size = u64::from(self.cx.types.size_of(dst.ty));
        match (dst.state.clone(), src.state.clone()) {
            (AddrState::LocalPointer(d), AddrState::WidePointer(w)) => {
                let locale = self.wide_locale(&w)?;
                let addr = self.wide_addr(&w)?;
                self.comm_unordered_get(&d, &locale, &addr, size);
                Ok(())
            }
            (AddrState::WidePointer(dw), AddrState::WidePointer(sw)) => {
                let (dl, da) = (self.wide_locale(&dw)?, self.wide_addr(&dw)?);
                let (sl, sa) = (self.wide_locale(&sw)?, self.wide_addr(&sw)?);
                self.comm_unordered_getput(&dl, &da, &sl, &sa, size);
                Ok(())
            }
            (AddrState::WidePointer(w), AddrState::LocalPointer(_) | AddrState::Value(_)) => {
                let local = self.value_ptr(&src)?;
                let locale = self.wide_locale(&w)?;
                let addr = self.wide_addr(&w)?;
                self.comm_unordered_put(&local, &locale, &addr, size);
                Ok(())
            }
            _ => self.assign(dst, src),
        }
    }
}
