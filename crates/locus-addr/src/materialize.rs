// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Materialization - turning an address into a value.

use locus_types::{Repr, TypeKind};
use tracing::trace;

use crate::emit::Emitter;
use crate::{AddrState, Address, CodegenError, CodegenResult, Lowerer, Materialized, WidePtr};

impl<E: Emitter> Lowerer<'_, E> {
    /// Load the value an address names.
    ///
    /// Values pass through unchanged. Tuples stay addressed (a local tuple is
    /// its own value); a remote tuple in immediate mode is fetched into a
    /// temporary first. Records and unions cannot be materialized.
    pub fn materialize(&mut self, addr: Address<E::Val>) -> CodegenResult<Address<E::Val>> {
        if addr.is_value() {
            return Ok(addr);
        }
        match self.kind(addr.ty) {
            TypeKind::Record(_) | TypeKind::Union(_) => {
                return Err(CodegenError::invariant(format!(
                    "cannot materialize aggregate `{}`",
                    self.type_name(addr.ty)
                )))
            }
            TypeKind::Tuple { .. } => return self.materialize_tuple(addr),
            _ => {}
        }

        let vt = self.val_ty(addr.ty);
        match &addr.state {
            AddrState::LocalPointer(p) => {
                let value = if vt.repr == Repr::Wide {
                    Materialized::Wide(self.load_wide(p, addr.ty, &addr.attrs))
                } else {
                    Materialized::Plain(self.em.emit_load(&vt, p, &addr.attrs))
                };
                Ok(Address { state: AddrState::Value(value), ty: addr.ty, attrs: addr.attrs })
            }
            AddrState::WidePointer(WidePtr::Opaque(v)) => {
                let loaded = self.em.emit_load(&vt, v, &addr.attrs);
                let value = if vt.repr == Repr::Wide {
                    Materialized::Wide(WidePtr::Opaque(loaded))
                } else {
                    Materialized::Plain(loaded)
                };
                Ok(Address { state: AddrState::Value(value), ty: addr.ty, attrs: addr.attrs })
            }
            AddrState::WidePointer(WidePtr::Parts { .. }) => {
                trace!(ty = %self.type_name(addr.ty), "fetching remote value");
                let local = self.localize_copy(addr)?;
                self.materialize(local)
            }
            AddrState::Value(_) => Ok(addr),
        }
    }

    fn materialize_tuple(&mut self, addr: Address<E::Val>) -> CodegenResult<Address<E::Val>> {
        match &addr.state {
            AddrState::WidePointer(WidePtr::Parts { .. }) => self.localize_copy(addr),
            _ => Ok(addr),
        }
    }

    /// Copy the storage `addr` names into a fresh local temporary.
    pub fn localize_copy(&mut self, addr: Address<E::Val>) -> CodegenResult<Address<E::Val>> {
        let ty = addr.ty;
        let attrs = addr.attrs;
        let tmp = self.temp(ty);
        let dst = Address::local(tmp.clone(), ty).with_attrs(attrs);
        self.assign(&dst, addr)?;
        Ok(Address::local(tmp, ty).with_attrs(attrs))
    }
}
