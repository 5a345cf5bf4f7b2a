// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Dynamic subtype tests on class ids.

use locus_lir::BinOp;
use locus_types::{TypeId, ValTy};
use tracing::trace;

use crate::emit::Emitter;
use crate::{AddrState, Address, CodegenError, CodegenResult, Lowerer, Materialized};

impl<E: Emitter> Lowerer<'_, E> {
    /// `low(class) <= cid && cid <= high(class)`: two comparisons regardless
    /// of hierarchy depth.
    pub fn subtype_check(&mut self, cid: &E::Val, class: TypeId) -> CodegenResult<E::Val> {
        let Some(interval) = self.cx.types.class_interval(class) else {
            return Err(CodegenError::invariant(format!(
                "subtype test against non-class `{}`",
                self.type_name(class)
            )));
        };
        trace!(class = %self.type_name(class), low = interval.low, high = interval.high, "subtype test");
        let id_ty = ValTy::int(32, false);
        let low = self.em.emit_int(i64::from(interval.low), &id_ty);
        let high = self.em.emit_int(i64::from(interval.high), &id_ty);
        let above = self.em.emit_binary(BinOp::Le, &id_ty, &low, cid);
        let below = self.em.emit_binary(BinOp::Le, &id_ty, cid, &high);
        Ok(self.em.emit_binary(BinOp::And, &ValTy::bool(), &above, &below))
    }

    /// Downcast a class handle: the handle when the object's class is
    /// `target` or one of its subclasses, nil otherwise. The object must not
    /// be nil. Wide handles keep their locale; the object's class id is read
    /// through the usual materialization path.
    pub fn dynamic_cast(&mut self, obj: Address<E::Val>, target: TypeId) -> CodegenResult<Address<E::Val>> {
        let narrow_target = self.cx.types.narrow_of(target);
        if self.cx.types.class(narrow_target).is_none() {
            return Err(CodegenError::invariant(format!(
                "dynamic cast to non-class `{}`",
                self.type_name(target)
            )));
        }
        let handle = self.materialize(obj)?;
        let cid_ptr = self.class_id_ptr(handle.clone())?;
        let cid = self.plain_value(cid_ptr)?;
        let ok = self.subtype_check(&cid, narrow_target)?;
        let null = self.em.emit_null();

        let AddrState::Value(value) = handle.state else {
            return Err(CodegenError::invariant("class handle did not materialize to a value"));
        };
        match value {
            Materialized::Plain(p) => {
                let cast = self.em.emit_select(&ValTy::ptr(), &ok, &p, &null);
                Ok(Address::value(cast, narrow_target))
            }
            Materialized::Wide(w) => {
                let locale = self.wide_locale(&w)?;
                let addr = self.wide_addr(&w)?;
                let cast = self.em.emit_select(&ValTy::ptr(), &ok, &addr, &null);
                let wide_target = self.cx.types.wide_of(narrow_target)?;
                let w = self.pack_wide(locale, cast)?;
                Ok(Address::wide_value(w, wide_target))
            }
        }
    }
}
