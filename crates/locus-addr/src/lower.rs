// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! The lowering handle shared by resolution, materialization, assignment
//! and communication, plus wide-pointer packing.

use locus_lir::RuntimeFn;
use locus_types::{
    FieldInfo, Repr, TypeId, TypeKind, ValTy, WIDE_ADDR_OFFSET, WIDE_C_NAME, WIDE_LOCALE_OFFSET,
};

use crate::emit::{Emitter, FieldSel};
use crate::{AccessAttrs, AddrState, Address, CodegenContext, CodegenError, CodegenResult, Materialized, WidePtr};

/// Borrowed context plus emitter. Methods are spread over the resolve,
/// materialize, assign, comm and subtype modules.
pub struct Lowerer<'a, E: Emitter> {
    pub(crate) cx: &'a mut CodegenContext,
    pub(crate) em: &'a mut E,
}

impl<'a, E: Emitter> Lowerer<'a, E> {
    pub fn new(cx: &'a mut CodegenContext, em: &'a mut E) -> Self {
        Lowerer { cx, em }
    }

    pub fn context(&mut self) -> &mut CodegenContext {
        &mut *self.cx
    }

    pub fn emitter(&mut self) -> &mut E {
        &mut *self.em
    }

    pub(crate) fn val_ty(&self, ty: TypeId) -> ValTy {
        self.cx.types.val_ty(ty)
    }

    pub(crate) fn type_name(&self, ty: TypeId) -> String {
        self.cx.types.type_name(ty)
    }

    pub(crate) fn kind(&self, ty: TypeId) -> TypeKind {
        self.cx.types.get(ty).kind.clone()
    }

    /// Attributes for storage of type `ty` reached from an address with `base`.
    pub(crate) fn attrs_for(&self, ty: TypeId, base: AccessAttrs) -> AccessAttrs {
        let vt = self.val_ty(ty);
        AccessAttrs { unsigned: matches!(vt.repr, Repr::Int(_)) && !vt.signed, ..base }
    }

    pub fn int(&mut self, value: i64) -> E::Val {
        self.em.emit_int(value, &ValTy::i64())
    }

    pub fn int_address(&mut self, value: i64) -> Address<E::Val> {
        let v = self.int(value);
        Address::value(v, self.cx.types.builtins().int64)
    }

    /// Stack temporary for a value of `ty`.
    pub fn temp(&mut self, ty: TypeId) -> E::Val {
        let name = self.cx.fresh_temp("tmp");
        let vt = self.val_ty(ty);
        self.em.emit_alloca(&vt, &name)
    }

    pub(crate) fn call_value(&mut self, func: RuntimeFn, args: &[E::Val]) -> CodegenResult<E::Val> {
        self.em
            .emit_call(func, args)
            .ok_or_else(|| CodegenError::invariant(format!("`{}` produced no value", func.symbol())))
    }

    /// Current source position as `(line, file)` arguments.
    pub(crate) fn location_args(&mut self) -> [E::Val; 2] {
        let (line, file) = self.cx.location();
        let i32_ty = ValTy::int(32, true);
        [self.em.emit_int(i64::from(line), &i32_ty), self.em.emit_int(i64::from(file), &i32_ty)]
    }

    /// Fresh communication id followed by the source position.
    pub(crate) fn comm_debug_args(&mut self) -> [E::Val; 3] {
        let id = self.cx.next_comm_id();
        let id = self.em.emit_int(i64::from(id), &ValTy::int(32, true));
        let [line, file] = self.location_args();
        [id, line, file]
    }

    /// Locale id of the executing task.
    pub fn here(&mut self) -> CodegenResult<E::Val> {
        self.call_value(RuntimeFn::LocaleHere, &[])
    }

    pub fn pack_wide(&mut self, locale: E::Val, addr: E::Val) -> CodegenResult<WidePtr<E::Val>> {
        if self.cx.is_deferred() {
            Ok(WidePtr::Opaque(self.em.emit_wide_make(&locale, &addr)?))
        } else {
            Ok(WidePtr::Parts { locale, addr })
        }
    }

    pub fn wide_locale(&mut self, w: &WidePtr<E::Val>) -> CodegenResult<E::Val> {
        match w {
            WidePtr::Parts { locale, .. } => Ok(locale.clone()),
            WidePtr::Opaque(v) => self.em.emit_wide_locale(v),
        }
    }

    pub fn wide_addr(&mut self, w: &WidePtr<E::Val>) -> CodegenResult<E::Val> {
        match w {
            WidePtr::Parts { addr, .. } => Ok(addr.clone()),
            WidePtr::Opaque(v) => self.em.emit_wide_addr(v),
        }
    }

    /// Same locale, different address.
    pub(crate) fn rewrap(&mut self, w: &WidePtr<E::Val>, addr: E::Val) -> CodegenResult<WidePtr<E::Val>> {
        let locale = self.wide_locale(w)?;
        self.pack_wide(locale, addr)
    }

    pub(crate) fn field_sel<'f>(&self, info: &'f FieldInfo, owner_c: &'f str) -> FieldSel<'f> {
        let owner = self.cx.types.get(info.declared_in);
        FieldSel {
            owner_c,
            owner_is_class: owner.is_class(),
            field_c: &info.name,
            offset: info.offset,
            union_payload: matches!(owner.kind, TypeKind::Union(_)),
        }
    }

    fn wide_half(&mut self, ptr: &E::Val, locale: bool) -> E::Val {
        let (field_c, offset) = if locale { ("locale", WIDE_LOCALE_OFFSET) } else { ("addr", WIDE_ADDR_OFFSET) };
        let sel = FieldSel { owner_c: WIDE_C_NAME, owner_is_class: false, field_c, offset, union_payload: false };
        self.em.emit_field_gep(ptr, &sel)
    }

    /// Load a wide value held in local memory.
    pub(crate) fn load_wide(&mut self, ptr: &E::Val, ty: TypeId, attrs: &AccessAttrs) -> WidePtr<E::Val> {
        if self.cx.is_deferred() {
            let vt = self.val_ty(ty);
            return WidePtr::Opaque(self.em.emit_load(&vt, ptr, attrs));
        }
        let locale_ptr = self.wide_half(ptr, true);
        let locale = self.em.emit_load(&ValTy::locale(), &locale_ptr, attrs);
        let addr_ptr = self.wide_half(ptr, false);
        let addr = self.em.emit_load(&ValTy::ptr(), &addr_ptr, attrs);
        WidePtr::Parts { locale, addr }
    }

    /// Store a wide value into local memory.
    pub(crate) fn store_wide(&mut self, ptr: &E::Val, w: &WidePtr<E::Val>, ty: TypeId, attrs: &AccessAttrs) {
        match w {
            WidePtr::Opaque(v) => {
                let vt = self.val_ty(ty);
                self.em.emit_store(&vt, v, ptr, attrs);
            }
            WidePtr::Parts { locale, addr } => {
                let locale_ptr = self.wide_half(ptr, true);
                self.em.emit_store(&ValTy::locale(), locale, &locale_ptr, attrs);
                let addr_ptr = self.wide_half(ptr, false);
                self.em.emit_store(&ValTy::ptr(), addr, &addr_ptr, attrs);
            }
        }
    }

    /// Store a materialized value of type `ty` into local memory.
    pub(crate) fn store_value(&mut self, ptr: &E::Val, value: &Materialized<E::Val>, ty: TypeId, attrs: &AccessAttrs) {
        match value {
            Materialized::Plain(v) => {
                let vt = self.val_ty(ty);
                self.em.emit_store(&vt, v, ptr, attrs);
            }
            Materialized::Wide(w) => self.store_wide(ptr, w, ty, attrs),
        }
    }

    /// Local pointer holding `src`: the pointer itself, or a temporary the
    /// value is spilled into.
    pub fn value_ptr(&mut self, src: &Address<E::Val>) -> CodegenResult<E::Val> {
        match &src.state {
            AddrState::LocalPointer(p) => Ok(p.clone()),
            AddrState::Value(m) => {
                let tmp = self.temp(src.ty);
                self.store_value(&tmp, m, src.ty, &src.attrs);
                Ok(tmp)
            }
            AddrState::WidePointer(_) => Err(CodegenError::invariant(format!(
                "no local pointer for remote `{}`",
                self.type_name(src.ty)
            ))),
        }
    }
}
