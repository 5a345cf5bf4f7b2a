// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Address resolution - field and element addresses, dereference, and the
//! conversions between local and wide addresses.
//!
//! Field and element addresses on remote storage are computed without
//! touching the network: the address half is offset locally and re-paired
//! with the original locale (or, for opaque wide values, offset in place).

use locus_lir::RuntimeFn;
use locus_types::{
    FieldInfo, TypeId, TypeKind, ValTy, CLASS_ID_OFFSET, UNION_ID_OFFSET,
};
use tracing::trace;

use crate::emit::Emitter;
use crate::{AccessAttrs, AddrState, Address, CodegenError, CodegenResult, Lowerer, Materialized, WidePtr};

type Addr<E> = Address<<E as Emitter>::Val>;

impl<E: Emitter> Lowerer<'_, E> {
    /// Address of the storage a reference refers to.
    pub fn deref(&mut self, addr: Addr<E>) -> CodegenResult<Addr<E>> {
        let TypeKind::Ref(pointee) = self.kind(addr.ty) else {
            return Err(CodegenError::invariant(format!(
                "dereference of non-reference type `{}`",
                self.type_name(addr.ty)
            )));
        };
        let attrs = self.attrs_for(pointee, addr.attrs);
        let target = self.materialize(addr)?;
        match target.state {
            AddrState::Value(Materialized::Plain(p)) => Ok(Address::local(p, pointee).with_attrs(attrs)),
            AddrState::Value(Materialized::Wide(w)) => Ok(Address::wide(w, pointee).with_attrs(attrs)),
            _ => Err(CodegenError::invariant("reference did not materialize to a value")),
        }
    }

    /// Address of field `name` of the aggregate or object `base` refers to.
    pub fn field_ptr(&mut self, base: Addr<E>, name: &str) -> CodegenResult<Addr<E>> {
        let info = match self.kind(base.ty) {
            TypeKind::Ref(_) => {
                let base = self.deref(base)?;
                return self.field_ptr(base, name);
            }
            TypeKind::Class(_) | TypeKind::Record(_) | TypeKind::Union(_) => self
                .cx
                .types
                .field(base.ty, name)
                .cloned()
                .ok_or_else(|| CodegenError::UnknownField { ty: self.type_name(base.ty), field: name.to_string() })?,
            _ => {
                return Err(CodegenError::invariant(format!(
                    "field `{}` accessed on non-aggregate type `{}`",
                    name,
                    self.type_name(base.ty)
                )))
            }
        };
        trace!(field = name, ty = %self.type_name(base.ty), offset = info.offset, "field address");
        self.member_ptr(base, &info)
    }

    /// Address of the class id in an object's header.
    pub fn class_id_ptr(&mut self, base: Addr<E>) -> CodegenResult<Addr<E>> {
        if self.cx.types.get(base.ty).is_ref() {
            let base = self.deref(base)?;
            return self.class_id_ptr(base);
        }
        let Some(class) = self.cx.types.class(base.ty) else {
            return Err(CodegenError::invariant(format!(
                "class id of non-class type `{}`",
                self.type_name(base.ty)
            )));
        };
        let root = self.root_class(class.ty);
        let info = FieldInfo {
            name: "_cid".to_string(),
            ty: self.cx.types.builtins().class_id,
            offset: CLASS_ID_OFFSET,
            declared_in: root,
        };
        self.member_ptr(base, &info)
    }

    /// Address of a union's id tag.
    pub fn union_id_ptr(&mut self, base: Addr<E>) -> CodegenResult<Addr<E>> {
        if self.cx.types.get(base.ty).is_ref() {
            let base = self.deref(base)?;
            return self.union_id_ptr(base);
        }
        if !matches!(self.kind(base.ty), TypeKind::Union(_)) {
            return Err(CodegenError::invariant(format!(
                "union id of non-union type `{}`",
                self.type_name(base.ty)
            )));
        }
        // the tag sits in front of the payload, outside `_u`
        let info = FieldInfo {
            name: "_uid".to_string(),
            ty: self.cx.types.builtins().int64,
            offset: UNION_ID_OFFSET,
            declared_in: base.ty,
        };
        self.aggregate_member(base, &info, false)
    }

    fn root_class(&self, mut ty: TypeId) -> TypeId {
        while let Some(parent) = self.cx.types.class(ty).and_then(|c| c.parent) {
            ty = self.cx.types.class_layout(parent).ty;
        }
        ty
    }

    fn member_ptr(&mut self, base: Addr<E>, info: &FieldInfo) -> CodegenResult<Addr<E>> {
        match self.kind(base.ty) {
            TypeKind::Class(_) => self.object_member(base, info),
            TypeKind::Union(_) => self.aggregate_member(base, info, true),
            _ => self.aggregate_member(base, info, false),
        }
    }

    fn gep_member(&mut self, ptr: &E::Val, info: &FieldInfo, union_payload: bool) -> E::Val {
        let owner_c = self.cx.types.get(info.declared_in).c_name.clone();
        let mut sel = self.field_sel(info, &owner_c);
        sel.union_payload = union_payload;
        self.em.emit_field_gep(ptr, &sel)
    }

    /// Fields of objects: the handle value is the object address, cast to
    /// the declaring class.
    fn object_member(&mut self, base: Addr<E>, info: &FieldInfo) -> CodegenResult<Addr<E>> {
        let attrs = AccessAttrs { outside_independent_loop: true, ..self.attrs_for(info.ty, base.attrs) };
        let handle = self.materialize(base)?;
        if self.cx.config().checks.nil {
            self.check_nil(&handle)?;
        }
        match handle.state {
            AddrState::Value(Materialized::Plain(obj)) => {
                let ptr = self.gep_member(&obj, info, false);
                Ok(Address::local(ptr, info.ty).with_attrs(attrs))
            }
            AddrState::Value(Materialized::Wide(w)) => {
                let field = self.wide_member(&w, info, false)?;
                Ok(Address::wide(field, info.ty).with_attrs(attrs))
            }
            _ => Err(CodegenError::invariant("class handle did not materialize to a value")),
        }
    }

    /// Fields of records and unions: `base` must point at the storage.
    fn aggregate_member(&mut self, base: Addr<E>, info: &FieldInfo, union_payload: bool) -> CodegenResult<Addr<E>> {
        let attrs = self.attrs_for(info.ty, base.attrs);
        match base.state {
            AddrState::LocalPointer(p) => {
                let ptr = self.gep_member(&p, info, union_payload);
                Ok(Address::local(ptr, info.ty).with_attrs(attrs))
            }
            AddrState::WidePointer(w) => {
                let field = self.wide_member(&w, info, union_payload)?;
                Ok(Address::wide(field, info.ty).with_attrs(attrs))
            }
            AddrState::Value(_) => Err(CodegenError::invariant(format!(
                "field `{}` of `{}` accessed through a value; aggregates are always addressed",
                info.name,
                self.type_name(base.ty)
            ))),
        }
    }

    fn wide_member(
        &mut self,
        w: &WidePtr<E::Val>,
        info: &FieldInfo,
        union_payload: bool,
    ) -> CodegenResult<WidePtr<E::Val>> {
        match w {
            WidePtr::Opaque(v) => Ok(WidePtr::Opaque(self.gep_member(v, info, union_payload))),
            WidePtr::Parts { locale, addr } => {
                let field = self.gep_member(addr, info, union_payload);
                Ok(WidePtr::Parts { locale: locale.clone(), addr: field })
            }
        }
    }

    /// Address of element `index` of a tuple or flat buffer.
    pub fn element_ptr(&mut self, base: Addr<E>, index: Addr<E>) -> CodegenResult<Addr<E>> {
        let elem = match self.kind(base.ty) {
            TypeKind::Ref(_) => {
                let base = self.deref(base)?;
                return self.element_ptr(base, index);
            }
            TypeKind::Tuple { elem, .. } | TypeKind::Buffer(elem) => elem,
            _ => {
                return Err(CodegenError::invariant(format!(
                    "element access on non-indexable type `{}`",
                    self.type_name(base.ty)
                )))
            }
        };
        let idx = self.index_value(index)?;
        let elem_vt = self.val_ty(elem);
        let attrs = self.attrs_for(elem, base.attrs);

        // buffers are handles; tuples are the storage itself
        let storage = if matches!(self.kind(base.ty), TypeKind::Buffer(_)) {
            self.materialize(base)?.state
        } else {
            base.state
        };
        match storage {
            AddrState::LocalPointer(p) | AddrState::Value(Materialized::Plain(p)) => {
                let ptr = self.em.emit_elem_gep(&p, &idx, &elem_vt);
                Ok(Address::local(ptr, elem).with_attrs(attrs))
            }
            AddrState::WidePointer(w) | AddrState::Value(Materialized::Wide(w)) => {
                let ptr = match w {
                    WidePtr::Opaque(v) => WidePtr::Opaque(self.em.emit_elem_gep(&v, &idx, &elem_vt)),
                    WidePtr::Parts { locale, addr } => {
                        let ptr = self.em.emit_elem_gep(&addr, &idx, &elem_vt);
                        WidePtr::Parts { locale, addr: ptr }
                    }
                };
                Ok(Address::wide(ptr, elem).with_attrs(attrs))
            }
        }
    }

    /// Index as a 64-bit integer, extended according to its signedness.
    fn index_value(&mut self, index: Addr<E>) -> CodegenResult<E::Val> {
        let ty = index.ty;
        let unsigned = index.attrs.unsigned;
        let m = self.materialize(index)?;
        let AddrState::Value(Materialized::Plain(v)) = m.state else {
            return Err(CodegenError::invariant("index did not materialize to an integer"));
        };
        let mut from = self.val_ty(ty);
        if from.size == 8 {
            return Ok(v);
        }
        from.signed = from.signed && !unsigned;
        Ok(self.em.emit_cast(&v, &from, &ValTy::i64()))
    }

    /// The defined wide-to-local conversion. With `checked` (or the local
    /// runtime check enabled) the runtime verifies the locale first.
    pub fn localize(&mut self, addr: Addr<E>, checked: bool) -> CodegenResult<Addr<E>> {
        let checked = checked || self.cx.config().checks.local;
        match addr.state {
            AddrState::WidePointer(w) => {
                let ptr = self.checked_addr(&w, checked)?;
                Ok(Address::local(ptr, addr.ty).with_attrs(addr.attrs))
            }
            AddrState::Value(Materialized::Wide(w)) => {
                let ptr = self.checked_addr(&w, checked)?;
                let narrow = self.cx.types.narrow_of(addr.ty);
                Ok(Address::value(ptr, narrow).with_attrs(addr.attrs))
            }
            _ => Ok(addr),
        }
    }

    fn checked_addr(&mut self, w: &WidePtr<E::Val>, checked: bool) -> CodegenResult<E::Val> {
        if checked {
            let locale = self.wide_locale(w)?;
            let [line, file] = self.location_args();
            self.em.emit_call(RuntimeFn::CheckLocal, &[locale, line, file]);
        }
        self.wide_addr(w)
    }

    /// Re-wrap a local pointer, or a narrow pointer value, with the current
    /// locale.
    pub fn widen_here(&mut self, addr: Addr<E>) -> CodegenResult<Addr<E>> {
        match addr.state {
            AddrState::LocalPointer(p) => {
                let here = self.here()?;
                let w = self.pack_wide(here, p)?;
                Ok(Address::wide(w, addr.ty).with_attrs(addr.attrs))
            }
            AddrState::Value(Materialized::Plain(p)) if self.cx.types.get(addr.ty).is_pointer_valued() => {
                let wide_ty = self.cx.types.wide_of(addr.ty)?;
                let here = self.here()?;
                let w = self.pack_wide(here, p)?;
                Ok(Address::wide_value(w, wide_ty).with_attrs(addr.attrs))
            }
            AddrState::Value(Materialized::Plain(_)) => Err(CodegenError::invariant(format!(
                "cannot widen a value of non-pointer type `{}`",
                self.type_name(addr.ty)
            ))),
            _ => Ok(addr),
        }
    }

    /// Locale of the storage (pointer states) or pointee (wide values);
    /// the current locale when nothing remote is involved.
    pub fn locale_of(&mut self, addr: &Addr<E>) -> CodegenResult<E::Val> {
        match &addr.state {
            AddrState::WidePointer(w) | AddrState::Value(Materialized::Wide(w)) => self.wide_locale(w),
            _ => self.here(),
        }
    }

    pub fn node_of(&mut self, addr: &Addr<E>) -> CodegenResult<E::Val> {
        let locale = self.locale_of(addr)?;
        self.call_value(RuntimeFn::NodeFromLocale, &[locale])
    }

    /// Address half of a pointer state or pointer value.
    pub fn addr_of(&mut self, addr: &Addr<E>) -> CodegenResult<E::Val> {
        match &addr.state {
            AddrState::WidePointer(w) | AddrState::Value(Materialized::Wide(w)) => self.wide_addr(w),
            AddrState::LocalPointer(p) | AddrState::Value(Materialized::Plain(p)) => Ok(p.clone()),
        }
    }
}
