// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type table - registered types, layouts and memoized derived types.

use std::collections::HashMap;

use crate::hierarchy::{number_classes, ClassInterval};
use crate::layout::{
    align_to, AggregateLayout, ClassLayout, FieldInfo, CLASS_ID_OFFSET, UNION_PAYLOAD_OFFSET,
    WIDE_C_NAME, WIDE_PTR_ALIGN, WIDE_PTR_SIZE,
};
use crate::types::{ClassId, Locality, Scalar, Type, TypeId, TypeKind};
use crate::valty::{Repr, ValTy};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("type `{0}` is not pointer-valued and has no wide form")]
    NotWidenable(String),
    #[error("parent of class `{class}` is not a class: `{parent}`")]
    ParentNotClass { class: String, parent: String },
    #[error("type `{0}` is already defined")]
    Duplicate(String),
    #[error("type `{0}` is too large")]
    TooLarge(String),
}

/// Ids of the builtin types, registered by [`TypeTable::new`].
#[derive(Debug, Clone, Copy)]
pub struct Builtins {
    pub void: TypeId,
    pub nil: TypeId,
    pub bool: TypeId,
    pub int8: TypeId,
    pub int16: TypeId,
    pub int32: TypeId,
    pub int64: TypeId,
    pub uint8: TypeId,
    pub uint16: TypeId,
    pub uint32: TypeId,
    pub uint64: TypeId,
    pub real32: TypeId,
    pub real64: TypeId,
    pub locale_id: TypeId,
    pub class_id: TypeId,
}

#[derive(Debug, Clone)]
pub struct TypeTable {
    types: Vec<Type>,
    classes: Vec<ClassLayout>,
    by_name: HashMap<String, TypeId>,
    refs: HashMap<(TypeId, Locality), TypeId>,
    wide: HashMap<TypeId, TypeId>,
    narrow: HashMap<TypeId, TypeId>,
    tuples: HashMap<(TypeId, u32), TypeId>,
    buffers: HashMap<TypeId, TypeId>,
    builtins: Builtins,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    pub fn new() -> Self {
        let mut table = TypeTable {
            types: Vec::new(),
            classes: Vec::new(),
            by_name: HashMap::new(),
            refs: HashMap::new(),
            wide: HashMap::new(),
            narrow: HashMap::new(),
            tuples: HashMap::new(),
            buffers: HashMap::new(),
            builtins: Builtins {
                void: TypeId(0),
                nil: TypeId(0),
                bool: TypeId(0),
                int8: TypeId(0),
                int16: TypeId(0),
                int32: TypeId(0),
                int64: TypeId(0),
                uint8: TypeId(0),
                uint16: TypeId(0),
                uint32: TypeId(0),
                uint64: TypeId(0),
                real32: TypeId(0),
                real64: TypeId(0),
                locale_id: TypeId(0),
                class_id: TypeId(0),
            },
        };

        let void = table.register(Type {
            name: "void".to_string(),
            c_name: "void".to_string(),
            kind: TypeKind::Void,
            locality: Locality::Local,
        });
        let nil = table.register(Type {
            name: "nil".to_string(),
            c_name: "void*".to_string(),
            kind: TypeKind::Nil,
            locality: Locality::Local,
        });
        let builtins = Builtins {
            void,
            nil,
            bool: table.register_scalar("bool", Scalar::Bool),
            int8: table.register_scalar("int8", Scalar::Int { bits: 8, signed: true }),
            int16: table.register_scalar("int16", Scalar::Int { bits: 16, signed: true }),
            int32: table.register_scalar("int32", Scalar::Int { bits: 32, signed: true }),
            int64: table.register_scalar("int64", Scalar::Int { bits: 64, signed: true }),
            uint8: table.register_scalar("uint8", Scalar::Int { bits: 8, signed: false }),
            uint16: table.register_scalar("uint16", Scalar::Int { bits: 16, signed: false }),
            uint32: table.register_scalar("uint32", Scalar::Int { bits: 32, signed: false }),
            uint64: table.register_scalar("uint64", Scalar::Int { bits: 64, signed: false }),
            real32: table.register_scalar("real32", Scalar::Real { bits: 32 }),
            real64: table.register_scalar("real64", Scalar::Real { bits: 64 }),
            locale_id: table.register_scalar("locale_id", Scalar::LocaleId),
            class_id: table.register_scalar("class_id", Scalar::ClassId),
        };
        table.builtins = builtins;
        table
    }

    fn register_scalar(&mut self, name: &str, scalar: Scalar) -> TypeId {
        self.register(Type {
            name: name.to_string(),
            c_name: scalar.c_name(),
            kind: TypeKind::Scalar(scalar),
            locality: Locality::Local,
        })
    }

    /// Register a fully-formed type. Later registrations shadow earlier
    /// ones in [`TypeTable::lookup`].
    pub fn register(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.by_name.insert(ty.name.clone(), id);
        self.types.push(ty);
        id
    }

    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    /// Panics if `id` was not minted by this table.
    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn type_name(&self, id: TypeId) -> String {
        self.get(id).name.clone()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn check_fresh(&self, name: &str) -> Result<(), TypeError> {
        if self.by_name.contains_key(name) {
            return Err(TypeError::Duplicate(name.to_string()));
        }
        Ok(())
    }

    fn lay_out(
        &self,
        owner_name: &str,
        start: u32,
        owner: TypeId,
        fields: &[(&str, TypeId)],
    ) -> Result<(Vec<FieldInfo>, u32, u32), TypeError> {
        let too_large = || TypeError::TooLarge(owner_name.to_string());
        let mut offset = start;
        let mut align = 1;
        let mut infos = Vec::with_capacity(fields.len());
        for (name, ty) in fields {
            let field_align = self.align_of(*ty);
            offset = align_to(offset, field_align).ok_or_else(too_large)?;
            infos.push(FieldInfo {
                name: (*name).to_string(),
                ty: *ty,
                offset,
                declared_in: owner,
            });
            offset = offset.checked_add(self.size_of(*ty)).ok_or_else(too_large)?;
            align = align.max(field_align);
        }
        Ok((infos, offset, align))
    }

    pub fn add_record(&mut self, name: &str, fields: &[(&str, TypeId)]) -> Result<TypeId, TypeError> {
        self.check_fresh(name)?;
        let id = TypeId(self.types.len() as u32);
        let (fields, end, align) = self.lay_out(name, 0, id, fields)?;
        let size = align_to(end, align).ok_or_else(|| TypeError::TooLarge(name.to_string()))?;
        let layout = AggregateLayout { size, align, fields };
        Ok(self.register(Type {
            name: name.to_string(),
            c_name: name.to_string(),
            kind: TypeKind::Record(layout),
            locality: Locality::Local,
        }))
    }

    pub fn add_union(&mut self, name: &str, fields: &[(&str, TypeId)]) -> Result<TypeId, TypeError> {
        self.check_fresh(name)?;
        let id = TypeId(self.types.len() as u32);
        let mut align = 8;
        let mut payload = 0;
        let mut infos = Vec::with_capacity(fields.len());
        for (field_name, ty) in fields {
            align = align.max(self.align_of(*ty));
            payload = payload.max(self.size_of(*ty));
            infos.push(FieldInfo {
                name: (*field_name).to_string(),
                ty: *ty,
                offset: UNION_PAYLOAD_OFFSET,
                declared_in: id,
            });
        }
        let size = UNION_PAYLOAD_OFFSET
            .checked_add(payload)
            .and_then(|end| align_to(end, align))
            .ok_or_else(|| TypeError::TooLarge(name.to_string()))?;
        let layout = AggregateLayout { size, align, fields: infos };
        Ok(self.register(Type {
            name: name.to_string(),
            c_name: name.to_string(),
            kind: TypeKind::Union(layout),
            locality: Locality::Local,
        }))
    }

    /// Add a class. Inherited fields keep their offsets and declaring
    /// class; own fields follow the parent's storage.
    pub fn add_class(
        &mut self,
        name: &str,
        parent: Option<TypeId>,
        fields: &[(&str, TypeId)],
    ) -> Result<TypeId, TypeError> {
        self.check_fresh(name)?;
        let parent_class = match parent {
            Some(p) => match self.get(p).kind {
                TypeKind::Class(cid) if !self.get(p).is_wide() => Some(cid),
                _ => {
                    return Err(TypeError::ParentNotClass {
                        class: name.to_string(),
                        parent: self.type_name(p),
                    })
                }
            },
            None => None,
        };

        let id = TypeId(self.types.len() as u32);
        let (inherited, start, base_align) = match parent_class {
            Some(cid) => {
                let object = &self.class_layout(cid).object;
                (object.fields.clone(), object.size, object.align)
            }
            // class id header
            None => (Vec::new(), CLASS_ID_OFFSET + 4, 4),
        };
        let (own, end, own_align) = self.lay_out(name, start, id, fields)?;
        let align = base_align.max(own_align);
        let size = align_to(end, align).ok_or_else(|| TypeError::TooLarge(name.to_string()))?;
        let mut all = inherited;
        all.extend(own);

        let cid = ClassId(self.classes.len() as u32);
        self.classes.push(ClassLayout {
            id: cid,
            name: name.to_string(),
            ty: id,
            parent: parent_class,
            object: AggregateLayout { size, align, fields: all },
            class_id: 0,
            subclass_max: 0,
        });
        number_classes(&mut self.classes);

        Ok(self.register(Type {
            name: name.to_string(),
            c_name: name.to_string(),
            kind: TypeKind::Class(cid),
            locality: Locality::Local,
        }))
    }

    /// Homogeneous tuple; its size must fit in a `u32`.
    pub fn tuple_of(&mut self, elem: TypeId, len: u32) -> Result<TypeId, TypeError> {
        if let Some(&id) = self.tuples.get(&(elem, len)) {
            return Ok(id);
        }
        let elem_ty = self.get(elem);
        let name = format!("{}*{}", len, elem_ty.name);
        if self.size_of(elem).checked_mul(len).is_none() {
            return Err(TypeError::TooLarge(name));
        }
        let c_name = format!("_tuple_{}_{}", len, sanitize(&elem_ty.c_name));
        let id = self.register(Type {
            name,
            c_name,
            kind: TypeKind::Tuple { elem, len },
            locality: Locality::Local,
        });
        self.tuples.insert((elem, len), id);
        Ok(id)
    }

    pub fn buffer_of(&mut self, elem: TypeId) -> TypeId {
        if let Some(&id) = self.buffers.get(&elem) {
            return id;
        }
        let elem_ty = self.get(elem);
        let name = format!("_ddata({})", elem_ty.name);
        let c_name = format!("{}*", elem_ty.c_name);
        let id = self.register(Type {
            name,
            c_name,
            kind: TypeKind::Buffer(elem),
            locality: Locality::Local,
        });
        self.buffers.insert(elem, id);
        id
    }

    pub fn ref_to(&mut self, pointee: TypeId, locality: Locality) -> TypeId {
        if let Some(&id) = self.refs.get(&(pointee, locality)) {
            return id;
        }
        let pointee_ty = self.get(pointee);
        let (name, c_name) = match locality {
            Locality::Local => (format!("ref({})", pointee_ty.name), format!("{}*", pointee_ty.c_name)),
            Locality::Wide => (format!("wide ref({})", pointee_ty.name), WIDE_C_NAME.to_string()),
        };
        let id = self.register(Type { name, c_name, kind: TypeKind::Ref(pointee), locality });
        self.refs.insert((pointee, locality), id);
        id
    }

    /// The wide counterpart of a pointer-valued type.
    pub fn wide_of(&mut self, ty: TypeId) -> Result<TypeId, TypeError> {
        let t = self.get(ty);
        if t.is_wide() {
            return Ok(ty);
        }
        match t.kind.clone() {
            TypeKind::Ref(pointee) => Ok(self.ref_to(pointee, Locality::Wide)),
            kind @ (TypeKind::Class(_) | TypeKind::Buffer(_)) => {
                if let Some(&id) = self.wide.get(&ty) {
                    return Ok(id);
                }
                let name = format!("wide({})", t.name);
                let id = self.register(Type {
                    name,
                    c_name: WIDE_C_NAME.to_string(),
                    kind,
                    locality: Locality::Wide,
                });
                self.wide.insert(ty, id);
                self.narrow.insert(id, ty);
                Ok(id)
            }
            _ => Err(TypeError::NotWidenable(t.name.clone())),
        }
    }

    /// The local counterpart of a wide type; identity for local types.
    pub fn narrow_of(&mut self, ty: TypeId) -> TypeId {
        let t = self.get(ty);
        if !t.is_wide() {
            return ty;
        }
        match t.kind {
            TypeKind::Ref(pointee) => self.ref_to(pointee, Locality::Local),
            _ => self.narrow.get(&ty).copied().unwrap_or(ty),
        }
    }

    pub fn size_of(&self, ty: TypeId) -> u32 {
        let t = self.get(ty);
        match &t.kind {
            TypeKind::Void => 0,
            TypeKind::Nil => 8,
            TypeKind::Scalar(s) => s.size(),
            TypeKind::Ref(_) | TypeKind::Class(_) | TypeKind::Buffer(_) => {
                if t.is_wide() {
                    WIDE_PTR_SIZE
                } else {
                    8
                }
            }
            TypeKind::Record(layout) | TypeKind::Union(layout) => layout.size,
            // checked when the tuple type is created
            TypeKind::Tuple { elem, len } => self.size_of(*elem) * len,
        }
    }

    pub fn align_of(&self, ty: TypeId) -> u32 {
        let t = self.get(ty);
        match &t.kind {
            TypeKind::Void => 1,
            TypeKind::Nil => 8,
            TypeKind::Scalar(s) => s.size().max(1),
            TypeKind::Ref(_) | TypeKind::Class(_) | TypeKind::Buffer(_) => {
                if t.is_wide() {
                    WIDE_PTR_ALIGN
                } else {
                    8
                }
            }
            TypeKind::Record(layout) | TypeKind::Union(layout) => layout.align,
            TypeKind::Tuple { elem, .. } => self.align_of(*elem),
        }
    }

    pub fn class(&self, ty: TypeId) -> Option<&ClassLayout> {
        match self.get(ty).kind {
            TypeKind::Class(cid) => Some(self.class_layout(cid)),
            _ => None,
        }
    }

    pub fn class_layout(&self, id: ClassId) -> &ClassLayout {
        &self.classes[id.0 as usize]
    }

    pub fn classes(&self) -> &[ClassLayout] {
        &self.classes
    }

    pub fn class_interval(&self, ty: TypeId) -> Option<ClassInterval> {
        self.class(ty).map(|c| ClassInterval { low: c.class_id, high: c.subclass_max })
    }

    /// Field lookup on records, unions and class objects.
    pub fn field(&self, ty: TypeId, name: &str) -> Option<&FieldInfo> {
        match &self.get(ty).kind {
            TypeKind::Record(layout) | TypeKind::Union(layout) => layout.field(name),
            TypeKind::Class(cid) => self.class_layout(*cid).object.field(name),
            _ => None,
        }
    }

    pub fn tuple_elem(&self, ty: TypeId) -> Option<(TypeId, u32)> {
        match self.get(ty).kind {
            TypeKind::Tuple { elem, len } => Some((elem, len)),
            _ => None,
        }
    }

    pub fn is_tuple_of_tuple(&self, ty: TypeId) -> bool {
        self.tuple_elem(ty)
            .map(|(elem, _)| self.get(elem).is_tuple())
            .unwrap_or(false)
    }

    pub fn val_ty(&self, ty: TypeId) -> ValTy {
        let t = self.get(ty);
        let size = self.size_of(ty);
        let align = self.align_of(ty);
        let (repr, signed) = match &t.kind {
            TypeKind::Scalar(Scalar::Real { bits }) => (Repr::Float(*bits), true),
            TypeKind::Scalar(s) => (Repr::Int((s.size() * 8) as u8), s.is_signed()),
            TypeKind::Ref(_) | TypeKind::Class(_) | TypeKind::Buffer(_) if t.is_wide() => (Repr::Wide, false),
            TypeKind::Ref(_) | TypeKind::Class(_) | TypeKind::Buffer(_) | TypeKind::Nil => (Repr::Ptr, false),
            TypeKind::Void | TypeKind::Record(_) | TypeKind::Union(_) | TypeKind::Tuple { .. } => {
                (Repr::Memory, false)
            }
        };
        ValTy { repr, size, align, c_name: t.c_name.clone(), signed }
    }
}

fn sanitize(c_name: &str) -> String {
    c_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
