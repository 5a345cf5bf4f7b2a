// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Memory layout - field offsets, sizes, alignments, object headers.

use crate::types::{ClassId, TypeId};

/// Wide pointers are `{ locale, addr }`. Code that extracts one half
/// relies on these positions.
pub const WIDE_LOCALE_FIELD: u32 = 0;
pub const WIDE_ADDR_FIELD: u32 = 1;
pub const WIDE_LOCALE_OFFSET: u32 = 0;
pub const WIDE_ADDR_OFFSET: u32 = 8;
pub const WIDE_PTR_SIZE: u32 = 16;
pub const WIDE_PTR_ALIGN: u32 = 8;
pub const WIDE_C_NAME: &str = "locus_wide_ptr_t";

/// Every object starts with its 4-byte class id.
pub const CLASS_ID_OFFSET: u32 = 0;
/// Every union starts with an 8-byte union id, followed by the payload.
pub const UNION_ID_OFFSET: u32 = 0;
pub const UNION_PAYLOAD_OFFSET: u32 = 8;

/// Field layout within an aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub ty: TypeId,
    pub offset: u32,
    /// The record, union or class that declares the field. For inherited
    /// class fields this is the superclass.
    pub declared_in: TypeId,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregateLayout {
    pub size: u32,
    pub align: u32,
    pub fields: Vec<FieldInfo>,
}

impl AggregateLayout {
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Class object layout plus its position in the class hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassLayout {
    pub id: ClassId,
    pub name: String,
    /// The narrow class type.
    pub ty: TypeId,
    pub parent: Option<ClassId>,
    /// Object storage; inherited fields come first.
    pub object: AggregateLayout,
    /// Preorder number of the class (`n1`).
    pub class_id: u32,
    /// Largest preorder number among the class and its subclasses (`n2`).
    pub subclass_max: u32,
}

/// `offset` rounded up to `align`; `None` past `u32::MAX`.
pub(crate) fn align_to(offset: u32, align: u32) -> Option<u32> {
    if align <= 1 {
        return Some(offset);
    }
    Some(offset.checked_add(align - 1)? / align * align)
}
