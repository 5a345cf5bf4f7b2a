// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Core type representation.

use std::fmt;

use crate::layout::AggregateLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

/// Index into the table's class layouts. A narrow class type and its wide
/// counterpart share one `ClassId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u32);

/// Whether values of a type may refer to storage on another locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locality {
    #[default]
    Local,
    Wide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Bool,
    Int { bits: u8, signed: bool },
    Real { bits: u8 },
    /// Runtime locale identifier.
    LocaleId,
    /// Object header class id.
    ClassId,
}

impl Scalar {
    pub fn size(self) -> u32 {
        match self {
            Scalar::Bool => 1,
            Scalar::Int { bits, .. } | Scalar::Real { bits } => u32::from(bits) / 8,
            Scalar::LocaleId => 8,
            Scalar::ClassId => 4,
        }
    }

    pub fn is_signed(self) -> bool {
        match self {
            Scalar::Int { signed, .. } => signed,
            Scalar::ClassId | Scalar::LocaleId => true,
            Scalar::Bool | Scalar::Real { .. } => false,
        }
    }

    pub fn c_name(self) -> String {
        match self {
            Scalar::Bool => "bool".to_string(),
            Scalar::Int { bits, signed: true } => format!("int{}_t", bits),
            Scalar::Int { bits, signed: false } => format!("uint{}_t", bits),
            Scalar::Real { bits: 32 } => "float".to_string(),
            Scalar::Real { .. } => "double".to_string(),
            Scalar::LocaleId => "locus_locale_t".to_string(),
            Scalar::ClassId => "locus_class_id_t".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Void,
    /// Type of the `nil` literal.
    Nil,
    Scalar(Scalar),
    /// Reference to a value of the pointee type.
    Ref(TypeId),
    /// Handle to heap object storage.
    Class(ClassId),
    Record(AggregateLayout),
    /// Fields overlap at the payload offset, after the union id tag.
    Union(AggregateLayout),
    /// Homogeneous fixed-size tuple, stored contiguously.
    Tuple { elem: TypeId, len: u32 },
    /// Handle to a flat data buffer of `elem`.
    Buffer(TypeId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub name: String,
    pub c_name: String,
    pub kind: TypeKind,
    pub locality: Locality,
}

impl Type {
    pub fn is_wide(&self) -> bool {
        self.locality == Locality::Wide
    }

    /// Values of this type are addresses (and so can be wide).
    pub fn is_pointer_valued(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Ref(_) | TypeKind::Class(_) | TypeKind::Buffer(_) | TypeKind::Nil
        )
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.kind, TypeKind::Record(_) | TypeKind::Union(_) | TypeKind::Tuple { .. })
    }

    pub fn is_ref(&self) -> bool {
        matches!(self.kind, TypeKind::Ref(_))
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, TypeKind::Class(_))
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self.kind, TypeKind::Tuple { .. })
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
