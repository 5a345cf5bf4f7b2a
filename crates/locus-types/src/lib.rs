// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type facts consumed by the address model.
//!
//! Everything here is produced upstream (type checking, instantiation and
//! the wideness analysis) and is read-only for code generation, apart from
//! the memoized construction of reference and wide types.

mod hierarchy;
mod layout;
mod table;
mod types;
mod valty;


pub use hierarchy::{is_subclass, ClassInterval};
pub use layout::{
    AggregateLayout, ClassLayout, FieldInfo, CLASS_ID_OFFSET, UNION_ID_OFFSET,
    UNION_PAYLOAD_OFFSET, WIDE_ADDR_FIELD, WIDE_ADDR_OFFSET, WIDE_C_NAME, WIDE_LOCALE_FIELD,
    WIDE_LOCALE_OFFSET, WIDE_PTR_ALIGN, WIDE_PTR_SIZE,
};
pub use table::{Builtins, TypeError, TypeTable};
pub use types::{ClassId, Locality, Scalar, Type, TypeId, TypeKind};
pub use valty::{Repr, ValTy};
