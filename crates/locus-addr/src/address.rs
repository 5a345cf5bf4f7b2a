// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! The tri-state address produced for every expression that names storage.

use locus_types::TypeId;

/// Metadata that travels with an address and lands on its loads and stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessAttrs {
    pub alias_scope: Option<u32>,
    /// Accesses must stay out of any enclosing order-independent loop's
    /// parallel access group (heap object fields).
    pub outside_independent_loop: bool,
    /// Widen and narrow integer values with zero extension.
    pub unsigned: bool,
}

/// A locale plus an address on that locale.
#[derive(Debug, Clone, PartialEq)]
pub enum WidePtr<V> {
    /// Both halves are live values (immediate mode).
    Parts { locale: V, addr: V },
    /// A single opaque wide value (deferred mode).
    Opaque(V),
}

/// A loaded value. Values of wide pointer-valued types carry both halves.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized<V> {
    Plain(V),
    Wide(WidePtr<V>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AddrState<V> {
    /// Already loaded; not assignable.
    Value(Materialized<V>),
    /// Storage on the current locale.
    LocalPointer(V),
    /// Storage on any locale.
    WidePointer(WidePtr<V>),
}

/// `ty` is the type of the storage for pointer states and the type of the
/// value for [`AddrState::Value`].
#[derive(Debug, Clone, PartialEq)]
pub struct Address<V> {
    pub state: AddrState<V>,
    pub ty: TypeId,
    pub attrs: AccessAttrs,
}

impl<V> Address<V> {
    pub fn value(v: V, ty: TypeId) -> Self {
        Address { state: AddrState::Value(Materialized::Plain(v)), ty, attrs: AccessAttrs::default() }
    }

    pub fn wide_value(w: WidePtr<V>, ty: TypeId) -> Self {
        Address { state: AddrState::Value(Materialized::Wide(w)), ty, attrs: AccessAttrs::default() }
    }

    pub fn local(ptr: V, ty: TypeId) -> Self {
        Address { state: AddrState::LocalPointer(ptr), ty, attrs: AccessAttrs::default() }
    }

    pub fn wide(w: WidePtr<V>, ty: TypeId) -> Self {
        Address { state: AddrState::WidePointer(w), ty, attrs: AccessAttrs::default() }
    }

    pub fn with_attrs(mut self, attrs: AccessAttrs) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn is_value(&self) -> bool {
        matches!(self.state, AddrState::Value(_))
    }

    pub fn is_local_pointer(&self) -> bool {
        matches!(self.state, AddrState::LocalPointer(_))
    }

    pub fn is_wide_pointer(&self) -> bool {
        matches!(self.state, AddrState::WidePointer(_))
    }
}
