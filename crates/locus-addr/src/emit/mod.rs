// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Instruction emission capability.
//!
//! The address model is written once against [`Emitter`]; targets differ
//! only in how they spell loads, stores, GEPs and calls.

mod c;
mod lir;

pub use c::CEmitter;
pub use lir::{lir_type, LirEmitter};

use std::fmt;

use locus_lir::{BinOp, RuntimeFn};
use locus_types::ValTy;

use crate::{AccessAttrs, CodegenResult};

/// What a target can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetCaps {
    pub name: &'static str,
    /// Opaque wide values with ordinary load/store/GEP (deferred mode).
    pub opaque_wide: bool,
}

/// A field access, resolved against its declaring aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSel<'a> {
    /// C spelling of the declaring record, union or class.
    pub owner_c: &'a str,
    /// Class handles are already pointers.
    pub owner_is_class: bool,
    pub field_c: &'a str,
    pub offset: u32,
    /// Union fields live inside the shared payload.
    pub union_payload: bool,
}

pub trait Emitter {
    type Val: Clone + fmt::Debug + PartialEq;

    fn caps(&self) -> TargetCaps;

    fn emit_int(&mut self, value: i64, ty: &ValTy) -> Self::Val;
    fn emit_null(&mut self) -> Self::Val;
    fn emit_param(&mut self, name: &str, ty: &ValTy) -> Self::Val;
    /// Stack temporary; returns its address.
    fn emit_alloca(&mut self, ty: &ValTy, name: &str) -> Self::Val;

    fn emit_load(&mut self, ty: &ValTy, ptr: &Self::Val, attrs: &AccessAttrs) -> Self::Val;
    fn emit_store(&mut self, ty: &ValTy, value: &Self::Val, ptr: &Self::Val, attrs: &AccessAttrs);
    fn emit_field_gep(&mut self, base: &Self::Val, field: &FieldSel<'_>) -> Self::Val;
    /// `base + index * elem.size`; `index` is a 64-bit integer.
    fn emit_elem_gep(&mut self, base: &Self::Val, index: &Self::Val, elem: &ValTy) -> Self::Val;
    fn emit_memcpy(&mut self, dst: &Self::Val, src: &Self::Val, size: u64);
    /// Block copy of a run-time byte count (`size` is a 64-bit integer).
    fn emit_memcpy_n(&mut self, dst: &Self::Val, src: &Self::Val, size: &Self::Val);
    fn emit_call(&mut self, func: RuntimeFn, args: &[Self::Val]) -> Option<Self::Val>;

    fn emit_binary(&mut self, op: BinOp, ty: &ValTy, lhs: &Self::Val, rhs: &Self::Val) -> Self::Val;
    fn emit_select(&mut self, ty: &ValTy, cond: &Self::Val, if_true: &Self::Val, if_false: &Self::Val) -> Self::Val;
    /// Resize or reinterpret; sign extension follows `from.signed`.
    fn emit_cast(&mut self, value: &Self::Val, from: &ValTy, to: &ValTy) -> Self::Val;

    fn emit_wide_make(&mut self, locale: &Self::Val, addr: &Self::Val) -> CodegenResult<Self::Val>;
    fn emit_wide_locale(&mut self, wide: &Self::Val) -> CodegenResult<Self::Val>;
    fn emit_wide_addr(&mut self, wide: &Self::Val) -> CodegenResult<Self::Val>;

    fn emit_location(&mut self, line: u32, file: u32);
    fn emit_return(&mut self, value: Option<&Self::Val>);
}
