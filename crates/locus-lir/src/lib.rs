// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! LIR (Low-level Intermediate Representation) - typed straight-line SSA.
//!
//! Produced by the instruction-building emitter. Addresses are explicit:
//! aggregates are reached through byte-offset GEPs, and in deferred mode
//! remote locations are ordinary-looking operations on opaque `wideptr`
//! values until [`transform::lower_wide_ops`] rewrites them.

mod builder;
mod display;
mod function;
mod inst;
mod operand;
mod types;

pub mod runtime;
pub mod transform;

mod tests;

pub use builder::LirBuilder;
pub use function::{LirFunction, LirParam};
pub use inst::LirInst;
pub use operand::{BinOp, LirConst, MemAttrs, Operand, ValueId};
pub use runtime::RuntimeFn;
pub use types::LirType;
