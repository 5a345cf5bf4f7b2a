// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Address model for PGAS code generation.
//!
//! Every memory access is described by an [`Address`]: an already-loaded
//! value, a pointer on the current locale, or a wide pointer naming another
//! locale. The [`Lowerer`] resolves field and element accesses on
//! addresses, materializes values, and performs assignments, turning
//! cross-locale accesses into runtime transfers (immediate mode) or into
//! ordinary operations on opaque wide values for a later pass (deferred
//! mode). Output goes through an [`Emitter`]: C text or LIR.

mod address;
mod assign;
mod body;
mod comm;
mod config;
mod context;
mod error;
mod lower;
mod materialize;
mod resolve;
mod subtype;

pub mod emit;

mod tests;

pub use address::{AccessAttrs, AddrState, Address, Materialized, WidePtr};
pub use body::{lower_function, AccessStmt, FunctionSig, PlaceExpr, ValueExpr, VarDecl};
pub use comm::StridedTransfer;
pub use config::{CodegenConfig, LoweringMode, RuntimeChecks};
pub use context::CodegenContext;
pub use emit::{CEmitter, Emitter, FieldSel, LirEmitter, TargetCaps};
pub use error::{CodegenError, CodegenResult, ConfigError};
pub use lower::Lowerer;
