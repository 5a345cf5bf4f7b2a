// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Locus native backend - lowered LIR to object code via Cranelift.
//!
//! Only functions free of wide operations can be compiled: run
//! `locus_lir::transform::lower_wide_ops` first when the address model
//! worked in deferred mode.

mod builder;
mod module;
mod types;


pub use module::CodeGenerator;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodegenError {
    #[error("cranelift error: {0}")]
    Cranelift(String),

    #[error("wide operation in `{func}` ({what}); lower wide operations first")]
    WideOperation { func: String, what: &'static str },

    #[error("function not declared: {0}")]
    FunctionNotFound(String),

    #[error("call to unknown function `{0}`")]
    UnknownCallee(String),

    #[error("use of undefined value %{0}")]
    UndefinedValue(u32),

    #[error("function `{0}` does not return a value on every path")]
    MissingReturn(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

pub type CodegenResult<T> = Result<T, CodegenError>;

impl CodegenError {
    pub(crate) fn cranelift(e: impl std::fmt::Display) -> Self {
        CodegenError::Cranelift(e.to_string())
    }
}
