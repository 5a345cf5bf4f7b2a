// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Error types for address lowering.

use locus_types::TypeError;

/// Rejected configuration. Raised before any code is generated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("deferred lowering needs opaque wide values, which target `{0}` does not support")]
    DeferredUnsupported(&'static str),
    #[error("forcing local communication requires a single-locale machine (num_locales = {0:?})")]
    ForceLocalMultiLocale(Option<u32>),
    #[error("tuple copy limit must be positive")]
    ZeroTupleLimit,
    #[error("invalid configuration: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodegenError {
    /// Compiler-internal invariant violation. Compilation must stop.
    #[error("internal invariant violated: {0}")]
    Invariant(String),
    #[error("type `{ty}` has no field `{field}`")]
    UnknownField { ty: String, field: String },
    #[error("unknown variable `{0}`")]
    UnknownVariable(String),
    #[error("target `{target}` does not support {what}")]
    UnsupportedTarget { target: &'static str, what: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl CodegenError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        CodegenError::Invariant(msg.into())
    }
}

pub type CodegenResult<T> = Result<T, CodegenError>;
