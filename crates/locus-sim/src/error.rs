// SPDX-License-Identifier: (MIT OR Apache-2.0)

/// A simulated runtime fault. The real runtime aborts the program on all
/// of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    #[error("null access at {addr:#x} on locale {locale}")]
    NullAccess { locale: i64, addr: u64 },

    #[error("access of {size} bytes at {addr:#x} is outside the memory of locale {locale}")]
    OutOfBounds { locale: i64, addr: u64, size: u64 },

    #[error("no such locale: {0}")]
    BadLocale(i64),

    #[error("stack overflow")]
    StackOverflow,

    #[error("heap exhausted on locale {0}")]
    OutOfMemory(i64),

    #[error("undefined function: {0}")]
    UndefinedFunction(String),

    #[error("unlowered wide operation: {0}")]
    Unlowered(&'static str),

    #[error("arity mismatch: expected {expected}, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("use of undefined value %{0}")]
    UndefinedValue(u32),

    #[error("nil dereference (line {line}, file {file})")]
    NilDereference { line: i32, file: i32 },

    #[error("locale {locale} is not the current locale {here} (line {line}, file {file})")]
    NotLocal { locale: i64, here: i64, line: i32, file: i32 },

    #[error("type error: {0}")]
    TypeError(String),
}

pub type SimResult<T> = Result<T, SimError>;
