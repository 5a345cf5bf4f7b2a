// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Multi-locale simulator for lowered LIR.
//!
//! Runs a single function on one locale of a machine with partitioned
//! memory and implements the runtime communication entry points against
//! that memory. Every transfer is recorded, so tests can check both the
//! data that moved and the calls that moved it.

mod error;
mod machine;
mod memory;
mod runtime;
mod value;

pub use error::{SimError, SimResult};
pub use machine::{CommEvent, Machine};
pub use memory::{HEAP_BASE, LOCALE_MEMORY_SIZE, NULL_GUARD, STACK_BASE};
pub use value::Value;
