// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Passes over deferred-mode LIR.

mod coalesce;
mod widen;

pub use coalesce::coalesce_wide_loads;
pub use widen::{lower_wide_ops, WidenError, WidenStats};
