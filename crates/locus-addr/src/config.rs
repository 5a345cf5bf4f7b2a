// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Code generation configuration.

use serde::{Deserialize, Serialize};

use crate::emit::TargetCaps;
use crate::ConfigError;

/// Whole-compilation strategy for remote accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoweringMode {
    /// Remote accesses become runtime transfer calls as they are generated.
    #[default]
    Immediate,
    /// Remote accesses stay ordinary operations on opaque wide values until
    /// the wide lowering pass.
    Deferred,
}

/// Optional runtime checks emitted by the address model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeChecks {
    /// Check the locale before converting a wide pointer to a local one.
    pub local: bool,
    /// Check class handles for nil before dereferencing them.
    pub nil: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    pub mode: LoweringMode,
    /// Largest tuple copied element by element.
    pub tuple_copy_limit: u32,
    pub tuple_copy_opt: bool,
    /// Turn every transfer into a local copy. Only valid on a single locale.
    pub force_local_comm: bool,
    pub num_locales: Option<u32>,
    pub checks: RuntimeChecks,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        CodegenConfig {
            mode: LoweringMode::Immediate,
            tuple_copy_limit: 8,
            tuple_copy_opt: true,
            force_local_comm: false,
            num_locales: None,
            checks: RuntimeChecks::default(),
        }
    }
}

impl CodegenConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self, caps: TargetCaps) -> Result<(), ConfigError> {
        if self.mode == LoweringMode::Deferred && !caps.opaque_wide {
            return Err(ConfigError::DeferredUnsupported(caps.name));
        }
        if self.force_local_comm && self.num_locales != Some(1) {
            return Err(ConfigError::ForceLocalMultiLocale(self.num_locales));
        }
        if self.tuple_copy_limit == 0 && self.tuple_copy_opt {
            return Err(ConfigError::ZeroTupleLimit);
        }
        Ok(())
    }
}
