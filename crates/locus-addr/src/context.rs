// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Per-module code generation state.

use locus_types::TypeTable;

use crate::emit::TargetCaps;
use crate::{CodegenConfig, ConfigError, LoweringMode};

/// Passed by reference through every lowering call. The configuration is
/// fixed at creation; the counters and the source position advance as code
/// is generated.
#[derive(Debug)]
pub struct CodegenContext {
    config: CodegenConfig,
    pub types: TypeTable,
    temps: u32,
    comm_ids: u32,
    line: u32,
    file: u32,
}

impl CodegenContext {
    pub fn new(config: CodegenConfig, types: TypeTable, caps: TargetCaps) -> Result<Self, ConfigError> {
        config.validate(caps)?;
        Ok(CodegenContext { config, types, temps: 0, comm_ids: 0, line: 0, file: 0 })
    }

    pub fn config(&self) -> &CodegenConfig {
        &self.config
    }

    pub fn mode(&self) -> LoweringMode {
        self.config.mode
    }

    pub fn is_deferred(&self) -> bool {
        self.config.mode == LoweringMode::Deferred
    }

    /// Transfers degrade to local copies.
    pub fn comm_is_local(&self) -> bool {
        self.config.force_local_comm
    }

    pub fn fresh_temp(&mut self, hint: &str) -> String {
        let name = format!("{}_{}", hint, self.temps);
        self.temps += 1;
        name
    }

    pub fn next_comm_id(&mut self) -> u32 {
        let id = self.comm_ids;
        self.comm_ids += 1;
        id
    }

    /// Next unused communication id. Handed to the wide lowering pass,
    /// which allocates ids for the transfers it creates.
    pub fn comm_ids(&self) -> u32 {
        self.comm_ids
    }

    pub fn set_comm_ids(&mut self, next: u32) {
        self.comm_ids = self.comm_ids.max(next);
    }

    pub fn set_location(&mut self, line: u32, file: u32) {
        self.line = line;
        self.file = file;
    }

    pub fn location(&self) -> (u32, u32) {
        (self.line, self.file)
    }
}
