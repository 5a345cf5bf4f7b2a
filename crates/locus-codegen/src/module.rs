// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Cranelift module setup and code generation orchestration.

use std::collections::HashMap;

use cranelift::prelude::*;
use cranelift_module::{FuncId, Linkage, Module};
use cranelift_object::{ObjectBuilder, ObjectModule};
use locus_lir::{LirFunction, LirType, RuntimeFn};
use tracing::debug;

use crate::builder::FunctionBuilder;
use crate::types::lir_to_cranelift_type;
use crate::{CodegenError, CodegenResult};

pub struct CodeGenerator {
    module: ObjectModule,
    ctx: codegen::Context,
    func_ids: HashMap<String, FuncId>,
}

impl CodeGenerator {
    pub fn new() -> CodegenResult<Self> {
        let isa_builder = cranelift_native::builder().map_err(CodegenError::cranelift)?;
        let isa = isa_builder
            .finish(settings::Flags::new(settings::builder()))
            .map_err(CodegenError::cranelift)?;

        let builder = ObjectBuilder::new(isa, "locus_module", cranelift_module::default_libcall_names())
            .map_err(CodegenError::cranelift)?;

        Ok(CodeGenerator { module: ObjectModule::new(builder), ctx: codegen::Context::new(), func_ids: HashMap::new() })
    }

    fn signature(
        &self,
        name: &str,
        params: impl IntoIterator<Item = LirType>,
        ret: Option<LirType>,
    ) -> CodegenResult<Signature> {
        let mut sig = self.module.make_signature();
        for ty in params {
            sig.params.push(AbiParam::new(lir_to_cranelift_type(ty, name)?));
        }
        if let Some(ty) = ret {
            sig.returns.push(AbiParam::new(lir_to_cranelift_type(ty, name)?));
        }
        Ok(sig)
    }

    /// Declare the communication runtime as external imports.
    pub fn declare_runtime_functions(&mut self) -> CodegenResult<()> {
        for f in RuntimeFn::ALL {
            let sig = self.signature(f.symbol(), f.params().iter().copied(), f.ret())?;
            let id = self
                .module
                .declare_function(f.symbol(), Linkage::Import, &sig)
                .map_err(CodegenError::cranelift)?;
            self.func_ids.insert(f.symbol().to_string(), id);
        }
        Ok(())
    }

    /// Declare all functions first, so bodies may call each other.
    pub fn declare_functions(&mut self, funcs: &[LirFunction]) -> CodegenResult<()> {
        for func in funcs {
            let sig = self.signature(&func.name, func.params.iter().map(|p| p.ty), func.ret_ty)?;
            let id = self
                .module
                .declare_function(&func.name, Linkage::Export, &sig)
                .map_err(CodegenError::cranelift)?;
            self.func_ids.insert(func.name.clone(), id);
        }
        Ok(())
    }

    /// Generate code for one declared function.
    pub fn gen_function(&mut self, func: &LirFunction) -> CodegenResult<()> {
        let func_id = *self
            .func_ids
            .get(&func.name)
            .ok_or_else(|| CodegenError::FunctionNotFound(func.name.clone()))?;

        let sig = self.signature(&func.name, func.params.iter().map(|p| p.ty), func.ret_ty)?;
        self.ctx.clear();
        self.ctx.func.signature = sig;

        // Import callees before the frontend borrows the function.
        let mut func_refs = HashMap::new();
        for (name, fid) in &self.func_ids {
            let func_ref = self.module.declare_func_in_func(*fid, &mut self.ctx.func);
            func_refs.insert(name.clone(), func_ref);
        }

        let config = self.module.target_config();
        FunctionBuilder::new(&mut self.ctx.func, func, &func_refs, config).build()?;

        self.module.define_function(func_id, &mut self.ctx).map_err(CodegenError::cranelift)?;
        debug!(function = %func.name, insts = func.body.len(), "defined function");
        Ok(())
    }

    /// Declare and define every function in `funcs`.
    pub fn compile(&mut self, funcs: &[LirFunction]) -> CodegenResult<()> {
        self.declare_functions(funcs)?;
        funcs.iter().try_for_each(|f| self.gen_function(f))
    }

    /// Object file bytes. Consumes self because finish() takes ownership.
    pub fn finish(self) -> CodegenResult<Vec<u8>> {
        self.module.finish().emit().map_err(CodegenError::cranelift)
    }

    pub fn emit_object(self, path: &std::path::Path) -> CodegenResult<()> {
        let bytes = self.finish()?;
        std::fs::write(path, bytes).map_err(|e| CodegenError::Cranelift(format!("writing {}: {e}", path.display())))
    }
}
