// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Lowering pipeline shared by the commands.

use anyhow::{Context, Result};
use locus_addr::{emit::lir_type, lower_function, CEmitter, CodegenConfig, CodegenContext, Emitter, LirEmitter};
use locus_lir::transform::{coalesce_wide_loads, lower_wide_ops, WidenStats};
use locus_lir::LirFunction;
use tracing::{debug, info};

use crate::scenario::Program;

/// Lower to C source text.
pub fn lower_c(program: Program, config: CodegenConfig) -> Result<String> {
    let ret = program.sig.ret.map(|ty| program.types.val_ty(ty).c_name);
    let mut em = CEmitter::new(program.sig.name.clone(), ret.as_deref());
    let mut cx = CodegenContext::new(config, program.types, em.caps())?;
    lower_function(&mut cx, &mut em, &program.sig, &program.body)
        .with_context(|| format!("lowering `{}`", program.sig.name))?;
    Ok(em.finish())
}

/// LIR output, with the deferred-mode pass results when they ran.
pub struct Lowered {
    pub func: LirFunction,
    pub coalesced: usize,
    pub widened: Option<WidenStats>,
}

/// Lower to LIR. With `passes`, deferred-mode output is coalesced and its
/// wide operations rewritten into transfers.
pub fn lower_lir(program: Program, config: CodegenConfig, passes: bool) -> Result<Lowered> {
    let ret = program.sig.ret.map(|ty| lir_type(&program.types.val_ty(ty)));
    let mut em = LirEmitter::new(program.sig.name.clone(), ret);
    let mut cx = CodegenContext::new(config, program.types, em.caps())?;
    lower_function(&mut cx, &mut em, &program.sig, &program.body)
        .with_context(|| format!("lowering `{}`", program.sig.name))?;
    let mut func = em.finish();

    let mut coalesced = 0;
    let mut widened = None;
    if passes && cx.is_deferred() {
        coalesced = coalesce_wide_loads(&mut func);
        let mut ids = cx.comm_ids();
        let stats = lower_wide_ops(&mut func, &mut ids).context("lowering wide operations")?;
        cx.set_comm_ids(ids);
        info!(coalesced, gets = stats.gets, puts = stats.puts, "deferred passes done");
        widened = Some(stats);
    }
    debug!(insts = func.body.len(), "lowered to LIR");
    Ok(Lowered { func, coalesced, widened })
}
