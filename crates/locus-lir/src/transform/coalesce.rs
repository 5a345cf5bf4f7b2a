// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Wide load coalescing - eliminate repeated remote reads.
//!
//! In deferred mode a remote read is an ordinary `load` through a
//! `wideptr`. When the same (address, type) pair is loaded twice with no
//! intervening store, block copy or call, the second load is replaced by
//! the first result. Runs before wide lowering, where each surviving load
//! becomes one `get`.

use std::collections::HashMap;

use tracing::debug;

use crate::{LirFunction, LirInst, LirType, Operand, ValueId};

/// Key for tracking already-loaded wide locations.
type LoadKey = (ValueId, LirType);

/// Returns the number of loads removed.
pub fn coalesce_wide_loads(func: &mut LirFunction) -> usize {
    let mut available: HashMap<LoadKey, ValueId> = HashMap::new();
    let mut subst: HashMap<ValueId, ValueId> = HashMap::new();
    let mut removed = 0;

    let body = std::mem::take(&mut func.body);
    let mut out = Vec::with_capacity(body.len());
    for mut inst in body {
        inst.for_each_operand_mut(|op| {
            if let Operand::Value(id) = op {
                if let Some(&to) = subst.get(id) {
                    *id = to;
                }
            }
        });

        if let LirInst::Load { dst, addr: Operand::Value(addr), .. } = &inst {
            if func.value_type(*addr) == LirType::WidePtr {
                let key = (*addr, func.value_type(*dst));
                if let Some(&prev) = available.get(&key) {
                    subst.insert(*dst, prev);
                    removed += 1;
                    continue;
                }
                available.insert(key, *dst);
            }
        } else if inst.clobbers_memory() {
            available.clear();
        }
        out.push(inst);
    }
    func.body = out;

    if removed > 0 {
        debug!(function = %func.name, removed, "coalesced wide loads");
    }
    removed
}
