// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! LIR tests - builder typing, display, deferred-mode passes.

#[cfg(test)]
mod tests {
    use crate::transform::{coalesce_wide_loads, lower_wide_ops, WidenError};
    use crate::{BinOp, LirBuilder, LirInst, LirType, MemAttrs, Operand, RuntimeFn};

    fn attrs() -> MemAttrs {
        MemAttrs::default()
    }

    fn get_calls(func: &crate::LirFunction) -> Vec<Vec<Operand>> {
        func.body
            .iter()
            .filter_map(|inst| match inst {
                LirInst::Call { func: f, args, .. } if f == RuntimeFn::Get.symbol() => Some(args.clone()),
                _ => None,
            })
            .collect()
    }

    // ── Builder ─────────────────────────────────────────────────

    #[test]
    fn gep_keeps_base_address_space() {
        let mut b = LirBuilder::new("f", None);
        let w = b.add_param("w", LirType::WidePtr);
        let p = b.add_param("p", LirType::Ptr);
        let wg = b.gep(w.into(), 8, None);
        let pg = b.gep(p.into(), 8, None);
        let func = b.finish();
        assert_eq!(func.value_type(wg), LirType::WidePtr);
        assert_eq!(func.value_type(pg), LirType::Ptr);
    }

    #[test]
    fn compare_yields_i8() {
        let mut b = LirBuilder::new("f", Some(LirType::I8));
        let x = b.add_param("x", LirType::I32);
        let c = b.binary(BinOp::Le, Operand::i32(1), x.into());
        let s = b.binary(BinOp::Add, x.into(), Operand::i32(1));
        b.ret(Some(c.into()));
        let func = b.finish();
        assert_eq!(func.value_type(c), LirType::I8);
        assert_eq!(func.value_type(s), LirType::I32);
        assert!(matches!(func.body.last(), Some(LirInst::Return { value: Some(_) })));
    }

    #[test]
    fn display_lists_instructions() {
        let mut b = LirBuilder::new("show", Some(LirType::I64));
        let p = b.add_param("p", LirType::Ptr);
        let v = b.load(LirType::I64, p.into(), MemAttrs { alias_scope: Some(2), outside_independent_loop: true });
        b.ret(Some(v.into()));
        let text = b.finish().to_string();
        assert!(text.contains("func show(p: ptr %0) -> i64"));
        assert!(text.contains("%1 = load i64, %0 !scope 2 !no_access_group"));
        assert!(text.contains("ret %1"));
    }

    #[test]
    fn runtime_symbols_round_trip() {
        for f in RuntimeFn::ALL {
            assert_eq!(RuntimeFn::from_symbol(f.symbol()), Some(f));
        }
        assert_eq!(RuntimeFn::Get.params().len(), 7);
        assert!(RuntimeFn::GetPutUnordered.is_transfer());
        assert!(!RuntimeFn::Prefetch.is_transfer());
    }

    // ── Coalescing ──────────────────────────────────────────────

    #[test]
    fn repeated_wide_loads_coalesce() {
        let mut b = LirBuilder::new("f", Some(LirType::I64));
        let w = b.add_param("w", LirType::WidePtr);
        let a = b.load(LirType::I64, w.into(), attrs());
        let c = b.load(LirType::I64, w.into(), attrs());
        let s = b.binary(BinOp::Add, a.into(), c.into());
        b.ret(Some(s.into()));
        let mut func = b.finish();

        assert_eq!(coalesce_wide_loads(&mut func), 1);
        let sum = func.body.iter().find_map(|inst| match inst {
            LirInst::Binary { lhs, rhs, .. } => Some((*lhs, *rhs)),
            _ => None,
        });
        assert_eq!(sum, Some((Operand::Value(a), Operand::Value(a))));
    }

    #[test]
    fn stores_block_coalescing() {
        let mut b = LirBuilder::new("f", None);
        let w = b.add_param("w", LirType::WidePtr);
        b.load(LirType::I64, w.into(), attrs());
        b.store(w.into(), Operand::i64(3), attrs());
        b.load(LirType::I64, w.into(), attrs());
        let mut func = b.finish();
        assert_eq!(coalesce_wide_loads(&mut func), 0);
    }

    #[test]
    fn local_loads_are_not_coalesced() {
        let mut b = LirBuilder::new("f", None);
        let p = b.add_param("p", LirType::Ptr);
        b.load(LirType::I64, p.into(), attrs());
        b.load(LirType::I64, p.into(), attrs());
        let mut func = b.finish();
        assert_eq!(coalesce_wide_loads(&mut func), 0);
    }

    // ── Wide lowering ───────────────────────────────────────────

    #[test]
    fn wide_load_becomes_get() {
        let mut b = LirBuilder::new("f", Some(LirType::I64));
        let w = b.add_param("r", LirType::WidePtr);
        b.loc(12, 3);
        let v = b.load(LirType::I64, w.into(), attrs());
        b.ret(Some(v.into()));
        let mut func = b.finish();

        let mut ids = 5;
        let stats = lower_wide_ops(&mut func, &mut ids).unwrap();
        assert_eq!(stats.gets, 1);
        assert_eq!(ids, 6);
        assert!(!func.has_wide_ops());
        assert_eq!(func.params.len(), 2);
        assert_eq!(func.params[0].name, "r_locale");
        assert_eq!(func.params[1].name, "r_addr");

        let gets = get_calls(&func);
        assert_eq!(gets.len(), 1);
        let args = &gets[0];
        assert_eq!(args[1], Operand::Value(func.params[0].id));
        assert_eq!(args[2], Operand::Value(func.params[1].id));
        assert_eq!(args[3], Operand::i64(8));
        assert_eq!(args[4], Operand::i32(5));
        assert_eq!(args[5], Operand::i32(12));
        assert_eq!(args[6], Operand::i32(3));
    }

    #[test]
    fn wide_gep_keeps_locale() {
        let mut b = LirBuilder::new("f", None);
        let w = b.add_param("r", LirType::WidePtr);
        let field = b.gep(w.into(), 16, None);
        b.store(field.into(), Operand::i32(7), attrs());
        let mut func = b.finish();

        lower_wide_ops(&mut func, &mut 0).unwrap();
        let put = func.body.iter().find_map(|inst| match inst {
            LirInst::Call { func: f, args, .. } if f == RuntimeFn::Put.symbol() => Some(args.clone()),
            _ => None,
        });
        let args = put.unwrap();
        assert_eq!(args[1], Operand::Value(func.params[0].id));
        assert_eq!(args[3], Operand::i64(4));
        let gep_base = func.body.iter().find_map(|inst| match inst {
            LirInst::Gep { base, offset: 16, .. } => Some(*base),
            _ => None,
        });
        assert_eq!(gep_base, Some(Operand::Value(func.params[1].id)));
    }

    #[test]
    fn wide_make_and_extract_are_substituted() {
        let mut b = LirBuilder::new("f", Some(LirType::I64));
        let loc = b.add_param("loc", LirType::I64);
        let addr = b.add_param("addr", LirType::Ptr);
        let w = b.wide_make(loc.into(), addr.into());
        let l = b.wide_locale(w.into());
        b.ret(Some(l.into()));
        let mut func = b.finish();

        lower_wide_ops(&mut func, &mut 0).unwrap();
        assert_eq!(func.body, vec![LirInst::Return { value: Some(Operand::Value(loc)) }]);
    }

    #[test]
    fn wide_to_wide_memcpy_goes_through_temp() {
        let mut b = LirBuilder::new("f", None);
        let d = b.add_param("d", LirType::WidePtr);
        let s = b.add_param("s", LirType::WidePtr);
        b.memcpy(d.into(), s.into(), 24);
        let mut func = b.finish();

        let stats = lower_wide_ops(&mut func, &mut 0).unwrap();
        assert_eq!((stats.gets, stats.puts), (1, 1));
        assert!(matches!(func.body[0], LirInst::Alloca { size: 24, .. }));
    }

    #[test]
    fn wide_value_in_local_memory_is_two_halves() {
        let mut b = LirBuilder::new("f", None);
        let slot = b.add_param("slot", LirType::Ptr);
        let w = b.load(LirType::WidePtr, slot.into(), attrs());
        b.store(w.into(), Operand::i64(1), attrs());
        let mut func = b.finish();

        let stats = lower_wide_ops(&mut func, &mut 0).unwrap();
        assert_eq!(stats.puts, 1);
        let loads = func.body.iter().filter(|i| matches!(i, LirInst::Load { .. })).count();
        assert_eq!(loads, 2);
    }

    #[test]
    fn wide_return_is_rejected() {
        let mut b = LirBuilder::new("f", None);
        let w = b.add_param("w", LirType::WidePtr);
        b.ret(Some(w.into()));
        let mut func = b.finish();
        assert!(matches!(lower_wide_ops(&mut func, &mut 0), Err(WidenError::Escape(..))));
    }
}
