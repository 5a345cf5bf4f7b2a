// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Address model tests - resolution, materialization, assignment and
//! communication lowering against both emitters.

#[cfg(test)]
mod tests {
    use locus_lir::transform::lower_wide_ops;
    use locus_lir::{BinOp, LirFunction, LirInst, LirType, Operand, RuntimeFn, ValueId};
    use locus_types::{Locality, TypeId, TypeTable};
    use proptest::prelude::*;

    use crate::*;

    fn deferred() -> CodegenConfig {
        CodegenConfig { mode: LoweringMode::Deferred, ..CodegenConfig::default() }
    }

    fn lir_cx(config: CodegenConfig, types: TypeTable) -> CodegenContext {
        let caps = LirEmitter::new("caps", None).caps();
        CodegenContext::new(config, types, caps).unwrap()
    }

    fn c_cx(config: CodegenConfig, types: TypeTable) -> CodegenContext {
        let caps = CEmitter::new("caps", None).caps();
        CodegenContext::new(config, types, caps).unwrap()
    }

    fn lower_lir(config: CodegenConfig, types: TypeTable, sig: &FunctionSig, body: &[AccessStmt]) -> LirFunction {
        let mut cx = lir_cx(config, types);
        let mut em = LirEmitter::new(sig.name.clone(), None);
        lower_function(&mut cx, &mut em, sig, body).unwrap();
        em.finish()
    }

    fn var(name: &str) -> PlaceExpr {
        PlaceExpr::Var(name.to_string())
    }

    fn read(name: &str) -> ValueExpr {
        ValueExpr::Place(var(name))
    }

    fn decl(name: &str, ty: TypeId) -> VarDecl {
        VarDecl { name: name.to_string(), ty }
    }

    fn sig(params: Vec<VarDecl>, locals: Vec<VarDecl>) -> FunctionSig {
        FunctionSig { name: "f".to_string(), params, locals, ret: None }
    }

    fn calls(func: &LirFunction, f: RuntimeFn) -> Vec<Vec<Operand>> {
        func.body
            .iter()
            .filter_map(|inst| match inst {
                LirInst::Call { func: name, args, .. } if name == f.symbol() => Some(args.clone()),
                _ => None,
            })
            .collect()
    }

    fn alloca_ids(func: &LirFunction) -> Vec<ValueId> {
        func.body
            .iter()
            .filter_map(|inst| match inst {
                LirInst::Alloca { dst, .. } => Some(*dst),
                _ => None,
            })
            .collect()
    }

    /// Types with a wide reference to `int64`.
    fn remote_int() -> (TypeTable, TypeId, TypeId) {
        let mut types = TypeTable::new();
        let int = types.builtins().int64;
        let wide_ref = types.ref_to(int, Locality::Wide);
        (types, int, wide_ref)
    }

    // ── Assignment ──────────────────────────────────────────────

    #[test]
    fn remote_read_emits_one_get() {
        let (types, int, wide_ref) = remote_int();
        let sig = sig(vec![decl("r", wide_ref)], vec![decl("x", int)]);
        let body = [AccessStmt::Assign { dst: var("x"), src: read("r") }];
        let func = lower_lir(CodegenConfig::default(), types, &sig, &body);

        assert_eq!(func.params[0].name, "r_locale");
        assert_eq!(func.params[1].name, "r_addr");
        let gets = calls(&func, RuntimeFn::Get);
        assert_eq!(gets.len(), 1);
        let x = alloca_ids(&func)[0];
        assert_eq!(gets[0][0], Operand::Value(x));
        assert_eq!(gets[0][1], Operand::Value(func.params[0].id));
        assert_eq!(gets[0][2], Operand::Value(func.params[1].id));
        assert_eq!(gets[0][3], Operand::i64(8));
        assert_eq!(gets[0].len(), RuntimeFn::Get.params().len());
        assert!(!func.has_wide_ops());
    }

    #[test]
    fn deferred_read_is_block_copy_until_lowered() {
        let (types, int, wide_ref) = remote_int();
        let sig = sig(vec![decl("r", wide_ref)], vec![decl("x", int)]);
        let body = [AccessStmt::Assign { dst: var("x"), src: read("r") }];
        let mut func = lower_lir(deferred(), types, &sig, &body);

        assert_eq!(func.params[0].ty, LirType::WidePtr);
        assert!(calls(&func, RuntimeFn::Get).is_empty());
        let x = alloca_ids(&func)[0];
        assert!(func.body.iter().any(|inst| matches!(
            inst,
            LirInst::Memcpy { dst, src, size }
                if *size == Operand::i64(8) && *dst == Operand::Value(x) && *src == Operand::Value(func.params[0].id)
        )));

        let mut ids = 0;
        let stats = lower_wide_ops(&mut func, &mut ids).unwrap();
        assert_eq!(stats.gets, 1);
        assert_eq!(func.count_calls(RuntimeFn::Get.symbol()), 1);
        assert!(!func.has_wide_ops());
    }

    #[test]
    fn nil_into_wide_class_uses_current_locale() {
        let mut types = TypeTable::new();
        let int = types.builtins().int64;
        let class = types.add_class("C", None, &[("a", int)]).unwrap();
        let wide_class = types.wide_of(class).unwrap();
        let sig = sig(vec![], vec![decl("o", wide_class)]);
        let body = [AccessStmt::Assign { dst: var("o"), src: ValueExpr::Nil }];
        let func = lower_lir(CodegenConfig::default(), types, &sig, &body);

        let here = func
            .body
            .iter()
            .find_map(|inst| match inst {
                LirInst::Call { dst: Some(d), func: name, .. } if name == RuntimeFn::LocaleHere.symbol() => Some(*d),
                _ => None,
            })
            .expect("locale_here call");
        let o = alloca_ids(&func)[0];
        let locale_slot = func
            .body
            .iter()
            .find_map(|inst| match inst {
                LirInst::Gep { dst, base, offset: 0, index: None } if *base == Operand::Value(o) => Some(*dst),
                _ => None,
            })
            .expect("locale half");
        let addr_slot = func
            .body
            .iter()
            .find_map(|inst| match inst {
                LirInst::Gep { dst, base, offset: 8, index: None } if *base == Operand::Value(o) => Some(*dst),
                _ => None,
            })
            .expect("address half");
        let stores: Vec<_> = func
            .body
            .iter()
            .filter_map(|inst| match inst {
                LirInst::Store { addr, value, .. } => Some((*addr, *value)),
                _ => None,
            })
            .collect();
        assert!(stores.contains(&(Operand::Value(locale_slot), Operand::Value(here))));
        assert!(stores.contains(&(Operand::Value(addr_slot), Operand::null())));
    }

    #[test]
    fn assign_to_value_is_invariant_violation() {
        let mut cx = lir_cx(CodegenConfig::default(), TypeTable::new());
        let mut em = LirEmitter::new("f", None);
        let mut lw = Lowerer::new(&mut cx, &mut em);
        let v = lw.int_address(1);
        let err = lw.assign(&v.clone(), v).unwrap_err();
        assert!(matches!(err, CodegenError::Invariant(_)));
    }

    #[test]
    fn remote_to_remote_goes_through_temporary() {
        let (types, _, wide_ref) = remote_int();
        let sig = sig(vec![decl("a", wide_ref), decl("b", wide_ref)], vec![]);
        let body = [AccessStmt::Assign { dst: PlaceExpr::Deref(Box::new(var("a"))), src: read("b") }];
        let func = lower_lir(CodegenConfig::default(), types, &sig, &body);

        let gets = calls(&func, RuntimeFn::Get);
        let puts = calls(&func, RuntimeFn::Put);
        assert_eq!((gets.len(), puts.len()), (1, 1));
        let tmp = alloca_ids(&func)[0];
        assert_eq!(gets[0][0], Operand::Value(tmp));
        assert_eq!(puts[0][0], Operand::Value(tmp));
        // distinct communication ids
        assert_eq!(gets[0][4], Operand::i32(0));
        assert_eq!(puts[0][4], Operand::i32(1));
    }

    #[test]
    fn single_locale_degrades_get_to_load() {
        let (types, int, wide_ref) = remote_int();
        let config = CodegenConfig { force_local_comm: true, num_locales: Some(1), ..CodegenConfig::default() };
        let sig = sig(vec![decl("r", wide_ref)], vec![decl("x", int)]);
        let body = [AccessStmt::Assign { dst: var("x"), src: read("r") }];
        let func = lower_lir(config, types, &sig, &body);

        assert!(calls(&func, RuntimeFn::Get).is_empty());
        let r_addr = Operand::Value(func.params[1].id);
        assert!(func.body.iter().any(|inst| matches!(inst, LirInst::Load { addr, .. } if *addr == r_addr)));
    }

    #[test]
    fn compound_assign_on_remote_copies_in_and_out() {
        let (types, _, wide_ref) = remote_int();
        let sig = sig(vec![decl("r", wide_ref)], vec![]);
        let body = [AccessStmt::OpAssign {
            dst: PlaceExpr::Deref(Box::new(var("r"))),
            op: BinOp::Add,
            src: ValueExpr::Int(1),
        }];
        let func = lower_lir(CodegenConfig::default(), types, &sig, &body);

        assert_eq!(calls(&func, RuntimeFn::Get).len(), 1);
        assert_eq!(calls(&func, RuntimeFn::Put).len(), 1);
        assert!(func.body.iter().any(|inst| matches!(inst, LirInst::Binary { op: BinOp::Add, .. })));
    }

    #[test]
    fn unordered_get_waits_for_fence() {
        let (types, int, wide_ref) = remote_int();
        let sig = sig(vec![decl("r", wide_ref)], vec![decl("x", int)]);
        let body = [AccessStmt::UnorderedAssign { dst: var("x"), src: read("r") }, AccessStmt::Fence];
        let func = lower_lir(CodegenConfig::default(), types, &sig, &body);

        assert_eq!(calls(&func, RuntimeFn::GetUnordered).len(), 1);
        assert!(calls(&func, RuntimeFn::Get).is_empty());
        let fence = func.body.iter().position(|i| matches!(i, LirInst::Call { func, .. } if func == RuntimeFn::UnorderedFence.symbol()));
        let get = func.body.iter().position(|i| matches!(i, LirInst::Call { func, .. } if func == RuntimeFn::GetUnordered.symbol()));
        assert!(get < fence);
    }

    #[test]
    fn prefetch_skips_local_storage() {
        let (types, int, wide_ref) = remote_int();
        let sig = sig(vec![decl("r", wide_ref)], vec![decl("x", int)]);
        let body = [
            AccessStmt::Prefetch(var("x")),
            AccessStmt::Prefetch(PlaceExpr::Deref(Box::new(var("r")))),
        ];
        let func = lower_lir(CodegenConfig::default(), types, &sig, &body);
        let prefetches = calls(&func, RuntimeFn::Prefetch);
        assert_eq!(prefetches.len(), 1);
        assert_eq!(prefetches[0][2], Operand::i64(8));
    }

    #[test]
    fn location_reaches_transfer_arguments() {
        let (types, int, wide_ref) = remote_int();
        let sig = sig(vec![decl("r", wide_ref)], vec![decl("x", int)]);
        let body = [
            AccessStmt::Location { line: 12, file: 3 },
            AccessStmt::Assign { dst: var("x"), src: read("r") },
        ];
        let func = lower_lir(CodegenConfig::default(), types, &sig, &body);
        let gets = calls(&func, RuntimeFn::Get);
        assert_eq!(&gets[0][5..], &[Operand::i32(12), Operand::i32(3)]);
    }

    // ── Tuples ──────────────────────────────────────────────────

    fn tuple_copy(config: CodegenConfig, tuple_of_tuple: bool) -> Vec<String> {
        let mut types = TypeTable::new();
        let int = types.builtins().int64;
        let elem = if tuple_of_tuple { types.tuple_of(int, 2).unwrap() } else { int };
        let tup = types.tuple_of(elem, 4).unwrap();
        let mut cx = c_cx(config, types);
        let mut em = CEmitter::new("f", None);
        let sig = sig(vec![], vec![decl("a", tup), decl("b", tup)]);
        lower_function(&mut cx, &mut em, &sig, &[AccessStmt::Assign { dst: var("a"), src: read("b") }]).unwrap();
        em.statements().to_vec()
    }

    #[test]
    fn small_tuple_copies_elementwise() {
        let stmts = tuple_copy(CodegenConfig::default(), false);
        assert_eq!(stmts.len(), 4);
        assert!(stmts.iter().all(|s| !s.contains("memcpy")));
        assert!(stmts[3].contains("INT64_C(3)"));
    }

    #[test]
    fn tuple_over_limit_is_block_copy() {
        let config = CodegenConfig { tuple_copy_limit: 2, ..CodegenConfig::default() };
        assert_eq!(tuple_copy(config, false), vec!["memcpy(&a, &b, 32);".to_string()]);
    }

    #[test]
    fn tuple_of_tuples_is_block_copy() {
        assert_eq!(tuple_copy(CodegenConfig::default(), true), vec!["memcpy(&a, &b, 64);".to_string()]);
    }

    // ── Resolution ──────────────────────────────────────────────

    #[test]
    fn inherited_field_uses_declaring_class() {
        let mut types = TypeTable::new();
        let int = types.builtins().int64;
        let base = types.add_class("C", None, &[("a", int)]).unwrap();
        let sub = types.add_class("D", Some(base), &[("b", int)]).unwrap();
        let mut cx = c_cx(CodegenConfig::default(), types);
        let mut em = CEmitter::new("f", None);
        let mut lw = Lowerer::new(&mut cx, &mut em);

        let obj = Address::value("o".to_string(), sub);
        let a = lw.field_ptr(obj.clone(), "a").unwrap();
        let b = lw.field_ptr(obj, "b").unwrap();
        assert_eq!(a.state, AddrState::LocalPointer("&(((C)(o))->a)".to_string()));
        assert_eq!(b.state, AddrState::LocalPointer("&(((D)(o))->b)".to_string()));
        assert!(a.attrs.outside_independent_loop);
    }

    #[test]
    fn union_fields_live_in_payload() {
        let mut types = TypeTable::new();
        let int = types.builtins().int64;
        let real = types.builtins().real64;
        let u = types.add_union("U", &[("i", int), ("r", real)]).unwrap();
        let mut cx = c_cx(CodegenConfig::default(), types);
        let mut em = CEmitter::new("f", None);
        let mut lw = Lowerer::new(&mut cx, &mut em);

        let storage = Address::local("&u".to_string(), u);
        let r = lw.field_ptr(storage.clone(), "r").unwrap();
        let tag = lw.union_id_ptr(storage).unwrap();
        assert_eq!(r.state, AddrState::LocalPointer("&(((U*)(&u))->_u.r)".to_string()));
        assert_eq!(tag.state, AddrState::LocalPointer("&(((U*)(&u))->_uid)".to_string()));
    }

    #[test]
    fn unknown_field_and_value_record_are_rejected() {
        let mut types = TypeTable::new();
        let int = types.builtins().int64;
        let rec = types.add_record("R", &[("x", int)]).unwrap();
        let mut cx = c_cx(CodegenConfig::default(), types);
        let mut em = CEmitter::new("f", None);
        let mut lw = Lowerer::new(&mut cx, &mut em);

        let err = lw.field_ptr(Address::local("&r".to_string(), rec), "y").unwrap_err();
        assert!(matches!(err, CodegenError::UnknownField { .. }));
        let err = lw.field_ptr(Address::value("r".to_string(), rec), "x").unwrap_err();
        assert!(matches!(err, CodegenError::Invariant(_)));
        let err = lw.field_ptr(Address::value("n".to_string(), int), "x").unwrap_err();
        assert!(matches!(err, CodegenError::Invariant(_)));
    }

    #[test]
    fn remote_buffer_element_keeps_locale() {
        let mut types = TypeTable::new();
        let int = types.builtins().int64;
        let buf = types.buffer_of(int);
        let wide_buf = types.wide_of(buf).unwrap();
        let sig = sig(vec![decl("d", wide_buf)], vec![decl("x", int)]);
        let body = [AccessStmt::Assign {
            dst: var("x"),
            src: ValueExpr::Place(PlaceExpr::Index(Box::new(var("d")), Box::new(ValueExpr::Int(3)))),
        }];
        let func = lower_lir(CodegenConfig::default(), types, &sig, &body);

        let gets = calls(&func, RuntimeFn::Get);
        assert_eq!(gets.len(), 1);
        assert_eq!(gets[0][1], Operand::Value(func.params[0].id));
        let elem = func
            .body
            .iter()
            .find_map(|inst| match inst {
                LirInst::Gep { dst, base, index: Some((idx, 8)), .. }
                    if *base == Operand::Value(func.params[1].id) && *idx == Operand::i64(3) =>
                {
                    Some(*dst)
                }
                _ => None,
            })
            .expect("element address");
        assert_eq!(gets[0][2], Operand::Value(elem));
    }

    #[test]
    fn localize_checks_locale_when_asked() {
        let (types, _, wide_ref) = remote_int();
        let mut cx = lir_cx(CodegenConfig::default(), types);
        let mut em = LirEmitter::new("f", None);
        {
            let mut lw = Lowerer::new(&mut cx, &mut em);
            let w = WidePtr::Parts { locale: Operand::i64(2), addr: Operand::null() };
            let narrow = lw.localize(Address::wide_value(w, wide_ref), true).unwrap();
            assert_eq!(narrow.state, AddrState::Value(Materialized::Plain(Operand::null())));
            assert!(!lw.context().types.get(narrow.ty).is_wide());
        }
        let func = em.finish();
        let checks = calls(&func, RuntimeFn::CheckLocal);
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0][0], Operand::i64(2));
    }

    #[test]
    fn widen_here_pairs_with_current_locale() {
        let (types, int, _) = remote_int();
        let mut cx = lir_cx(CodegenConfig::default(), types);
        let mut em = LirEmitter::new("f", None);
        let mut lw = Lowerer::new(&mut cx, &mut em);
        let p = Operand::Value(ValueId(0));
        let wide = lw.widen_here(Address::local(p, int)).unwrap();
        let AddrState::WidePointer(WidePtr::Parts { addr, .. }) = wide.state else {
            panic!("expected wide parts, got {:?}", wide.state);
        };
        assert_eq!(addr, p);
    }

    // ── Subtype tests ───────────────────────────────────────────

    fn hierarchy() -> (TypeTable, TypeId, TypeId, TypeId) {
        let mut types = TypeTable::new();
        let int = types.builtins().int64;
        let a = types.add_class("A", None, &[("x", int)]).unwrap();
        let b = types.add_class("B", Some(a), &[]).unwrap();
        let c = types.add_class("C", Some(a), &[]).unwrap();
        (types, a, b, c)
    }

    #[test]
    fn subtype_check_is_two_comparisons() {
        let (types, a, _, _) = hierarchy();
        let mut cx = c_cx(CodegenConfig::default(), types);
        let mut em = CEmitter::new("f", None);
        let mut lw = Lowerer::new(&mut cx, &mut em);
        let test = lw.subtype_check(&"cid".to_string(), a).unwrap();
        assert_eq!(test, "((((1) <= (cid))) & (((cid) <= (3))))");
    }

    #[test]
    fn dynamic_cast_selects_object_or_nil() {
        let (types, a, b, _) = hierarchy();
        let int = types.builtins().int64;
        let mut cx = c_cx(CodegenConfig::default(), types);
        let mut em = CEmitter::new("f", None);
        let mut lw = Lowerer::new(&mut cx, &mut em);

        let cast = lw.dynamic_cast(Address::value("o".to_string(), a), b).unwrap();
        assert_eq!(cast.ty, b);
        let AddrState::Value(Materialized::Plain(text)) = cast.state else {
            panic!("expected a plain value");
        };
        assert!(text.contains("(((A)(o))->_cid)"));
        assert!(text.ends_with("? (o) : (NULL))"));

        let err = lw.dynamic_cast(Address::value("o".to_string(), a), int).unwrap_err();
        assert!(matches!(err, CodegenError::Invariant(_)));
    }

    #[test]
    fn local_array_get_is_a_sized_memcpy() {
        let (types, int, _) = remote_int();
        let mut cx = c_cx(CodegenConfig::default(), types);
        let mut em = CEmitter::new("f", None);
        {
            let mut lw = Lowerer::new(&mut cx, &mut em);
            let src = Address::local("src".to_string(), int);
            lw.array_get(&"buf".to_string(), &src, &"n".to_string()).unwrap();
            lw.array_put(&src, &"buf".to_string(), &"n".to_string()).unwrap();
        }
        assert_eq!(
            em.statements(),
            [
                "memcpy(buf, src, (size_t)(((n) * (INT64_C(8)))));".to_string(),
                "memcpy(src, buf, (size_t)(((n) * (INT64_C(8)))));".to_string(),
            ]
        );
    }

    #[test]
    fn deferred_array_get_lowers_to_one_get() {
        let (types, int, _) = remote_int();
        let mut cx = lir_cx(deferred(), types);
        let mut em = LirEmitter::new("f", None);
        {
            let mut lw = Lowerer::new(&mut cx, &mut em);
            let w = lw.pack_wide(Operand::i64(1), Operand::int(0x2000, LirType::Ptr)).unwrap();
            let len = lw.int(3);
            lw.array_get(&Operand::int(0x1000, LirType::Ptr), &Address::wide(w, int), &len).unwrap();
        }
        let mut func = em.finish();
        assert!(calls(&func, RuntimeFn::Get).is_empty());
        let mut ids = cx.comm_ids();
        lower_wide_ops(&mut func, &mut ids).unwrap();
        let gets = calls(&func, RuntimeFn::Get);
        assert_eq!(gets.len(), 1);
        assert_eq!(gets[0][1], Operand::i64(1));
        assert_eq!(gets[0][2], Operand::int(0x2000, LirType::Ptr));
    }

    // ── C output ────────────────────────────────────────────────

    #[test]
    fn c_function_text() {
        let (types, int, wide_ref) = remote_int();
        let mut cx = c_cx(CodegenConfig::default(), types);
        let mut em = CEmitter::new("f", Some("int64_t"));
        let sig = FunctionSig {
            name: "f".to_string(),
            params: vec![decl("r", wide_ref)],
            locals: vec![decl("x", int)],
            ret: Some(int),
        };
        let body = [AccessStmt::Assign { dst: var("x"), src: read("r") }, AccessStmt::Return(Some(read("x")))];
        lower_function(&mut cx, &mut em, &sig, &body).unwrap();
        assert_eq!(
            em.finish(),
            "int64_t f(locus_locale_t r_locale, void* r_addr) {\n  int64_t x;\n  \
             locus_comm_get(&x, r_locale, r_addr, INT64_C(8), 0, 0, 0);\n  return x;\n}\n"
        );
    }

    #[test]
    fn unknown_variable_is_reported() {
        let mut cx = c_cx(CodegenConfig::default(), TypeTable::new());
        let mut em = CEmitter::new("f", None);
        let body = [AccessStmt::CheckNil(var("q"))];
        let err = lower_function(&mut cx, &mut em, &sig(vec![], vec![]), &body).unwrap_err();
        assert_eq!(err, CodegenError::UnknownVariable("q".to_string()));
    }

    // ── Configuration ───────────────────────────────────────────

    #[test]
    fn deferred_rejected_for_c() {
        let caps = CEmitter::new("f", None).caps();
        let err = CodegenContext::new(deferred(), TypeTable::new(), caps).unwrap_err();
        assert_eq!(err, ConfigError::DeferredUnsupported("c"));
    }

    #[test]
    fn force_local_needs_single_locale() {
        let caps = LirEmitter::new("f", None).caps();
        let config = CodegenConfig { force_local_comm: true, num_locales: Some(4), ..CodegenConfig::default() };
        let err = CodegenContext::new(config, TypeTable::new(), caps).unwrap_err();
        assert_eq!(err, ConfigError::ForceLocalMultiLocale(Some(4)));
    }

    #[test]
    fn config_from_json_fills_defaults() {
        let config = CodegenConfig::from_json(r#"{"mode":"deferred","tuple_copy_limit":4}"#).unwrap();
        assert_eq!(config.mode, LoweringMode::Deferred);
        assert_eq!(config.tuple_copy_limit, 4);
        assert!(config.tuple_copy_opt);
        assert!(matches!(CodegenConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }

    // ── Properties ──────────────────────────────────────────────

    proptest! {
        #[test]
        fn pack_then_unpack_round_trips(locale in any::<i64>(), addr in any::<i64>()) {
            let mut cx = lir_cx(CodegenConfig::default(), TypeTable::new());
            let mut em = LirEmitter::new("f", None);
            let mut lw = Lowerer::new(&mut cx, &mut em);
            let w = lw.pack_wide(Operand::i64(locale), Operand::int(addr, LirType::Ptr)).unwrap();
            prop_assert_eq!(lw.wide_locale(&w).unwrap(), Operand::i64(locale));
            prop_assert_eq!(lw.wide_addr(&w).unwrap(), Operand::int(addr, LirType::Ptr));
        }

        #[test]
        fn field_offset_independent_of_locality(sizes in prop::collection::vec(0usize..4, 1..8)) {
            let mut types = TypeTable::new();
            let b = *types.builtins();
            let scalars = [b.int8, b.int16, b.int32, b.int64];
            let names: Vec<String> = (0..sizes.len()).map(|i| format!("f{}", i)).collect();
            let fields: Vec<(&str, TypeId)> =
                names.iter().zip(&sizes).map(|(n, s)| (n.as_str(), scalars[*s])).collect();
            let rec = types.add_record("R", &fields).unwrap();
            let offsets: Vec<u32> = names.iter().map(|n| types.field(rec, n).unwrap().offset).collect();

            let mut cx = lir_cx(CodegenConfig::default(), types);
            let mut em = LirEmitter::new("f", None);
            let (local, locale, remote) = {
                let mut lw = Lowerer::new(&mut cx, &mut em);
                let local = lw.emitter().emit_param("p", &locus_types::ValTy::ptr());
                let locale = lw.emitter().emit_param("l", &locus_types::ValTy::locale());
                let remote = lw.emitter().emit_param("q", &locus_types::ValTy::ptr());
                (local, locale, remote)
            };
            for (name, offset) in names.iter().zip(&offsets) {
                let mut lw = Lowerer::new(&mut cx, &mut em);
                let l = lw.field_ptr(Address::local(local, rec), name).unwrap();
                let w = WidePtr::Parts { locale, addr: remote };
                let r = lw.field_ptr(Address::wide(w, rec), name).unwrap();
                let AddrState::LocalPointer(Operand::Value(lp)) = l.state else { panic!("local field") };
                let AddrState::WidePointer(WidePtr::Parts { locale: rl, addr: Operand::Value(rp) }) = r.state else {
                    panic!("wide field")
                };
                prop_assert_eq!(rl, locale);
                let func = em.function();
                let gep_of = |id: ValueId| func.body.iter().find_map(|inst| match inst {
                    LirInst::Gep { dst, base, offset, .. } if *dst == id => Some((*base, *offset)),
                    _ => None,
                });
                prop_assert_eq!(gep_of(lp), Some((local, i64::from(*offset))));
                prop_assert_eq!(gep_of(rp), Some((remote, i64::from(*offset))));
            }
        }
    }
}
