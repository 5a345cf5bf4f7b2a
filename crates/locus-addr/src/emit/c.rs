// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! C text emitter. Values are C expressions; statements and temporary
//! declarations accumulate until [`CEmitter::finish`].

use locus_lir::{BinOp, RuntimeFn};
use locus_types::ValTy;

use super::{Emitter, FieldSel, TargetCaps};
use crate::{AccessAttrs, CodegenError, CodegenResult};

pub struct CEmitter {
    name: String,
    ret: String,
    params: Vec<String>,
    decls: Vec<String>,
    stmts: Vec<String>,
}

impl CEmitter {
    pub fn new(name: impl Into<String>, ret: Option<&str>) -> Self {
        CEmitter {
            name: name.into(),
            ret: ret.unwrap_or("void").to_string(),
            params: Vec::new(),
            decls: Vec::new(),
            stmts: Vec::new(),
        }
    }

    pub fn statements(&self) -> &[String] {
        &self.stmts
    }

    pub fn finish(self) -> String {
        let params = if self.params.is_empty() { "void".to_string() } else { self.params.join(", ") };
        let mut out = format!("{} {}({}) {{\n", self.ret, self.name, params);
        for decl in &self.decls {
            out.push_str("  ");
            out.push_str(decl);
            out.push('\n');
        }
        for stmt in &self.stmts {
            out.push_str("  ");
            out.push_str(stmt);
            out.push('\n');
        }
        out.push_str("}\n");
        out
    }

    fn unsupported(&self, what: &str) -> CodegenError {
        CodegenError::UnsupportedTarget { target: "c", what: what.to_string() }
    }
}

/// `&x` and `&(...)` can be dereferenced by dropping the `&`.
fn strip_address_of(ptr: &str) -> Option<&str> {
    let rest = ptr.strip_prefix('&')?;
    let simple = rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    let wrapped = rest.starts_with('(') && rest.ends_with(')') && balanced(&rest[1..rest.len() - 1]);
    if !rest.is_empty() && (simple || wrapped) {
        Some(rest)
    } else {
        None
    }
}

fn balanced(s: &str) -> bool {
    let mut depth = 0i32;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn c_op(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::And => "&",
        BinOp::Or => "|",
        BinOp::Xor => "^",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
    }
}

impl Emitter for CEmitter {
    type Val = String;

    fn caps(&self) -> TargetCaps {
        TargetCaps { name: "c", opaque_wide: false }
    }

    fn emit_int(&mut self, value: i64, ty: &ValTy) -> String {
        match ty.size {
            8 if ty.signed => format!("INT64_C({})", value),
            8 => format!("UINT64_C({})", value),
            _ if value < 0 => format!("({})", value),
            _ => value.to_string(),
        }
    }

    fn emit_null(&mut self) -> String {
        "NULL".to_string()
    }

    fn emit_param(&mut self, name: &str, ty: &ValTy) -> String {
        self.params.push(format!("{} {}", ty.c_name, name));
        name.to_string()
    }

    fn emit_alloca(&mut self, ty: &ValTy, name: &str) -> String {
        self.decls.push(format!("{} {};", ty.c_name, name));
        format!("&{}", name)
    }

    fn emit_load(&mut self, ty: &ValTy, ptr: &String, _attrs: &AccessAttrs) -> String {
        match strip_address_of(ptr) {
            Some(lvalue) => lvalue.to_string(),
            None => format!("(*(({}*)({})))", ty.c_name, ptr),
        }
    }

    fn emit_store(&mut self, ty: &ValTy, value: &String, ptr: &String, _attrs: &AccessAttrs) {
        let lvalue = match strip_address_of(ptr) {
            Some(lvalue) => lvalue.to_string(),
            None => format!("*(({}*)({}))", ty.c_name, ptr),
        };
        self.stmts.push(format!("{} = {};", lvalue, value));
    }

    fn emit_field_gep(&mut self, base: &String, field: &FieldSel<'_>) -> String {
        let owner = if field.owner_is_class {
            format!("(({})({}))", field.owner_c, base)
        } else {
            format!("(({}*)({}))", field.owner_c, base)
        };
        if field.union_payload {
            format!("&({}->_u.{})", owner, field.field_c)
        } else {
            format!("&({}->{})", owner, field.field_c)
        }
    }

    fn emit_elem_gep(&mut self, base: &String, index: &String, elem: &ValTy) -> String {
        format!("((({}*)({})) + ({}))", elem.c_name, base, index)
    }

    fn emit_memcpy(&mut self, dst: &String, src: &String, size: u64) {
        self.stmts.push(format!("memcpy({}, {}, {});", dst, src, size));
    }

    fn emit_memcpy_n(&mut self, dst: &String, src: &String, size: &String) {
        self.stmts.push(format!("memcpy({}, {}, (size_t)({}));", dst, src, size));
    }

    fn emit_call(&mut self, func: RuntimeFn, args: &[String]) -> Option<String> {
        let call = format!("{}({})", func.symbol(), args.join(", "));
        if func.ret().is_some() {
            Some(call)
        } else {
            self.stmts.push(format!("{};", call));
            None
        }
    }

    fn emit_binary(&mut self, op: BinOp, _ty: &ValTy, lhs: &String, rhs: &String) -> String {
        format!("(({}) {} ({}))", lhs, c_op(op), rhs)
    }

    fn emit_select(&mut self, _ty: &ValTy, cond: &String, if_true: &String, if_false: &String) -> String {
        format!("(({}) ? ({}) : ({}))", cond, if_true, if_false)
    }

    fn emit_cast(&mut self, value: &String, _from: &ValTy, to: &ValTy) -> String {
        format!("(({})({}))", to.c_name, value)
    }

    fn emit_wide_make(&mut self, _locale: &String, _addr: &String) -> CodegenResult<String> {
        Err(self.unsupported("opaque wide values"))
    }

    fn emit_wide_locale(&mut self, _wide: &String) -> CodegenResult<String> {
        Err(self.unsupported("opaque wide values"))
    }

    fn emit_wide_addr(&mut self, _wide: &String) -> CodegenResult<String> {
        Err(self.unsupported("opaque wide values"))
    }

    fn emit_location(&mut self, line: u32, file: u32) {
        self.stmts.push(format!("/* line {} file {} */", line, file));
    }

    fn emit_return(&mut self, value: Option<&String>) {
        match value {
            Some(v) => self.stmts.push(format!("return {};", v)),
            None => self.stmts.push("return;".to_string()),
        }
    }
}
