// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Display implementations for LIR types.

use std::fmt;

use crate::*;

impl fmt::Display for LirType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LirType::I8 => "i8",
            LirType::I16 => "i16",
            LirType::I32 => "i32",
            LirType::I64 => "i64",
            LirType::F32 => "f32",
            LirType::F64 => "f64",
            LirType::Ptr => "ptr",
            LirType::WidePtr => "wideptr",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(id) => write!(f, "{}", id),
            Operand::Const(c) => write!(f, "{}", c),
        }
    }
}

impl fmt::Display for LirConst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LirConst::Int { value, ty } => write!(f, "{} {}", ty, value),
            LirConst::Float { value, ty } => write!(f, "{} {}", ty, value),
            LirConst::Null => write!(f, "null"),
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sym = match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::Eq => "eq",
            BinOp::Ne => "ne",
            BinOp::Lt => "lt",
            BinOp::Le => "le",
            BinOp::Gt => "gt",
            BinOp::Ge => "ge",
        };
        f.write_str(sym)
    }
}

fn write_attrs(f: &mut fmt::Formatter<'_>, attrs: &MemAttrs) -> fmt::Result {
    if let Some(scope) = attrs.alias_scope {
        write!(f, " !scope {}", scope)?;
    }
    if attrs.outside_independent_loop {
        write!(f, " !no_access_group")?;
    }
    Ok(())
}

fn write_inst(f: &mut fmt::Formatter<'_>, func: &LirFunction, inst: &LirInst) -> fmt::Result {
    let ty = |id: &ValueId| func.value_type(*id);
    match inst {
        LirInst::Alloca { dst, size, align, name } => {
            write!(f, "{} = alloca {}, align {}", dst, size, align)?;
            if let Some(name) = name {
                write!(f, " ; {}", name)?;
            }
            Ok(())
        }
        LirInst::Load { dst, addr, attrs } => {
            write!(f, "{} = load {}, {}", dst, ty(dst), addr)?;
            write_attrs(f, attrs)
        }
        LirInst::Store { addr, value, attrs } => {
            write!(f, "store {}, {}", value, addr)?;
            write_attrs(f, attrs)
        }
        LirInst::Gep { dst, base, offset, index } => {
            write!(f, "{} = gep {}, {}", dst, base, offset)?;
            if let Some((idx, scale)) = index {
                write!(f, ", {} x {}", idx, scale)?;
            }
            Ok(())
        }
        LirInst::Memcpy { dst, src, size } => write!(f, "memcpy {}, {}, {}", dst, src, size),
        LirInst::Call { dst, func: callee, args } => {
            if let Some(dst) = dst {
                write!(f, "{} = ", dst)?;
            }
            write!(f, "call {}(", callee)?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ")")
        }
        LirInst::Binary { dst, op, lhs, rhs } => write!(f, "{} = {} {}, {}", dst, op, lhs, rhs),
        LirInst::Cast { dst, value, signed } => {
            let kind = if *signed { "scast" } else { "ucast" };
            write!(f, "{} = {} {} to {}", dst, kind, value, ty(dst))
        }
        LirInst::Select { dst, cond, if_true, if_false } => {
            write!(f, "{} = select {}, {}, {}", dst, cond, if_true, if_false)
        }
        LirInst::WideMake { dst, locale, addr } => write!(f, "{} = wide.make {}, {}", dst, locale, addr),
        LirInst::WideLocale { dst, wide } => write!(f, "{} = wide.locale {}", dst, wide),
        LirInst::WideAddr { dst, wide } => write!(f, "{} = wide.addr {}", dst, wide),
        LirInst::Loc { line, file } => write!(f, "; line {} file {}", line, file),
        LirInst::Return { value: Some(v) } => write!(f, "ret {}", v),
        LirInst::Return { value: None } => write!(f, "ret"),
    }
}

impl fmt::Display for LirFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func {}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {} {}", p.name, p.ty, p.id)?;
        }
        write!(f, ")")?;
        if let Some(ret) = self.ret_ty {
            write!(f, " -> {}", ret)?;
        }
        writeln!(f, " {{")?;
        for inst in &self.body {
            write!(f, "    ")?;
            write_inst(f, self, inst)?;
            writeln!(f)?;
        }
        writeln!(f, "}}")
    }
}
