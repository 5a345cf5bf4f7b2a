// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Scenario files: a type environment plus one function of memory accesses,
//! written as JSON.
//!
//! Types are named with a small prefix syntax: `int64`, `R`, `ref T`,
//! `wide ref T`, `wide C`, `buffer T` and `T[n]` for tuples. Places use
//! `x`, `x.f`, `x[i]` and `*x`.

use anyhow::{anyhow, bail, Context, Result};
use locus_addr::{AccessStmt, CodegenConfig, FunctionSig, PlaceExpr, ValueExpr, VarDecl};
use locus_lir::BinOp;
use locus_types::{Locality, TypeId, TypeTable};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    pub function: FunctionDef,
    /// Configuration used when none is given on the command line.
    #[serde(default)]
    pub config: Option<CodegenConfig>,
    #[serde(default)]
    pub run: RunDef,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
pub enum TypeDecl {
    Record {
        name: String,
        fields: Vec<VarDef>,
    },
    Union {
        name: String,
        fields: Vec<VarDef>,
    },
    Class {
        name: String,
        #[serde(default)]
        parent: Option<String>,
        #[serde(default)]
        fields: Vec<VarDef>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VarDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionDef {
    pub name: String,
    #[serde(default)]
    pub params: Vec<VarDef>,
    #[serde(default)]
    pub locals: Vec<VarDef>,
    #[serde(default)]
    pub ret: Option<String>,
    pub body: Vec<StmtDef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum StmtDef {
    Assign { dst: String, src: ValueDef },
    OpAssign { dst: String, op: OpDef, src: ValueDef },
    UnorderedAssign { dst: String, src: ValueDef },
    Fence,
    Prefetch(String),
    CheckNil(String),
    Location { line: u32, file: u32 },
    Return(Option<ValueDef>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ValueDef {
    Int(i64),
    /// A place, or `nil`.
    Expr(String),
    Binary { op: OpDef, lhs: Box<ValueDef>, rhs: Box<ValueDef> },
    Cast { dynamic_cast: Box<ValueDef>, to: String },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpDef {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl From<OpDef> for BinOp {
    fn from(op: OpDef) -> Self {
        match op {
            OpDef::Add => BinOp::Add,
            OpDef::Sub => BinOp::Sub,
            OpDef::Mul => BinOp::Mul,
            OpDef::And => BinOp::And,
            OpDef::Or => BinOp::Or,
            OpDef::Xor => BinOp::Xor,
            OpDef::Eq => BinOp::Eq,
            OpDef::Ne => BinOp::Ne,
            OpDef::Lt => BinOp::Lt,
            OpDef::Le => BinOp::Le,
            OpDef::Gt => BinOp::Gt,
            OpDef::Ge => BinOp::Ge,
        }
    }
}

/// Machine setup for `locus run`.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunDef {
    pub locales: u32,
    pub here: i64,
    /// One integer per lowered parameter; wide parameters take two.
    pub args: Vec<i64>,
    pub memory: Vec<MemInit>,
}

impl Default for RunDef {
    fn default() -> Self {
        RunDef { locales: 1, here: 0, args: Vec::new(), memory: Vec::new() }
    }
}

/// One 64-bit word written before the run.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemInit {
    pub locale: i64,
    pub addr: u64,
    pub value: i64,
}

/// A scenario resolved against its type environment.
#[derive(Debug)]
pub struct Program {
    pub types: TypeTable,
    pub sig: FunctionSig,
    pub body: Vec<AccessStmt>,
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("malformed scenario")
    }

    pub fn program(&self) -> Result<Program> {
        let mut types = TypeTable::new();
        for decl in &self.types {
            declare_type(&mut types, decl)?;
        }
        let f = &self.function;
        let vars = |types: &mut TypeTable, defs: &[VarDef]| -> Result<Vec<VarDecl>> {
            defs
                .iter()
                .map(|v| Ok(VarDecl { name: v.name.clone(), ty: resolve_type(types, &v.ty)? }))
                .collect()
        };
        let params = vars(&mut types, &f.params)?;
        let locals = vars(&mut types, &f.locals)?;
        let ret = f.ret.as_deref().map(|t| resolve_type(&mut types, t)).transpose()?;
        let body = f
            .body
            .iter()
            .map(|s| stmt(&mut types, s))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("in function `{}`", f.name))?;
        let sig = FunctionSig { name: f.name.clone(), params, locals, ret };
        Ok(Program { types, sig, body })
    }
}

fn declare_type(types: &mut TypeTable, decl: &TypeDecl) -> Result<TypeId> {
    let id = match decl {
        TypeDecl::Record { name, fields } => {
            let fields = field_list(types, fields)?;
            types.add_record(name, &borrowed(&fields))?
        }
        TypeDecl::Union { name, fields } => {
            let fields = field_list(types, fields)?;
            types.add_union(name, &borrowed(&fields))?
        }
        TypeDecl::Class { name, parent, fields } => {
            let parent = parent.as_deref().map(|p| resolve_type(types, p)).transpose()?;
            let fields = field_list(types, fields)?;
            types.add_class(name, parent, &borrowed(&fields))?
        }
    };
    Ok(id)
}

fn field_list(types: &mut TypeTable, defs: &[VarDef]) -> Result<Vec<(String, TypeId)>> {
    defs.iter().map(|f| Ok((f.name.clone(), resolve_type(types, &f.ty)?))).collect()
}

fn borrowed(fields: &[(String, TypeId)]) -> Vec<(&str, TypeId)> {
    fields.iter().map(|(n, t)| (n.as_str(), *t)).collect()
}

pub fn resolve_type(types: &mut TypeTable, text: &str) -> Result<TypeId> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("wide ref ") {
        let pointee = resolve_type(types, rest)?;
        return Ok(types.ref_to(pointee, Locality::Wide));
    }
    if let Some(rest) = text.strip_prefix("ref ") {
        let pointee = resolve_type(types, rest)?;
        return Ok(types.ref_to(pointee, Locality::Local));
    }
    if let Some(rest) = text.strip_prefix("wide ") {
        let narrow = resolve_type(types, rest)?;
        return Ok(types.wide_of(narrow)?);
    }
    if let Some(rest) = text.strip_prefix("buffer ") {
        let elem = resolve_type(types, rest)?;
        return Ok(types.buffer_of(elem));
    }
    if let Some(inner) = text.strip_suffix(']') {
        let open = inner.rfind('[').ok_or_else(|| anyhow!("unbalanced `]` in type `{text}`"))?;
        let len: u32 = inner[open + 1..].trim().parse().with_context(|| format!("bad tuple length in `{text}`"))?;
        let elem = resolve_type(types, &inner[..open])?;
        return Ok(types.tuple_of(elem, len)?);
    }
    types.lookup(text).ok_or_else(|| anyhow!("unknown type `{text}`"))
}

fn stmt(types: &mut TypeTable, def: &StmtDef) -> Result<AccessStmt> {
    Ok(match def {
        StmtDef::Assign { dst, src } => AccessStmt::Assign { dst: parse_place(dst)?, src: value(types, src)? },
        StmtDef::OpAssign { dst, op, src } => {
            AccessStmt::OpAssign { dst: parse_place(dst)?, op: (*op).into(), src: value(types, src)? }
        }
        StmtDef::UnorderedAssign { dst, src } => {
            AccessStmt::UnorderedAssign { dst: parse_place(dst)?, src: value(types, src)? }
        }
        StmtDef::Fence => AccessStmt::Fence,
        StmtDef::Prefetch(place) => AccessStmt::Prefetch(parse_place(place)?),
        StmtDef::CheckNil(place) => AccessStmt::CheckNil(parse_place(place)?),
        StmtDef::Location { line, file } => AccessStmt::Location { line: *line, file: *file },
        StmtDef::Return(v) => AccessStmt::Return(v.as_ref().map(|v| value(types, v)).transpose()?),
    })
}

fn value(types: &mut TypeTable, def: &ValueDef) -> Result<ValueExpr> {
    Ok(match def {
        ValueDef::Int(v) => ValueExpr::Int(*v),
        ValueDef::Expr(text) => parse_value(text)?,
        ValueDef::Binary { op, lhs, rhs } => {
            ValueExpr::Binary((*op).into(), Box::new(value(types, lhs)?), Box::new(value(types, rhs)?))
        }
        ValueDef::Cast { dynamic_cast, to } => {
            let target = resolve_type(types, to)?;
            ValueExpr::DynamicCast(Box::new(value(types, dynamic_cast)?), target)
        }
    })
}

/// An integer literal, `nil`, or a place.
pub fn parse_value(text: &str) -> Result<ValueExpr> {
    let text = text.trim();
    if text == "nil" {
        return Ok(ValueExpr::Nil);
    }
    if let Ok(v) = text.parse::<i64>() {
        return Ok(ValueExpr::Int(v));
    }
    Ok(ValueExpr::Place(parse_place(text)?))
}

pub fn parse_place(text: &str) -> Result<PlaceExpr> {
    let mut parser = PlaceParser { text, pos: 0 };
    let place = parser.place()?;
    parser.skip_ws();
    if parser.pos != text.len() {
        bail!("unexpected `{}` in place `{text}`", &text[parser.pos..]);
    }
    Ok(place)
}

struct PlaceParser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> PlaceParser<'a> {
    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.text.len() - trimmed.len();
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<String> {
        self.skip_ws();
        let len = self
            .rest()
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(self.rest().len());
        if len == 0 {
            bail!("expected a name at `{}` in `{}`", self.rest(), self.text);
        }
        let name = self.rest()[..len].to_string();
        self.pos += len;
        Ok(name)
    }

    /// `*` binds looser than `.` and `[]`.
    fn place(&mut self) -> Result<PlaceExpr> {
        if self.eat('*') {
            return Ok(PlaceExpr::Deref(Box::new(self.place()?)));
        }
        let mut place = PlaceExpr::Var(self.ident()?);
        loop {
            if self.eat('.') {
                place = PlaceExpr::Field(Box::new(place), self.ident()?);
            } else if self.eat('[') {
                let index = self.bracketed()?;
                place = PlaceExpr::Index(Box::new(place), Box::new(parse_value(index)?));
            } else {
                return Ok(place);
            }
        }
    }

    /// Text up to the matching `]`, which is consumed.
    fn bracketed(&mut self) -> Result<&'a str> {
        let start = self.pos;
        let mut depth = 1;
        for (i, c) in self.rest().char_indices() {
            match c {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos = start + i + 1;
                        return Ok(&self.text[start..start + i]);
                    }
                }
                _ => {}
            }
        }
        bail!("unclosed `[` in `{}`", self.text)
    }
}
