use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::op::{BinOp, UnaryOp};
use crate::val::{TypeTag, Value};

/// Constant operand of [`Instr::Push`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Unit,
    Int(i32),
    Long(i64),
    Single(f32),
    Double(f64),
    Bool(bool),
    Char(char),
    Str(String),
}

impl Literal {
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Unit => Value::Unit,
            Literal::Int(i) => Value::Int(*i),
            Literal::Long(i) => Value::Long(*i),
            Literal::Single(f) => Value::Single(*f),
            Literal::Double(f) => Value::Double(*f),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Char(c) => Value::Char(*c),
            Literal::Str(s) => Value::str(s),
        }
    }
}

/// Stack machine instruction. Operands are read from the top of the frame's
/// value stack, the rightmost operand on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instr {
    Push(Literal),
    /// Push local slot; locals are the captures followed by the arguments.
    Load(usize),
    /// Pop into a local slot, growing the locals as needed.
    Store(usize),
    Pop,
    Dup,
    Swap,
    Binary(BinOp),
    Unary(UnaryOp),
    /// `[container, key] -> item`
    Index,
    /// `[container, key, item] -> container'`
    SetIndex,
    Length,
    Head,
    Tail,
    IsNil,
    /// `[head, tail] -> head :: tail`, forcing neither.
    Cons,
    /// `[seq] -> empty seq of the same kind`
    Nil,
    MakeList(usize),
    MakeRecord(Vec<String>),
    MakeVariant(String),
    Tag,
    Untag,
    Show,
    Convert(TypeTag),
    /// Thunk over `chunk`, capturing the top `captures` values.
    Lazy { chunk: usize, captures: usize },
    /// Function over `chunk`, capturing the top `captures` values.
    Closure { chunk: usize, captures: usize },
    Force,
    /// `[callee, arg1 .. argN] -> result`
    Call(usize),
    Jump(usize),
    JumpIfFalse(usize),
    /// Install a handler at `target` for failures until the matching `EndTry`.
    Try(usize),
    EndTry,
    Return,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub name: String,
    #[serde(default)]
    pub arity: u16,
    pub code: Vec<Instr>,
}

impl Chunk {
    pub fn new(name: impl Into<String>, arity: u16, code: Vec<Instr>) -> Self {
        Self {
            name: name.into(),
            arity,
            code,
        }
    }
}

/// A set of chunks with a designated zero-argument entry chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub chunks: Vec<Chunk>,
    #[serde(default)]
    pub entry: usize,
}

impl Program {
    pub fn new(chunks: Vec<Chunk>, entry: usize) -> Result<Arc<Self>> {
        let program = Self { chunks, entry };
        program.validate()?;
        Ok(Arc::new(program))
    }

    #[inline]
    pub fn chunk(&self, idx: usize) -> Option<&Chunk> {
        self.chunks.get(idx)
    }

    /// Static checks: chunk references and jump targets are in range and the
    /// entry chunk takes no arguments.
    pub fn validate(&self) -> Result<()> {
        let Some(entry) = self.chunk(self.entry) else {
            bail!("entry chunk {} does not exist ({} chunks)", self.entry, self.chunks.len());
        };
        if entry.arity != 0 {
            bail!("entry chunk {} must take no arguments, takes {}", entry.name, entry.arity);
        }
        for chunk in &self.chunks {
            for (pc, instr) in chunk.code.iter().enumerate() {
                match instr {
                    Instr::Jump(target) | Instr::JumpIfFalse(target) | Instr::Try(target) => {
                        if *target > chunk.code.len() {
                            bail!("{}@{pc}: jump target {target} is out of range", chunk.name);
                        }
                    }
                    Instr::Lazy { chunk: idx, .. } | Instr::Closure { chunk: idx, .. } => {
                        if *idx >= self.chunks.len() {
                            bail!("{}@{pc}: chunk {idx} does not exist", chunk.name);
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    pub fn from_json(text: &str) -> Result<Arc<Self>> {
        let program: Program = serde_json::from_str(text).context("failed to parse program JSON")?;
        program.validate()?;
        Ok(Arc::new(program))
    }

    pub fn from_yaml(text: &str) -> Result<Arc<Self>> {
        let program: Program = serde_yaml::from_str(text).context("failed to parse program YAML")?;
        program.validate()?;
        Ok(Arc::new(program))
    }
}
