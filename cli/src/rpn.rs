//! Postfix front end used by `fen eval` and the REPL.
//!
//! Every whitespace-separated word pushes a literal or applies one machine
//! instruction to the stack; the top of the stack is the result. Strings
//! (`"..."`) and chars (`'c'`) may contain spaces and the usual escapes.

use std::sync::Arc;

use anyhow::{anyhow, bail};
use fen_core::{BinOp, Chunk, Instr, Literal, Program, TypeTag, UnaryOp};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Word(String),
    Str(String),
    Char(char),
}

pub(crate) fn tokenize(src: &str) -> anyhow::Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '"' || c == '\'' {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some(ch) if ch == c => break,
                    Some('\\') => text.push(unescape(chars.next())?),
                    Some(ch) => text.push(ch),
                    None => bail!("unterminated {} literal", if c == '"' { "string" } else { "char" }),
                }
            }
            if c == '"' {
                tokens.push(Token::Str(text));
            } else {
                let mut it = text.chars();
                match (it.next(), it.next()) {
                    (Some(ch), None) => tokens.push(Token::Char(ch)),
                    _ => bail!("char literal '{text}' must hold exactly one character"),
                }
            }
            continue;
        }
        let mut word = String::new();
        while let Some(&ch) = chars.peek() {
            if ch.is_whitespace() {
                break;
            }
            word.push(ch);
            chars.next();
        }
        tokens.push(Token::Word(word));
    }
    Ok(tokens)
}

fn unescape(c: Option<char>) -> anyhow::Result<char> {
    Ok(match c {
        Some('n') => '\n',
        Some('t') => '\t',
        Some('r') => '\r',
        Some('0') => '\0',
        Some(c @ ('\\' | '"' | '\'')) => c,
        Some(other) => bail!("unknown escape '\\{other}'"),
        None => bail!("dangling escape at end of input"),
    })
}

fn number(word: &str) -> Option<Literal> {
    let digits = word.strip_prefix('-').unwrap_or(word);
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if let Some(long) = word.strip_suffix('L') {
        return long.parse().ok().map(Literal::Long);
    }
    if let Some(single) = word.strip_suffix('f') {
        return single.parse().ok().map(Literal::Single);
    }
    if word.contains(['.', 'e', 'E']) {
        return word.parse().ok().map(Literal::Double);
    }
    // integers that do not fit an Int widen to Long
    match word.parse::<i32>() {
        Ok(i) => Some(Literal::Int(i)),
        Err(_) => word.parse().ok().map(Literal::Long),
    }
}

fn count(word: &str, arg: &str) -> anyhow::Result<usize> {
    arg.parse().map_err(|_| anyhow!("`{word}` expects a count, got '{arg}'"))
}

fn word_instr(word: &str) -> anyhow::Result<Instr> {
    if let Some(literal) = number(word) {
        return Ok(Instr::Push(literal));
    }
    if let Some(op) = BinOp::from_symbol(word) {
        return Ok(Instr::Binary(op));
    }
    if let Some(op) = UnaryOp::from_symbol(word) {
        return Ok(Instr::Unary(op));
    }
    if let Some((head, arg)) = word.split_once(':')
        && !arg.is_empty()
    {
        return Ok(match head {
            "list" => Instr::MakeList(count(word, arg)?),
            "rec" => Instr::MakeRecord(arg.split(',').map(str::to_string).collect()),
            "tag" => Instr::MakeVariant(arg.to_string()),
            "as" => Instr::Convert(TypeTag::from_name(arg).ok_or_else(|| anyhow!("unknown type '{arg}'"))?),
            _ => bail!("unknown word '{word}'"),
        });
    }
    Ok(match word {
        "true" => Instr::Push(Literal::Bool(true)),
        "false" => Instr::Push(Literal::Bool(false)),
        "()" => Instr::Push(Literal::Unit),
        "nil" => Instr::MakeList(0),
        "empty" => Instr::Nil,
        "dup" => Instr::Dup,
        "swap" => Instr::Swap,
        "pop" => Instr::Pop,
        "len" => Instr::Length,
        "head" => Instr::Head,
        "tail" => Instr::Tail,
        "isnil" => Instr::IsNil,
        "at" => Instr::Index,
        "put" => Instr::SetIndex,
        "show" => Instr::Show,
        "tagof" => Instr::Tag,
        "untag" => Instr::Untag,
        "force" => Instr::Force,
        _ => bail!("unknown word '{word}'"),
    })
}

/// Compiles a postfix expression into a one-chunk program.
pub fn compile(src: &str) -> anyhow::Result<Arc<Program>> {
    let mut code = Vec::new();
    for token in tokenize(src)? {
        code.push(match token {
            Token::Str(s) => Instr::Push(Literal::Str(s)),
            Token::Char(c) => Instr::Push(Literal::Char(c)),
            Token::Word(word) => word_instr(&word)?,
        });
    }
    if code.is_empty() {
        bail!("nothing to evaluate");
    }
    tracing::debug!(target: "fen_cli::rpn", instructions = code.len(), "compiled expression");
    code.push(Instr::Return);
    Program::new(vec![Chunk::new("main", 0, code)], 0)
}
