use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    Succ,
    Pred,
}

impl UnaryOp {
    /// Operation name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "Negate",
            UnaryOp::Not => "Not",
            UnaryOp::BitNot => "BitwiseNot",
            UnaryOp::Succ => "Successor",
            UnaryOp::Pred => "Predecessor",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "neg" => UnaryOp::Neg,
            "not" => UnaryOp::Not,
            "~~~" => UnaryOp::BitNot,
            "succ" => UnaryOp::Succ,
            "pred" => UnaryOp::Pred,
            _ => return None,
        })
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "neg"),
            UnaryOp::Not => write!(f, "not"),
            UnaryOp::BitNot => write!(f, "~~~"),
            UnaryOp::Succ => write!(f, "succ"),
            UnaryOp::Pred => write!(f, "pred"),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    /// Truncated remainder
    Rem,
    /// Floored modulus
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Concat,
    Cons,
}

impl BinOp {
    pub(crate) fn is_arith(&self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem | BinOp::Mod | BinOp::Pow
        )
    }

    pub(crate) fn is_bitwise(&self) -> bool {
        matches!(
            self,
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr
        )
    }

    pub(crate) fn is_cmp(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Gt | BinOp::Lt | BinOp::Ge | BinOp::Le
        )
    }

    /// Operation name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            BinOp::Add => "Add",
            BinOp::Sub => "Subtract",
            BinOp::Mul => "Multiply",
            BinOp::Div => "Divide",
            BinOp::Rem => "Remainder",
            BinOp::Mod => "Modulus",
            BinOp::Pow => "Power",
            BinOp::BitAnd => "BitwiseAnd",
            BinOp::BitOr => "BitwiseOr",
            BinOp::BitXor => "BitwiseXor",
            BinOp::Shl => "ShiftLeft",
            BinOp::Shr => "ShiftRight",
            BinOp::Eq => "Equal",
            BinOp::Ne => "NotEqual",
            BinOp::Gt => "Greater",
            BinOp::Lt => "Lesser",
            BinOp::Ge => "GreaterEqual",
            BinOp::Le => "LesserEqual",
            BinOp::Concat => "Concatenate",
            BinOp::Cons => "Cons",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            "rem" => BinOp::Rem,
            "%" => BinOp::Mod,
            "**" => BinOp::Pow,
            "&&&" => BinOp::BitAnd,
            "|||" => BinOp::BitOr,
            "^^^" => BinOp::BitXor,
            "<<<" => BinOp::Shl,
            ">>>" => BinOp::Shr,
            "==" => BinOp::Eq,
            "<>" => BinOp::Ne,
            ">" => BinOp::Gt,
            "<" => BinOp::Lt,
            ">=" => BinOp::Ge,
            "<=" => BinOp::Le,
            "++" => BinOp::Concat,
            "::" => BinOp::Cons,
            _ => return None,
        })
    }
}

impl Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
            BinOp::Rem => write!(f, "rem"),
            BinOp::Mod => write!(f, "%"),
            BinOp::Pow => write!(f, "**"),
            BinOp::BitAnd => write!(f, "&&&"),
            BinOp::BitOr => write!(f, "|||"),
            BinOp::BitXor => write!(f, "^^^"),
            BinOp::Shl => write!(f, "<<<"),
            BinOp::Shr => write!(f, ">>>"),
            BinOp::Eq => write!(f, "=="),
            BinOp::Ne => write!(f, "<>"),
            BinOp::Gt => write!(f, ">"),
            BinOp::Lt => write!(f, "<"),
            BinOp::Ge => write!(f, ">="),
            BinOp::Le => write!(f, "<="),
            BinOp::Concat => write!(f, "++"),
            BinOp::Cons => write!(f, "::"),
        }
    }
}
