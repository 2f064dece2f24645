use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Classification of user-domain runtime failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Operator not supported between the given dynamic types.
    InvalidOperand,
    DivideByZero,
    /// No clause of an overloaded function accepts the argument types.
    NoOverload,
    IndexOutOfRange,
    InvalidIndexType,
    ConversionFailed,
    /// Text could not be read as a value of the requested type.
    UnableRead,
    InvalidFormat,
    /// A lazy value was forced while its own evaluation was in progress.
    CyclicLazy,
    /// The driving loop gave up on a nested call (malformed code or cancellation).
    Fault,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::InvalidOperand => "InvalidOperand",
            ErrorKind::DivideByZero => "DivideByZero",
            ErrorKind::NoOverload => "NoOverload",
            ErrorKind::IndexOutOfRange => "IndexOutOfRange",
            ErrorKind::InvalidIndexType => "InvalidIndexType",
            ErrorKind::ConversionFailed => "ConversionFailed",
            ErrorKind::UnableRead => "UnableRead",
            ErrorKind::InvalidFormat => "InvalidFormat",
            ErrorKind::CyclicLazy => "CyclicLazy",
            ErrorKind::Fault => "Fault",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Structured descriptor recorded on the execution context when an
/// operation fails. Always names the operation and the operand types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub op: Arc<str>,
    pub operands: Vec<Arc<str>>,
    pub message: String,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, op: &str, operands: &[&str], message: impl Into<String>) -> Self {
        Self {
            kind,
            op: Arc::from(op),
            operands: operands.iter().map(|name| Arc::from(*name)).collect(),
            message: message.into(),
        }
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (op {}", self.kind, self.message, self.op)?;
        if !self.operands.is_empty() {
            write!(f, "; operands: ")?;
            for (idx, name) in self.operands.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{name}")?;
            }
        }
        write!(f, ")")
    }
}

impl std::error::Error for RuntimeError {}
