use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::op::FormatOptions;
use crate::val::{Thunk, Value};

use super::error::{ErrorKind, RuntimeError};

/// How a pending lazy value is handled when an operation needs its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceMode {
    /// Run the deferred computation synchronously (host API).
    #[default]
    Eager,
    /// Hand the thunk back to the driving loop through [`Interrupt::Suspended`].
    Cooperative,
}

/// Why an operation did not produce a value.
///
/// The details live on the [`ExecContext`]; this token only proves that the
/// context was marked before the call returned.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// A runtime error was recorded.
    Failed,
    /// A pending thunk must be forced by the driving loop first.
    Suspended,
}

pub type Outcome<T> = Result<T, Interrupt>;

/// Per-evaluation failure carrier threaded through every operation.
///
/// - `failed` flips once and stays set until [`ExecContext::reset`];
/// - `error` keeps the first recorded descriptor;
/// - `pending` holds the thunk a cooperative force is waiting on.
#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    failed: bool,
    error: Option<RuntimeError>,
    pending: Option<Thunk>,
    mode: ForceMode,
    format: FormatOptions,
}

impl ExecContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context used by the driving loop.
    pub fn cooperative() -> Self {
        Self::new().with_mode(ForceMode::Cooperative)
    }

    pub fn with_mode(mut self, mode: ForceMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_format(mut self, format: FormatOptions) -> Self {
        self.format = format;
        self
    }

    #[inline]
    pub fn mode(&self) -> ForceMode {
        self.mode
    }

    /// Switches the force mode in place and returns the previous one.
    pub(crate) fn replace_mode(&mut self, mode: ForceMode) -> ForceMode {
        std::mem::replace(&mut self.mode, mode)
    }

    #[inline]
    pub fn format(&self) -> &FormatOptions {
        &self.format
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    #[inline]
    pub fn error(&self) -> Option<&RuntimeError> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<RuntimeError> {
        self.failed = self.pending.is_some();
        self.error.take()
    }

    #[inline]
    pub fn pending(&self) -> Option<&Thunk> {
        self.pending.as_ref()
    }

    /// Takes the thunk a suspended operation waits on and clears the failure
    /// flag it raised, so the caller can run the thunk on the same context.
    pub fn take_pending(&mut self) -> Option<Thunk> {
        let thunk = self.pending.take()?;
        if self.error.is_none() {
            self.failed = false;
        }
        Some(thunk)
    }

    /// Entry check for every dispatcher: a failed context short-circuits
    /// without further side effects.
    #[inline]
    pub fn ensure_live(&self) -> Outcome<()> {
        if !self.failed {
            Ok(())
        } else if self.error.is_some() {
            Err(Interrupt::Failed)
        } else {
            Err(Interrupt::Suspended)
        }
    }

    pub fn reset(&mut self) {
        self.failed = false;
        self.error = None;
        self.pending = None;
    }

    pub(crate) fn suspend(&mut self, thunk: Thunk) -> Interrupt {
        tracing::trace!(target: "fen::rt::lazy", "suspending on pending thunk");
        self.failed = true;
        self.pending = Some(thunk);
        Interrupt::Suspended
    }

    /// Records `error` unless an earlier failure is already recorded.
    pub fn fail(&mut self, error: RuntimeError) -> Interrupt {
        tracing::debug!(
            target: "fen::rt::error",
            kind = %error.kind,
            op = %error.op,
            message = %error.message,
            "operation failed"
        );
        self.failed = true;
        if self.error.is_none() {
            self.error = Some(error);
        }
        Interrupt::Failed
    }

    pub fn invalid_operand(&mut self, op: &str, left: &Value, right: &Value) -> Interrupt {
        let message = format!("cannot apply {op} to {} and {}", left.type_name(), right.type_name());
        self.fail(RuntimeError::new(
            ErrorKind::InvalidOperand,
            op,
            &[left.type_name(), right.type_name()],
            message,
        ))
    }

    pub fn invalid_unary(&mut self, op: &str, value: &Value) -> Interrupt {
        let message = format!("cannot apply {op} to {}", value.type_name());
        self.fail(RuntimeError::new(ErrorKind::InvalidOperand, op, &[value.type_name()], message))
    }

    pub fn divide_by_zero(&mut self, op: &str, left: &Value) -> Interrupt {
        let message = format!("{op} of {} by zero", left.type_name());
        self.fail(RuntimeError::new(ErrorKind::DivideByZero, op, &[left.type_name()], message))
    }

    pub fn no_overload(&mut self, function: &str, args: &[Value]) -> Interrupt {
        let names: Vec<&str> = args.iter().map(Value::type_name).collect();
        let message = format!("no clause of {function} accepts ({})", names.join(", "));
        self.fail(RuntimeError::new(ErrorKind::NoOverload, function, &names, message))
    }

    pub fn index_out_of_range(&mut self, container: &Value, index: &Value) -> Interrupt {
        let message = format!("index {} is out of range for {}", index, container.type_name());
        self.fail(RuntimeError::new(
            ErrorKind::IndexOutOfRange,
            "GetValue",
            &[container.type_name(), index.type_name()],
            message,
        ))
    }

    pub fn invalid_index_type(&mut self, container: &Value, index: &Value) -> Interrupt {
        let message = format!("{} cannot be indexed by {}", container.type_name(), index.type_name());
        self.fail(RuntimeError::new(
            ErrorKind::InvalidIndexType,
            "GetValue",
            &[container.type_name(), index.type_name()],
            message,
        ))
    }

    pub fn conversion_failed(&mut self, value: &Value, target: &str) -> Interrupt {
        let message = format!("cannot convert {} to {target}", value.type_name());
        self.fail(RuntimeError::new(
            ErrorKind::ConversionFailed,
            "Convert",
            &[value.type_name(), target],
            message,
        ))
    }

    pub fn unable_read(&mut self, text: &str, target: &str) -> Interrupt {
        let message = format!("unable to read {text:?} as {target}");
        self.fail(RuntimeError::new(ErrorKind::UnableRead, "Read", &["String", target], message))
    }

    pub fn invalid_format(&mut self, spec: &str, value: &Value) -> Interrupt {
        let message = format!("invalid format {spec:?} for {}", value.type_name());
        self.fail(RuntimeError::new(ErrorKind::InvalidFormat, "Show", &[value.type_name()], message))
    }

    pub fn cyclic_lazy(&mut self) -> Interrupt {
        self.fail(RuntimeError::new(
            ErrorKind::CyclicLazy,
            "Force",
            &["Lazy"],
            "lazy value depends on itself",
        ))
    }

    pub fn fault(&mut self, op: &str, message: impl Into<String>) -> Interrupt {
        self.fail(RuntimeError::new(ErrorKind::Fault, op, &[], message))
    }

    /// Converts an outcome at the host boundary. Recorded runtime errors are
    /// returned as `anyhow` errors wrapping the [`RuntimeError`].
    pub fn finish<T>(&mut self, outcome: Outcome<T>) -> anyhow::Result<T> {
        match outcome {
            Ok(value) => Ok(value),
            Err(Interrupt::Failed) => match self.take_error() {
                Some(err) => Err(err.into()),
                None => Err(anyhow!("evaluation failed without a recorded error")),
            },
            Err(Interrupt::Suspended) => Err(anyhow!(
                "evaluation suspended on a pending lazy value; run it through a Machine or use an eager context"
            )),
        }
    }
}
