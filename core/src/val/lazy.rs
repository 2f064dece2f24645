use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

use crate::rt::{ExecContext, ForceMode, Outcome};

use super::{Function, Value};

type NativeThunk = Arc<dyn Fn(&mut ExecContext) -> Outcome<Value> + Send + Sync>;

/// The computation a pending thunk will run.
#[derive(Clone)]
pub enum Deferred {
    /// Host closure; runs synchronously wherever it is forced.
    Native(NativeThunk),
    /// Zero-argument function value; the driving loop runs code bodies on its
    /// own frame stack.
    Call(Arc<Function>),
}

impl Deferred {
    pub(crate) fn run(&self, ctx: &mut ExecContext) -> Outcome<Value> {
        match self {
            Deferred::Native(f) => {
                // a host closure cannot be resumed midway, so it runs to
                // completion; suspending it would rerun it on retry
                let previous = ctx.replace_mode(ForceMode::Eager);
                let out = f(ctx);
                ctx.replace_mode(previous);
                out
            }
            Deferred::Call(function) => function.apply(&[], ctx),
        }
    }
}

enum State {
    Waiting(Deferred),
    Running(Deferred),
    Done,
}

struct LazyCell {
    state: Mutex<State>,
    value: OnceCell<Value>,
}

/// A deferred computation with once-only memoization.
///
/// Pending → Forced is one-way. The memo is a `OnceCell`, so a value, once
/// published, is never replaced and every force returns the same instance.
#[derive(Clone)]
pub struct Thunk(Arc<LazyCell>);

/// Result of starting a force.
pub enum Begin {
    Ready(Value),
    Run(Deferred),
}

/// Trampoline step: either the value, or the thunk the caller must run first.
pub enum Poll {
    Ready(Value),
    Suspend(Thunk),
}

impl Thunk {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut ExecContext) -> Outcome<Value> + Send + Sync + 'static,
    {
        Self::deferred(Deferred::Native(Arc::new(f)))
    }

    pub fn from_function(function: Arc<Function>) -> Self {
        Self::deferred(Deferred::Call(function))
    }

    pub fn deferred(deferred: Deferred) -> Self {
        Self(Arc::new(LazyCell {
            state: Mutex::new(State::Waiting(deferred)),
            value: OnceCell::new(),
        }))
    }

    /// An already forced thunk.
    pub fn ready(value: Value) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(value);
        Self(Arc::new(LazyCell {
            state: Mutex::new(State::Done),
            value: cell,
        }))
    }

    #[inline]
    pub fn value(&self) -> Option<&Value> {
        self.0.value.get()
    }

    #[inline]
    pub fn is_forced(&self) -> bool {
        self.0.value.get().is_some()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Thunk) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Non-evaluating check used by trampolines.
    pub fn poll(&self) -> Poll {
        match self.value() {
            Some(value) => Poll::Ready(value.clone()),
            None => Poll::Suspend(self.clone()),
        }
    }

    /// Forces according to the context's [`ForceMode`]. In cooperative mode a
    /// pending thunk is not run here: the context records it and the call
    /// returns [`crate::rt::Interrupt::Suspended`].
    pub fn force(&self, ctx: &mut ExecContext) -> Outcome<Value> {
        if let Some(value) = self.value() {
            return Ok(value.clone());
        }
        match ctx.mode() {
            ForceMode::Eager => self.force_now(ctx),
            ForceMode::Cooperative => Err(ctx.suspend(self.clone())),
        }
    }

    /// Runs the deferred computation synchronously. A result that is itself a
    /// pending thunk is followed iteratively and every thunk of the chain is
    /// memoized with the final value.
    pub fn force_now(&self, ctx: &mut ExecContext) -> Outcome<Value> {
        let mut chain: Vec<Thunk> = Vec::new();
        let mut current = self.clone();
        loop {
            let deferred = match current.begin(ctx) {
                Ok(Begin::Ready(value)) => return Ok(Self::complete_chain(&chain, value)),
                Ok(Begin::Run(deferred)) => deferred,
                Err(interrupt) => {
                    Self::abort_chain(&chain);
                    return Err(interrupt);
                }
            };
            let result = deferred.run(ctx);
            chain.push(current);
            match result {
                Ok(Value::Lazy(next)) => current = next,
                Ok(value) => return Ok(Self::complete_chain(&chain, value)),
                Err(interrupt) => {
                    Self::abort_chain(&chain);
                    return Err(interrupt);
                }
            }
        }
    }

    /// Claims the deferred computation. A thunk already being evaluated is a
    /// self-dependency and fails with `CyclicLazy`.
    pub fn begin(&self, ctx: &mut ExecContext) -> Outcome<Begin> {
        if let Some(value) = self.value() {
            return Ok(Begin::Ready(value.clone()));
        }
        let mut state = match self.0.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match std::mem::replace(&mut *state, State::Done) {
            State::Waiting(deferred) => {
                *state = State::Running(deferred.clone());
                Ok(Begin::Run(deferred))
            }
            State::Running(deferred) => {
                *state = State::Running(deferred);
                drop(state);
                Err(ctx.cyclic_lazy())
            }
            State::Done => {
                drop(state);
                match self.value() {
                    Some(value) => Ok(Begin::Ready(value.clone())),
                    None => Err(ctx.cyclic_lazy()),
                }
            }
        }
    }

    /// Publishes the result of a claimed computation and drops the deferred
    /// code. Returns the stored value, which is the first one ever published.
    pub fn complete(&self, value: Value) -> Value {
        let _ = self.0.value.set(value);
        if let Ok(mut state) = self.0.state.lock() {
            *state = State::Done;
        }
        self.0.value.get().cloned().unwrap_or_default()
    }

    /// Returns a claimed thunk to the pending state after a failed or
    /// suspended evaluation, so a later force runs it again.
    pub fn abort(&self) {
        if self.is_forced() {
            return;
        }
        if let Ok(mut state) = self.0.state.lock()
            && let State::Running(deferred) = &*state
        {
            let deferred = deferred.clone();
            *state = State::Waiting(deferred);
        }
    }

    pub(crate) fn complete_chain(chain: &[Thunk], value: Value) -> Value {
        let mut out = value;
        for thunk in chain.iter().rev() {
            out = thunk.complete(out);
        }
        out
    }

    pub(crate) fn abort_chain(chain: &[Thunk]) {
        for thunk in chain {
            thunk.abort();
        }
    }

    /// Memoized value when this is the only handle left, used to unlink long
    /// chains without recursion.
    pub(crate) fn into_unique_value(self) -> Option<Value> {
        Arc::try_unwrap(self.0).ok().and_then(|cell| cell.value.into_inner())
    }
}

impl std::fmt::Debug for Thunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.value() {
            Some(value) => f.debug_tuple("Thunk").field(value).finish(),
            None => f.write_str("Thunk(<pending>)"),
        }
    }
}
