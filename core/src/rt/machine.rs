//! The driving loop.
//!
//! Code runs on an explicit frame stack. Lazy values met by an instruction are
//! not forced on the host stack: with a cooperative context the dispatcher
//! suspends, the loop pushes the thunk body as a frame of its own and retries
//! the instruction once the thunk is memoized. An instruction's operands stay
//! on the value stack until its dispatcher succeeds, which makes the retry a
//! plain re-execution.

use std::sync::Arc;

use anyhow::{Error, anyhow};

use crate::op::FormatOptions;
use crate::val::{Application, Begin, Deferred, Function, Thunk, Value};

use super::context::{ExecContext, Interrupt, Outcome};
use super::error::ErrorKind;
use super::program::{Instr, Program};

/// Why the loop stopped executing instructions.
enum Stop {
    Interrupt(Interrupt),
    /// Malformed code or cancellation; never caught by `Try`.
    Abort(Error),
}

impl From<Interrupt> for Stop {
    fn from(interrupt: Interrupt) -> Self {
        Stop::Interrupt(interrupt)
    }
}

enum Flow {
    Next,
    /// The frame's pc is already where it must be.
    Stay,
    Jump(usize),
    Return(Value),
}

enum Exit {
    Done(Value),
    Failed,
    Abort(Error),
}

enum FrameKind {
    /// Bottom frame of a `run`/`invoke`.
    Entry,
    /// Code call; the result is applied to `rest` when it is not empty.
    Call { rest: Vec<Value> },
    /// Thunk body; the result is memoized in every thunk of `chain`.
    Thunk { chain: Vec<Thunk> },
}

struct Handler {
    target: usize,
    depth: usize,
}

struct Frame {
    program: Arc<Program>,
    chunk: usize,
    pc: usize,
    locals: Vec<Value>,
    stack: Vec<Value>,
    handlers: Vec<Handler>,
    kind: FrameKind,
    /// A call of this many arguments still has to be applied to the top of
    /// the stack before the next instruction.
    pending_call: Option<usize>,
}

impl Frame {
    fn peek(&self, n: usize) -> Result<&[Value], Stop> {
        match self.stack.len().checked_sub(n) {
            Some(base) => Ok(&self.stack[base..]),
            None => Err(Stop::Abort(anyhow!(
                "stack underflow in chunk {} at {}: need {n}, have {}",
                self.chunk,
                self.pc,
                self.stack.len()
            ))),
        }
    }

    fn top(&self) -> Result<&Value, Stop> {
        Ok(&self.peek(1)?[0])
    }

    /// Drops the `n` consumed operands and pushes the result.
    fn replace(&mut self, n: usize, value: Value) {
        let len = self.stack.len().saturating_sub(n);
        self.stack.truncate(len);
        self.stack.push(value);
    }
}

pub struct Machine {
    frames: Vec<Frame>,
    steps: u64,
    step_limit: Option<u64>,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            steps: 0,
            step_limit: None,
        }
    }

    /// Aborts the run after `limit` instructions.
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Runs the entry chunk of `program`. Unhandled runtime errors and
    /// cancellation come back as `anyhow` errors; the former wrap the
    /// recorded [`super::RuntimeError`].
    pub fn run(&mut self, program: &Arc<Program>, ctx: &mut ExecContext) -> anyhow::Result<Value> {
        self.push_frame(program.clone(), program.entry, Vec::new(), FrameKind::Entry)
            .map_err(|_| anyhow!("entry chunk {} does not exist", program.entry))?;
        match self.execute(ctx) {
            Exit::Done(value) => Ok(value),
            Exit::Failed => ctx.finish(Err(Interrupt::Failed)),
            Exit::Abort(err) => Err(err),
        }
    }

    /// Runs one chunk with the given locals to completion. Used when a code
    /// function is applied outside the loop; aborts surface as `Fault`.
    pub fn invoke(
        &mut self,
        program: &Arc<Program>,
        chunk: usize,
        locals: Vec<Value>,
        ctx: &mut ExecContext,
    ) -> Outcome<Value> {
        ctx.ensure_live()?;
        if self.push_frame(program.clone(), chunk, locals, FrameKind::Entry).is_err() {
            return Err(ctx.fault("Call", format!("chunk {chunk} does not exist")));
        }
        match self.execute(ctx) {
            Exit::Done(value) => Ok(value),
            Exit::Failed => Err(Interrupt::Failed),
            Exit::Abort(err) => Err(ctx.fault("Call", err.to_string())),
        }
    }

    fn push_frame(
        &mut self,
        program: Arc<Program>,
        chunk: usize,
        locals: Vec<Value>,
        kind: FrameKind,
    ) -> Result<(), Stop> {
        let Some(target) = program.chunk(chunk) else {
            return Err(Stop::Abort(anyhow!("chunk {chunk} does not exist")));
        };
        tracing::trace!(target: "fen::machine", chunk = %target.name, depth = self.frames.len() + 1, "enter frame");
        self.frames.push(Frame {
            program,
            chunk,
            pc: 0,
            locals,
            stack: Vec::new(),
            handlers: Vec::new(),
            kind,
            pending_call: None,
        });
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ExecContext) -> Exit {
        loop {
            if let Some(limit) = self.step_limit
                && self.steps >= limit
            {
                self.abandon();
                return Exit::Abort(anyhow!("step limit of {limit} instructions exceeded"));
            }
            self.steps += 1;

            let Some(depth) = self.frames.len().checked_sub(1) else {
                return Exit::Abort(anyhow!("no frame to execute"));
            };

            let result = match self.frames[depth].pending_call.take() {
                Some(argc) => match self.call(argc, ctx) {
                    Ok(()) => Ok(Flow::Stay),
                    Err(stop) => {
                        self.frames[depth].pending_call = Some(argc);
                        Err(stop)
                    }
                },
                None => {
                    let frame = &self.frames[depth];
                    let program = frame.program.clone();
                    match program.chunk(frame.chunk).and_then(|chunk| chunk.code.get(frame.pc)) {
                        Some(instr) => self.step(instr, ctx),
                        // running off the end returns the top of the stack
                        None => Ok(Flow::Return(frame.stack.last().cloned().unwrap_or_default())),
                    }
                }
            };

            let stop = match result {
                Ok(Flow::Next) => {
                    self.frames[depth].pc += 1;
                    continue;
                }
                Ok(Flow::Stay) => continue,
                Ok(Flow::Jump(target)) => {
                    self.frames[depth].pc = target;
                    continue;
                }
                Ok(Flow::Return(value)) => match self.leave(value, ctx) {
                    Ok(Some(value)) => return Exit::Done(value),
                    Ok(None) => continue,
                    Err(stop) => stop,
                },
                Err(stop) => stop,
            };

            let stop = match stop {
                Stop::Interrupt(Interrupt::Suspended) => match self.resume(ctx) {
                    Ok(()) => continue,
                    Err(stop) => stop,
                },
                other => other,
            };

            match stop {
                Stop::Interrupt(_) => {
                    if !self.unwind(ctx) {
                        return Exit::Failed;
                    }
                }
                Stop::Abort(err) => {
                    self.abandon();
                    return Exit::Abort(err);
                }
            }
        }
    }

    fn step(&mut self, instr: &Instr, ctx: &mut ExecContext) -> Result<Flow, Stop> {
        let Some(frame) = self.frames.last_mut() else {
            return Err(Stop::Abort(anyhow!("no frame to execute")));
        };
        match instr {
            Instr::Push(literal) => frame.stack.push(literal.to_value()),
            Instr::Load(slot) => match frame.locals.get(*slot) {
                Some(value) => {
                    let value = value.clone();
                    frame.stack.push(value);
                }
                None => return Err(Stop::Abort(anyhow!("local slot {slot} is not defined"))),
            },
            Instr::Store(slot) => {
                let value = frame.top()?.clone();
                frame.stack.pop();
                if frame.locals.len() <= *slot {
                    frame.locals.resize(*slot + 1, Value::Unit);
                }
                frame.locals[*slot] = value;
            }
            Instr::Pop => {
                frame.peek(1)?;
                frame.stack.pop();
            }
            Instr::Dup => {
                let value = frame.top()?.clone();
                frame.stack.push(value);
            }
            Instr::Swap => {
                frame.peek(2)?;
                let len = frame.stack.len();
                frame.stack.swap(len - 1, len - 2);
            }
            Instr::Binary(op) => {
                let args = frame.peek(2)?;
                let out = args[0].binary(*op, &args[1], ctx)?;
                frame.replace(2, out);
            }
            Instr::Unary(op) => {
                let out = frame.top()?.unary(*op, ctx)?;
                frame.replace(1, out);
            }
            Instr::Index => {
                let args = frame.peek(2)?;
                let out = args[0].get_value(&args[1], ctx)?;
                frame.replace(2, out);
            }
            Instr::SetIndex => {
                let args = frame.peek(3)?;
                let out = args[0].set_value(&args[1], args[2].clone(), ctx)?;
                frame.replace(3, out);
            }
            Instr::Length => {
                let out = frame.top()?.length(ctx)?;
                frame.replace(1, out);
            }
            Instr::Head => {
                let out = frame.top()?.head(ctx)?;
                frame.replace(1, out);
            }
            Instr::Tail => {
                let out = frame.top()?.tail(ctx)?;
                frame.replace(1, out);
            }
            Instr::IsNil => {
                let out = frame.top()?.is_nil(ctx)?;
                frame.replace(1, Value::Bool(out));
            }
            Instr::Cons => {
                let args = frame.peek(2)?;
                let out = args[0].cons(&args[1], ctx)?;
                frame.replace(2, out);
            }
            Instr::Nil => {
                let out = frame.top()?.nil_of(ctx)?;
                frame.replace(1, out);
            }
            Instr::MakeList(n) => {
                let items = frame.peek(*n)?.to_vec();
                frame.replace(*n, Value::list(items));
            }
            Instr::MakeRecord(names) => {
                let n = names.len();
                let fields: Vec<(&str, Value)> = names
                    .iter()
                    .map(String::as_str)
                    .zip(frame.peek(n)?.iter().cloned())
                    .collect();
                let record = Value::record(fields);
                frame.replace(n, record);
            }
            Instr::MakeVariant(tag) => {
                let out = Value::variant(tag, frame.top()?.clone());
                frame.replace(1, out);
            }
            Instr::Tag => {
                let out = frame.top()?.get_tag(ctx)?;
                frame.replace(1, out);
            }
            Instr::Untag => {
                let out = frame.top()?.untag(ctx)?;
                frame.replace(1, out);
            }
            Instr::Show => {
                let opts: FormatOptions = ctx.format().clone();
                let text = frame.top()?.show(&opts, ctx)?;
                frame.replace(1, Value::str(text));
            }
            Instr::Convert(tag) => {
                let out = frame.top()?.convert(*tag, ctx)?;
                frame.replace(1, out);
            }
            Instr::Lazy { chunk, captures } => {
                let function = self.closure(*chunk, *captures)?;
                self.replace_top(*captures, Value::Lazy(Thunk::from_function(function)));
            }
            Instr::Closure { chunk, captures } => {
                let function = self.closure(*chunk, *captures)?;
                self.replace_top(*captures, Value::Function(function));
            }
            Instr::Force => {
                let out = frame.top()?.force(ctx)?;
                frame.replace(1, out);
            }
            Instr::Call(argc) => {
                self.call(*argc, ctx)?;
            }
            Instr::Jump(target) => return Ok(Flow::Jump(*target)),
            Instr::JumpIfFalse(target) => {
                let cond = frame.top()?.force(ctx)?;
                let Value::Bool(b) = cond else {
                    return Err(ctx.invalid_unary("JumpIfFalse", &cond).into());
                };
                frame.stack.pop();
                if !b {
                    return Ok(Flow::Jump(*target));
                }
            }
            Instr::Try(target) => {
                let depth = frame.stack.len();
                frame.handlers.push(Handler {
                    target: *target,
                    depth,
                });
            }
            Instr::EndTry => {
                frame.handlers.pop();
            }
            Instr::Return => {
                let value = frame.stack.pop().unwrap_or_default();
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Next)
    }

    fn current(&mut self) -> Result<&mut Frame, Stop> {
        self.frames
            .last_mut()
            .ok_or_else(|| Stop::Abort(anyhow!("no frame to execute")))
    }

    fn replace_top(&mut self, n: usize, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.replace(n, value);
        }
    }

    fn closure(&mut self, chunk: usize, captures: usize) -> Result<Arc<Function>, Stop> {
        let frame = self.current()?;
        let values = frame.peek(captures)?.to_vec();
        Function::code(frame.program.clone(), chunk, values)
            .ok_or_else(|| Stop::Abort(anyhow!("chunk {chunk} does not exist")))
    }

    /// Applies the callee below the top `argc` values. The callee and the
    /// arguments are only removed once binding succeeded.
    fn call(&mut self, argc: usize, ctx: &mut ExecContext) -> Result<(), Stop> {
        let frame = self.current()?;
        let slots = frame.peek(argc + 1)?;
        let callee = slots[0].force(ctx)?;
        let args = slots[1..].to_vec();
        let app = match &callee {
            Value::Function(function) => function.bind(&args, ctx)?,
            Value::Foreign(f) => Application::Value(f.dispatcher().call(f, &args, ctx)?, Vec::new()),
            other => return Err(ctx.invalid_unary("Call", other).into()),
        };

        let len = frame.stack.len() - (argc + 1);
        frame.stack.truncate(len);
        match app {
            Application::Value(value, rest) => {
                frame.stack.push(value);
                if !rest.is_empty() {
                    frame.pending_call = Some(rest.len());
                    frame.stack.extend(rest);
                }
                Ok(())
            }
            Application::Enter {
                program,
                chunk,
                locals,
                rest,
            } => self.push_frame(program, chunk, locals, FrameKind::Call { rest }),
        }
    }

    /// Pops the returning frame. `Some` carries the result of the entry frame.
    fn leave(&mut self, value: Value, ctx: &mut ExecContext) -> Result<Option<Value>, Stop> {
        let Some(frame) = self.frames.pop() else {
            return Err(Stop::Abort(anyhow!("return without a frame")));
        };
        tracing::trace!(target: "fen::machine", chunk = frame.chunk, depth = self.frames.len(), "leave frame");
        match frame.kind {
            FrameKind::Entry => Ok(Some(value)),
            FrameKind::Call { rest } => {
                let caller = self.current()?;
                caller.stack.push(value);
                if !rest.is_empty() {
                    caller.pending_call = Some(rest.len());
                    caller.stack.extend(rest);
                }
                Ok(None)
            }
            FrameKind::Thunk { chain } => {
                // the caller retries its instruction and finds the memo
                self.settle(chain, value, ctx)?;
                Ok(None)
            }
        }
    }

    /// Memoizes `value` in `chain`, or keeps following when the value is
    /// itself a pending thunk.
    fn settle(&mut self, mut chain: Vec<Thunk>, value: Value, ctx: &mut ExecContext) -> Outcome<()> {
        match value.resolved() {
            Value::Lazy(next) => {
                chain.push(next.clone());
                self.drive(chain, ctx)
            }
            resolved => {
                Thunk::complete_chain(&chain, resolved.clone());
                Ok(())
            }
        }
    }

    /// Starts the last thunk of `chain`. Code bodies become a frame; host
    /// closures run right here.
    fn drive(&mut self, mut chain: Vec<Thunk>, ctx: &mut ExecContext) -> Outcome<()> {
        let Some(current) = chain.last().cloned() else {
            return Ok(());
        };
        let deferred = match current.begin(ctx) {
            Ok(Begin::Ready(value)) => {
                Thunk::complete_chain(&chain, value);
                return Ok(());
            }
            Ok(Begin::Run(deferred)) => deferred,
            Err(interrupt) => {
                chain.pop();
                Thunk::abort_chain(&chain);
                return Err(interrupt);
            }
        };
        let app = match &deferred {
            Deferred::Call(function) => function.bind(&[], ctx),
            // host closures run to completion on the host stack
            Deferred::Native(_) => deferred.run(ctx).map(|value| Application::Value(value, Vec::new())),
        };
        match app {
            Ok(Application::Enter {
                program, chunk, locals, ..
            }) => {
                if self.push_frame(program, chunk, locals, FrameKind::Thunk { chain: chain.clone() }).is_err() {
                    Thunk::abort_chain(&chain);
                    return Err(ctx.fault("Force", format!("chunk {chunk} does not exist")));
                }
                Ok(())
            }
            Ok(Application::Value(value, _)) => self.settle(chain, value, ctx),
            Err(interrupt) => {
                Thunk::abort_chain(&chain);
                Err(interrupt)
            }
        }
    }

    /// Schedules the thunk a suspended instruction is waiting on.
    fn resume(&mut self, ctx: &mut ExecContext) -> Result<(), Stop> {
        loop {
            let Some(thunk) = ctx.take_pending() else {
                return Err(Stop::Abort(anyhow!("suspended without a pending lazy value")));
            };
            tracing::trace!(target: "fen::rt::lazy", depth = self.frames.len(), "resuming pending thunk");
            match self.drive(vec![thunk], ctx) {
                // the thunk handed back another pending one: schedule that first
                Err(Interrupt::Suspended) => continue,
                other => return other.map_err(Stop::from),
            }
        }
    }

    /// Unwinds to the nearest `Try` handler and hands it the error as an
    /// `Error` variant. Returns `false` when the entry frame has no handler.
    fn unwind(&mut self, ctx: &mut ExecContext) -> bool {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return false;
            };
            if let Some(handler) = frame.handlers.pop() {
                let error = ctx.take_error();
                ctx.reset();
                let payload = match error {
                    Some(err) => Value::record([
                        ("kind", Value::str(err.kind.name())),
                        ("op", Value::Str(err.op.clone())),
                        ("message", Value::str(&err.message)),
                    ]),
                    None => Value::record([
                        ("kind", Value::str(ErrorKind::Fault.name())),
                        ("op", Value::str("")),
                        ("message", Value::str("unknown failure")),
                    ]),
                };
                frame.stack.truncate(handler.depth);
                frame.stack.push(Value::variant("Error", payload));
                frame.pc = handler.target;
                frame.pending_call = None;
                tracing::debug!(target: "fen::machine", chunk = frame.chunk, handler = handler.target, "caught failure");
                return true;
            }
            if matches!(frame.kind, FrameKind::Entry) {
                self.frames.pop();
                return false;
            }
            if let Some(Frame {
                kind: FrameKind::Thunk { chain },
                ..
            }) = self.frames.pop()
            {
                Thunk::abort_chain(&chain);
            }
        }
    }

    /// Drops every frame, returning claimed thunks to the pending state.
    fn abandon(&mut self) {
        while let Some(frame) = self.frames.pop() {
            if let FrameKind::Thunk { chain } = frame.kind {
                Thunk::abort_chain(&chain);
            }
        }
    }
}
