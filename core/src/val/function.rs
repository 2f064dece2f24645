use std::sync::Arc;

use anyhow::{Result, bail};

use crate::rt::{ExecContext, Machine, Outcome, Program};

use super::{TypeId, Value};

/// Host function body. Receives exactly `arity` arguments.
pub type NativeFn = Arc<dyn Fn(&[Value], &mut ExecContext) -> Outcome<Value> + Send + Sync>;

#[derive(Clone)]
pub enum Body {
    Native(NativeFn),
    /// A chunk of a loaded program; locals are `captures ++ arguments`.
    Code {
        program: Arc<Program>,
        chunk: usize,
        captures: Arc<[Value]>,
    },
    Overloaded(Arc<OverloadTable>),
}

/// Curried function value. `applied` holds the arguments of a partial
/// application; the body runs once `arity` arguments are available.
#[derive(Clone)]
pub struct Function {
    name: Arc<str>,
    arity: usize,
    applied: Arc<[Value]>,
    body: Body,
}

/// What binding arguments to a function produced.
pub enum Application {
    /// A finished value and the arguments left over for it.
    Value(Value, Vec<Value>),
    /// A code body to run on the driving loop, then apply to `rest`.
    Enter {
        program: Arc<Program>,
        chunk: usize,
        locals: Vec<Value>,
        rest: Vec<Value>,
    },
}

impl Function {
    pub fn native<F>(name: impl AsRef<str>, arity: usize, f: F) -> Arc<Self>
    where
        F: Fn(&[Value], &mut ExecContext) -> Outcome<Value> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: Arc::from(name.as_ref()),
            arity,
            applied: Arc::from(Vec::new()),
            body: Body::Native(Arc::new(f)),
        })
    }

    /// Function over chunk `chunk` of `program`, or `None` if there is no such chunk.
    pub fn code(program: Arc<Program>, chunk: usize, captures: Vec<Value>) -> Option<Arc<Self>> {
        let (name, arity) = {
            let target = program.chunk(chunk)?;
            (Arc::<str>::from(target.name.as_str()), target.arity as usize)
        };
        Some(Arc::new(Self {
            name,
            arity,
            applied: Arc::from(Vec::new()),
            body: Body::Code {
                program,
                chunk,
                captures: Arc::from(captures),
            },
        }))
    }

    pub fn overloaded(table: OverloadTable) -> Arc<Self> {
        Arc::new(Self {
            name: table.name.clone(),
            arity: table.arity,
            applied: Arc::from(Vec::new()),
            body: Body::Overloaded(Arc::new(table)),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    #[inline]
    pub fn applied(&self) -> &[Value] {
        &self.applied
    }

    /// Arguments still needed before the body runs.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.arity.saturating_sub(self.applied.len())
    }

    #[inline]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Binds `args` with curried semantics: too few arguments yield a
    /// partial application, surplus arguments are returned for the caller
    /// to apply to the result.
    pub fn bind(self: &Arc<Self>, args: &[Value], ctx: &mut ExecContext) -> Outcome<Application> {
        ctx.ensure_live()?;
        let remaining = self.remaining();
        if remaining > 0 && args.len() < remaining {
            if args.is_empty() {
                return Ok(Application::Value(Value::Function(self.clone()), Vec::new()));
            }
            let mut applied = self.applied.to_vec();
            applied.extend_from_slice(args);
            let partial = Function {
                name: self.name.clone(),
                arity: self.arity,
                applied: Arc::from(applied),
                body: self.body.clone(),
            };
            return Ok(Application::Value(Value::Function(Arc::new(partial)), Vec::new()));
        }

        let mut full = Vec::with_capacity(self.arity);
        full.extend_from_slice(&self.applied);
        full.extend_from_slice(&args[..remaining]);
        let rest = args[remaining..].to_vec();

        match &self.body {
            Body::Native(f) => Ok(Application::Value(f(&full, ctx)?, rest)),
            Body::Code {
                program,
                chunk,
                captures,
            } => {
                let mut locals = Vec::with_capacity(captures.len() + full.len());
                locals.extend_from_slice(captures);
                locals.extend(full);
                Ok(Application::Enter {
                    program: program.clone(),
                    chunk: *chunk,
                    locals,
                    rest,
                })
            }
            Body::Overloaded(table) => {
                let (target, forced) = table.select(&full, ctx)?;
                Ok(match target.bind(&forced, ctx)? {
                    Application::Value(value, mut extra) => {
                        extra.extend(rest);
                        Application::Value(value, extra)
                    }
                    Application::Enter {
                        program,
                        chunk,
                        locals,
                        rest: mut extra,
                    } => {
                        extra.extend(rest);
                        Application::Enter {
                            program,
                            chunk,
                            locals,
                            rest: extra,
                        }
                    }
                })
            }
        }
    }

    /// Applies `args` to completion. Code bodies run on a nested [`Machine`].
    pub fn apply(self: &Arc<Self>, args: &[Value], ctx: &mut ExecContext) -> Outcome<Value> {
        let mut app = self.bind(args, ctx)?;
        loop {
            let (value, rest) = match app {
                Application::Value(value, rest) => (value, rest),
                Application::Enter {
                    program,
                    chunk,
                    locals,
                    rest,
                } => (Machine::new().invoke(&program, chunk, locals, ctx)?, rest),
            };
            if rest.is_empty() {
                return Ok(value);
            }
            app = match value.force(ctx)? {
                Value::Function(next) => next.bind(&rest, ctx)?,
                Value::Foreign(foreign) => {
                    Application::Value(foreign.dispatcher().call(&foreign, &rest, ctx)?, Vec::new())
                }
                other => return Err(ctx.invalid_unary("Call", &other)),
            };
        }
    }

    /// Host entry point. The argument count must match exactly; a mismatch
    /// is a contract violation of the embedding code, not a runtime error.
    pub fn invoke(self: &Arc<Self>, args: &[Value], ctx: &mut ExecContext) -> Result<Value> {
        if args.len() != self.remaining() {
            bail!(
                "Function {} expects {} arguments, got {}",
                self.name,
                self.remaining(),
                args.len()
            );
        }
        let outcome = self.apply(args, ctx);
        ctx.finish(outcome)
    }
}

/// One clause of an overload table. `None` matches any type.
#[derive(Clone)]
pub struct Clause {
    params: Vec<Option<TypeId>>,
    target: Arc<Function>,
}

impl Clause {
    fn matches(&self, args: &[Value]) -> bool {
        self.params
            .iter()
            .zip(args)
            .all(|(param, arg)| param.is_none_or(|id| id == arg.type_id()))
    }
}

/// Functions selected by the runtime types of their arguments. The first
/// matching clause wins.
#[derive(Clone)]
pub struct OverloadTable {
    name: Arc<str>,
    arity: usize,
    clauses: Vec<Clause>,
}

impl OverloadTable {
    pub fn new(name: impl AsRef<str>, arity: usize) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            arity,
            clauses: Vec::new(),
        }
    }

    pub fn with_clause(mut self, params: Vec<Option<TypeId>>, target: Arc<Function>) -> Result<Self> {
        if params.len() != self.arity {
            bail!(
                "clause for {} has {} parameters, expected {}",
                self.name,
                params.len(),
                self.arity
            );
        }
        if target.remaining() != self.arity {
            bail!(
                "clause target {} takes {} arguments, expected {}",
                target.name(),
                target.remaining(),
                self.arity
            );
        }
        self.clauses.push(Clause { params, target });
        Ok(self)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Forces the arguments and picks the first clause accepting their types.
    pub fn select(&self, args: &[Value], ctx: &mut ExecContext) -> Outcome<(Arc<Function>, Vec<Value>)> {
        let mut forced = Vec::with_capacity(args.len());
        for arg in args {
            forced.push(arg.force(ctx)?);
        }
        match self.clauses.iter().find(|clause| clause.matches(&forced)) {
            Some(clause) => Ok((clause.target.clone(), forced)),
            None => Err(ctx.no_overload(&self.name, &forced)),
        }
    }
}
