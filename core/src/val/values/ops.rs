//! Operation entry points on [`Value`].
//!
//! Every method forces lazy operands first (except `cons`, which must keep a
//! lazy tail lazy), routes host-registered kinds to their dispatcher and
//! otherwise hands off to the per-kind implementation in [`crate::op`].

use crate::op::{BinOp, FormatOptions, UnaryOp, compare, convert, index, numeric, show};
use crate::rt::{ExecContext, Outcome};

use super::{TypeTag, Value};

macro_rules! binary_ops {
    ($($(#[$meta:meta])* $name:ident => $op:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[inline]
            pub fn $name(&self, rhs: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
                self.binary(BinOp::$op, rhs, ctx)
            }
        )*
    };
}

macro_rules! unary_ops {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            #[inline]
            pub fn $name(&self, ctx: &mut ExecContext) -> Outcome<Value> {
                self.unary(UnaryOp::$op, ctx)
            }
        )*
    };
}

impl Value {
    /// Forces a lazy slot; any other slot returns itself.
    #[inline]
    pub fn force(&self, ctx: &mut ExecContext) -> Outcome<Value> {
        ctx.ensure_live()?;
        let mut current = self.clone();
        while let Value::Lazy(thunk) = &current {
            current = thunk.force(ctx)?;
        }
        Ok(current)
    }

    /// Binary dispatch with `self` as the left operand.
    pub fn binary(&self, op: BinOp, rhs: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
        ctx.ensure_live()?;
        if op == BinOp::Cons {
            return index::cons(self, rhs, ctx);
        }
        if op.is_cmp() {
            return compare::relation(op, self, rhs, ctx);
        }

        let lhs = self.force(ctx)?;
        let rhs = rhs.force(ctx)?;
        if let Value::Foreign(f) = &lhs {
            return f.dispatcher().binary(op, &lhs, &rhs, ctx);
        }
        if let Value::Foreign(f) = &rhs {
            tracing::trace!(target: "fen::op::slowpath", op = %op, "foreign right operand");
            return f.dispatcher().binary(op, &lhs, &rhs, ctx);
        }

        if op.is_arith() {
            numeric::arithmetic(op, &lhs, &rhs, ctx)
        } else if op.is_bitwise() {
            numeric::bitwise(op, &lhs, &rhs, ctx)
        } else {
            index::concat(&lhs, &rhs, ctx)
        }
    }

    pub fn unary(&self, op: UnaryOp, ctx: &mut ExecContext) -> Outcome<Value> {
        let value = self.force(ctx)?;
        match (&value, op) {
            (Value::Foreign(f), _) => f.dispatcher().unary(op, f, ctx),
            (Value::Bool(b), UnaryOp::Not) => Ok(Value::Bool(!b)),
            (Value::Char(c), UnaryOp::Succ | UnaryOp::Pred) => {
                let code = *c as u32;
                let next = if op == UnaryOp::Succ {
                    code.checked_add(1)
                } else {
                    code.checked_sub(1)
                };
                next.and_then(char::from_u32)
                    .map(Value::Char)
                    .ok_or_else(|| ctx.conversion_failed(&value, "Char"))
            }
            _ => numeric::unary(op, &value, ctx),
        }
    }

    binary_ops! {
        add => Add,
        sub => Sub,
        mul => Mul,
        /// Truncating for integers; a zero divisor fails in every class.
        div => Div,
        /// Truncated remainder, sign of the dividend.
        rem => Rem,
        /// Floored modulus, sign of the divisor.
        modulus => Mod,
        pow => Pow,
        bit_and => BitAnd,
        bit_or => BitOr,
        bit_xor => BitXor,
        shl => Shl,
        shr => Shr,
        greater => Gt,
        lesser => Lt,
        greater_equal => Ge,
        lesser_equal => Le,
        concat => Concat,
        /// Prepends `self` to `rhs` without forcing either.
        cons => Cons,
    }

    unary_ops! {
        neg => Neg,
        not => Not,
        bit_not => BitNot,
        succ => Succ,
        pred => Pred,
    }

    /// The language's `==`: promoting, structural, cycle-safe.
    #[inline]
    pub fn equal(&self, rhs: &Value, ctx: &mut ExecContext) -> Outcome<bool> {
        compare::equal(self, rhs, ctx)
    }

    #[inline]
    pub fn not_equal(&self, rhs: &Value, ctx: &mut ExecContext) -> Outcome<bool> {
        compare::equal(self, rhs, ctx).map(|eq| !eq)
    }

    pub fn length(&self, ctx: &mut ExecContext) -> Outcome<Value> {
        index::length(self, ctx)
    }

    pub fn get_value(&self, key: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
        index::get_value(self, key, ctx)
    }

    pub fn set_value(&self, key: &Value, item: Value, ctx: &mut ExecContext) -> Outcome<Value> {
        index::set_value(self, key, item, ctx)
    }

    pub fn head(&self, ctx: &mut ExecContext) -> Outcome<Value> {
        index::head(self, ctx)
    }

    pub fn tail(&self, ctx: &mut ExecContext) -> Outcome<Value> {
        index::tail(self, ctx)
    }

    pub fn is_nil(&self, ctx: &mut ExecContext) -> Outcome<bool> {
        index::is_nil(self, ctx)
    }

    /// Empty value of the same sequence kind.
    pub fn nil_of(&self, ctx: &mut ExecContext) -> Outcome<Value> {
        index::nil_of(self, ctx)
    }

    pub fn generate(&self, item: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
        index::generate(self, item, ctx)
    }

    pub fn generate_finalize(&self, ctx: &mut ExecContext) -> Outcome<Value> {
        index::generate_finalize(self, ctx)
    }

    pub fn get_tag(&self, ctx: &mut ExecContext) -> Outcome<Value> {
        index::get_tag(self, ctx)
    }

    pub fn untag(&self, ctx: &mut ExecContext) -> Outcome<Value> {
        index::untag(self, ctx)
    }

    pub fn show(&self, opts: &FormatOptions, ctx: &mut ExecContext) -> Outcome<String> {
        show::show(self, opts, ctx)
    }

    /// Show with a textual format spec such as `"f2"` or `"x"`.
    pub fn format(&self, spec: &str, ctx: &mut ExecContext) -> Outcome<String> {
        match FormatOptions::parse(spec) {
            Some(opts) => show::show(self, &opts, ctx),
            None => Err(ctx.invalid_format(spec, self.resolved())),
        }
    }

    pub fn convert(&self, target: TypeTag, ctx: &mut ExecContext) -> Outcome<Value> {
        convert::convert(self, target, ctx)
    }

    pub fn read(text: &str, target: TypeTag, ctx: &mut ExecContext) -> Outcome<Value> {
        convert::read(text, target, ctx)
    }

    pub fn type_of(&self, ctx: &mut ExecContext) -> Outcome<Value> {
        convert::type_of(self, ctx)
    }

    /// Applies a callable with curried semantics.
    pub fn call(&self, args: &[Value], ctx: &mut ExecContext) -> Outcome<Value> {
        match self.force(ctx)? {
            Value::Function(f) => f.apply(args, ctx),
            Value::Foreign(f) => f.dispatcher().call(&f, args, ctx),
            other => Err(ctx.invalid_unary("Call", &other)),
        }
    }
}
