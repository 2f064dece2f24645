use std::cmp::Ordering;
use std::sync::Arc;

use crate::rt::{ExecContext, Outcome};
use crate::util::fast_map::VisitedPairs;
use crate::val::{List, Value};

use super::BinOp;
use super::numeric::{self, Num};

/// Language equality.
///
/// Numeric operands compare after promotion, aggregates compare structurally
/// and values of unrelated kinds are simply unequal. The walk keeps the pairs
/// of heap nodes it is comparing; meeting a pair again means the data is
/// cyclic and the pair is taken as equal.
pub(crate) fn equal(lhs: &Value, rhs: &Value, ctx: &mut ExecContext) -> Outcome<bool> {
    ctx.ensure_live()?;
    let mut visited = VisitedPairs::default();
    equal_in(lhs, rhs, &mut visited, ctx)
}

fn equal_in(lhs: &Value, rhs: &Value, visited: &mut VisitedPairs, ctx: &mut ExecContext) -> Outcome<bool> {
    let l = lhs.force(ctx)?;
    let r = rhs.force(ctx)?;

    // foreign kinds decide for themselves, whichever side they are on
    if let Value::Foreign(f) = &l {
        return f.dispatcher().equal(f, &r, ctx);
    }
    if let Value::Foreign(f) = &r {
        return f.dispatcher().equal(f, &l, ctx);
    }
    if let (Some(a), Some(b)) = (Num::of(&l), Num::of(&r)) {
        return Ok(numeric::compare(a, b) == Some(Ordering::Equal));
    }

    Ok(match (&l, &r) {
        (Value::Unit, Value::Unit) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Char(a), Value::Char(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::List(a), Value::List(b)) => return lists_equal(a, b, visited, ctx),
        (Value::Record(a), Value::Record(b)) => {
            if !visited.enter(l.heap_addr(), r.heap_addr()) {
                return Ok(true);
            }
            if a.len() != b.len() {
                return Ok(false);
            }
            // every entry, duplicates included, in declaration order
            for ((ln, lv), (rn, rv)) in a.iter().zip(b.iter()) {
                if ln != rn || !equal_in(lv, rv, visited, ctx)? {
                    return Ok(false);
                }
            }
            true
        }
        (Value::Variant(a), Value::Variant(b)) => {
            if !visited.enter(l.heap_addr(), r.heap_addr()) {
                return Ok(true);
            }
            a.tag() == b.tag() && equal_in(a.value(), b.value(), visited, ctx)?
        }
        (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
        (Value::Module(a), Value::Module(b)) => Arc::ptr_eq(a, b),
        (Value::TypeInfo(a), Value::TypeInfo(b)) => a.id == b.id,
        _ => false,
    })
}

// Iterative over the spine so long lists do not grow the host stack.
fn lists_equal(a: &List, b: &List, visited: &mut VisitedPairs, ctx: &mut ExecContext) -> Outcome<bool> {
    let mut left = a.clone();
    let mut right = b.clone();
    loop {
        if !visited.enter(left.addr(), right.addr()) {
            return Ok(true);
        }
        match (left.node(), right.node()) {
            (None, None) => return Ok(true),
            (Some(l), Some(r)) => {
                if !equal_in(l.head(), r.head(), visited, ctx)? {
                    return Ok(false);
                }
            }
            _ => return Ok(false),
        }
        let next_left = left.forced_tail(ctx)?;
        let next_right = right.forced_tail(ctx)?;
        match (next_left, next_right) {
            (Some(l), Some(r)) => {
                left = l;
                right = r;
            }
            _ => return Ok(false),
        }
    }
}

/// Ordering of two forced operands; `Ok(None)` when a NaN is involved.
fn ordering(op: BinOp, lhs: &Value, rhs: &Value, ctx: &mut ExecContext) -> Outcome<Option<Ordering>> {
    if let (Some(a), Some(b)) = (Num::of(lhs), Num::of(rhs)) {
        return Ok(numeric::compare(a, b));
    }
    match (lhs, rhs) {
        (Value::Char(a), Value::Char(b)) => Ok(Some(a.cmp(b))),
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        (Value::Bool(a), Value::Bool(b)) => Ok(Some(a.cmp(b))),
        _ => Err(ctx.invalid_operand(op.name(), lhs, rhs)),
    }
}

/// Equal, NotEqual, Greater, Lesser, GreaterEqual, LesserEqual.
pub(crate) fn relation(op: BinOp, lhs: &Value, rhs: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
    match op {
        BinOp::Eq => return equal(lhs, rhs, ctx).map(Value::Bool),
        BinOp::Ne => return equal(lhs, rhs, ctx).map(|eq| Value::Bool(!eq)),
        _ => {}
    }
    let l = lhs.force(ctx)?;
    let r = rhs.force(ctx)?;
    if let Value::Foreign(f) = &l {
        return f.dispatcher().binary(op, &l, &r, ctx);
    }
    if let Value::Foreign(f) = &r {
        return f.dispatcher().binary(op, &l, &r, ctx);
    }
    let ord = ordering(op, &l, &r, ctx)?;
    let holds = match op {
        BinOp::Gt => ord == Some(Ordering::Greater),
        BinOp::Lt => ord == Some(Ordering::Less),
        BinOp::Ge => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
        BinOp::Le => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
        _ => return Err(ctx.invalid_operand(op.name(), &l, &r)),
    };
    Ok(Value::Bool(holds))
}
