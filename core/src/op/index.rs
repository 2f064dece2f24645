//! Indexing, the sequence protocol and concatenation.

use std::sync::Arc;

use crate::rt::{ExecContext, Outcome};
use crate::val::{List, Record, Value};

fn length_value(len: usize) -> Value {
    match i32::try_from(len) {
        Ok(n) => Value::Int(n),
        Err(_) => Value::Long(len as i64),
    }
}

/// Integer key as a position; `Ok(None)` for a non-integral key.
fn ordinal(key: &Value) -> Option<i64> {
    match key {
        Value::Int(i) => Some(*i as i64),
        Value::Long(i) => Some(*i),
        _ => None,
    }
}

pub(crate) fn length(value: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
    let value = value.force(ctx)?;
    match &value {
        Value::Str(s) => Ok(length_value(s.chars().count())),
        Value::List(list) => Ok(length_value(list.length(ctx)?)),
        Value::Record(record) => Ok(length_value(record.len())),
        Value::Module(module) => Ok(length_value(module.exports().len())),
        Value::Foreign(f) => f.dispatcher().length(f, ctx),
        _ => Err(ctx.invalid_unary("GetLength", &value)),
    }
}

pub(crate) fn get_value(container: &Value, key: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
    let container = container.force(ctx)?;
    let key = key.force(ctx)?;
    match &container {
        Value::Str(s) => {
            let Some(i) = ordinal(&key) else {
                return Err(ctx.invalid_index_type(&container, &key));
            };
            let found = usize::try_from(i).ok().and_then(|i| s.chars().nth(i));
            found.map(Value::Char).ok_or_else(|| ctx.index_out_of_range(&container, &key))
        }
        Value::List(list) => {
            let Some(i) = ordinal(&key) else {
                return Err(ctx.invalid_index_type(&container, &key));
            };
            let found = match usize::try_from(i) {
                Ok(i) => list.nth(i, ctx)?,
                Err(_) => None,
            };
            found.ok_or_else(|| ctx.index_out_of_range(&container, &key))
        }
        Value::Record(record) => {
            let found = match &key {
                Value::Str(name) => record.get(name),
                other => match ordinal(other) {
                    Some(i) => usize::try_from(i).ok().and_then(|i| record.get_index(i)),
                    None => return Err(ctx.invalid_index_type(&container, &key)),
                },
            };
            found.cloned().ok_or_else(|| ctx.index_out_of_range(&container, &key))
        }
        Value::Module(module) => match &key {
            Value::Str(name) => module
                .export(name)
                .cloned()
                .ok_or_else(|| ctx.index_out_of_range(&container, &key)),
            _ => Err(ctx.invalid_index_type(&container, &key)),
        },
        Value::Foreign(f) => f.dispatcher().get_value(f, &key, ctx),
        _ => Err(ctx.invalid_operand("GetValue", &container, &key)),
    }
}

/// Functional update: returns a new container with the entry at `key`
/// replaced. The original is left untouched.
pub(crate) fn set_value(container: &Value, key: &Value, item: Value, ctx: &mut ExecContext) -> Outcome<Value> {
    let container = container.force(ctx)?;
    let key = key.force(ctx)?;
    match &container {
        Value::Record(record) => {
            let position = match &key {
                Value::Str(name) => record.position(name),
                other => match ordinal(other) {
                    Some(i) => usize::try_from(i).ok().filter(|i| *i < record.len()),
                    None => return Err(ctx.invalid_index_type(&container, &key)),
                },
            };
            match position.and_then(|i| record.with_index(i, item)) {
                Some(updated) => Ok(Value::Record(Arc::new(updated))),
                None => Err(ctx.index_out_of_range(&container, &key)),
            }
        }
        Value::List(list) => {
            let Some(i) = ordinal(&key) else {
                return Err(ctx.invalid_index_type(&container, &key));
            };
            let Ok(index) = usize::try_from(i) else {
                return Err(ctx.index_out_of_range(&container, &key));
            };
            // sized by the cells actually walked, never by the key
            let mut prefix = Vec::new();
            let mut cursor = list.clone();
            for _ in 0..index {
                let Some(node) = cursor.node() else {
                    return Err(ctx.index_out_of_range(&container, &key));
                };
                prefix.push(node.head().clone());
                cursor = match cursor.forced_tail(ctx)? {
                    Some(next) => next,
                    None => return Err(ctx.index_out_of_range(&container, &key)),
                };
            }
            let Some(node) = cursor.node() else {
                return Err(ctx.index_out_of_range(&container, &key));
            };
            // the suffix after the replaced cell is shared, not copied
            let mut out = List::cons(item, node.tail().clone());
            for head in prefix.into_iter().rev() {
                out = List::cons(head, Value::List(out));
            }
            Ok(Value::List(out))
        }
        _ => Err(ctx.invalid_operand("SetValue", &container, &key)),
    }
}

pub(crate) fn head(value: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
    let value = value.force(ctx)?;
    let found = match &value {
        Value::List(list) => list.head().cloned(),
        Value::Str(s) => s.chars().next().map(Value::Char),
        _ => None,
    };
    found.ok_or_else(|| ctx.invalid_unary("Head", &value))
}

/// The tail slot as stored; a lazy tail is returned unforced.
pub(crate) fn tail(value: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
    let value = value.force(ctx)?;
    let found = match &value {
        Value::List(list) => list.node().map(|node| node.tail().clone()),
        Value::Str(s) => {
            let mut chars = s.chars();
            chars.next().map(|_| Value::str(chars.as_str()))
        }
        _ => None,
    };
    found.ok_or_else(|| ctx.invalid_unary("Tail", &value))
}

pub(crate) fn is_nil(value: &Value, ctx: &mut ExecContext) -> Outcome<bool> {
    let value = value.force(ctx)?;
    match &value {
        Value::List(list) => Ok(list.is_nil()),
        Value::Str(s) => Ok(s.is_empty()),
        _ => Err(ctx.invalid_unary("IsNil", &value)),
    }
}

/// Prepends `head` to `tail`. Neither operand is forced, so a lazy tail keeps
/// the structure lazy.
pub(crate) fn cons(head: &Value, tail: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
    ctx.ensure_live()?;
    match tail.resolved() {
        Value::List(list) => Ok(Value::List(List::cons(head.clone(), Value::List(list.clone())))),
        Value::Lazy(_) => Ok(Value::List(List::cons(head.clone(), tail.clone()))),
        Value::Str(s) => match head.resolved() {
            Value::Char(c) => {
                let mut out = String::with_capacity(s.len() + c.len_utf8());
                out.push(*c);
                out.push_str(s);
                Ok(Value::str(out))
            }
            other => Err(ctx.invalid_operand("Cons", other, tail)),
        },
        Value::Foreign(f) => f.dispatcher().binary(crate::op::BinOp::Cons, head, tail, ctx),
        other => Err(ctx.invalid_operand("Cons", head, other)),
    }
}

/// Empty sequence of the same kind as `value`.
pub(crate) fn nil_of(value: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
    let value = value.force(ctx)?;
    match &value {
        Value::List(_) => Ok(Value::nil()),
        Value::Str(_) => Ok(Value::str("")),
        Value::Record(_) => Ok(Value::Record(Arc::new(Record::default()))),
        _ => Err(ctx.invalid_unary("Nil", &value)),
    }
}

/// Adds `item` to a sequence under construction. Lists accumulate in reverse
/// and are put in order by [`generate_finalize`]; the item is not forced.
pub(crate) fn generate(acc: &Value, item: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
    let acc = acc.force(ctx)?;
    match &acc {
        Value::List(list) => Ok(Value::List(List::cons(item.clone(), Value::List(list.clone())))),
        Value::Str(s) => match item.force(ctx)? {
            Value::Char(c) => {
                let mut out = String::from(s.as_ref());
                out.push(c);
                Ok(Value::str(out))
            }
            Value::Str(t) => Ok(Value::str(format!("{s}{t}"))),
            other => Err(ctx.invalid_operand("Generate", &acc, &other)),
        },
        _ => Err(ctx.invalid_operand("Generate", &acc, item)),
    }
}

pub(crate) fn generate_finalize(acc: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
    let acc = acc.force(ctx)?;
    match &acc {
        Value::List(list) => {
            let mut out = List::nil();
            let mut cursor = list.clone();
            while let Some(node) = cursor.node() {
                out = List::cons(node.head().clone(), Value::List(out));
                cursor = match cursor.forced_tail(ctx)? {
                    Some(next) => next,
                    None => break,
                };
            }
            Ok(Value::List(out))
        }
        Value::Str(_) => Ok(acc.clone()),
        _ => Err(ctx.invalid_unary("GenerateFinalize", &acc)),
    }
}

pub(crate) fn get_tag(value: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
    match value.force(ctx)? {
        Value::Variant(variant) => Ok(Value::Str(variant.tag_arc().clone())),
        other => Err(ctx.invalid_unary("GetTag", &other)),
    }
}

pub(crate) fn untag(value: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
    match value.force(ctx)? {
        Value::Variant(variant) => Ok(variant.value().clone()),
        other => Err(ctx.invalid_unary("Untag", &other)),
    }
}

/// Concatenate on forced operands.
pub(crate) fn concat(lhs: &Value, rhs: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
        (Value::Str(a), Value::Char(b)) => Ok(Value::str(format!("{a}{b}"))),
        (Value::Char(a), Value::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
        (Value::Char(a), Value::Char(b)) => Ok(Value::str(format!("{a}{b}"))),
        (Value::List(a), Value::List(b)) => {
            if b.is_nil() {
                return Ok(lhs.clone());
            }
            let items = a.collect(ctx)?;
            let mut out = b.clone();
            for item in items.into_iter().rev() {
                out = List::cons(item, Value::List(out));
            }
            Ok(Value::List(out))
        }
        (Value::Record(a), Value::Record(b)) => Ok(Value::Record(Arc::new(a.concat(b)))),
        _ => Err(ctx.invalid_operand("Concatenate", lhs, rhs)),
    }
}
