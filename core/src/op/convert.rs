use crate::rt::{ExecContext, Outcome};
use crate::val::{List, TypeTag, Value};

use super::FormatOptions;
use super::numeric::{Num, NumericTower};

/// Truncates toward zero; `None` for NaN or a value outside a `bits`-wide
/// signed integer.
fn float_to_int(x: f64, bits: u32) -> Option<i64> {
    let bound = 2f64.powi(bits as i32 - 1);
    let t = x.trunc();
    if x.is_nan() || t < -bound || t >= bound {
        None
    } else {
        Some(t as i64)
    }
}

fn numeric_to(num: Num, target: TypeTag) -> Option<Value> {
    Some(match (num, target) {
        (Num::Int(x), TypeTag::Int) => Value::Int(x),
        (Num::Int(x), TypeTag::Long) => Value::Long(x as i64),
        (Num::Long(x), TypeTag::Int) => Value::Int(i32::try_from(x).ok()?),
        (Num::Long(x), TypeTag::Long) => Value::Long(x),
        (Num::Single(x), TypeTag::Int) => Value::Int(float_to_int(x as f64, 32)? as i32),
        (Num::Double(x), TypeTag::Int) => Value::Int(float_to_int(x, 32)? as i32),
        (Num::Single(x), TypeTag::Long) => Value::Long(float_to_int(x as f64, 64)?),
        (Num::Double(x), TypeTag::Long) => Value::Long(float_to_int(x, 64)?),
        (Num::Int(x), TypeTag::Single) => Value::Single(x as f32),
        (Num::Long(x), TypeTag::Single) => Value::Single(x as f32),
        (Num::Single(x), TypeTag::Single) => Value::Single(x),
        (Num::Double(x), TypeTag::Single) => Value::Single(x as f32),
        (Num::Int(x), TypeTag::Double) => Value::Double(x as f64),
        (Num::Long(x), TypeTag::Double) => Value::Double(x as f64),
        (Num::Single(x), TypeTag::Double) => Value::Double(x as f64),
        (Num::Double(x), TypeTag::Double) => Value::Double(x),
        _ => return None,
    })
}

/// Convert/CastTo.
pub(crate) fn convert(value: &Value, target: TypeTag, ctx: &mut ExecContext) -> Outcome<Value> {
    let value = value.force(ctx)?;
    if let Value::Foreign(f) = &value {
        return f.dispatcher().convert(f, target, ctx);
    }
    if value.tag() == Some(target) {
        return Ok(value);
    }

    let converted = match (&value, target) {
        // a list of chars joins into a string, anything else is shown
        (Value::List(list), TypeTag::String) => match chars_to_string(list, ctx)? {
            Some(text) => Some(text),
            None => Some(Value::str(value.show(&FormatOptions::default(), ctx)?)),
        },
        (_, TypeTag::String) => Some(Value::str(value.show(&FormatOptions::default(), ctx)?)),
        (_, TypeTag::TypeInfo) => Some(value.type_info()),
        (Value::Char(c), TypeTag::Int) => i32::try_from(*c as u32).ok().map(Value::Int),
        (Value::Char(c), TypeTag::Long) => Some(Value::Long(*c as u32 as i64)),
        (Value::Bool(b), TypeTag::Int) => Some(Value::Int(*b as i32)),
        (Value::Bool(b), TypeTag::Long) => Some(Value::Long(*b as i64)),
        (Value::Int(x), TypeTag::Char) => u32::try_from(*x).ok().and_then(char::from_u32).map(Value::Char),
        (Value::Long(x), TypeTag::Char) => u32::try_from(*x).ok().and_then(char::from_u32).map(Value::Char),
        (Value::Str(s), TypeTag::List) => Some(Value::list(s.chars().map(Value::Char).collect::<Vec<_>>())),
        (other, tag) if NumericTower::classify_tag(tag).is_some() => Num::of(other).and_then(|n| numeric_to(n, tag)),
        _ => None,
    };
    converted.ok_or_else(|| ctx.conversion_failed(&value, target.name()))
}

fn chars_to_string(list: &List, ctx: &mut ExecContext) -> Outcome<Option<Value>> {
    let mut out = String::new();
    for item in list.collect(ctx)? {
        match item.force(ctx)? {
            Value::Char(c) => out.push(c),
            _ => return Ok(None),
        }
    }
    Ok(Some(Value::str(out)))
}

/// Parses `text` as a value of kind `target`.
pub(crate) fn read(text: &str, target: TypeTag, ctx: &mut ExecContext) -> Outcome<Value> {
    ctx.ensure_live()?;
    let trimmed = text.trim();
    let parsed = match target {
        TypeTag::Int => trimmed.parse().ok().map(Value::Int),
        TypeTag::Long => trimmed.parse().ok().map(Value::Long),
        TypeTag::Single => trimmed.parse().ok().map(Value::Single),
        TypeTag::Double => trimmed.parse().ok().map(Value::Double),
        TypeTag::Bool => match trimmed {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        TypeTag::Char => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(Value::Char(c)),
                _ => None,
            }
        }
        TypeTag::String => Some(Value::str(text)),
        TypeTag::Unit => (trimmed == "()").then_some(Value::Unit),
        _ => None,
    };
    parsed.ok_or_else(|| ctx.unable_read(text, target.name()))
}

/// Descriptor of the forced value's kind.
pub(crate) fn type_of(value: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
    Ok(value.force(ctx)?.type_info())
}
