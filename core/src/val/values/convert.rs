use std::sync::Arc;

use anyhow::{Result, bail};

use crate::rt::{ExecContext, Outcome};
use crate::val::{Function, List, Record, Thunk, Variant};

use super::Value;

impl From<i32> for Value {
    #[inline]
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(i: i64) -> Self {
        Value::Long(i)
    }
}

impl From<f32> for Value {
    #[inline]
    fn from(f: f32) -> Self {
        Value::Single(f)
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<bool> for Value {
    #[inline]
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<char> for Value {
    #[inline]
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<()> for Value {
    #[inline]
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<String> for Value {
    #[inline]
    fn from(s: String) -> Self {
        Value::Str(Arc::<str>::from(s))
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Arc<str>> for Value {
    #[inline]
    fn from(s: Arc<str>) -> Self {
        Value::Str(s)
    }
}

impl<T> From<Vec<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Vec<T>) -> Self {
        Value::list(v.into_iter().map(Into::into))
    }
}

/// `Some payload` or the bare `None` tag.
impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(o: Option<T>) -> Self {
        match o {
            Some(v) => Value::some(v.into()),
            None => Value::none(),
        }
    }
}

impl From<List> for Value {
    #[inline]
    fn from(list: List) -> Self {
        Value::List(list)
    }
}

impl From<Record> for Value {
    #[inline]
    fn from(record: Record) -> Self {
        Value::Record(Arc::new(record))
    }
}

impl From<Variant> for Value {
    #[inline]
    fn from(variant: Variant) -> Self {
        Value::Variant(Arc::new(variant))
    }
}

impl From<Thunk> for Value {
    #[inline]
    fn from(thunk: Thunk) -> Self {
        Value::Lazy(thunk)
    }
}

impl From<Arc<Function>> for Value {
    #[inline]
    fn from(function: Arc<Function>) -> Self {
        Value::Function(function)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Unit,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    match i32::try_from(i) {
                        Ok(small) => Value::Int(small),
                        Err(_) => Value::Long(i),
                    }
                } else {
                    Value::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => s.into(),
            serde_json::Value::Array(items) => items.into(),
            serde_json::Value::Object(map) => Value::record(map.into_iter().map(|(k, v)| (k, Value::from(v)))),
        }
    }
}

// Typed accessors for embedding code. Each one forces on an eager context;
// a wrong kind is a contract violation reported through anyhow.
impl Value {
    fn forced(&self) -> Result<Value> {
        let mut ctx = ExecContext::new();
        let outcome = self.force(&mut ctx);
        ctx.finish(outcome)
    }

    pub fn as_i32(&self) -> Result<i32> {
        match self.forced()? {
            Value::Int(i) => Ok(i),
            Value::Long(i) => match i32::try_from(i) {
                Ok(i) => Ok(i),
                Err(_) => bail!("Long {i} does not fit in Int"),
            },
            other => bail!("expected Int, found {}", other.type_name()),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self.forced()? {
            Value::Int(i) => Ok(i as i64),
            Value::Long(i) => Ok(i),
            other => bail!("expected Long, found {}", other.type_name()),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self.forced()? {
            Value::Int(i) => Ok(i as f64),
            Value::Long(i) => Ok(i as f64),
            Value::Single(f) => Ok(f as f64),
            Value::Double(f) => Ok(f),
            other => bail!("expected a number, found {}", other.type_name()),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self.forced()? {
            Value::Bool(b) => Ok(b),
            other => bail!("expected Bool, found {}", other.type_name()),
        }
    }

    pub fn as_char(&self) -> Result<char> {
        match self.forced()? {
            Value::Char(c) => Ok(c),
            other => bail!("expected Char, found {}", other.type_name()),
        }
    }

    pub fn as_string(&self) -> Result<String> {
        match self.forced()? {
            Value::Str(s) => Ok(s.to_string()),
            other => bail!("expected String, found {}", other.type_name()),
        }
    }

    /// Elements of a list, forcing the whole spine.
    pub fn to_vec(&self) -> Result<Vec<Value>> {
        let mut ctx = ExecContext::new();
        let outcome = match self.forced()? {
            Value::List(list) => list.collect(&mut ctx),
            other => bail!("expected List, found {}", other.type_name()),
        };
        ctx.finish(outcome)
    }

    /// Deep JSON image. Unlike `Serialize`, this forces every lazy value.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut ctx = ExecContext::new();
        let outcome = json_of(self, &mut ctx);
        ctx.finish(outcome)
    }
}

fn json_of(value: &Value, ctx: &mut ExecContext) -> Outcome<serde_json::Value> {
    use serde_json::Value as Json;

    let value = value.force(ctx)?;
    Ok(match &value {
        Value::Unit => Json::Null,
        Value::Int(i) => Json::from(*i),
        Value::Long(i) => Json::from(*i),
        Value::Single(f) => serde_json::Number::from_f64(*f as f64).map_or(Json::Null, Json::Number),
        Value::Double(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::Bool(b) => Json::Bool(*b),
        Value::Char(c) => Json::String(c.to_string()),
        Value::Str(s) => Json::String(s.to_string()),
        Value::List(list) => {
            let mut items = Vec::new();
            for item in list.collect(ctx)? {
                items.push(json_of(&item, ctx)?);
            }
            Json::Array(items)
        }
        Value::Record(record) => {
            let mut map = serde_json::Map::new();
            for (name, field) in record.iter() {
                // keep the first of duplicate names, like lookup does
                if !map.contains_key(name.as_ref()) {
                    map.insert(name.to_string(), json_of(field, ctx)?);
                }
            }
            Json::Object(map)
        }
        Value::Variant(variant) => {
            let mut map = serde_json::Map::new();
            map.insert("tag".to_string(), Json::String(variant.tag().to_string()));
            map.insert("value".to_string(), json_of(variant.value(), ctx)?);
            Json::Object(map)
        }
        _ => return Err(ctx.conversion_failed(&value, "Json")),
    })
}
