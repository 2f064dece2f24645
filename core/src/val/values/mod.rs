use std::sync::Arc;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::op::FormatOptions;
use crate::rt::ExecContext;

use super::{ForeignValue, Function, List, Module, Record, Thunk, Variant};

mod convert;
mod ops;
mod types;

pub use types::{TypeId, TypeInfo, TypeTag};

/// A runtime value slot.
///
/// Scalars are stored inline; every other kind holds an `Arc` to an
/// immutable heap object, so cloning a value never deep-copies. The only
/// mutable state reachable from a value is the one-way transition of a
/// [`Thunk`] from pending to forced.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Unit,
    Int(i32),
    Long(i64),
    Single(f32),
    Double(f64),
    Bool(bool),
    Char(char),
    /// String type, wrapped in Arc<str> for cheap cloning
    Str(Arc<str>),
    /// Immutable cons list whose tails may be lazy
    List(List),
    Record(Arc<Record>),
    Variant(Arc<Variant>),
    Lazy(Thunk),
    Function(Arc<Function>),
    Module(Arc<Module>),
    TypeInfo(Arc<TypeInfo>),
    /// Host-registered kind dispatched through its own operation table
    Foreign(ForeignValue),
}

impl Value {
    #[inline]
    pub fn tag(&self) -> Option<TypeTag> {
        Some(match self {
            Value::Unit => TypeTag::Unit,
            Value::Int(_) => TypeTag::Int,
            Value::Long(_) => TypeTag::Long,
            Value::Single(_) => TypeTag::Single,
            Value::Double(_) => TypeTag::Double,
            Value::Bool(_) => TypeTag::Bool,
            Value::Char(_) => TypeTag::Char,
            Value::Str(_) => TypeTag::String,
            Value::List(_) => TypeTag::List,
            Value::Record(_) => TypeTag::Record,
            Value::Variant(_) => TypeTag::Variant,
            Value::Lazy(_) => TypeTag::Lazy,
            Value::Function(_) => TypeTag::Function,
            Value::Module(_) => TypeTag::Module,
            Value::TypeInfo(_) => TypeTag::TypeInfo,
            Value::Foreign(_) => return None,
        })
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        match self {
            Value::Foreign(foreign) => foreign.type_id(),
            other => other.tag().map(TypeTag::id).unwrap_or(TypeTag::FIRST_FOREIGN_ID),
        }
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        match self {
            Value::Foreign(foreign) => foreign.dispatcher().type_name(),
            other => other.tag().map(TypeTag::name).unwrap_or("Foreign"),
        }
    }

    #[inline]
    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }

    #[inline]
    pub fn is_lazy(&self) -> bool {
        matches!(self, Value::Lazy(_))
    }

    pub fn str(text: impl AsRef<str>) -> Value {
        Value::Str(Arc::from(text.as_ref()))
    }

    /// Record literal; duplicate names are kept in order.
    pub fn record<I, K>(fields: I) -> Value
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        Value::Record(Arc::new(Record::from_pairs(fields)))
    }

    pub fn variant(tag: impl AsRef<str>, payload: Value) -> Value {
        Value::Variant(Arc::new(Variant::new(tag, payload)))
    }

    pub fn tag_only(tag: impl AsRef<str>) -> Value {
        Value::Variant(Arc::new(Variant::new(tag, Value::Unit)))
    }

    pub fn some(value: Value) -> Value {
        Value::variant("Some", value)
    }

    pub fn none() -> Value {
        Value::tag_only("None")
    }

    pub fn list<I>(items: I) -> Value
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        Value::List(List::from_values(items))
    }

    pub fn nil() -> Value {
        Value::List(List::nil())
    }

    pub fn lazy<F>(f: F) -> Value
    where
        F: Fn(&mut ExecContext) -> crate::rt::Outcome<Value> + Send + Sync + 'static,
    {
        Value::Lazy(Thunk::new(f))
    }

    pub fn type_info(&self) -> Value {
        Value::TypeInfo(Arc::new(TypeInfo::new(self.type_id(), self.type_name())))
    }

    /// Address of the heap object behind this slot, 0 for inline kinds.
    pub(crate) fn heap_addr(&self) -> usize {
        match self {
            Value::Str(s) => Arc::as_ptr(s) as *const u8 as usize,
            Value::List(list) => list.addr(),
            Value::Record(r) => Arc::as_ptr(r) as usize,
            Value::Variant(v) => Arc::as_ptr(v) as usize,
            Value::Lazy(t) => t.addr(),
            Value::Function(f) => Arc::as_ptr(f) as usize,
            Value::Module(m) => Arc::as_ptr(m) as usize,
            Value::TypeInfo(t) => Arc::as_ptr(t) as usize,
            Value::Foreign(f) => f.addr(),
            _ => 0,
        }
    }

    /// Identity comparison: same inline payload or same heap object.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self.heap_addr(), other.heap_addr()) {
            (0, 0) => self == other,
            (a, b) => a == b,
        }
    }

    /// Returns the memoized value of a forced thunk, or the slot itself.
    /// Pending thunks are returned unchanged; nothing is evaluated.
    pub fn resolved(&self) -> &Value {
        let mut current = self;
        while let Value::Lazy(thunk) = current {
            match thunk.value() {
                Some(value) => current = value,
                None => break,
            }
        }
        current
    }
}

/// Host-side equality: same kind and structurally equal, without forcing and
/// without numeric promotion. Pending thunks compare by identity. Use
/// [`Value::equal`] for the language's `==`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self.resolved(), other.resolved()) {
            (Value::Unit, Value::Unit) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Single(a), Value::Single(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Variant(a), Value::Variant(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Lazy(a), Value::Lazy(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Arc::ptr_eq(a, b),
            (Value::TypeInfo(a), Value::TypeInfo(b)) => a.id == b.id,
            (Value::Foreign(a), Value::Foreign(b)) => a.addr() == b.addr(),
            _ => false,
        }
    }
}

// Debug never forces and never walks more than the forced prefix of a list,
// so it is safe on infinite and cyclic data.
impl core::fmt::Debug for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Value::Unit => write!(f, "Unit"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Long(i) => write!(f, "Long({i})"),
            Value::Single(x) => write!(f, "Single({x:?})"),
            Value::Double(x) => write!(f, "Double({x:?})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Char(c) => write!(f, "Char({c:?})"),
            Value::Str(s) => write!(f, "Str({:?})", s.as_ref()),
            Value::List(list) => {
                let mut dbg = f.debug_list();
                let mut cursor = list.clone();
                let mut shown = 0usize;
                while let Some(node) = cursor.node() {
                    if shown == 16 {
                        dbg.entry(&format_args!(".."));
                        break;
                    }
                    dbg.entry(node.head());
                    shown += 1;
                    match node.tail().resolved() {
                        Value::List(next) => cursor = next.clone(),
                        _ => {
                            dbg.entry(&format_args!("<lazy>"));
                            break;
                        }
                    }
                }
                dbg.finish()
            }
            Value::Record(record) => {
                let mut dbg = f.debug_map();
                for (name, value) in record.iter() {
                    dbg.entry(&name, value);
                }
                dbg.finish()
            }
            Value::Variant(variant) => write!(f, "Variant({}, {:?})", variant.tag(), variant.value()),
            Value::Lazy(thunk) => match thunk.value() {
                Some(value) => write!(f, "Lazy({value:?})"),
                None => write!(f, "Lazy(<pending>)"),
            },
            Value::Function(fun) => write!(f, "Function({}/{})", fun.name(), fun.arity()),
            Value::Module(module) => write!(f, "Module({})", module.name()),
            Value::TypeInfo(info) => write!(f, "TypeInfo({})", info.name),
            Value::Foreign(foreign) => write!(f, "Foreign({})", foreign.dispatcher().type_name()),
        }
    }
}

/// Renders with the default [`FormatOptions`] on a fresh eager context, so
/// pending thunks reachable from the value get forced and memoized.
impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut ctx = ExecContext::new();
        match self.show(&FormatOptions::default(), &mut ctx) {
            Ok(text) => f.write_str(&text),
            Err(_) => match ctx.take_error() {
                Some(err) => write!(f, "<error: {err}>"),
                None => f.write_str("<error>"),
            },
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.resolved() {
            Value::Unit => serializer.serialize_unit(),
            Value::Int(i) => serializer.serialize_i32(*i),
            Value::Long(i) => serializer.serialize_i64(*i),
            Value::Single(x) => serializer.serialize_f32(*x),
            Value::Double(x) => serializer.serialize_f64(*x),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Char(c) => serializer.serialize_char(*c),
            Value::Str(s) => serializer.serialize_str(s.as_ref()),
            Value::List(list) => {
                let mut seq = serializer.serialize_seq(None)?;
                let mut cursor = list.clone();
                while let Some(node) = cursor.node() {
                    seq.serialize_element(node.head())?;
                    match node.tail().resolved() {
                        Value::List(next) => cursor = next.clone(),
                        // Unforced tails are not evaluated while serializing
                        _ => {
                            seq.serialize_element("<lazy>")?;
                            break;
                        }
                    }
                }
                seq.end()
            }
            Value::Record(record) => {
                let mut map = serializer.serialize_map(Some(record.len()))?;
                for (name, value) in record.iter() {
                    map.serialize_entry(name.as_ref(), value)?;
                }
                map.end()
            }
            Value::Variant(variant) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("tag", variant.tag())?;
                map.serialize_entry("value", variant.value())?;
                map.end()
            }
            Value::Lazy(_) => serializer.serialize_str("<lazy>"),
            Value::Function(fun) => serializer.serialize_str(&format!("<function {}>", fun.name())),
            Value::Module(module) => serializer.serialize_str(&format!("<module {}>", module.name())),
            Value::TypeInfo(info) => serializer.serialize_str(&info.name),
            Value::Foreign(foreign) => {
                serializer.serialize_str(&format!("<{}>", foreign.dispatcher().type_name()))
            }
        }
    }
}
