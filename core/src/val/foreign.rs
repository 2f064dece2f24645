//! Host-registered value kinds.
//!
//! Built-in kinds dispatch through an exhaustive `match` on [`Value`]; a host
//! type implements [`Dispatcher`] once, registers it, and gets a fresh type id.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use anyhow::{Result, anyhow, bail};
use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::op::{BinOp, FormatOptions, UnaryOp};
use crate::rt::{ExecContext, Outcome};

use super::{TypeId, TypeTag, Value};

/// Operation table of a host-registered kind. Every operation defaults to
/// the `InvalidOperand` failure, so implementations only override what the
/// kind supports.
pub trait Dispatcher: Send + Sync + 'static {
    fn type_name(&self) -> &str;

    /// Called when either operand of a binary operation is of this kind.
    /// `lhs`/`rhs` keep their original positions.
    fn binary(&self, op: BinOp, lhs: &Value, rhs: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
        Err(ctx.invalid_operand(op.name(), lhs, rhs))
    }

    fn unary(&self, op: UnaryOp, value: &ForeignValue, ctx: &mut ExecContext) -> Outcome<Value> {
        Err(ctx.invalid_unary(op.name(), &Value::Foreign(value.clone())))
    }

    /// Equality with any other value; defaults to identity.
    fn equal(&self, value: &ForeignValue, other: &Value, _ctx: &mut ExecContext) -> Outcome<bool> {
        Ok(matches!(other, Value::Foreign(o) if o.addr() == value.addr()))
    }

    fn show(&self, _value: &ForeignValue, _opts: &FormatOptions, _ctx: &mut ExecContext) -> Outcome<String> {
        Ok(format!("<{}>", self.type_name()))
    }

    fn length(&self, value: &ForeignValue, ctx: &mut ExecContext) -> Outcome<Value> {
        Err(ctx.invalid_unary("GetLength", &Value::Foreign(value.clone())))
    }

    fn get_value(&self, value: &ForeignValue, key: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
        Err(ctx.invalid_operand("GetValue", &Value::Foreign(value.clone()), key))
    }

    fn call(&self, value: &ForeignValue, _args: &[Value], ctx: &mut ExecContext) -> Outcome<Value> {
        Err(ctx.invalid_unary("Call", &Value::Foreign(value.clone())))
    }

    fn convert(&self, value: &ForeignValue, target: TypeTag, ctx: &mut ExecContext) -> Outcome<Value> {
        Err(ctx.conversion_failed(&Value::Foreign(value.clone()), target.name()))
    }
}

/// A value of a host-registered kind.
#[derive(Clone)]
pub struct ForeignValue {
    type_id: TypeId,
    dispatcher: Arc<dyn Dispatcher>,
    data: Arc<dyn Any + Send + Sync>,
}

impl ForeignValue {
    /// Wraps `data` as a value of the registered kind `type_id`.
    pub fn new<T>(type_id: TypeId, data: T) -> Result<Self>
    where
        T: Any + Send + Sync,
    {
        let dispatcher = dispatcher_for(type_id).ok_or_else(|| anyhow!("type id {type_id} is not registered"))?;
        Ok(Self {
            type_id,
            dispatcher,
            data: Arc::new(data),
        })
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.dispatcher
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.data) as *const u8 as usize
    }
}

// Global registry: type id -> dispatcher, plus a name index
static DISPATCHERS: Lazy<DashMap<TypeId, Arc<dyn Dispatcher>>> = Lazy::new(DashMap::new);
static NAMES: Lazy<DashMap<String, TypeId>> = Lazy::new(DashMap::new);
static NEXT_ID: AtomicU16 = AtomicU16::new(TypeTag::FIRST_FOREIGN_ID);

/// Registers a host kind and returns its type id. Names must be unique and
/// must not shadow a built-in kind.
pub fn register_dispatcher(dispatcher: Arc<dyn Dispatcher>) -> Result<TypeId> {
    let name = dispatcher.type_name().to_string();
    if TypeTag::from_name(&name).is_some() {
        bail!("type name {name} is reserved for a built-in kind");
    }
    let entry = NAMES.entry(name.clone());
    if let dashmap::mapref::entry::Entry::Occupied(_) = entry {
        bail!("type {name} is already registered");
    }
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    if id == TypeId::MAX {
        bail!("type id space exhausted");
    }
    DISPATCHERS.insert(id, dispatcher);
    entry.or_insert(id);
    tracing::debug!(target: "fen::val::foreign", name = %name, id, "registered dispatcher");
    Ok(id)
}

pub fn dispatcher_for(type_id: TypeId) -> Option<Arc<dyn Dispatcher>> {
    DISPATCHERS.get(&type_id).map(|entry| entry.value().clone())
}

/// Resolves built-in names first, then registered ones.
pub fn type_id_by_name(name: &str) -> Option<TypeId> {
    TypeTag::from_name(name)
        .map(TypeTag::id)
        .or_else(|| NAMES.get(name).map(|entry| *entry.value()))
}

pub fn type_name_of(type_id: TypeId) -> Option<String> {
    match TypeTag::from_id(type_id) {
        Some(tag) => Some(tag.name().to_string()),
        None => dispatcher_for(type_id).map(|d| d.type_name().to_string()),
    }
}
