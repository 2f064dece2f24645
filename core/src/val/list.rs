use std::sync::Arc;

use crate::rt::{ExecContext, Outcome};

use super::Value;

/// Immutable singly linked list. The tail of each cell is either another
/// list or a lazy value that yields one, so list structure can be built
/// without forcing anything.
#[derive(Clone, Default)]
pub struct List {
    node: Option<Arc<Cons>>,
}

/// A list cell.
pub struct Cons {
    head: Value,
    tail: Value,
}

impl Cons {
    #[inline]
    pub fn head(&self) -> &Value {
        &self.head
    }

    /// Either `Value::List` or `Value::Lazy`.
    #[inline]
    pub fn tail(&self) -> &Value {
        &self.tail
    }
}

// Dropping a long list (or a long chain of memoized tails) must not recurse
// once per cell.
impl Drop for Cons {
    fn drop(&mut self) {
        let mut next = std::mem::take(&mut self.tail);
        loop {
            next = match next {
                Value::List(list) => match list.node.and_then(|node| Arc::try_unwrap(node).ok()) {
                    Some(mut cell) => std::mem::take(&mut cell.tail),
                    None => break,
                },
                Value::Lazy(thunk) => match thunk.into_unique_value() {
                    Some(value) => value,
                    None => break,
                },
                _ => break,
            };
        }
    }
}

impl List {
    #[inline]
    pub fn nil() -> Self {
        Self { node: None }
    }

    /// Prepends `head`. `tail` must be a list or a lazy value; it is not forced.
    #[inline]
    pub(crate) fn cons(head: Value, tail: Value) -> Self {
        debug_assert!(matches!(tail, Value::List(_) | Value::Lazy(_)));
        Self {
            node: Some(Arc::new(Cons { head, tail })),
        }
    }

    pub fn from_values<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        let mut list = List::nil();
        for item in items.into_iter().rev() {
            list = List::cons(item, Value::List(list));
        }
        list
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.node.is_none()
    }

    #[inline]
    pub fn node(&self) -> Option<&Cons> {
        self.node.as_deref()
    }

    #[inline]
    pub fn head(&self) -> Option<&Value> {
        self.node().map(Cons::head)
    }

    pub(crate) fn addr(&self) -> usize {
        self.node.as_ref().map(|node| Arc::as_ptr(node) as usize).unwrap_or(0)
    }

    #[inline]
    pub fn ptr_eq(&self, other: &List) -> bool {
        self.addr() == other.addr()
    }

    /// Forces the tail of this cell and returns it as a list.
    pub fn forced_tail(&self, ctx: &mut ExecContext) -> Outcome<Option<List>> {
        let Some(node) = self.node() else {
            return Ok(None);
        };
        match node.tail.force(ctx)? {
            Value::List(next) => Ok(Some(next)),
            other => Err(ctx.invalid_unary("Tail", &other)),
        }
    }

    /// Walks the whole spine, forcing lazy tails, and collects the heads.
    /// Does not terminate on infinite lists.
    pub fn collect(&self, ctx: &mut ExecContext) -> Outcome<Vec<Value>> {
        let mut out = Vec::new();
        let mut cursor = self.clone();
        while let Some(node) = cursor.node() {
            out.push(node.head.clone());
            cursor = match cursor.forced_tail(ctx)? {
                Some(next) => next,
                None => break,
            };
        }
        Ok(out)
    }

    /// Number of cells; forces the spine.
    pub fn length(&self, ctx: &mut ExecContext) -> Outcome<usize> {
        let mut len = 0usize;
        let mut cursor = self.clone();
        while !cursor.is_nil() {
            len += 1;
            cursor = match cursor.forced_tail(ctx)? {
                Some(next) => next,
                None => break,
            };
        }
        Ok(len)
    }

    /// Element at `index`, forcing only the first `index` tails.
    pub fn nth(&self, index: usize, ctx: &mut ExecContext) -> Outcome<Option<Value>> {
        let mut cursor = self.clone();
        for _ in 0..index {
            cursor = match cursor.forced_tail(ctx)? {
                Some(next) => next,
                None => return Ok(None),
            };
        }
        Ok(cursor.head().cloned())
    }
}

/// Compares the already-evaluated prefix; pending tails compare by identity.
impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        let mut left = self.clone();
        let mut right = other.clone();
        loop {
            if left.ptr_eq(&right) {
                return true;
            }
            let (Some(l), Some(r)) = (left.node(), right.node()) else {
                return false;
            };
            if l.head != r.head {
                return false;
            }
            let (next_left, next_right) = match (l.tail.resolved(), r.tail.resolved()) {
                (Value::List(a), Value::List(b)) => (a.clone(), b.clone()),
                (a, b) => return a == b,
            };
            left = next_left;
            right = next_right;
        }
    }
}
