use std::sync::Arc;

use super::Value;

/// Tagged alternative: a string tag plus a payload that defaults to unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    tag: Arc<str>,
    value: Value,
}

impl Variant {
    pub fn new(tag: impl AsRef<str>, value: Value) -> Self {
        Self {
            tag: Arc::from(tag.as_ref()),
            value,
        }
    }

    #[inline]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[inline]
    pub fn tag_arc(&self) -> &Arc<str> {
        &self.tag
    }

    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[inline]
    pub fn has_payload(&self) -> bool {
        !self.value.resolved().is_unit()
    }
}
