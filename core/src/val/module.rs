use std::sync::Arc;

use super::{Record, Value};

/// A linked module as seen by running code: a name and its exported bindings.
#[derive(Debug, Clone)]
pub struct Module {
    name: Arc<str>,
    exports: Record,
}

impl Module {
    pub fn new(name: impl AsRef<str>, exports: Record) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            exports,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn exports(&self) -> &Record {
        &self.exports
    }

    pub fn export(&self, name: &str) -> Option<&Value> {
        self.exports.get(name)
    }
}
