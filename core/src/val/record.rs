use std::sync::Arc;

use super::Value;

/// Ordered named fields. Names may repeat; lookups by name see the first
/// entry, iteration and rendering see all of them in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(Arc<str>, Value)>,
}

impl Record {
    pub fn new(fields: Vec<(Arc<str>, Value)>) -> Self {
        Self { fields }
    }

    pub fn from_pairs<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(name, value)| (Arc::from(name.as_ref()), value))
                .collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Value)> {
        self.fields.iter().map(|(name, value)| (name, value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_ref())
    }

    // Records are small; a linear scan keeps declaration order authoritative.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(field, _)| field.as_ref() == name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.position(name).map(|idx| &self.fields[idx].1)
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.fields.get(index).map(|(_, value)| value)
    }

    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|(name, _)| name.as_ref())
    }

    /// `self`'s fields followed by `other`'s; duplicates stay in place.
    pub fn concat(&self, other: &Record) -> Record {
        let mut fields = Vec::with_capacity(self.len() + other.len());
        fields.extend(self.fields.iter().cloned());
        fields.extend(other.fields.iter().cloned());
        Record { fields }
    }

    /// Copy with the entry at `index` replaced.
    pub fn with_index(&self, index: usize, value: Value) -> Option<Record> {
        if index >= self.fields.len() {
            return None;
        }
        let mut fields = self.fields.clone();
        fields[index].1 = value;
        Some(Record { fields })
    }
}
