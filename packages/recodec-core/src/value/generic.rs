//! Generic records: named values validated against their schema at encode time.

use std::sync::Arc;

use super::Value;
use crate::error::{EncodeError, Result};
use crate::schema::Schema;

/// A record whose field set is only checked when it is encoded.
///
/// Fields may be put in any order and may be left out; the encoder writes
/// them in schema order, substitutes defaults or null for absent fields, and
/// rejects fields the schema does not declare.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericRecord {
    schema: Arc<Schema>,
    fields: Vec<(String, Value)>,
}

impl GenericRecord {
    /// Creates an empty record for `schema`.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            fields: Vec::new(),
        }
    }

    /// Wraps a decoded record value.
    pub fn from_value(schema: Arc<Schema>, value: Value) -> Result<Self> {
        match value.unwrap_union() {
            Value::Record(fields) => Ok(Self { schema, fields }),
            other => Err(EncodeError::TypeMismatch {
                expected: "record".to_string(),
                found: other.type_name().to_string(),
            }
            .into()),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Sets a field, returning its previous value.
    pub fn put(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        match self.get_mut(&name) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((name, value));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let pos = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Field storage handed to the decoder for in-place reuse.
    pub(crate) fn fields_mut(&mut self) -> &mut Vec<(String, Value)> {
        &mut self.fields
    }

    /// Copies the fields into a record value.
    pub fn to_value(&self) -> Value {
        Value::Record(self.fields.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Record(self.fields)
    }
}

impl std::fmt::Display for GenericRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Schema order when the schema is a record, insertion order otherwise.
        match self.schema.as_ref() {
            Schema::Record(record) => {
                let ordered: Vec<(String, Value)> = record
                    .fields
                    .iter()
                    .filter_map(|field| {
                        self.get(&field.name)
                            .map(|v| (field.name.clone(), v.clone()))
                    })
                    .collect();
                write!(f, "{}", Value::Record(ordered))
            }
            _ => write!(f, "{}", Value::Record(self.fields.clone())),
        }
    }
}
