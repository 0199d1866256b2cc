//! Lookup of named type definitions reachable from a schema.

use std::collections::HashMap;

use super::{Name, Schema};

/// Every record, enum and fixed definition reachable from a root schema,
/// keyed by full name, so that [`Schema::Ref`] nodes can be followed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameTable {
    types: HashMap<String, Schema>,
}

impl NameTable {
    /// Collects the named definitions of `schema`.
    pub fn build(schema: &Schema) -> Self {
        let mut table = Self::default();
        table.collect(schema);
        table
    }

    fn collect(&mut self, schema: &Schema) {
        match schema {
            Schema::Record(record) => {
                self.types
                    .entry(record.name.fullname())
                    .or_insert_with(|| schema.clone());
                for field in &record.fields {
                    self.collect(&field.schema);
                }
            }
            Schema::Enum(e) => {
                self.types
                    .entry(e.name.fullname())
                    .or_insert_with(|| schema.clone());
            }
            Schema::Fixed(f) => {
                self.types
                    .entry(f.name.fullname())
                    .or_insert_with(|| schema.clone());
            }
            Schema::Array(items) | Schema::Map(items) => self.collect(items),
            Schema::Union(union) => {
                for variant in union.variants() {
                    self.collect(variant);
                }
            }
            _ => {}
        }
    }

    /// Returns the definition registered under `name`.
    pub fn get(&self, name: &Name) -> Option<&Schema> {
        self.types.get(&name.fullname())
    }

    /// Follows a reference; any other schema is returned unchanged.
    ///
    /// Returns `None` for a reference to an unknown name.
    pub fn resolve<'a>(&'a self, schema: &'a Schema) -> Option<&'a Schema> {
        match schema {
            Schema::Ref(name) => self.get(name),
            other => Some(other),
        }
    }

    /// Number of named definitions.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
