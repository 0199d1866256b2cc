//! Shared fixtures for the integration tests.

use std::fs::File;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use recodec_core::container::Metadata;
use recodec_core::error::EncodeError;
use recodec_core::{ContainerReader, ContainerWriter, GenericRecord, Result, Schema, SpecificRecord, Value};

pub const USER_SCHEMA: &str = r#"{
    "namespace": "example.avro",
    "type": "record",
    "name": "User",
    "fields": [
        {"name": "name", "type": "string"},
        {"name": "favorite_number", "type": ["null", "int"]},
        {"name": "favorite_color", "type": ["null", "string"]}
    ]
}"#;

pub fn user_schema() -> Arc<Schema> {
    Arc::new(Schema::parse(USER_SCHEMA).unwrap())
}

/// Hand-written statically-shaped user record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub name: String,
    pub favorite_number: Option<i32>,
    pub favorite_color: Option<String>,
}

impl User {
    pub fn new(name: &str, favorite_number: Option<i32>, favorite_color: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            favorite_number,
            favorite_color: favorite_color.map(str::to_string),
        }
    }
}

impl SpecificRecord for User {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| Schema::parse(USER_SCHEMA).unwrap())
    }

    fn get(&self, position: usize) -> Value {
        match position {
            0 => self.name.clone().into(),
            1 => self.favorite_number.into(),
            2 => self.favorite_color.clone().into(),
            _ => Value::Null,
        }
    }

    fn put(&mut self, position: usize, value: Value) -> Result<()> {
        match position {
            0 => self.name = value.try_into()?,
            1 => self.favorite_number = value.into_nullable().map(i32::try_from).transpose()?,
            2 => self.favorite_color = value.into_nullable().map(String::try_from).transpose()?,
            _ => {
                return Err(EncodeError::UnknownField {
                    record: "example.avro.User".to_string(),
                    field: position.to_string(),
                }
                .into())
            }
        }
        Ok(())
    }
}

pub fn alyssa(schema: &Arc<Schema>) -> GenericRecord {
    let mut record = GenericRecord::new(Arc::clone(schema));
    record.put("name", "Alyssa");
    record.put("favorite_number", 256);
    record
}

pub fn ben(schema: &Arc<Schema>) -> GenericRecord {
    let mut record = GenericRecord::new(Arc::clone(schema));
    record.put("name", "Ben");
    record.put("favorite_number", 7);
    record.put("favorite_color", "red");
    record
}

/// Writes `values` to a new container file at `path`.
pub fn write_file(path: &Path, schema: &Schema, values: &[Value]) {
    let file = File::create(path).unwrap();
    let mut writer = ContainerWriter::create(schema, Metadata::new(), file).unwrap();
    for value in values {
        writer.append_value(value).unwrap();
    }
    writer.close().unwrap();
}

pub fn read_file(path: &Path) -> Vec<Value> {
    let reader = ContainerReader::open(File::open(path).unwrap()).unwrap();
    reader.collect::<Result<Vec<_>>>().unwrap()
}
