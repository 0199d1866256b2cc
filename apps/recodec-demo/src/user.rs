//! Statically-shaped user record.

use std::fmt;
use std::sync::OnceLock;

use recodec_core::error::EncodeError;
use recodec_core::{Result, Schema, SpecificRecord, Value};

const USER_SCHEMA: &str = include_str!("../schemas/user.avsc");

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
        SCHEMA.get_or_init(|| Schema::parse(USER_SCHEMA).expect("bundled user schema is valid"))
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

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}
