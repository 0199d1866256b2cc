//! Dynamically-typed values and the record types built on them.

mod generic;
mod json;
mod specific;

use std::collections::HashMap;
use std::fmt;

use crate::error::EncodeError;

pub use generic::GenericRecord;
pub use specific::{Datum, SpecificRecord};

/// A value of any schema type.
///
/// Records hold their fields as ordered `(name, value)` pairs. Values decoded
/// against a schema list them in schema order; values built by callers may
/// use any order since the encoder looks fields up by name.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    Fixed(Vec<u8>),
    /// Ordinal and symbol
    Enum(u32, String),
    /// Selected branch index and its value
    Union(u32, Box<Value>),
    Array(Vec<Value>),
    Map(HashMap<String, Value>),
    Record(Vec<(String, Value)>),
}

impl Value {
    /// Type keyword used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Fixed(_) => "fixed",
            Value::Enum(..) => "enum",
            Value::Union(..) => "union",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }

    /// Strips union wrappers.
    pub fn unwrap_union(self) -> Value {
        match self {
            Value::Union(_, inner) => inner.unwrap_union(),
            other => other,
        }
    }

    /// Strips union wrappers and maps null to `None`.
    pub fn into_nullable(self) -> Option<Value> {
        match self.unwrap_union() {
            Value::Null => None,
            other => Some(other),
        }
    }

    /// Looks up a record field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            Value::Union(_, inner) => inner.field(name),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Enum(_, symbol) => Some(symbol),
            Value::Union(_, inner) => inner.as_str(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i as i64),
            Value::Long(l) => Some(*l),
            Value::Union(_, inner) => inner.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Long(l) => Some(*l as f64),
            Value::Float(f) => Some(*f as f64),
            Value::Double(d) => Some(*d),
            Value::Union(_, inner) => inner.as_f64(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Union(_, inner) => inner.is_null(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

fn mismatch(expected: &str, found: &Value) -> EncodeError {
    EncodeError::TypeMismatch {
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}

impl TryFrom<Value> for bool {
    type Error = EncodeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.unwrap_union() {
            Value::Boolean(b) => Ok(b),
            other => Err(mismatch("boolean", &other)),
        }
    }
}

impl TryFrom<Value> for i32 {
    type Error = EncodeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.unwrap_union() {
            Value::Int(i) => Ok(i),
            other => Err(mismatch("int", &other)),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = EncodeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.unwrap_union() {
            Value::Int(i) => Ok(i as i64),
            Value::Long(l) => Ok(l),
            other => Err(mismatch("long", &other)),
        }
    }
}

impl TryFrom<Value> for f32 {
    type Error = EncodeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.unwrap_union() {
            Value::Float(f) => Ok(f),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = EncodeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.unwrap_union() {
            Value::Float(f) => Ok(f as f64),
            Value::Double(d) => Ok(d),
            other => Err(mismatch("double", &other)),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = EncodeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.unwrap_union() {
            Value::String(s) => Ok(s),
            Value::Enum(_, symbol) => Ok(symbol),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl TryFrom<Value> for Vec<u8> {
    type Error = EncodeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.unwrap_union() {
            Value::Bytes(b) | Value::Fixed(b) => Ok(b),
            other => Err(mismatch("bytes", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("red")), Value::String("red".into()));
    }

    #[test]
    fn test_unwrap_nested_union() {
        let value = Value::Union(1, Box::new(Value::Int(7)));
        assert_eq!(value.as_i64(), Some(7));
        assert_eq!(value.clone().into_nullable(), Some(Value::Int(7)));
        assert_eq!(i32::try_from(value).unwrap(), 7);
        assert_eq!(Value::Union(0, Box::new(Value::Null)).into_nullable(), None);
    }

    #[test]
    fn test_try_from_mismatch() {
        let err = String::try_from(Value::Int(1)).unwrap_err();
        assert_eq!(
            err,
            EncodeError::TypeMismatch {
                expected: "string".into(),
                found: "int".into()
            }
        );
    }

    #[test]
    fn test_record_field_lookup() {
        let record = Value::Record(vec![
            ("name".into(), Value::from("Ben")),
            ("favorite_number".into(), Value::Union(1, Box::new(Value::Int(7)))),
        ]);
        assert_eq!(record.field("name").and_then(Value::as_str), Some("Ben"));
        assert_eq!(record.field("favorite_number").and_then(Value::as_i64), Some(7));
        assert!(record.field("missing").is_none());
    }
}
