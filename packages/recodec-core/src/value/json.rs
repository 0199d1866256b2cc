//! Conversions between [`Value`] and JSON.

use std::collections::HashMap;

use serde_json::{Map, Number, Value as JsonValue};

use super::Value;
use crate::schema::{NameTable, Schema};

impl Value {
    /// Renders the value as JSON for display.
    ///
    /// Union wrappers are dropped, enums render as their symbol, bytes and
    /// fixed render as strings of code points 0-255.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Long(l) => JsonValue::from(*l),
            Value::Float(f) => float_json(*f as f64),
            Value::Double(d) => float_json(*d),
            Value::Bytes(b) | Value::Fixed(b) => JsonValue::String(bytes_to_string(b)),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Enum(_, symbol) => JsonValue::String(symbol.clone()),
            Value::Union(_, inner) => inner.to_json(),
            Value::Array(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => {
                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort();
                let map: Map<String, JsonValue> = keys
                    .into_iter()
                    .map(|k| (k.clone(), entries[k].to_json()))
                    .collect();
                JsonValue::Object(map)
            }
            Value::Record(fields) => {
                let map: Map<String, JsonValue> = fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect();
                JsonValue::Object(map)
            }
        }
    }

    /// Converts a schema default into a value of `schema`.
    ///
    /// A union default always describes the union's first branch.
    pub fn from_default_json(
        json: &JsonValue,
        schema: &Schema,
        names: &NameTable,
    ) -> Result<Value, String> {
        let schema = names
            .resolve(schema)
            .ok_or_else(|| format!("unknown type {}", schema.describe()))?;

        let unexpected = || format!("{} is not a valid {}", json, schema.describe());

        match schema {
            Schema::Null => json.is_null().then_some(Value::Null).ok_or_else(unexpected),
            Schema::Boolean => json.as_bool().map(Value::Boolean).ok_or_else(unexpected),
            Schema::Int => json
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .map(Value::Int)
                .ok_or_else(unexpected),
            Schema::Long => json.as_i64().map(Value::Long).ok_or_else(unexpected),
            Schema::Float => json
                .as_f64()
                .map(|f| Value::Float(f as f32))
                .ok_or_else(unexpected),
            Schema::Double => json.as_f64().map(Value::Double).ok_or_else(unexpected),
            Schema::Bytes => json
                .as_str()
                .and_then(string_to_bytes)
                .map(Value::Bytes)
                .ok_or_else(unexpected),
            Schema::Fixed(fixed) => json
                .as_str()
                .and_then(string_to_bytes)
                .filter(|b| b.len() == fixed.size)
                .map(Value::Fixed)
                .ok_or_else(unexpected),
            Schema::String => json
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(unexpected),
            Schema::Enum(e) => {
                let symbol = json.as_str().ok_or_else(unexpected)?;
                let ordinal = e.ordinal(symbol).ok_or_else(unexpected)?;
                Ok(Value::Enum(ordinal as u32, symbol.to_string()))
            }
            Schema::Array(items) => json
                .as_array()
                .ok_or_else(unexpected)?
                .iter()
                .map(|item| Value::from_default_json(item, items, names))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Schema::Map(values) => json
                .as_object()
                .ok_or_else(unexpected)?
                .iter()
                .map(|(k, v)| Ok((k.clone(), Value::from_default_json(v, values, names)?)))
                .collect::<Result<HashMap<_, _>, String>>()
                .map(Value::Map),
            Schema::Union(union) => {
                let first = union
                    .variants()
                    .first()
                    .ok_or_else(|| "empty union has no default".to_string())?;
                let value = Value::from_default_json(json, first, names)?;
                Ok(Value::Union(0, Box::new(value)))
            }
            Schema::Record(record) => {
                let object = json.as_object().ok_or_else(unexpected)?;
                let mut fields = Vec::with_capacity(record.fields.len());
                for field in &record.fields {
                    let value = match (object.get(&field.name), &field.default) {
                        (Some(v), _) | (None, Some(v)) => {
                            Value::from_default_json(v, &field.schema, names)?
                        }
                        (None, None) => {
                            return Err(format!(
                                "default for record '{}' lacks field '{}'",
                                record.name, field.name
                            ))
                        }
                    };
                    fields.push((field.name.clone(), value));
                }
                Ok(Value::Record(fields))
            }
            Schema::Ref(name) => Err(format!("unknown type {}", name)),
        }
    }
}

fn float_json(f: f64) -> JsonValue {
    match Number::from_f64(f) {
        Some(n) => JsonValue::Number(n),
        None => JsonValue::String(f.to_string()),
    }
}

fn bytes_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn string_to_bytes(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(c as u32).ok()).collect()
}
