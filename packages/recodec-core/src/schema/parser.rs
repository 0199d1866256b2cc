//! JSON schema text parser.

use std::collections::HashSet;

use serde_json::{Map, Value as JsonValue};

use super::{EnumSchema, FixedSchema, Name, RecordField, RecordSchema, Schema, UnionSchema};
use crate::error::SchemaParseError;

type Result<T> = std::result::Result<T, SchemaParseError>;

/// Parses schema JSON into a [`Schema`].
///
/// Named types may be referenced by name once defined; later uses become
/// [`Schema::Ref`] nodes. A parser instance tracks the names defined so far,
/// so one instance should parse exactly one document.
#[derive(Debug, Default)]
pub struct SchemaParser {
    defined: HashSet<String>,
}

impl SchemaParser {
    /// Parses schema text.
    pub fn parse_str(text: &str) -> Result<Schema> {
        let json: JsonValue = serde_json::from_str(text)?;
        Self::default().parse(&json, None)
    }

    /// Parses one schema node within the enclosing namespace.
    pub fn parse(&mut self, json: &JsonValue, namespace: Option<&str>) -> Result<Schema> {
        match json {
            JsonValue::String(type_name) => self.parse_type_name(type_name, namespace),
            JsonValue::Object(map) => self.parse_complex(map, namespace),
            JsonValue::Array(items) => self.parse_union(items, namespace),
            other => Err(SchemaParseError::InvalidAttribute {
                attribute: "type",
                message: format!("expected a string, object or array, got {}", other),
            }),
        }
    }

    fn parse_type_name(&mut self, type_name: &str, namespace: Option<&str>) -> Result<Schema> {
        if let Some(primitive) = primitive(type_name) {
            return Ok(primitive);
        }

        // Unqualified references resolve against the enclosing namespace first.
        if !type_name.contains('.') {
            if let Some(namespace) = namespace {
                let qualified = format!("{}.{}", namespace, type_name);
                if self.defined.contains(&qualified) {
                    return Ok(Schema::Ref(Name::new(&qualified)));
                }
            }
        }
        if self.defined.contains(type_name) {
            return Ok(Schema::Ref(Name::new(type_name)));
        }

        Err(SchemaParseError::UnknownType {
            name: type_name.to_string(),
        })
    }

    fn parse_complex(&mut self, map: &Map<String, JsonValue>, namespace: Option<&str>) -> Result<Schema> {
        let type_value = map.get("type").ok_or(SchemaParseError::MissingAttribute {
            kind: "schema",
            attribute: "type",
        })?;

        let type_name = match type_value {
            JsonValue::String(s) => s.as_str(),
            // {"type": {...}} or {"type": [...]} wraps another schema
            nested => return self.parse(nested, namespace),
        };

        match type_name {
            "record" | "error" => self.parse_record(map, namespace),
            "enum" => self.parse_enum(map, namespace),
            "fixed" => self.parse_fixed(map, namespace),
            "array" => {
                let items = map.get("items").ok_or(SchemaParseError::MissingAttribute {
                    kind: "array",
                    attribute: "items",
                })?;
                Ok(Schema::Array(Box::new(self.parse(items, namespace)?)))
            }
            "map" => {
                let values = map.get("values").ok_or(SchemaParseError::MissingAttribute {
                    kind: "map",
                    attribute: "values",
                })?;
                Ok(Schema::Map(Box::new(self.parse(values, namespace)?)))
            }
            other => self.parse_type_name(other, namespace),
        }
    }

    fn parse_union(&mut self, items: &[JsonValue], namespace: Option<&str>) -> Result<Schema> {
        let variants = items
            .iter()
            .map(|item| self.parse(item, namespace))
            .collect::<Result<Vec<_>>>()?;
        Ok(Schema::Union(UnionSchema::new(variants)?))
    }

    fn parse_record(&mut self, map: &Map<String, JsonValue>, namespace: Option<&str>) -> Result<Schema> {
        let name = self.parse_name(map, "record", namespace)?;
        let aliases = parse_aliases(map, name.namespace.as_deref())?;
        // Register before the fields so they can refer back to the record.
        self.define(&name)?;

        let field_values = map
            .get("fields")
            .ok_or(SchemaParseError::MissingAttribute {
                kind: "record",
                attribute: "fields",
            })?
            .as_array()
            .ok_or_else(|| SchemaParseError::InvalidAttribute {
                attribute: "fields",
                message: "expected an array".to_string(),
            })?;

        let mut fields = Vec::with_capacity(field_values.len());
        for (position, field_value) in field_values.iter().enumerate() {
            fields.push(self.parse_field(field_value, position, name.namespace.as_deref())?);
        }

        let mut record = RecordSchema::new(name, fields)?;
        record.aliases = aliases;
        record.doc = optional_string(map, "doc")?;
        Ok(Schema::Record(record))
    }

    fn parse_field(
        &mut self,
        json: &JsonValue,
        position: usize,
        namespace: Option<&str>,
    ) -> Result<RecordField> {
        let map = json
            .as_object()
            .ok_or_else(|| SchemaParseError::InvalidAttribute {
                attribute: "fields",
                message: format!("field definition must be an object, got {}", json),
            })?;

        let name = map
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or(SchemaParseError::MissingAttribute {
                kind: "field",
                attribute: "name",
            })?;
        validate_identifier(name)?;

        let type_value = map.get("type").ok_or(SchemaParseError::MissingAttribute {
            kind: "field",
            attribute: "type",
        })?;
        let schema = self.parse(type_value, namespace)?;

        let aliases = match map.get("aliases") {
            Some(value) => string_list(value, "aliases")?,
            None => Vec::new(),
        };

        Ok(RecordField {
            name: name.to_string(),
            doc: optional_string(map, "doc")?,
            aliases,
            schema,
            default: map.get("default").cloned(),
            position,
        })
    }

    fn parse_enum(&mut self, map: &Map<String, JsonValue>, namespace: Option<&str>) -> Result<Schema> {
        let name = self.parse_name(map, "enum", namespace)?;
        let aliases = parse_aliases(map, name.namespace.as_deref())?;
        self.define(&name)?;

        let symbols = match map.get("symbols") {
            Some(value) => string_list(value, "symbols")?,
            None => {
                return Err(SchemaParseError::MissingAttribute {
                    kind: "enum",
                    attribute: "symbols",
                })
            }
        };
        for symbol in &symbols {
            validate_identifier(symbol)?;
        }

        let mut schema = EnumSchema::new(name, symbols)?;
        schema.aliases = aliases;
        schema.doc = optional_string(map, "doc")?;
        schema.default = optional_string(map, "default")?;
        if let Some(default) = &schema.default {
            if schema.ordinal(default).is_none() {
                return Err(SchemaParseError::InvalidAttribute {
                    attribute: "default",
                    message: format!("'{}' is not a symbol of enum '{}'", default, schema.name),
                });
            }
        }
        Ok(Schema::Enum(schema))
    }

    fn parse_fixed(&mut self, map: &Map<String, JsonValue>, namespace: Option<&str>) -> Result<Schema> {
        let name = self.parse_name(map, "fixed", namespace)?;
        let aliases = parse_aliases(map, name.namespace.as_deref())?;
        self.define(&name)?;

        let size = map
            .get("size")
            .ok_or(SchemaParseError::MissingAttribute {
                kind: "fixed",
                attribute: "size",
            })?
            .as_u64()
            .ok_or_else(|| SchemaParseError::InvalidAttribute {
                attribute: "size",
                message: "expected a non-negative integer".to_string(),
            })?;

        Ok(Schema::Fixed(FixedSchema {
            name,
            aliases,
            doc: optional_string(map, "doc")?,
            size: size as usize,
        }))
    }

    /// Reads `name`/`namespace` of a named type.
    ///
    /// A dotted name carries its own namespace; otherwise an explicit
    /// `namespace` attribute wins over the enclosing one.
    fn parse_name(
        &self,
        map: &Map<String, JsonValue>,
        kind: &'static str,
        enclosing: Option<&str>,
    ) -> Result<Name> {
        let raw = map
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or(SchemaParseError::MissingAttribute {
                kind,
                attribute: "name",
            })?;

        let name = if raw.contains('.') {
            Name::new(raw)
        } else {
            let namespace = match map.get("namespace") {
                Some(JsonValue::String(ns)) => (!ns.is_empty()).then(|| ns.clone()),
                Some(JsonValue::Null) => None,
                Some(other) => {
                    return Err(SchemaParseError::InvalidAttribute {
                        attribute: "namespace",
                        message: format!("expected a string, got {}", other),
                    })
                }
                None => enclosing.map(|ns| ns.to_string()),
            };
            Name {
                name: raw.to_string(),
                namespace,
            }
        };

        validate_name(&name)?;
        Ok(name)
    }

    fn define(&mut self, name: &Name) -> Result<()> {
        let fullname = name.fullname();
        if primitive(&fullname).is_some() || !self.defined.insert(fullname.clone()) {
            return Err(SchemaParseError::DuplicateName { name: fullname });
        }
        Ok(())
    }
}

fn primitive(type_name: &str) -> Option<Schema> {
    match type_name {
        "null" => Some(Schema::Null),
        "boolean" => Some(Schema::Boolean),
        "int" => Some(Schema::Int),
        "long" => Some(Schema::Long),
        "float" => Some(Schema::Float),
        "double" => Some(Schema::Double),
        "bytes" => Some(Schema::Bytes),
        "string" => Some(Schema::String),
        _ => None,
    }
}

/// Checks `[A-Za-z_][A-Za-z0-9_]*`.
fn validate_identifier(ident: &str) -> Result<()> {
    let mut chars = ident.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(SchemaParseError::InvalidName {
            name: ident.to_string(),
        })
    }
}

fn validate_name(name: &Name) -> Result<()> {
    validate_identifier(&name.name)?;
    if let Some(namespace) = &name.namespace {
        for part in namespace.split('.') {
            validate_identifier(part).map_err(|_| SchemaParseError::InvalidName {
                name: name.fullname(),
            })?;
        }
    }
    Ok(())
}

fn parse_aliases(map: &Map<String, JsonValue>, namespace: Option<&str>) -> Result<Vec<Name>> {
    let Some(value) = map.get("aliases") else {
        return Ok(Vec::new());
    };
    string_list(value, "aliases")?
        .into_iter()
        .map(|alias| {
            let name = if alias.contains('.') {
                Name::new(&alias)
            } else {
                Name {
                    name: alias,
                    namespace: namespace.map(|ns| ns.to_string()),
                }
            };
            validate_name(&name)?;
            Ok(name)
        })
        .collect()
}

fn string_list(value: &JsonValue, attribute: &'static str) -> Result<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| SchemaParseError::InvalidAttribute {
            attribute,
            message: "expected an array of strings".to_string(),
        })?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| SchemaParseError::InvalidAttribute {
                    attribute,
                    message: format!("expected a string, got {}", item),
                })
        })
        .collect()
}

fn optional_string(map: &Map<String, JsonValue>, attribute: &'static str) -> Result<Option<String>> {
    match map.get(attribute) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(SchemaParseError::InvalidAttribute {
            attribute,
            message: format!("expected a string, got {}", other),
        }),
    }
}
