//! Schema model, parser, canonical form and fingerprinting.

mod canonical;
mod fingerprint;
mod names;
mod parser;


use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde_json::Value as JsonValue;

use crate::error::{Result, SchemaParseError};

pub use fingerprint::Fingerprint;
pub use names::NameTable;
pub use parser::SchemaParser;

/// Fully-qualified name of a record, enum or fixed type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    /// Unqualified name
    pub name: String,
    /// Dotted namespace, if any
    pub namespace: Option<String>,
}

impl Name {
    /// Creates a name from a possibly dotted string.
    pub fn new(raw: &str) -> Self {
        match raw.rsplit_once('.') {
            Some((namespace, name)) => Self {
                name: name.to_string(),
                namespace: (!namespace.is_empty()).then(|| namespace.to_string()),
            },
            None => Self {
                name: raw.to_string(),
                namespace: None,
            },
        }
    }

    /// Returns `namespace.name`, or just `name` without a namespace.
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}.{}", namespace, self.name),
            None => self.name.clone(),
        }
    }

    /// Whether `other` names the same type, either fully or by its
    /// unqualified part.
    pub fn matches(&self, other: &Name) -> bool {
        self.fullname() == other.fullname() || self.name == other.name
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}.{}", namespace, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// One field of a record schema.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: String,
    pub doc: Option<String>,
    pub aliases: Vec<String>,
    pub schema: Schema,
    /// Default as written in the schema text
    pub default: Option<JsonValue>,
    /// Zero-based position; determines binary layout
    pub position: usize,
}

impl RecordField {
    /// Creates a field without doc, aliases or default.
    pub fn new(name: impl Into<String>, schema: Schema, position: usize) -> Self {
        Self {
            name: name.into(),
            doc: None,
            aliases: Vec::new(),
            schema,
            default: None,
            position,
        }
    }

    /// Sets the field default.
    pub fn with_default(mut self, default: JsonValue) -> Self {
        self.default = Some(default);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub name: Name,
    pub aliases: Vec<Name>,
    pub doc: Option<String>,
    pub fields: Vec<RecordField>,
    lookup: HashMap<String, usize>,
}

impl RecordSchema {
    /// Builds a record schema, rejecting duplicate field names.
    ///
    /// Field positions are reassigned from their order in `fields`.
    pub fn new(
        name: Name,
        mut fields: Vec<RecordField>,
    ) -> std::result::Result<Self, SchemaParseError> {
        let mut lookup = HashMap::with_capacity(fields.len());
        for (position, field) in fields.iter_mut().enumerate() {
            field.position = position;
            if lookup.insert(field.name.clone(), position).is_some() {
                return Err(SchemaParseError::DuplicateField {
                    record: name.fullname(),
                    field: field.name.clone(),
                });
            }
        }
        Ok(Self {
            name,
            aliases: Vec::new(),
            doc: None,
            fields,
            lookup,
        })
    }

    /// Looks up a field position by name.
    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.field_position(name).map(|pos| &self.fields[pos])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    pub name: Name,
    pub aliases: Vec<Name>,
    pub doc: Option<String>,
    pub symbols: Vec<String>,
    /// Symbol substituted during resolution for writer symbols the reader lacks
    pub default: Option<String>,
}

impl EnumSchema {
    /// Builds an enum schema, rejecting duplicate symbols.
    pub fn new(name: Name, symbols: Vec<String>) -> std::result::Result<Self, SchemaParseError> {
        for (i, symbol) in symbols.iter().enumerate() {
            if symbols[..i].contains(symbol) {
                return Err(SchemaParseError::DuplicateSymbol {
                    name: name.fullname(),
                    symbol: symbol.clone(),
                });
            }
        }
        Ok(Self {
            name,
            aliases: Vec::new(),
            doc: None,
            symbols,
            default: None,
        })
    }

    /// Returns the ordinal of `symbol`.
    pub fn ordinal(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    pub name: Name,
    pub aliases: Vec<Name>,
    pub doc: Option<String>,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionSchema {
    variants: Vec<Schema>,
}

impl UnionSchema {
    /// Builds a union, rejecting nested unions and duplicate alternatives.
    pub fn new(variants: Vec<Schema>) -> std::result::Result<Self, SchemaParseError> {
        let mut seen: Vec<String> = Vec::with_capacity(variants.len());
        for variant in &variants {
            if let Schema::Union(_) = variant {
                return Err(SchemaParseError::InvalidUnion(
                    "unions may not immediately contain other unions".to_string(),
                ));
            }
            let key = variant.union_key();
            if seen.contains(&key) {
                return Err(SchemaParseError::InvalidUnion(format!(
                    "duplicate alternative {}",
                    key
                )));
            }
            seen.push(key);
        }
        Ok(Self { variants })
    }

    pub fn variants(&self) -> &[Schema] {
        &self.variants
    }

    /// Index of the `null` alternative, if present.
    pub fn null_index(&self) -> Option<usize> {
        self.variants.iter().position(|v| matches!(v, Schema::Null))
    }
}

/// Structural type descriptor governing binary layout.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Array(Box<Schema>),
    Map(Box<Schema>),
    Union(UnionSchema),
    Record(RecordSchema),
    Enum(EnumSchema),
    Fixed(FixedSchema),
    /// Reference to a named type defined elsewhere in the same schema
    Ref(Name),
}

impl Schema {
    /// Parses a schema from its JSON text.
    pub fn parse(text: &str) -> std::result::Result<Schema, SchemaParseError> {
        SchemaParser::parse_str(text)
    }

    /// Parses a schema from an already-decoded JSON document.
    pub fn parse_value(json: &JsonValue) -> std::result::Result<Schema, SchemaParseError> {
        SchemaParser::default().parse(json, None)
    }

    /// Reads and parses a schema file.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Schema> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text)?)
    }

    /// Renders the full JSON definition, including docs, aliases and defaults.
    pub fn to_json(&self) -> JsonValue {
        canonical::to_json(self)
    }

    /// Renders the Parsing Canonical Form.
    pub fn canonical_form(&self) -> String {
        canonical::canonical_form(self)
    }

    /// 64-bit Rabin fingerprint of the canonical form.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self.canonical_form().as_bytes())
    }

    /// Name of a named type or reference.
    pub fn name(&self) -> Option<&Name> {
        match self {
            Schema::Record(r) => Some(&r.name),
            Schema::Enum(e) => Some(&e.name),
            Schema::Fixed(f) => Some(&f.name),
            Schema::Ref(name) => Some(name),
            _ => None,
        }
    }

    /// Type keyword of this schema.
    pub fn type_name(&self) -> &'static str {
        match self {
            Schema::Null => "null",
            Schema::Boolean => "boolean",
            Schema::Int => "int",
            Schema::Long => "long",
            Schema::Float => "float",
            Schema::Double => "double",
            Schema::Bytes => "bytes",
            Schema::String => "string",
            Schema::Array(_) => "array",
            Schema::Map(_) => "map",
            Schema::Union(_) => "union",
            Schema::Record(_) => "record",
            Schema::Enum(_) => "enum",
            Schema::Fixed(_) => "fixed",
            Schema::Ref(_) => "reference",
        }
    }

    /// Human-readable description used in error messages.
    pub fn describe(&self) -> String {
        match self.name() {
            Some(name) => format!("{} '{}'", self.type_name(), name),
            None => self.type_name().to_string(),
        }
    }

    /// Whether a missing value can be written as null.
    pub fn is_nullable(&self) -> bool {
        match self {
            Schema::Null => true,
            Schema::Union(union) => union.null_index().is_some(),
            _ => false,
        }
    }

    /// Identity of this schema inside a union: the type keyword for unnamed
    /// types, the full name for named ones.
    fn union_key(&self) -> String {
        match self.name() {
            Some(name) => name.fullname(),
            None => self.type_name().to_string(),
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl std::str::FromStr for Schema {
    type Err = SchemaParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Schema::parse(s)
    }
}
