//! Schema-driven binary encoding.

use std::io::Write;

use super::varint::write_long;
use crate::config::EncoderConfig;
use crate::error::{EncodeError, Result};
use crate::schema::{NameTable, RecordSchema, Schema, UnionSchema};
use crate::value::Value;

/// Encodes values against one schema.
///
/// Values are validated while they are written; a value that fails leaves
/// no bytes behind in the output.
#[derive(Debug, Clone)]
pub struct Encoder {
    schema: Schema,
    names: NameTable,
    config: EncoderConfig,
}

impl Encoder {
    pub fn new(schema: &Schema) -> Self {
        Self::with_config(schema, EncoderConfig::default())
    }

    pub fn with_config(schema: &Schema, config: EncoderConfig) -> Self {
        Self {
            schema: schema.clone(),
            names: NameTable::build(schema),
            config,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> EncoderConfig {
        self.config
    }

    /// Encodes `value` and writes it to `out` in a single `write_all`.
    pub fn encode<W: Write + ?Sized>(&self, value: &Value, out: &mut W) -> Result<()> {
        let mut buf = Vec::new();
        self.write_value(&self.schema, value, &mut buf)?;
        out.write_all(&buf)?;
        Ok(())
    }

    /// Appends the encoding of `value` to `out`.
    ///
    /// On error `out` is truncated back to its original length.
    pub fn encode_to_vec(&self, value: &Value, out: &mut Vec<u8>) -> Result<()> {
        let mark = out.len();
        self.write_value(&self.schema, value, out).inspect_err(|_| {
            out.truncate(mark);
        })
    }

    /// Appends the encoding of a record given as named fields.
    ///
    /// The root schema must be a record. On error `out` is truncated back to
    /// its original length.
    pub fn encode_record_fields(&self, fields: &[(String, Value)], out: &mut Vec<u8>) -> Result<()> {
        let mark = out.len();
        let result = match self.resolve(&self.schema) {
            Ok(Schema::Record(record)) => self.write_record(record, fields, out),
            Ok(other) => Err(EncodeError::TypeMismatch {
                expected: other.describe(),
                found: "record".to_string(),
            }
            .into()),
            Err(e) => Err(e),
        };
        result.inspect_err(|_| out.truncate(mark))
    }

    fn resolve<'a>(&'a self, schema: &'a Schema) -> Result<&'a Schema> {
        match schema {
            Schema::Ref(name) => self
                .names
                .get(name)
                .ok_or_else(|| EncodeError::UnresolvedReference(name.fullname()).into()),
            other => Ok(other),
        }
    }

    fn write_value(&self, schema: &Schema, value: &Value, out: &mut Vec<u8>) -> Result<()> {
        let schema = self.resolve(schema)?;

        // An explicit branch only means something against a union.
        if let (Value::Union(_, inner), false) = (value, matches!(schema, Schema::Union(_))) {
            return self.write_value(schema, inner, out);
        }

        match (schema, value) {
            (Schema::Null, Value::Null) => {}
            (Schema::Boolean, Value::Boolean(b)) => out.push(*b as u8),
            (Schema::Int, Value::Int(i)) => write_long(out, *i as i64)?,
            (Schema::Long, Value::Int(i)) => write_long(out, *i as i64)?,
            (Schema::Long, Value::Long(l)) => write_long(out, *l)?,
            (Schema::Float, Value::Int(i)) => out.extend_from_slice(&(*i as f32).to_le_bytes()),
            (Schema::Float, Value::Long(l)) => out.extend_from_slice(&(*l as f32).to_le_bytes()),
            (Schema::Float, Value::Float(f)) => out.extend_from_slice(&f.to_le_bytes()),
            (Schema::Double, Value::Int(i)) => out.extend_from_slice(&(*i as f64).to_le_bytes()),
            (Schema::Double, Value::Long(l)) => out.extend_from_slice(&(*l as f64).to_le_bytes()),
            (Schema::Double, Value::Float(f)) => out.extend_from_slice(&(*f as f64).to_le_bytes()),
            (Schema::Double, Value::Double(d)) => out.extend_from_slice(&d.to_le_bytes()),
            (Schema::Bytes, Value::Bytes(b)) => write_bytes(out, b)?,
            (Schema::String, Value::String(s)) => write_bytes(out, s.as_bytes())?,
            (Schema::Fixed(fixed), Value::Fixed(b) | Value::Bytes(b)) => {
                if b.len() != fixed.size {
                    return Err(EncodeError::FixedSizeMismatch {
                        name: fixed.name.fullname(),
                        expected: fixed.size,
                        found: b.len(),
                    }
                    .into());
                }
                out.extend_from_slice(b);
            }
            (Schema::Enum(e), Value::Enum(_, symbol) | Value::String(symbol)) => {
                let ordinal = e.ordinal(symbol).ok_or_else(|| EncodeError::UnknownSymbol {
                    name: e.name.fullname(),
                    symbol: symbol.clone(),
                })?;
                write_long(out, ordinal as i64)?;
            }
            (Schema::Array(items), Value::Array(values)) => {
                self.write_blocks(out, values.len(), |block| {
                    for item in values {
                        self.write_value(items, item, block)?;
                    }
                    Ok(())
                })?;
            }
            (Schema::Map(values), Value::Map(entries)) => {
                // Sorted keys keep the encoding deterministic.
                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort();
                self.write_blocks(out, keys.len(), |block| {
                    for key in keys {
                        write_bytes(block, key.as_bytes())?;
                        self.write_value(values, &entries[key], block)?;
                    }
                    Ok(())
                })?;
            }
            (Schema::Union(union), Value::Union(index, inner)) => {
                let variant = union.variants().get(*index as usize).ok_or(
                    EncodeError::UnionIndexOutOfRange {
                        index: *index,
                        branches: union.variants().len(),
                    },
                )?;
                write_long(out, *index as i64)?;
                self.write_value(variant, inner, out)?;
            }
            (Schema::Union(union), other) => {
                let (index, encoded) = self.select_branch(union, other)?;
                write_long(out, index as i64)?;
                out.extend_from_slice(&encoded);
            }
            (Schema::Record(record), Value::Record(fields)) => {
                self.write_record(record, fields, out)?
            }
            (schema, value) => {
                return Err(EncodeError::TypeMismatch {
                    expected: schema.describe(),
                    found: value.type_name().to_string(),
                }
                .into())
            }
        }
        Ok(())
    }

    /// Picks the branch for a value that does not name one: the first branch
    /// of exactly the value's type, else the first branch that accepts it.
    ///
    /// Returns the branch index and the value encoded against that branch.
    fn select_branch(&self, union: &UnionSchema, value: &Value) -> Result<(usize, Vec<u8>)> {
        let exact = union.variants().iter().position(|variant| {
            self.resolve(variant)
                .map(|variant| exact_match(variant, value))
                .unwrap_or(false)
        });
        if let Some(index) = exact {
            let mut encoded = Vec::new();
            self.write_value(&union.variants()[index], value, &mut encoded)?;
            return Ok((index, encoded));
        }
        for (index, variant) in union.variants().iter().enumerate() {
            let mut encoded = Vec::new();
            if self.write_value(variant, value, &mut encoded).is_ok() {
                return Ok((index, encoded));
            }
        }
        Err(EncodeError::NoMatchingBranch {
            found: value.type_name().to_string(),
        }
        .into())
    }

    fn write_record(
        &self,
        record: &RecordSchema,
        fields: &[(String, Value)],
        out: &mut Vec<u8>,
    ) -> Result<()> {
        if let Some((name, _)) = fields.iter().find(|(n, _)| record.field(n).is_none()) {
            return Err(EncodeError::UnknownField {
                record: record.name.fullname(),
                field: name.clone(),
            }
            .into());
        }
        for field in &record.fields {
            match fields.iter().find(|(n, _)| *n == field.name) {
                Some((_, value)) => self.write_value(&field.schema, value, out)?,
                None => {
                    let fill = match &field.default {
                        Some(json) => Value::from_default_json(json, &field.schema, &self.names)
                            .map_err(|message| EncodeError::InvalidDefault {
                                field: field.name.clone(),
                                message,
                            })?,
                        None if self
                            .resolve(&field.schema)
                            .map(Schema::is_nullable)
                            .unwrap_or(false) =>
                        {
                            Value::Null
                        }
                        None => {
                            return Err(EncodeError::MissingField {
                                record: record.name.fullname(),
                                field: field.name.clone(),
                            }
                            .into())
                        }
                    };
                    self.write_value(&field.schema, &fill, out)?;
                }
            }
        }
        Ok(())
    }

    /// Writes `len` collection items as a single block plus the terminator.
    ///
    /// With `block_byte_sizes` the block count is negated and followed by the
    /// payload size.
    fn write_blocks<F>(&self, out: &mut Vec<u8>, len: usize, write_items: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<u8>) -> Result<()>,
    {
        if len > 0 {
            if self.config.block_byte_sizes {
                let mut block = Vec::new();
                write_items(&mut block)?;
                write_long(out, -(len as i64))?;
                write_long(out, block.len() as i64)?;
                out.extend_from_slice(&block);
            } else {
                write_long(out, len as i64)?;
                write_items(out)?;
            }
        }
        write_long(out, 0)
    }
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    write_long(out, bytes.len() as i64)?;
    out.extend_from_slice(bytes);
    Ok(())
}

/// Whether `value` has exactly the type of `schema`, without promotion.
fn exact_match(schema: &Schema, value: &Value) -> bool {
    match (schema, value) {
        (Schema::Null, Value::Null)
        | (Schema::Boolean, Value::Boolean(_))
        | (Schema::Int, Value::Int(_))
        | (Schema::Long, Value::Long(_))
        | (Schema::Float, Value::Float(_))
        | (Schema::Double, Value::Double(_))
        | (Schema::Bytes, Value::Bytes(_))
        | (Schema::String, Value::String(_))
        | (Schema::Array(_), Value::Array(_))
        | (Schema::Map(_), Value::Map(_)) => true,
        (Schema::Fixed(fixed), Value::Fixed(b)) => b.len() == fixed.size,
        (Schema::Enum(e), Value::Enum(_, symbol)) => e.ordinal(symbol).is_some(),
        (Schema::Record(record), Value::Record(fields)) => {
            fields.iter().all(|(name, _)| record.field(name).is_some())
        }
        _ => false,
    }
}
