//! Statically-shaped records and the [`Datum`] unit accepted by writers.

use std::mem;

use super::{GenericRecord, Value};
use crate::codec::Encoder;
use crate::error::{EncodeError, Result};
use crate::schema::Schema;

/// Anything that can be encoded as one datum of an encoder's schema.
pub trait Datum {
    /// Appends the encoding of `self` to `out`.
    fn write_datum(&self, encoder: &Encoder, out: &mut Vec<u8>) -> Result<()>;
}

impl Datum for Value {
    fn write_datum(&self, encoder: &Encoder, out: &mut Vec<u8>) -> Result<()> {
        encoder.encode_to_vec(self, out)
    }
}

impl Datum for GenericRecord {
    fn write_datum(&self, encoder: &Encoder, out: &mut Vec<u8>) -> Result<()> {
        encoder.encode_record_fields(self.fields(), out)
    }
}

/// A record type with a fixed field set known at compile time.
///
/// Fields are addressed by their position in [`SpecificRecord::schema`].
/// Implementations usually keep the schema in a `OnceLock`:
///
/// ```ignore
/// fn schema() -> &'static Schema {
///     static SCHEMA: OnceLock<Schema> = OnceLock::new();
///     SCHEMA.get_or_init(|| Schema::parse(USER_SCHEMA).expect("valid schema"))
/// }
/// ```
pub trait SpecificRecord: Default {
    fn schema() -> &'static Schema;

    /// Value of the field at `position`.
    fn get(&self, position: usize) -> Value;

    /// Sets the field at `position`.
    fn put(&mut self, position: usize, value: Value) -> Result<()>;

    /// Builds a record value with every field in schema order.
    fn to_value(&self) -> Value {
        match Self::schema() {
            Schema::Record(record) => Value::Record(
                record
                    .fields
                    .iter()
                    .map(|field| (field.name.clone(), self.get(field.position)))
                    .collect(),
            ),
            _ => Value::Null,
        }
    }

    /// Builds a record from a decoded value.
    fn from_value(value: Value) -> Result<Self> {
        let mut record = Self::default();
        record.assign(value)?;
        Ok(record)
    }

    /// Overwrites the fields present in `value`, matching them by name.
    ///
    /// Names the schema does not declare are rejected.
    fn assign(&mut self, mut value: Value) -> Result<()> {
        self.assign_from(&mut value)
    }

    /// Like [`assign`](Self::assign), but moves the field values out of
    /// `value` and leaves its record shape behind, with every field null, so
    /// the caller can decode the next record into it.
    fn assign_from(&mut self, value: &mut Value) -> Result<()> {
        let record = match Self::schema() {
            Schema::Record(record) => record,
            other => {
                return Err(EncodeError::TypeMismatch {
                    expected: "record".to_string(),
                    found: other.type_name().to_string(),
                }
                .into())
            }
        };
        let found = value.type_name();
        let fields = record_fields(value).ok_or_else(|| EncodeError::TypeMismatch {
            expected: record.name.fullname(),
            found: found.to_string(),
        })?;
        for (name, field_value) in fields.iter_mut() {
            let position = record
                .field_position(name)
                .ok_or_else(|| EncodeError::UnknownField {
                    record: record.name.fullname(),
                    field: name.clone(),
                })?;
            self.put(position, mem::replace(field_value, Value::Null))?;
        }
        Ok(())
    }
}

fn record_fields(value: &mut Value) -> Option<&mut Vec<(String, Value)>> {
    match value {
        Value::Union(_, inner) => record_fields(inner),
        Value::Record(fields) => Some(fields),
        _ => None,
    }
}

impl<T: SpecificRecord> Datum for T {
    fn write_datum(&self, encoder: &Encoder, out: &mut Vec<u8>) -> Result<()> {
        encoder.encode_to_vec(&self.to_value(), out)
    }
}
