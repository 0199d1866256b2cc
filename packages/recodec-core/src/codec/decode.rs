//! Schema-driven binary decoding.

use std::collections::HashMap;
use std::io::{self, Read};

use super::varint::{read_int, read_long};
use crate::config::DecodeLimits;
use crate::error::{classify_read_error, DecodeError, Result};
use crate::schema::{NameTable, Schema};
use crate::value::Value;

/// Decodes values written with one schema.
///
/// The name table is built once, so a decoder should be reused across
/// records of the same schema.
#[derive(Debug, Clone)]
pub struct Decoder {
    schema: Schema,
    names: NameTable,
    limits: DecodeLimits,
}

impl Decoder {
    pub fn new(schema: &Schema) -> Self {
        Self::with_limits(schema, DecodeLimits::default())
    }

    pub fn with_limits(schema: &Schema, limits: DecodeLimits) -> Self {
        Self {
            schema: schema.clone(),
            names: NameTable::build(schema),
            limits,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Decodes one value into a freshly allocated [`Value`].
    pub fn decode<R: Read + ?Sized>(&self, input: &mut R) -> Result<Value> {
        let mut value = Value::Null;
        self.decode_into(input, &mut value)?;
        Ok(value)
    }

    /// Decodes one value over `target`, reusing its allocations where the
    /// shape matches.
    ///
    /// On error `target` holds a partially decoded value.
    pub fn decode_into<R: Read + ?Sized>(&self, input: &mut R, target: &mut Value) -> Result<()> {
        self.read_value(&self.schema, input, target)
    }

    fn read_value<R: Read + ?Sized>(
        &self,
        schema: &Schema,
        input: &mut R,
        target: &mut Value,
    ) -> Result<()> {
        match schema {
            Schema::Null => *target = Value::Null,
            Schema::Boolean => *target = Value::Boolean(read_boolean(input)?),
            Schema::Int => *target = Value::Int(read_int(input)?),
            Schema::Long => *target = Value::Long(read_long(input)?),
            Schema::Float => *target = Value::Float(read_float(input)?),
            Schema::Double => *target = Value::Double(read_double(input)?),
            Schema::Bytes => {
                let len = read_len(input, &self.limits)?;
                read_bytes_slot(input, len, target, Value::Bytes)?;
            }
            Schema::Fixed(fixed) => read_bytes_slot(input, fixed.size, target, Value::Fixed)?,
            Schema::String => read_string_slot(input, &self.limits, target)?,
            Schema::Enum(e) => {
                let ordinal = read_long(input)?;
                let symbol = usize::try_from(ordinal)
                    .ok()
                    .and_then(|i| e.symbols.get(i))
                    .ok_or(DecodeError::EnumOrdinalOutOfRange {
                        ordinal,
                        symbols: e.symbols.len(),
                    })?;
                set_enum(target, ordinal as u32, symbol);
            }
            Schema::Union(union) => {
                let index = read_long(input)?;
                let variant = usize::try_from(index)
                    .ok()
                    .and_then(|i| union.variants().get(i))
                    .ok_or(DecodeError::UnionIndexOutOfRange {
                        index,
                        branches: union.variants().len(),
                    })?;
                match target {
                    Value::Union(i, inner) => {
                        *i = index as u32;
                        self.read_value(variant, input, inner)?;
                    }
                    _ => {
                        let mut inner = Value::Null;
                        self.read_value(variant, input, &mut inner)?;
                        *target = Value::Union(index as u32, Box::new(inner));
                    }
                }
            }
            Schema::Array(items) => {
                if !matches!(target, Value::Array(_)) {
                    *target = Value::Array(Vec::new());
                }
                if let Value::Array(vec) = target {
                    let mut n: usize = 0;
                    while let Some((count, _)) = read_block_header(input, &self.limits)? {
                        check_items::<Value>(n.saturating_add(count), &self.limits)?;
                        for _ in 0..count {
                            if n < vec.len() {
                                self.read_value(items, input, &mut vec[n])?;
                            } else {
                                let mut item = Value::Null;
                                self.read_value(items, input, &mut item)?;
                                vec.push(item);
                            }
                            n += 1;
                        }
                    }
                    vec.truncate(n);
                }
            }
            Schema::Map(values) => {
                let mut map = match std::mem::replace(target, Value::Null) {
                    Value::Map(mut map) => {
                        map.clear();
                        map
                    }
                    _ => HashMap::new(),
                };
                let mut n = 0;
                while let Some((count, _)) = read_block_header(input, &self.limits)? {
                    n += count;
                    check_items::<(String, Value)>(n, &self.limits)?;
                    for _ in 0..count {
                        let key = read_string(input, &self.limits)?;
                        let mut value = Value::Null;
                        self.read_value(values, input, &mut value)?;
                        map.insert(key, value);
                    }
                }
                *target = Value::Map(map);
            }
            Schema::Record(record) => {
                let reusable = matches!(target, Value::Record(fields)
                    if fields.len() == record.fields.len()
                        && fields.iter().zip(&record.fields).all(|((n, _), f)| *n == f.name));
                if !reusable {
                    *target = Value::Record(
                        record
                            .fields
                            .iter()
                            .map(|f| (f.name.clone(), Value::Null))
                            .collect(),
                    );
                }
                if let Value::Record(fields) = target {
                    for (field, (_, slot)) in record.fields.iter().zip(fields.iter_mut()) {
                        self.read_value(&field.schema, input, slot)?;
                    }
                }
            }
            Schema::Ref(name) => {
                let definition = self
                    .names
                    .get(name)
                    .ok_or_else(|| DecodeError::UnresolvedReference(name.fullname()))?;
                self.read_value(definition, input, target)?;
            }
        }
        Ok(())
    }
}

pub(crate) fn read_boolean<R: Read + ?Sized>(input: &mut R) -> Result<bool> {
    let mut byte = [0u8; 1];
    input
        .read_exact(&mut byte)
        .map_err(|e| classify_read_error(e, "boolean"))?;
    match byte[0] {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(DecodeError::InvalidBoolean(other).into()),
    }
}

pub(crate) fn read_float<R: Read + ?Sized>(input: &mut R) -> Result<f32> {
    let mut bytes = [0u8; 4];
    input
        .read_exact(&mut bytes)
        .map_err(|e| classify_read_error(e, "float"))?;
    Ok(f32::from_le_bytes(bytes))
}

pub(crate) fn read_double<R: Read + ?Sized>(input: &mut R) -> Result<f64> {
    let mut bytes = [0u8; 8];
    input
        .read_exact(&mut bytes)
        .map_err(|e| classify_read_error(e, "double"))?;
    Ok(f64::from_le_bytes(bytes))
}

/// Reads a length prefix and checks it against the allocation limit.
pub(crate) fn read_len<R: Read + ?Sized>(input: &mut R, limits: &DecodeLimits) -> Result<usize> {
    let len = read_long(input)?;
    if len < 0 {
        return Err(DecodeError::NegativeLength(len).into());
    }
    if len as u64 > limits.max_allocation as u64 {
        return Err(DecodeError::LengthTooLarge {
            length: len as u64,
            limit: limits.max_allocation,
        }
        .into());
    }
    Ok(len as usize)
}

/// Reads exactly `len` bytes, appending to `buf`.
///
/// The buffer grows with the data actually read, so a corrupt length on a
/// short input fails with truncation rather than a large allocation.
pub(crate) fn read_exact_into<R: Read + ?Sized>(
    input: &mut R,
    len: usize,
    buf: &mut Vec<u8>,
    context: &'static str,
) -> Result<()> {
    let read = (&mut *input)
        .take(len as u64)
        .read_to_end(buf)
        .map_err(|e| classify_read_error(e, context))?;
    if read < len {
        return Err(DecodeError::Truncated { context }.into());
    }
    Ok(())
}

pub(crate) fn read_string<R: Read + ?Sized>(input: &mut R, limits: &DecodeLimits) -> Result<String> {
    let len = read_len(input, limits)?;
    let mut buf = Vec::new();
    read_exact_into(input, len, &mut buf, "string")?;
    String::from_utf8(buf).map_err(|_| DecodeError::InvalidUtf8.into())
}

/// Decodes a string into `target`, reusing its buffer when it already
/// holds a string.
pub(crate) fn read_string_slot<R: Read + ?Sized>(
    input: &mut R,
    limits: &DecodeLimits,
    target: &mut Value,
) -> Result<()> {
    let len = read_len(input, limits)?;
    let mut buf = match std::mem::replace(target, Value::Null) {
        Value::String(s) => s.into_bytes(),
        _ => Vec::new(),
    };
    buf.clear();
    read_exact_into(input, len, &mut buf, "string")?;
    let s = String::from_utf8(buf).map_err(|_| DecodeError::InvalidUtf8)?;
    *target = Value::String(s);
    Ok(())
}

/// Decodes `len` raw bytes into `target` as the variant built by `wrap`,
/// reusing the existing byte buffer of a bytes or fixed value.
pub(crate) fn read_bytes_slot<R: Read + ?Sized>(
    input: &mut R,
    len: usize,
    target: &mut Value,
    wrap: fn(Vec<u8>) -> Value,
) -> Result<()> {
    let mut buf = match std::mem::replace(target, Value::Null) {
        Value::Bytes(b) | Value::Fixed(b) => b,
        _ => Vec::new(),
    };
    buf.clear();
    read_exact_into(input, len, &mut buf, "bytes")?;
    *target = wrap(buf);
    Ok(())
}

pub(crate) fn set_enum(target: &mut Value, ordinal: u32, symbol: &str) {
    match target {
        Value::Enum(i, s) => {
            *i = ordinal;
            s.clear();
            s.push_str(symbol);
        }
        _ => *target = Value::Enum(ordinal, symbol.to_string()),
    }
}

/// Reads an array/map block header.
///
/// Returns `None` for the terminating zero-count block, otherwise the item
/// count and, for negative-count blocks, the declared byte size.
pub(crate) fn read_block_header<R: Read + ?Sized>(
    input: &mut R,
    limits: &DecodeLimits,
) -> Result<Option<(usize, Option<usize>)>> {
    let raw = read_long(input)?;
    if raw == 0 {
        return Ok(None);
    }
    let (count, byte_size) = if raw < 0 {
        let count = raw
            .checked_neg()
            .ok_or(DecodeError::NegativeLength(raw))?;
        let size = read_len(input, limits)?;
        (count, Some(size))
    } else {
        (raw, None)
    };
    if count as u64 > limits.max_allocation as u64 {
        return Err(DecodeError::LengthTooLarge {
            length: count as u64,
            limit: limits.max_allocation,
        }
        .into());
    }
    Ok(Some((count as usize, byte_size)))
}

/// Checks that `items` decoded slots of `T` fit in the allocation limit.
///
/// Collection counts are bounded by the memory their slots take, since
/// zero-width items cost no input bytes.
pub(crate) fn check_items<T>(items: usize, limits: &DecodeLimits) -> Result<()> {
    let bytes = items.saturating_mul(std::mem::size_of::<T>());
    if bytes > limits.max_allocation {
        return Err(DecodeError::LengthTooLarge {
            length: bytes as u64,
            limit: limits.max_allocation,
        }
        .into());
    }
    Ok(())
}

/// Discards exactly `len` bytes.
pub(crate) fn skip_bytes<R: Read + ?Sized>(input: &mut R, len: usize) -> Result<()> {
    let skipped = io::copy(&mut (&mut *input).take(len as u64), &mut io::sink())
        .map_err(|e| classify_read_error(e, "skipped bytes"))?;
    if (skipped as usize) < len {
        return Err(DecodeError::Truncated {
            context: "skipped bytes",
        }
        .into());
    }
    Ok(())
}
