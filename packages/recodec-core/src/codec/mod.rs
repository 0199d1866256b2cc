//! Tag-free binary encoding of values against a schema.
//!
//! The one-shot functions build a fresh [`Encoder`] or [`Decoder`] per call;
//! hot paths should keep one around instead.

mod decode;
mod encode;
pub mod varint;


use std::io::{Read, Write};

use crate::error::Result;
use crate::schema::Schema;
use crate::value::Value;

pub use decode::Decoder;
pub use encode::Encoder;

pub(crate) use decode::{
    check_items, read_block_header, read_boolean, read_bytes_slot, read_double, read_exact_into, read_float,
    read_len, read_string, read_string_slot, set_enum, skip_bytes,
};

/// Encodes `value` against `schema` into `out`.
pub fn encode<W: Write + ?Sized>(value: &Value, schema: &Schema, out: &mut W) -> Result<()> {
    Encoder::new(schema).encode(value, out)
}

/// Encodes `value` against `schema` into a new buffer.
pub fn to_bytes(value: &Value, schema: &Schema) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    Encoder::new(schema).encode_to_vec(value, &mut out)?;
    Ok(out)
}

/// Decodes one value of `schema` from `input`.
pub fn decode<R: Read + ?Sized>(schema: &Schema, input: &mut R) -> Result<Value> {
    Decoder::new(schema).decode(input)
}

/// Decodes one value of `schema` over `target`, reusing its allocations.
pub fn decode_into<R: Read + ?Sized>(schema: &Schema, input: &mut R, target: &mut Value) -> Result<()> {
    Decoder::new(schema).decode_into(input, target)
}

/// Decodes one value of `schema` from the front of `bytes`.
///
/// Bytes after the value are ignored.
pub fn from_bytes(schema: &Schema, bytes: &[u8]) -> Result<Value> {
    let mut input = bytes;
    decode(schema, &mut input)
}
