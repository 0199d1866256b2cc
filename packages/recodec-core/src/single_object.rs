//! Single-object encoding: one datum tagged with its schema fingerprint.
//!
//! ```text
//! 0xC3 0x01 | 8-byte little-endian fingerprint | datum
//! ```

use crate::codec::{Decoder, Encoder};
use crate::error::{DecodeError, Result, SchemaResolutionError};
use crate::resolver::resolve;
use crate::schema::{Fingerprint, Schema};
use crate::value::Value;

/// Two-byte marker that starts every single-object frame.
pub const MARKER: [u8; 2] = [0xC3, 0x01];

/// Marker plus fingerprint.
pub const HEADER_SIZE: usize = 10;

/// Frames `value` with the marker and the fingerprint of `schema`.
pub fn encode(value: &Value, schema: &Schema) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(HEADER_SIZE);
    out.extend_from_slice(&MARKER);
    out.extend_from_slice(&schema.fingerprint().to_le_bytes());
    Encoder::new(schema).encode_to_vec(value, &mut out)?;
    Ok(out)
}

/// Reads the fingerprint of a frame without decoding its datum.
pub fn fingerprint(bytes: &[u8]) -> Result<Fingerprint> {
    if bytes.len() < HEADER_SIZE || bytes[..2] != MARKER {
        return Err(DecodeError::BadSingleObjectHeader.into());
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[2..HEADER_SIZE]);
    Ok(Fingerprint::from_le_bytes(raw))
}

/// Decodes a frame written with `schema`.
///
/// Fails if the frame's fingerprint is not the fingerprint of `schema`.
pub fn decode(schema: &Schema, bytes: &[u8]) -> Result<Value> {
    check_fingerprint(schema, bytes)?;
    let mut datum = &bytes[HEADER_SIZE..];
    Decoder::new(schema).decode(&mut datum)
}

/// Decodes a frame written with `writer` into the shape of `reader`.
pub fn decode_with(writer: &Schema, reader: &Schema, bytes: &[u8]) -> Result<Value> {
    check_fingerprint(writer, bytes)?;
    let plan = resolve(writer, reader)?;
    let mut datum = &bytes[HEADER_SIZE..];
    plan.decode(&mut datum)
}

fn check_fingerprint(schema: &Schema, bytes: &[u8]) -> Result<()> {
    let found = fingerprint(bytes)?;
    let expected = schema.fingerprint();
    if found != expected {
        return Err(SchemaResolutionError::FingerprintMismatch { expected, found }.into());
    }
    Ok(())
}
