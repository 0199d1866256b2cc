//! Self-describing container files.
//!
//! A container starts with a header holding the writer schema, a metadata
//! map and a random sync marker, followed by any number of blocks:
//!
//! ```text
//! Header:  "Obj\x01" | long-prefixed schema JSON | metadata map<bytes> | 16-byte sync
//! Block:   long record count | long payload size | payload | 16-byte sync
//! ```
//!
//! Every block ends with the header's sync marker, which lets a reader
//! detect damage and find the next intact block.

mod reader;
mod rewind;
mod writer;


use std::collections::HashMap;
use std::io::{Read, Write};

use rand::RngCore;

use crate::codec::varint::write_long;
use crate::codec::{check_items, read_block_header, read_exact_into, read_len, read_string};
use crate::config::DecodeLimits;
use crate::error::{classify_read_error, ContainerFormatError, Error, Result};
use crate::schema::{Fingerprint, Schema};

pub use reader::ContainerReader;
pub use writer::ContainerWriter;

/// File magic: "Obj" followed by format version 1.
pub const MAGIC: [u8; 4] = *b"Obj\x01";

/// Length of the sync marker.
pub const SYNC_SIZE: usize = 16;

/// Metadata key naming the block codec.
pub const CODEC_KEY: &str = "avro.codec";

/// Metadata key holding the little-endian schema fingerprint.
pub const FINGERPRINT_KEY: &str = "avro.fingerprint";

/// Prefix reserved for keys written by the container itself.
pub const RESERVED_PREFIX: &str = "avro.";

/// The only supported block codec.
pub const NULL_CODEC: &str = "null";

/// Header metadata: string keys, raw byte values.
pub type Metadata = HashMap<String, Vec<u8>>;

/// Parsed or freshly built container header.
#[derive(Debug, Clone)]
pub(crate) struct Header {
    pub schema: Schema,
    pub metadata: Metadata,
    pub sync: [u8; SYNC_SIZE],
}

impl Header {
    /// Builds the header for a new file from caller metadata.
    pub fn new(schema: &Schema, user_metadata: Metadata) -> Result<Self> {
        if let Some(key) = user_metadata.keys().find(|k| k.starts_with(RESERVED_PREFIX)) {
            return Err(ContainerFormatError::ReservedMetadataKey(key.clone()).into());
        }
        let mut metadata = user_metadata;
        metadata.insert(CODEC_KEY.to_string(), NULL_CODEC.as_bytes().to_vec());
        metadata.insert(
            FINGERPRINT_KEY.to_string(),
            schema.fingerprint().to_le_bytes().to_vec(),
        );

        let mut sync = [0u8; SYNC_SIZE];
        rand::thread_rng().fill_bytes(&mut sync);

        Ok(Self {
            schema: schema.clone(),
            metadata,
            sync,
        })
    }

    /// Serializes the header.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC);

        let schema_text = self.schema.to_json().to_string();
        write_long(&mut out, schema_text.len() as i64)?;
        out.extend_from_slice(schema_text.as_bytes());

        let mut keys: Vec<&String> = self.metadata.keys().collect();
        keys.sort();
        if !keys.is_empty() {
            write_long(&mut out, keys.len() as i64)?;
            for key in keys {
                let value = &self.metadata[key];
                write_long(&mut out, key.len() as i64)?;
                out.extend_from_slice(key.as_bytes());
                write_long(&mut out, value.len() as i64)?;
                out.extend_from_slice(value);
            }
        }
        write_long(&mut out, 0)?;

        out.extend_from_slice(&self.sync);
        Ok(out)
    }

    pub fn write<W: Write + ?Sized>(&self, out: &mut W) -> Result<usize> {
        let bytes = self.to_bytes()?;
        out.write_all(&bytes)?;
        Ok(bytes.len())
    }

    /// Reads and validates a header.
    ///
    /// Truncated or malformed framing is reported as
    /// [`ContainerFormatError::InvalidHeader`].
    pub fn read<R: Read + ?Sized>(input: &mut R, limits: &DecodeLimits) -> Result<Self> {
        Self::read_fields(input, limits).map_err(|e| match e {
            Error::Decode(decode) => ContainerFormatError::InvalidHeader(decode.to_string()).into(),
            other => other,
        })
    }

    fn read_fields<R: Read + ?Sized>(input: &mut R, limits: &DecodeLimits) -> Result<Self> {
        let mut magic = [0u8; 4];
        input
            .read_exact(&mut magic)
            .map_err(|e| classify_read_error(e, "magic"))?;
        if magic != MAGIC {
            return Err(ContainerFormatError::BadMagic(magic).into());
        }

        let schema_text = read_string(input, limits)?;
        let schema = Schema::parse(&schema_text)
            .map_err(|e| ContainerFormatError::InvalidHeader(format!("embedded schema: {}", e)))?;

        let mut metadata = Metadata::new();
        let mut entries = 0;
        while let Some((count, _)) = read_block_header(input, limits)? {
            entries += count;
            check_items::<(String, Vec<u8>)>(entries, limits)?;
            for _ in 0..count {
                let key = read_string(input, limits)?;
                let len = read_len(input, limits)?;
                let mut value = Vec::new();
                read_exact_into(input, len, &mut value, "metadata value")?;
                metadata.insert(key, value);
            }
        }

        let mut sync = [0u8; SYNC_SIZE];
        input
            .read_exact(&mut sync)
            .map_err(|e| classify_read_error(e, "sync marker"))?;

        let header = Self {
            schema,
            metadata,
            sync,
        };
        header.validate()?;
        Ok(header)
    }

    fn validate(&self) -> Result<()> {
        // An absent codec means the null codec.
        if let Some(codec) = self.metadata.get(CODEC_KEY) {
            if codec.as_slice() != NULL_CODEC.as_bytes() {
                return Err(
                    ContainerFormatError::UnsupportedCodec(String::from_utf8_lossy(codec).into_owned())
                        .into(),
                );
            }
        }
        if let Some(declared) = self.metadata.get(FINGERPRINT_KEY) {
            let bytes: [u8; 8] = declared.as_slice().try_into().map_err(|_| {
                ContainerFormatError::InvalidHeader(format!(
                    "fingerprint must be 8 bytes, found {}",
                    declared.len()
                ))
            })?;
            let declared = Fingerprint::from_le_bytes(bytes);
            let computed = self.schema.fingerprint();
            if declared != computed {
                return Err(ContainerFormatError::FingerprintMismatch { declared, computed }.into());
            }
        }
        Ok(())
    }
}
