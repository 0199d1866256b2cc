//! Schema-driven binary record codec.
//!
//! Provides the schema model and parser, the tag-free binary encoding,
//! writer/reader schema resolution, the block-framed container file format,
//! and the generic/specific record values passed through them.

pub mod codec;
pub mod config;
pub mod container;
pub mod error;
pub mod resolver;
pub mod schema;
pub mod single_object;
pub mod value;

pub use codec::{decode, decode_into, encode, from_bytes, to_bytes, Decoder, Encoder};
pub use container::{ContainerReader, ContainerWriter};
pub use error::{Error, Result};
pub use resolver::{resolve, DecodePlan};
pub use schema::{Fingerprint, Schema};
pub use value::{Datum, GenericRecord, SpecificRecord, Value};
