//! Codec error types.

use std::io::ErrorKind;

use thiserror::Error;

use crate::schema::Fingerprint;

/// Errors surfaced by every public operation of the crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed schema text
    #[error(transparent)]
    SchemaParse(#[from] SchemaParseError),

    /// Incompatible writer/reader schema pair
    #[error(transparent)]
    Resolution(#[from] SchemaResolutionError),

    /// Truncated or structurally invalid byte stream
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Value does not conform to its schema
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Bad container framing
    #[error(transparent)]
    Container(#[from] ContainerFormatError),

    /// Sink or source failure unrelated to the encoded content
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Schema text could not be turned into a [`crate::Schema`].
#[derive(Error, Debug)]
pub enum SchemaParseError {
    #[error("Invalid schema JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unknown type '{name}'")]
    UnknownType { name: String },

    #[error("Invalid name '{name}'")]
    InvalidName { name: String },

    #[error("Duplicate field '{field}' in record '{record}'")]
    DuplicateField { record: String, field: String },

    #[error("Duplicate symbol '{symbol}' in enum '{name}'")]
    DuplicateSymbol { name: String, symbol: String },

    #[error("Type '{name}' is defined more than once")]
    DuplicateName { name: String },

    #[error("{kind} schema is missing the '{attribute}' attribute")]
    MissingAttribute {
        kind: &'static str,
        attribute: &'static str,
    },

    #[error("Invalid '{attribute}' attribute: {message}")]
    InvalidAttribute {
        attribute: &'static str,
        message: String,
    },

    #[error("Invalid union: {0}")]
    InvalidUnion(String),
}

/// Writer and reader schemas cannot be reconciled.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaResolutionError {
    #[error("Writer type {writer} cannot be read as {reader}")]
    TypeMismatch { writer: String, reader: String },

    #[error("Writer type '{writer}' does not match reader type '{reader}'")]
    NameMismatch { writer: String, reader: String },

    #[error("Fixed '{name}' has size {writer} in writer but {reader} in reader")]
    FixedSizeMismatch {
        name: String,
        writer: usize,
        reader: usize,
    },

    #[error("Reader field '{field}' of record '{record}' is absent from the writer and has no default")]
    MissingDefault { record: String, field: String },

    #[error("Invalid default for field '{field}': {message}")]
    InvalidDefault { field: String, message: String },

    #[error("No reader union branch accepts writer type {writer}")]
    NoMatchingBranch { writer: String },

    #[error("Enum '{name}' symbol '{symbol}' is unknown to the reader and no default is declared")]
    UnknownEnumSymbol { name: String, symbol: String },

    #[error("Writer union branch {index} cannot be read: {message}")]
    UnresolvedBranch { index: usize, message: String },

    #[error("Schema fingerprint mismatch: expected {expected}, found {found}")]
    FingerprintMismatch {
        expected: Fingerprint,
        found: Fingerprint,
    },
}

/// Encoded bytes do not match the schema they are decoded against.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Unexpected end of input while reading {context}")]
    Truncated { context: &'static str },

    #[error("Variable-length integer longer than 10 bytes")]
    VarintOverflow,

    #[error("Value {0} does not fit in an int")]
    IntOutOfRange(i64),

    #[error("Invalid boolean byte {0:#04x}")]
    InvalidBoolean(u8),

    #[error("String is not valid UTF-8")]
    InvalidUtf8,

    #[error("Negative length {0}")]
    NegativeLength(i64),

    #[error("Length {length} exceeds allocation limit {limit}")]
    LengthTooLarge { length: u64, limit: usize },

    #[error("Union index {index} out of range for {branches} branches")]
    UnionIndexOutOfRange { index: i64, branches: usize },

    #[error("Enum ordinal {ordinal} out of range for {symbols} symbols")]
    EnumOrdinalOutOfRange { ordinal: i64, symbols: usize },

    #[error("Reference to undefined type '{0}'")]
    UnresolvedReference(String),

    #[error("Missing single-object marker")]
    BadSingleObjectHeader,
}

/// A value failed validation against the schema it was encoded with.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("Type mismatch: expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Symbol '{symbol}' is not part of enum '{name}'")]
    UnknownSymbol { name: String, symbol: String },

    #[error("Union index {index} out of range for {branches} branches")]
    UnionIndexOutOfRange { index: u32, branches: usize },

    #[error("No union branch accepts a {found} value")]
    NoMatchingBranch { found: String },

    #[error("Fixed '{name}' expects {expected} bytes, got {found}")]
    FixedSizeMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Required field '{field}' missing from record '{record}'")]
    MissingField { record: String, field: String },

    #[error("Field '{field}' is not part of record '{record}'")]
    UnknownField { record: String, field: String },

    #[error("Invalid default for field '{field}': {message}")]
    InvalidDefault { field: String, message: String },

    #[error("Reference to undefined type '{0}'")]
    UnresolvedReference(String),
}

/// Container header or block framing is damaged or unsupported.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContainerFormatError {
    #[error("Not a container file: bad magic {0:02x?}")]
    BadMagic([u8; 4]),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Header fingerprint {declared} does not match embedded schema {computed}")]
    FingerprintMismatch {
        declared: Fingerprint,
        computed: Fingerprint,
    },

    #[error("Unsupported codec '{0}'")]
    UnsupportedCodec(String),

    #[error("Metadata key '{0}' is reserved")]
    ReservedMetadataKey(String),

    #[error("Sync marker mismatch after block {block}")]
    SyncMismatch { block: u64 },

    #[error("Corrupt header for block {block}: {message}")]
    CorruptBlock { block: u64, message: String },

    #[error("Block of {size} bytes exceeds limit {limit}")]
    BlockTooLarge { size: u64, limit: usize },

    #[error("Reader failed earlier; call resync() before reading again")]
    NeedsResync,

    #[error("No more records")]
    Exhausted,

    #[error("Container writer failed while writing a block; the sink may hold a partial block")]
    WriterFailed,
}

/// Maps a read failure into a codec error.
///
/// End of input while a value is still expected is a truncation, not an I/O
/// fault; every other kind is passed through unchanged.
pub fn classify_read_error(error: std::io::Error, context: &'static str) -> Error {
    match error.kind() {
        ErrorKind::UnexpectedEof => DecodeError::Truncated { context }.into(),
        _ => Error::Io(error),
    }
}
