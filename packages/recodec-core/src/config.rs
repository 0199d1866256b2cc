//! Encoder, decoder and container configuration.

/// Default block payload size that triggers an automatic flush.
pub const DEFAULT_SYNC_INTERVAL: usize = 64_000;

/// Default ceiling for a single length-prefixed allocation during decode.
pub const DEFAULT_MAX_ALLOCATION: usize = 512 * 1024 * 1024;

/// Encoder configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Write arrays and maps as negative-count blocks followed by their byte
    /// size, so readers can skip them without decoding the items.
    pub block_byte_sizes: bool,
}

/// Limits applied while decoding untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Largest bytes/string/collection length accepted from a length prefix
    pub max_allocation: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_allocation: DEFAULT_MAX_ALLOCATION,
        }
    }
}

/// Container writer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    /// Block payload size in bytes at which `append` flushes the block
    pub sync_interval: usize,
    /// Encoder settings for every appended record
    pub encoder: EncoderConfig,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            sync_interval: DEFAULT_SYNC_INTERVAL,
            encoder: EncoderConfig::default(),
        }
    }
}

/// Container reader configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Limits for record decoding
    pub limits: DecodeLimits,
    /// Largest block payload the reader will buffer
    pub max_block_bytes: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            limits: DecodeLimits::default(),
            max_block_bytes: DEFAULT_MAX_ALLOCATION,
        }
    }
}
