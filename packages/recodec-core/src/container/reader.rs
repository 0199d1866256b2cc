//! Container reader.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::mem;
use std::sync::Arc;

use tracing::{debug, warn};

use super::rewind::Rewind;
use super::{Header, Metadata, SYNC_SIZE};
use crate::codec::read_exact_into;
use crate::codec::varint::read_long;
use crate::config::ReaderConfig;
use crate::error::{classify_read_error, ContainerFormatError, Error, Result};
use crate::resolver::{resolve, DecodePlan};
use crate::schema::{Fingerprint, Schema};
use crate::value::{GenericRecord, SpecificRecord, Value};

/// Reads the records of a container, resolved against an optional reader
/// schema.
///
/// Any decode or framing error poisons the reader: later reads fail with
/// [`ContainerFormatError::NeedsResync`] until [`resync`](Self::resync) skips
/// to the next intact block.
pub struct ContainerReader<R: Read> {
    source: Rewind<R>,
    header: Header,
    reader_schema: Arc<Schema>,
    plan: DecodePlan,
    config: ReaderConfig,
    block: Vec<u8>,
    block_pos: usize,
    /// Records left in the current block
    remaining: u64,
    blocks_read: u64,
    poisoned: bool,
    finished: bool,
    /// Bytes consumed by a block whose framing was damaged
    damaged: Option<Vec<u8>>,
    /// Decode target reused by `next_specific_into`
    scratch: Value,
}

impl<R: Read> ContainerReader<R> {
    /// Opens a container and reads records with the writer's schema.
    pub fn open(source: R) -> Result<Self> {
        Self::with_config(source, None, ReaderConfig::default())
    }

    /// Opens a container and reads records as `reader_schema`.
    pub fn open_with_schema(source: R, reader_schema: Schema) -> Result<Self> {
        Self::with_config(source, Some(reader_schema), ReaderConfig::default())
    }

    /// Opens a container.
    ///
    /// # Arguments
    ///
    /// * `source` - Container bytes, starting at the header
    /// * `reader_schema` - Schema to resolve records into; the writer schema
    ///   when `None`
    /// * `config` - Decode limits and the block size ceiling
    ///
    /// # Returns
    ///
    /// A reader positioned before the first record, or an error for a bad
    /// header or a reader schema the writer schema cannot resolve to.
    pub fn with_config(source: R, reader_schema: Option<Schema>, config: ReaderConfig) -> Result<Self> {
        let mut source = Rewind::new(source);
        let header = Header::read(&mut source, &config.limits)?;
        let reader_schema = reader_schema.unwrap_or_else(|| header.schema.clone());
        let plan = resolve(&header.schema, &reader_schema)?.with_limits(config.limits);
        debug!(
            "Opened container of {} (fingerprint {}) read as {}",
            header.schema.describe(),
            header.schema.fingerprint(),
            reader_schema.describe()
        );
        Ok(Self {
            source,
            header,
            reader_schema: Arc::new(reader_schema),
            plan,
            config,
            block: Vec::new(),
            block_pos: 0,
            remaining: 0,
            blocks_read: 0,
            poisoned: false,
            finished: false,
            damaged: None,
            scratch: Value::Null,
        })
    }

    pub fn writer_schema(&self) -> &Schema {
        &self.header.schema
    }

    pub fn reader_schema(&self) -> &Schema {
        &self.reader_schema
    }

    pub fn metadata(&self) -> &Metadata {
        &self.header.metadata
    }

    /// Looks up one metadata entry.
    pub fn metadata_value(&self, key: &str) -> Option<&[u8]> {
        self.header.metadata.get(key).map(Vec::as_slice)
    }

    pub fn sync_marker(&self) -> &[u8; SYNC_SIZE] {
        &self.header.sync
    }

    /// Fingerprint of the writer schema.
    pub fn fingerprint(&self) -> Fingerprint {
        self.header.schema.fingerprint()
    }

    pub fn blocks_read(&self) -> u64 {
        self.blocks_read
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn into_inner(self) -> R {
        self.source.into_inner()
    }

    /// Whether another record can be read, loading the next block if the
    /// current one is used up.
    pub fn has_next(&mut self) -> Result<bool> {
        if self.poisoned {
            return Err(ContainerFormatError::NeedsResync.into());
        }
        while self.remaining == 0 {
            if self.finished {
                return Ok(false);
            }
            if let Err(e) = self.load_block() {
                self.poisoned = true;
                return Err(e);
            }
        }
        Ok(true)
    }

    /// Reads the next record into a fresh value.
    pub fn next_value(&mut self) -> Result<Value> {
        let mut value = Value::Null;
        self.next_into(&mut value)?;
        Ok(value)
    }

    /// Reads the next record over `target`, reusing its allocations.
    ///
    /// Whatever `target` held before is overwritten.
    pub fn next_into(&mut self, target: &mut Value) -> Result<()> {
        if !self.has_next()? {
            return Err(ContainerFormatError::Exhausted.into());
        }
        let mut input = &self.block[self.block_pos..];
        let result = self.plan.decode_into(&mut input, target);
        self.block_pos = self.block.len() - input.len();
        match result {
            Ok(()) => {
                self.remaining -= 1;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to decode record in block {}: {}", self.blocks_read, e);
                self.poisoned = true;
                Err(e)
            }
        }
    }

    /// Reads the next record as a [`GenericRecord`] of the reader schema.
    pub fn next_record(&mut self) -> Result<GenericRecord> {
        let value = self.next_value()?;
        GenericRecord::from_value(Arc::clone(&self.reader_schema), value)
    }

    /// Reads the next record into `record`, reusing its field storage.
    pub fn next_record_into(&mut self, record: &mut GenericRecord) -> Result<()> {
        let mut value = Value::Record(mem::take(record.fields_mut()));
        let result = self.next_into(&mut value);
        if let Value::Record(fields) = value {
            *record.fields_mut() = fields;
        }
        result
    }

    /// Reads the next record as a statically-shaped record.
    pub fn next_specific<T: SpecificRecord>(&mut self) -> Result<T> {
        T::from_value(self.next_value()?)
    }

    /// Reads the next record into an existing statically-shaped record.
    ///
    /// The decoded value is kept between calls, so its record skeleton is
    /// reused for the next record.
    pub fn next_specific_into<T: SpecificRecord>(&mut self, record: &mut T) -> Result<()> {
        let mut scratch = mem::replace(&mut self.scratch, Value::Null);
        let result = self
            .next_into(&mut scratch)
            .and_then(|()| record.assign_from(&mut scratch));
        self.scratch = scratch;
        result
    }

    /// Recovers from an error by dropping the damaged block.
    ///
    /// If the block's framing was intact, reading resumes at the next block.
    /// Otherwise the input is scanned for the next sync marker, starting just
    /// past the start of the damaged block. Returns `false` when the input
    /// ended first.
    pub fn resync(&mut self) -> Result<bool> {
        self.poisoned = false;
        self.remaining = 0;
        self.block.clear();
        self.block_pos = 0;

        let Some(consumed) = self.damaged.take() else {
            debug!("Skipped the rest of block {}", self.blocks_read);
            return Ok(!self.finished);
        };
        if let Some((_, rest)) = consumed.split_first() {
            self.source.unread(rest);
        }
        warn!(
            "Scanning for sync marker after damaged block {}",
            self.blocks_read + 1
        );

        let mut window: VecDeque<u8> = VecDeque::with_capacity(SYNC_SIZE);
        let mut byte = [0u8; 1];
        let mut scanned = 0u64;
        loop {
            match self.source.read(&mut byte) {
                Ok(0) => {
                    warn!("No sync marker found in the last {} bytes", scanned);
                    self.finished = true;
                    return Ok(false);
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.poisoned = true;
                    return Err(e.into());
                }
            }
            scanned += 1;
            if window.len() == SYNC_SIZE {
                window.pop_front();
            }
            window.push_back(byte[0]);
            if window.iter().eq(self.header.sync.iter()) {
                debug!("Resynchronized after skipping {} bytes", scanned);
                return Ok(true);
            }
        }
    }

    /// Loads the next block, or marks the reader finished at end of input.
    fn load_block(&mut self) -> Result<()> {
        if self.source.is_eof()? {
            self.finished = true;
            return Ok(());
        }
        self.source.start_recording();
        let result = self.read_block();
        let consumed = self.source.stop_recording();
        if let Err(e) = result {
            self.damaged = Some(consumed);
            return Err(e);
        }
        Ok(())
    }

    fn read_block(&mut self) -> Result<()> {
        let index = self.blocks_read;
        let corrupt = |e: Error| -> Error {
            match e {
                Error::Decode(decode) => ContainerFormatError::CorruptBlock {
                    block: index,
                    message: decode.to_string(),
                }
                .into(),
                other => other,
            }
        };

        let count = read_long(&mut self.source).map_err(corrupt)?;
        let size = read_long(&mut self.source).map_err(corrupt)?;
        if count < 0 || size < 0 {
            return Err(ContainerFormatError::CorruptBlock {
                block: index,
                message: format!("negative record count {} or size {}", count, size),
            }
            .into());
        }
        if size as u64 > self.config.max_block_bytes as u64 {
            return Err(ContainerFormatError::BlockTooLarge {
                size: size as u64,
                limit: self.config.max_block_bytes,
            }
            .into());
        }

        self.block.clear();
        self.block_pos = 0;
        read_exact_into(&mut self.source, size as usize, &mut self.block, "block").map_err(corrupt)?;

        let mut sync = [0u8; SYNC_SIZE];
        self.source
            .read_exact(&mut sync)
            .map_err(|e| corrupt(classify_read_error(e, "sync marker")))?;
        if sync != self.header.sync {
            warn!("Sync marker mismatch after block {}", index);
            return Err(ContainerFormatError::SyncMismatch { block: index }.into());
        }

        debug!("Loaded block {} with {} records ({} bytes)", index, count, size);
        self.blocks_read += 1;
        self.remaining = count as u64;
        Ok(())
    }
}

impl<R: Read> Iterator for ContainerReader<R> {
    type Item = Result<Value>;

    /// Yields records until the input ends. An error is yielded once; the
    /// iterator then stops until [`ContainerReader::resync`] is called.
    fn next(&mut self) -> Option<Self::Item> {
        if self.poisoned {
            return None;
        }
        match self.has_next() {
            Ok(true) => Some(self.next_value()),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
