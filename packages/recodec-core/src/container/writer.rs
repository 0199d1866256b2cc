//! Container writer.

use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};

use tracing::{debug, warn};

use super::{Header, Metadata, SYNC_SIZE};
use crate::codec::varint::write_long;
use crate::codec::Encoder;
use crate::config::{DecodeLimits, WriterConfig};
use crate::error::{ContainerFormatError, Result};
use crate::schema::Schema;
use crate::value::{Datum, Value};

/// Appends records of one schema to a container.
///
/// Records are buffered into a block that is written once it reaches
/// [`WriterConfig::sync_interval`] bytes, or on [`flush`](Self::flush),
/// [`sync`](Self::sync) and [`close`](Self::close). Dropping an unclosed
/// writer writes the pending block on a best-effort basis.
///
/// A block that fails to reach the sink is never written again: the writer
/// discards it and every later call fails with
/// [`ContainerFormatError::WriterFailed`].
pub struct ContainerWriter<W: Write> {
    /// `None` only after `close` handed the sink back
    sink: Option<W>,
    header: Header,
    encoder: Encoder,
    config: WriterConfig,
    block: Vec<u8>,
    block_records: u64,
    /// Bytes in the file, including pre-existing content when appending
    position: u64,
    blocks_written: u64,
    records_written: u64,
    /// Set once a block write failed
    failed: bool,
}

impl<W: Write> ContainerWriter<W> {
    /// Creates a container with the default configuration and writes its
    /// header to `sink`.
    ///
    /// # Arguments
    ///
    /// * `schema` - Schema of every record appended
    /// * `metadata` - User metadata; keys starting with `avro.` are rejected
    /// * `sink` - Destination of the container bytes
    pub fn create(schema: &Schema, metadata: Metadata, sink: W) -> Result<Self> {
        Self::with_config(schema, metadata, sink, WriterConfig::default())
    }

    /// Creates a container with an explicit configuration.
    pub fn with_config(schema: &Schema, metadata: Metadata, mut sink: W, config: WriterConfig) -> Result<Self> {
        let header = Header::new(schema, metadata)?;
        let position = header.write(&mut sink)? as u64;
        debug!(
            "Wrote container header for {} (fingerprint {})",
            schema.describe(),
            schema.fingerprint()
        );
        Ok(Self::from_parts(sink, header, config, position))
    }

    fn from_parts(sink: W, header: Header, config: WriterConfig, position: u64) -> Self {
        Self {
            encoder: Encoder::with_config(&header.schema, config.encoder),
            sink: Some(sink),
            header,
            config,
            block: Vec::new(),
            block_records: 0,
            position,
            blocks_written: 0,
            records_written: 0,
            failed: false,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.header.schema
    }

    pub fn metadata(&self) -> &Metadata {
        &self.header.metadata
    }

    pub fn sync_marker(&self) -> &[u8; SYNC_SIZE] {
        &self.header.sync
    }

    /// Blocks written by this writer.
    pub fn block_count(&self) -> u64 {
        self.blocks_written
    }

    /// Records appended by this writer, including the pending block.
    pub fn record_count(&self) -> u64 {
        self.records_written + self.block_records
    }

    /// Encodes one datum into the pending block.
    ///
    /// A datum that fails to encode leaves the block unchanged. If the datum
    /// fills the block and writing it fails, the datum is lost with the rest
    /// of the block.
    pub fn append<D: Datum + ?Sized>(&mut self, datum: &D) -> Result<()> {
        self.check_failed()?;
        let mark = self.block.len();
        if let Err(e) = datum.write_datum(&self.encoder, &mut self.block) {
            self.block.truncate(mark);
            return Err(e);
        }
        self.block_records += 1;
        if self.block.len() >= self.config.sync_interval {
            self.write_block()?;
        }
        Ok(())
    }

    pub fn append_value(&mut self, value: &Value) -> Result<()> {
        self.append(value)
    }

    /// Appends every datum of `items`, stopping at the first failure.
    pub fn extend<'a, D, I>(&mut self, items: I) -> Result<()>
    where
        D: Datum + 'a,
        I: IntoIterator<Item = &'a D>,
    {
        for item in items {
            self.append(item)?;
        }
        Ok(())
    }

    /// Writes the pending block and flushes the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.check_failed()?;
        self.write_block()?;
        self.sink_mut()?.flush()?;
        Ok(())
    }

    /// Flushes and returns the file offset of the block boundary, from
    /// which a reader positioned at a sync point can continue.
    pub fn sync(&mut self) -> Result<u64> {
        self.flush()?;
        Ok(self.position)
    }

    /// Writes the last block and returns the sink.
    pub fn close(mut self) -> Result<W> {
        self.flush()?;
        debug!(
            "Closed container after {} blocks, {} records",
            self.blocks_written, self.records_written
        );
        self.sink
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "container writer already closed").into())
    }

    /// Whether a block write failed earlier.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    fn check_failed(&self) -> Result<()> {
        if self.failed {
            return Err(ContainerFormatError::WriterFailed.into());
        }
        Ok(())
    }

    fn sink_mut(&mut self) -> Result<&mut W> {
        self.sink
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "container writer already closed").into())
    }

    fn write_block(&mut self) -> Result<()> {
        if self.block_records == 0 {
            return Ok(());
        }
        let mut frame = Vec::with_capacity(self.block.len() + 2 * 10 + SYNC_SIZE);
        write_long(&mut frame, self.block_records as i64)?;
        write_long(&mut frame, self.block.len() as i64)?;
        frame.extend_from_slice(&self.block);
        frame.extend_from_slice(&self.header.sync);

        let written = self.sink_mut()?.write_all(&frame);
        if let Err(e) = written {
            warn!(
                "Failed to write block {} with {} records: {}",
                self.blocks_written, self.block_records, e
            );
            self.failed = true;
            self.block.clear();
            self.block_records = 0;
            return Err(e.into());
        }
        debug!(
            "Flushed block {} with {} records ({} bytes)",
            self.blocks_written,
            self.block_records,
            self.block.len()
        );

        self.position += frame.len() as u64;
        self.blocks_written += 1;
        self.records_written += self.block_records;
        self.block.clear();
        self.block_records = 0;
        Ok(())
    }
}

impl<W: Read + Write + Seek> ContainerWriter<W> {
    /// Reopens an existing container for appending.
    ///
    /// The schema and sync marker are taken from the file's header and new
    /// blocks are written after its current end.
    pub fn append_to(file: W) -> Result<Self> {
        Self::append_to_with_config(file, WriterConfig::default())
    }

    pub fn append_to_with_config(mut file: W, config: WriterConfig) -> Result<Self> {
        file.seek(SeekFrom::Start(0))?;
        let header = Header::read(&mut BufReader::new(&mut file), &DecodeLimits::default())?;
        let position = file.seek(SeekFrom::End(0))?;
        debug!(
            "Appending to container of {} at offset {}",
            header.schema.describe(),
            position
        );
        Ok(Self::from_parts(file, header, config, position))
    }
}

impl<W: Write> Drop for ContainerWriter<W> {
    fn drop(&mut self) {
        if self.sink.is_none() || self.failed || self.block_records == 0 {
            return;
        }
        if let Err(e) = self.flush() {
            warn!("Failed to flush pending block on drop: {}", e);
        }
    }
}
