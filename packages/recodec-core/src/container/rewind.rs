//! Buffered source that can give bytes back.

use std::io::{self, BufRead, BufReader, Read};

/// Wraps a container source so the reader can push consumed bytes back
/// after a framing error and rescan them for a sync marker.
pub(crate) struct Rewind<R> {
    inner: BufReader<R>,
    /// Pushed-back bytes, next byte last
    pushed: Vec<u8>,
    recording: Option<Vec<u8>>,
}

impl<R: Read> Rewind<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            pushed: Vec::new(),
            recording: None,
        }
    }

    /// Makes `bytes` the next bytes read, in order.
    pub fn unread(&mut self, bytes: &[u8]) {
        self.pushed.extend(bytes.iter().rev());
    }

    /// Whether the source has no more bytes.
    pub fn is_eof(&mut self) -> io::Result<bool> {
        if !self.pushed.is_empty() {
            return Ok(false);
        }
        Ok(self.inner.fill_buf()?.is_empty())
    }

    /// Starts keeping a copy of every byte read.
    pub fn start_recording(&mut self) {
        self.recording = Some(Vec::new());
    }

    /// Stops recording and returns the bytes read since it started.
    pub fn stop_recording(&mut self) -> Vec<u8> {
        self.recording.take().unwrap_or_default()
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R: Read> Read for Rewind<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            match self.pushed.pop() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        if n == 0 {
            n = self.inner.read(buf)?;
        }
        if let Some(recording) = &mut self.recording {
            recording.extend_from_slice(&buf[..n]);
        }
        Ok(n)
    }
}
