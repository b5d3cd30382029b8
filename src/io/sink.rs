//! Destinations for payload blocks.

use std::io::{self, Seek, SeekFrom, Write};
use std::sync::Mutex;

/// Somewhere payload blocks can be appended.
pub trait PayloadSink {
    /// Write `bytes` as one contiguous block and return the byte offset it starts at.
    fn append(&mut self, bytes: &[u8]) -> io::Result<u64>;
}

/// A sink owned by a single writer, appending at the stream's current position.
#[derive(Debug)]
pub struct StreamSink<W> {
    inner: W,
}

impl<W: Write + Seek> StreamSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write + Seek> PayloadSink for StreamSink<W> {
    fn append(&mut self, bytes: &[u8]) -> io::Result<u64> {
        let offset = self.inner.stream_position()?;
        self.inner.write_all(bytes)?;
        Ok(offset)
    }
}

/// A destination shared by several writers.
///
/// Each block is appended at the current end of the stream under one lock, so blocks of
/// different writers never interleave and every returned offset is exact.
#[derive(Debug)]
pub struct SharedSink<W> {
    inner: Mutex<W>,
}

impl<W: Write + Seek> SharedSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.inner.into_inner().map_err(|_| poisoned())
    }
}

impl<W: Write + Seek> PayloadSink for &SharedSink<W> {
    fn append(&mut self, bytes: &[u8]) -> io::Result<u64> {
        let mut inner = self.inner.lock().map_err(|_| poisoned())?;
        let offset = inner.seek(SeekFrom::End(0))?;
        inner.write_all(bytes)?;
        Ok(offset)
    }
}

fn poisoned() -> io::Error {
    io::Error::other("payload writer panicked while holding the lock")
}
