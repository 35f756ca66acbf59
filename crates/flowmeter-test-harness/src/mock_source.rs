//! Mock PCM source for deterministic testing of the pump.
//!
//! [`MockPcmSource`] implements the [`PcmSource`] trait with pre-loaded
//! chunks. Each `read()` hands out bytes from the front chunk, never more
//! than the caller's buffer holds, so a test controls exactly where the
//! chunk boundaries fall.
//!
//! # Example
//!
//! ```
//! use flowmeter_core::ByteOrder;
//! use flowmeter_test_harness::MockPcmSource;
//!
//! let mut mock = MockPcmSource::new(ByteOrder::Big);
//! mock.push_chunk(&[0x00, 0x01, 0x00]);
//! mock.push_chunk(&[0x02]);
//! assert_eq!(mock.remaining_chunks(), 2);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;

use flowmeter_core::error::{Error, Result};
use flowmeter_core::source::PcmSource;
use flowmeter_core::ByteOrder;

/// What the mock does once every chunk has been read.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Exhausted {
    /// Return `Ok(0)`.
    EndOfStream,
    /// Return `Error::Source` with this message.
    Fail(String),
    /// Never return.
    Stall,
}

/// A mock [`PcmSource`] for testing without a capture device.
///
/// Chunks are consumed in order. A chunk larger than the read buffer is
/// handed out over several reads. Empty chunks are skipped, since `Ok(0)`
/// means end of stream.
#[derive(Debug)]
pub struct MockPcmSource {
    /// Ordered queue of chunks still to deliver.
    chunks: VecDeque<Vec<u8>>,
    /// Byte order reported to the caller.
    byte_order: ByteOrder,
    /// Behaviour after the last chunk.
    exhausted: Exhausted,
    /// Number of `read()` calls so far.
    reads: usize,
}

impl MockPcmSource {
    /// Create an empty source that reports end of stream immediately.
    pub fn new(byte_order: ByteOrder) -> Self {
        MockPcmSource {
            chunks: VecDeque::new(),
            byte_order,
            exhausted: Exhausted::EndOfStream,
            reads: 0,
        }
    }

    /// Create a source pre-loaded with `chunks`.
    pub fn from_chunks<I>(chunks: I, byte_order: ByteOrder) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        let mut mock = Self::new(byte_order);
        mock.chunks.extend(chunks);
        mock
    }

    /// Queue another chunk.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        self.chunks.push_back(chunk.to_vec());
    }

    /// Fail with `Error::Source(message)` once every chunk has been read.
    pub fn fail_when_exhausted(&mut self, message: &str) {
        self.exhausted = Exhausted::Fail(message.to_string());
    }

    /// Block forever once every chunk has been read, like a live capture
    /// with no more audio coming.
    pub fn stall_when_exhausted(&mut self) {
        self.exhausted = Exhausted::Stall;
    }

    /// Chunks not yet fully read.
    pub fn remaining_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Number of `read()` calls made so far.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

#[async_trait]
impl PcmSource for MockPcmSource {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.reads += 1;

        while self.chunks.front().is_some_and(|c| c.is_empty()) {
            self.chunks.pop_front();
        }

        if let Some(chunk) = self.chunks.front_mut() {
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n == chunk.len() {
                self.chunks.pop_front();
            } else {
                chunk.drain(..n);
            }
            return Ok(n);
        }

        match &self.exhausted {
            Exhausted::EndOfStream => Ok(0),
            Exhausted::Fail(message) => Err(Error::Source(message.clone())),
            Exhausted::Stall => std::future::pending().await,
        }
    }

    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }
}
