//! 16-bit PCM sample decoder.
//!
//! Turns raw byte pairs into signed amplitudes. Capture backends hand over
//! whatever they happen to have read, so a chunk may end halfway through a
//! sample. [`SampleCodec`] keeps that odd trailing byte and pairs it with
//! the first byte of the next chunk, so no audio is dropped regardless of
//! how the stream was split.
//!
//! # Wire format
//!
//! ```text
//! big-endian:    <msb> <lsb> <msb> <lsb> ...
//! little-endian: <lsb> <msb> <lsb> <msb> ...
//! ```

use bytes::Buf;
use flowmeter_core::ByteOrder;

/// Number of bytes in one encoded sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Combine two bytes into one two's-complement 16-bit amplitude.
///
/// `byte1` is the byte that came first in the stream. For big-endian data it
/// is the more-significant byte; for little-endian data `byte2` is.
///
/// # Example
///
/// ```
/// use flowmeter_core::ByteOrder;
/// use flowmeter_pulse::codec::decode_sample;
///
/// assert_eq!(decode_sample(0xD2, 0xB5, ByteOrder::Big), -11595);
/// assert_eq!(decode_sample(0xB5, 0xD2, ByteOrder::Little), -11595);
/// ```
#[inline]
pub fn decode_sample(byte1: u8, byte2: u8, order: ByteOrder) -> i16 {
    match order {
        ByteOrder::Big => i16::from_be_bytes([byte1, byte2]),
        ByteOrder::Little => i16::from_le_bytes([byte1, byte2]),
    }
}

/// Stateful decoder that carries an odd trailing byte across chunks.
#[derive(Debug, Clone, Default)]
pub struct SampleCodec {
    pending: Option<u8>,
}

impl SampleCodec {
    /// Create a decoder with no pending byte.
    pub fn new() -> Self {
        SampleCodec { pending: None }
    }

    /// Whether a byte from a previous chunk is waiting for its partner.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The byte waiting for its partner, if any.
    pub fn pending(&self) -> Option<u8> {
        self.pending
    }

    /// Number of whole samples `len` more bytes would complete.
    pub fn samples_in(&self, len: usize) -> usize {
        (len + usize::from(self.pending.is_some())) / BYTES_PER_SAMPLE
    }

    /// Decode every whole sample available in `data`.
    ///
    /// A pending byte from the previous call is completed with the first
    /// byte of `data` before pairwise decoding resumes. If one byte is left
    /// over at the end it becomes the new pending byte and is not returned
    /// as a sample until its partner arrives.
    pub fn decode_chunk(&mut self, data: &[u8], order: ByteOrder) -> Vec<i16> {
        let mut buf = data;
        let mut out = Vec::with_capacity(self.samples_in(buf.len()));

        if !buf.has_remaining() {
            return out;
        }

        if let Some(first) = self.pending.take() {
            let second = buf.get_u8();
            out.push(decode_sample(first, second, order));
        }

        while buf.remaining() >= BYTES_PER_SAMPLE {
            let amplitude = match order {
                ByteOrder::Big => buf.get_i16(),
                ByteOrder::Little => buf.get_i16_le(),
            };
            out.push(amplitude);
        }

        if buf.has_remaining() {
            self.pending = Some(buf.get_u8());
        }

        out
    }
}
