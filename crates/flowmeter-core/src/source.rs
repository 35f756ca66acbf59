//! PCM source trait.
//!
//! The [`PcmSource`] trait is the boundary between the decode/detect core
//! and whatever produces the raw bytes: a sound card capture, a file
//! reader, or a scripted mock in tests. The core never reads devices or
//! files itself.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ByteOrder;

/// Asynchronous producer of raw 16-bit mono PCM bytes.
///
/// Implementations must deliver bytes in the order they occurred and must
/// deliver every byte exactly once. Chunk sizes are arbitrary and need not
/// be sample aligned.
#[async_trait]
pub trait PcmSource: Send {
    /// Read the next chunk of bytes into `buf`.
    ///
    /// Returns the number of bytes written. `Ok(0)` signals end of stream.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Byte order of the samples this source produces.
    fn byte_order(&self) -> ByteOrder;
}
