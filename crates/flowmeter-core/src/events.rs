//! Stream event types.
//!
//! Events are published through a [`tokio::sync::broadcast`] channel by the
//! pump that drives a reader from a PCM source. Displays and loggers
//! subscribe to them without touching the reader itself; slow consumers may
//! miss events under heavy load.

use crate::types::Pulse;

/// An event emitted while a PCM stream is being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    /// A pulse was detected.
    Pulse(Pulse),

    /// The source reported end of stream. No further events follow.
    EndOfStream {
        /// Total samples decoded over the life of the stream.
        samples_processed: u64,
    },

    /// The source failed. No further events follow.
    SourceError {
        /// Human-readable description of the failure.
        message: String,
    },
}
