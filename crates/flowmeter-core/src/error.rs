//! Error types for flowmeter.
//!
//! Decoding and pulse detection are total over their inputs, so the only
//! errors in this crate come from construction-time contract violations and
//! from the collaborators that feed PCM bytes in or consume readings.

/// The error type for all flowmeter operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An invalid construction parameter (zero sample rate, bad threshold
    /// ratios, zero pulse duration).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A PCM source collaborator failed to deliver bytes.
    #[error("source error: {0}")]
    Source(String),

    /// The consumer of a reading or event stream went away.
    #[error("stream closed")]
    StreamClosed,
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
