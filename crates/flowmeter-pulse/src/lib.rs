//! flowmeter-pulse: Streaming PCM decoding and pulse detection for two
//! flow meters sharing one audio line.
//!
//! The pieces, bottom up:
//!
//! - [`codec`] -- signed 16-bit sample decoding with odd-byte carry
//! - [`clock`] -- sample-count based nanosecond timestamps
//! - [`edge`] -- bounded monotonic edge following and meter classification
//! - [`reader`] -- [`FlowMeterReader`], which owns the per-stream state and
//!   ties the three together chunk by chunk
//! - [`builder`] -- fluent configuration for the reader
//! - [`tally`] -- running per-meter pulse counts
//! - [`pump`] -- a tokio task that feeds a reader from a [`PcmSource`]
//!
//! [`PcmSource`]: flowmeter_core::PcmSource

pub mod builder;
pub mod clock;
pub mod codec;
pub mod edge;
pub mod pump;
pub mod reader;
pub mod tally;

pub use builder::FlowMeterReaderBuilder;
pub use clock::SampleClock;
pub use codec::{BYTES_PER_SAMPLE, SampleCodec, decode_sample};
pub use edge::{
    Detection, EdgeDetector, FM1_THRESHOLD, FM1_THRESHOLD_RATIO, FM2_THRESHOLD,
    FM2_THRESHOLD_RATIO, MAX_EDGE_SAMPLES, MAX_PULSE_DURATION_NS, Thresholds,
    max_pulse_duration_samples,
};
pub use pump::{PumpConfig, PumpHandle, PumpOutcome, StopReason, spawn_pump};
pub use reader::{FlowMeterReader, StreamState};
pub use tally::PulseTally;
