//! flowmeter-test-harness: Test utilities for flowmeter.
//!
//! This crate provides [`MockPcmSource`] for driving the pump without a
//! capture device, [`signal`] helpers for building PCM byte streams with
//! known pulses in them, and [`chunking`] helpers for cutting a stream into
//! arbitrary chunk boundaries.

pub mod chunking;
pub mod mock_source;
pub mod signal;

pub use mock_source::MockPcmSource;
pub use signal::{PulseTrain, encode_pcm};
