//! # flowmeter -- Pulse Detection for Dual Flow Meters
//!
//! `flowmeter` decodes a live 16-bit mono PCM stream and detects the
//! pulses two flow meters inject into it. Both meters share one audio
//! line; each tick shows up as a sharp amplitude swing, and the size of
//! the swing says which meter ticked.
//!
//! ## Quick Start
//!
//! Feed raw bytes, in any chunk sizes, and collect the pulses:
//!
//! ```
//! use flowmeter::{ByteOrder, FlowMeterReader, MeterId, PulseTally};
//!
//! # fn example() -> flowmeter::Result<()> {
//! let mut reader = FlowMeterReader::new(16_000)?;
//! let mut tally = PulseTally::new();
//!
//! let amplitudes: [i16; 11] = [0, 3000, 9000, 18000, 27000, 27000, 27000, 0, 0, 0, 0];
//! let bytes: Vec<u8> = amplitudes.iter().flat_map(|a| a.to_be_bytes()).collect();
//!
//! // Chunk boundaries may fall anywhere, even inside a sample.
//! for chunk in bytes.chunks(3) {
//!     let reading = reader.process_chunk(chunk, ByteOrder::Big);
//!     tally.record(&reading);
//! }
//!
//! assert_eq!(tally.total_samples(), 11);
//! assert_eq!(tally.pulses(MeterId::Fm2), 1);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Architecture
//!
//! | Crate                     | Purpose                                         |
//! |---------------------------|-------------------------------------------------|
//! | `flowmeter-core`          | Value types, [`PcmSource`], [`FlowEvent`], errors |
//! | `flowmeter-pulse`         | Decoder, edge detector, reader, pump            |
//! | `flowmeter-test-harness`  | Mock source, signal and chunking helpers        |
//! | **`flowmeter`**           | This facade crate -- re-exports everything      |
//!
//! ## Driving a Reader from a Source
//!
//! Anything that implements [`PcmSource`] can be pumped through a reader on
//! a tokio task. Readings arrive on a bounded channel and must be received,
//! or the pump waits. Pulses are also published as [`FlowEvent`]s for any
//! other interested task:
//!
//! ```no_run
//! use flowmeter::{FlowMeterReader, PcmSource, PumpConfig, spawn_pump};
//! use tokio::sync::broadcast;
//!
//! # async fn example(source: Box<dyn PcmSource>) -> flowmeter::Result<()> {
//! let (event_tx, _) = broadcast::channel(256);
//! let mut pump = spawn_pump(source, FlowMeterReader::new(16_000)?, PumpConfig::default(), event_tx);
//!
//! while let Some(reading) = pump.recv().await {
//!     for pulse in &reading.pulses {
//!         println!("{pulse}");
//!     }
//! }
//!
//! let outcome = pump.join().await?;
//! println!("{} pulses", outcome.tally.total_pulses());
//! # Ok(())
//! # }
//! ```

pub use flowmeter_core::*;

pub use flowmeter_pulse::{
    FlowMeterReader, FlowMeterReaderBuilder, PulseTally, PumpConfig, PumpHandle, PumpOutcome,
    StopReason, StreamState, spawn_pump,
};

/// Decoder and detector building blocks.
///
/// Most applications only need [`FlowMeterReader`]. The pieces it is made
/// of are exposed here for callers that want to run them separately, for
/// example to detect edges in samples that did not come from PCM bytes.
pub mod pulse {
    pub use flowmeter_pulse::*;
}
