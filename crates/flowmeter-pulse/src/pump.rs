//! Async pump that drives a [`FlowMeterReader`] from a [`PcmSource`].
//!
//! The reader is synchronous and must see chunks one at a time, in stream
//! order. The pump gives it exactly that: one tokio task owns both the
//! source and the reader, reads a chunk, processes it, and hands the
//! resulting [`Reading`] to the application over a bounded channel. No lock
//! is ever taken around the reader.
//!
//! - **Readings** go to an `mpsc` channel read via [`PumpHandle::recv()`].
//!   The channel is bounded, so a slow consumer slows the pump down rather
//!   than letting readings pile up.
//! - **Events** ([`FlowEvent`]) go to a `broadcast` channel supplied by the
//!   caller. Every pulse is published, followed by one terminal
//!   `EndOfStream` or `SourceError`.
//!
//! The pump stops when the source reports end of stream, when the source
//! fails, when [`PumpHandle::stop()`] is called, or when the reading
//! receiver is dropped.

use flowmeter_core::error::{Error, Result};
use flowmeter_core::events::FlowEvent;
use flowmeter_core::source::PcmSource;
use flowmeter_core::Reading;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::reader::FlowMeterReader;
use crate::tally::PulseTally;

/// Bytes requested from the source per read: 80 samples.
pub const DEFAULT_READ_SIZE: usize = 160;

/// Readings buffered between the pump and the application.
pub const DEFAULT_READING_CAPACITY: usize = 32;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Configuration for the pump task.
#[derive(Debug, Clone)]
pub struct PumpConfig {
    /// Size of the read buffer handed to the source.
    pub read_size: usize,
    /// Capacity of the reading channel.
    pub reading_capacity: usize,
}

impl Default for PumpConfig {
    fn default() -> Self {
        PumpConfig {
            read_size: DEFAULT_READ_SIZE,
            reading_capacity: DEFAULT_READING_CAPACITY,
        }
    }
}

/// Why the pump stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The source returned `Ok(0)`.
    EndOfStream,
    /// [`PumpHandle::stop()`] was called.
    Cancelled,
    /// The reading receiver was dropped.
    ConsumerClosed,
    /// The source returned an error.
    SourceError(String),
}

/// What the pump task hands back when it finishes.
#[derive(Debug)]
pub struct PumpOutcome {
    /// The reader, with its stream state intact.
    pub reader: FlowMeterReader,
    /// Totals over every reading delivered to the reading channel.
    pub tally: PulseTally,
    /// Why the pump stopped.
    pub stop: StopReason,
    /// A reading the reader produced but the pump could not deliver before
    /// stopping. It is not in `tally` and its pulses were not published.
    pub undelivered: Option<Reading>,
}

impl PumpOutcome {
    /// The stop reason as a `Result`: end of stream and cancellation are
    /// clean stops, anything else is an error.
    pub fn result(&self) -> Result<()> {
        match &self.stop {
            StopReason::EndOfStream | StopReason::Cancelled => Ok(()),
            StopReason::ConsumerClosed => Err(Error::StreamClosed),
            StopReason::SourceError(message) => Err(Error::Source(message.clone())),
        }
    }
}

/// Handle to a running pump.
pub struct PumpHandle {
    readings: mpsc::Receiver<Reading>,
    event_tx: broadcast::Sender<FlowEvent>,
    cancel: CancellationToken,
    task: JoinHandle<PumpOutcome>,
}

impl PumpHandle {
    /// Receive the next reading.
    ///
    /// Returns `None` once the pump has stopped and every buffered reading
    /// has been received.
    pub async fn recv(&mut self) -> Option<Reading> {
        self.readings.recv().await
    }

    /// Subscribe to pulse and end-of-stream events.
    ///
    /// Only events published after this call are delivered.
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.event_tx.subscribe()
    }

    /// Ask the pump to stop before its next read.
    ///
    /// A reading still waiting for channel space when this is called is not
    /// delivered; it comes back in [`PumpOutcome::undelivered`]. The tally
    /// and the published events cover delivered readings only.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether the pump task has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the pump to finish and recover the reader.
    ///
    /// Readings not yet received are discarded so the pump is never left
    /// blocked on a full channel. Call [`stop()`](Self::stop) first to end
    /// a source that never reaches end of stream.
    pub async fn join(self) -> Result<PumpOutcome> {
        let PumpHandle {
            mut readings, task, ..
        } = self;

        let drain = async { while readings.recv().await.is_some() {} };
        let ((), outcome) = tokio::join!(drain, task);

        outcome.map_err(|e| Error::Source(format!("pump task failed: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Spawn
// ---------------------------------------------------------------------------

/// Spawn the pump task on the current tokio runtime.
///
/// The task owns `source` and `reader` exclusively until it finishes; both
/// come back through [`PumpHandle::join()`].
pub fn spawn_pump(
    source: Box<dyn PcmSource>,
    reader: FlowMeterReader,
    config: PumpConfig,
    event_tx: broadcast::Sender<FlowEvent>,
) -> PumpHandle {
    let (readings_tx, readings) = mpsc::channel(config.reading_capacity.max(1));
    let cancel = CancellationToken::new();

    let task = tokio::spawn(pump_loop(
        source,
        reader,
        config,
        readings_tx,
        event_tx.clone(),
        cancel.clone(),
    ));

    PumpHandle {
        readings,
        event_tx,
        cancel,
        task,
    }
}

// ---------------------------------------------------------------------------
// Pump loop
// ---------------------------------------------------------------------------

async fn pump_loop(
    mut source: Box<dyn PcmSource>,
    mut reader: FlowMeterReader,
    config: PumpConfig,
    readings_tx: mpsc::Sender<Reading>,
    event_tx: broadcast::Sender<FlowEvent>,
    cancel: CancellationToken,
) -> PumpOutcome {
    let mut buf = vec![0u8; config.read_size.max(1)];
    let mut tally = PulseTally::new();
    let mut undelivered = None;
    let order = source.byte_order();

    debug!(read_size = buf.len(), %order, "pump started");

    let stop = loop {
        let n = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("pump cancelled");
                break StopReason::Cancelled;
            }

            read = source.read(&mut buf) => match read {
                Ok(0) => {
                    debug!(samples = reader.samples_processed(), "PCM source exhausted");
                    let _ = event_tx.send(FlowEvent::EndOfStream {
                        samples_processed: reader.samples_processed(),
                    });
                    break StopReason::EndOfStream;
                }
                Ok(n) => n.min(buf.len()),
                Err(e) => {
                    warn!(%e, "PCM source failed");
                    let message = e.to_string();
                    let _ = event_tx.send(FlowEvent::SourceError {
                        message: message.clone(),
                    });
                    break StopReason::SourceError(message);
                }
            },
        };

        let reading = reader.process_chunk(&buf[..n], order);
        if reading.is_empty() {
            continue;
        }

        if readings_tx.capacity() == 0 {
            warn!("reading consumer is falling behind");
        }

        let permit = tokio::select! {
            biased;

            permit = readings_tx.reserve() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    debug!("reading receiver dropped, stopping pump");
                    undelivered = Some(reading);
                    break StopReason::ConsumerClosed;
                }
            },

            _ = cancel.cancelled() => {
                debug!("pump cancelled with a reading pending");
                undelivered = Some(reading);
                break StopReason::Cancelled;
            }
        };

        tally.record(&reading);
        for pulse in &reading.pulses {
            let _ = event_tx.send(FlowEvent::Pulse(*pulse));
        }
        permit.send(reading);
    };

    PumpOutcome {
        reader,
        tally,
        stop,
        undelivered,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
