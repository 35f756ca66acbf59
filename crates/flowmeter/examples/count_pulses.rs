//! Count flow meter pulses in a WAV recording.
//!
//! Reads a 16-bit mono WAV file with the `hound` crate, re-packs the
//! samples as raw PCM bytes, and streams them through a
//! [`FlowMeterReader`] on a pump task, exactly as a live capture would be
//! streamed. Every pulse is printed as its reading arrives, followed by
//! the per-meter totals.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p flowmeter --example count_pulses -- recording.wav
//! cargo run -p flowmeter --example count_pulses -- recording.wav --chunk-size 7 --byte-order le
//! RUST_LOG=flowmeter_pulse=trace cargo run -p flowmeter --example count_pulses -- recording.wav
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flowmeter::{
    ByteOrder, FlowMeterReader, MeterId, PcmSource, PumpConfig, StopReason, spawn_pump,
};

/// Count flow meter pulses in a 16-bit mono WAV file.
#[derive(Parser)]
#[command(name = "count_pulses", version, about)]
struct Cli {
    /// Path to the WAV file.
    path: PathBuf,

    /// Bytes handed to the reader per chunk.
    #[arg(long, default_value_t = 160)]
    chunk_size: usize,

    /// Byte order used when re-packing samples: be or le.
    #[arg(long, default_value = "be")]
    byte_order: ByteOrder,

    /// Longest pulse, in microseconds.
    #[arg(long, default_value_t = 625)]
    max_pulse_us: u64,
}

// ---------------------------------------------------------------------------
// In-memory PCM source
// ---------------------------------------------------------------------------

/// Serves a fixed byte buffer in reads of at most the caller's buffer size.
struct BufferSource {
    bytes: Vec<u8>,
    pos: usize,
    byte_order: ByteOrder,
}

#[async_trait]
impl PcmSource for BufferSource {
    async fn read(&mut self, buf: &mut [u8]) -> flowmeter::Result<usize> {
        let remaining = &self.bytes[self.pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }

    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }
}

fn load_wav(cli: &Cli) -> Result<(u32, Vec<u8>)> {
    let reader = hound::WavReader::open(&cli.path)
        .with_context(|| format!("opening {}", cli.path.display()))?;
    let spec = reader.spec();

    if spec.channels != 1 {
        bail!("expected a mono recording, got {} channels", spec.channels);
    }
    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        bail!(
            "expected 16-bit integer samples, got {} bit {:?}",
            spec.bits_per_sample,
            spec.sample_format
        );
    }

    let samples = reader
        .into_samples::<i16>()
        .collect::<std::result::Result<Vec<i16>, _>>()
        .context("reading samples")?;

    let bytes = samples
        .iter()
        .flat_map(|s| match cli.byte_order {
            ByteOrder::Big => s.to_be_bytes(),
            ByteOrder::Little => s.to_le_bytes(),
        })
        .collect();

    Ok((spec.sample_rate, bytes))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let (sample_rate, bytes) = load_wav(&cli)?;
    info!(sample_rate, bytes = bytes.len(), "loaded {}", cli.path.display());

    let reader = FlowMeterReader::builder(sample_rate)
        .max_pulse_duration(std::time::Duration::from_micros(cli.max_pulse_us))
        .build()?;
    println!(
        "{} Hz, pulses up to {} samples, {}-byte chunks\n",
        sample_rate,
        reader.max_pulse_duration_samples(),
        cli.chunk_size
    );

    let source = BufferSource {
        bytes,
        pos: 0,
        byte_order: cli.byte_order,
    };
    let config = PumpConfig {
        read_size: cli.chunk_size,
        ..PumpConfig::default()
    };

    let (event_tx, _) = broadcast::channel(16);
    let mut pump = spawn_pump(Box::new(source), reader, config, event_tx);

    while let Some(reading) = pump.recv().await {
        for pulse in &reading.pulses {
            println!("  {pulse}");
        }
    }

    let outcome = pump.join().await?;
    outcome.result()?;
    if outcome.stop == StopReason::EndOfStream {
        println!("\nEnd of stream after {} samples.", outcome.reader.samples_processed());
    }

    let tally = outcome.tally;
    for meter in MeterId::ALL {
        println!("{meter}: {} pulses", tally.pulses(meter));
    }
    if let Some(last) = tally.last_pulse() {
        let seconds = last.start.time_ns as f64 / 1e9;
        println!("Last pulse at {seconds:.3} s");
    }

    Ok(())
}
