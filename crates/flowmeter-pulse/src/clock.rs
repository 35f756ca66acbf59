//! Sample timestamps.

use flowmeter_core::{NS_PER_SEC, Sample};

/// Assigns nanosecond timestamps from a running sample counter.
///
/// The Nth sample of the stream (0-indexed) is stamped
/// `N * 1_000_000_000 / sample_rate`, truncated. Truncation means spacing
/// is not perfectly even when the rate does not divide a second, but the
/// result is monotonic and depends only on `N` and the rate.
#[derive(Debug, Clone)]
pub struct SampleClock {
    sample_rate: u32,
    samples_processed: u64,
}

impl SampleClock {
    /// Create a clock at sample zero. `sample_rate` must be non-zero; the
    /// reader builder checks this before constructing a clock.
    pub(crate) fn new(sample_rate: u32) -> Self {
        debug_assert!(sample_rate > 0);
        SampleClock {
            sample_rate,
            samples_processed: 0,
        }
    }

    /// Samples per second.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples stamped so far.
    pub fn samples_processed(&self) -> u64 {
        self.samples_processed
    }

    /// Time the Nth sample of the stream is stamped with.
    pub fn time_of(&self, n: u64) -> u64 {
        let ns = u128::from(n) * u128::from(NS_PER_SEC) / u128::from(self.sample_rate);
        ns as u64
    }

    /// Stamp the next sample and advance the counter.
    pub fn stamp(&mut self, amplitude: i16) -> Sample {
        let sample = Sample::new(self.time_of(self.samples_processed), amplitude);
        self.samples_processed += 1;
        sample
    }
}
