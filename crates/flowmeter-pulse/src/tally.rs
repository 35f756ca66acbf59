//! Running pulse statistics.
//!
//! [`PulseTally`] is a pure consumer of [`Reading`]s: it counts samples and
//! pulses per meter and remembers the most recent pulse. It never feeds
//! anything back into the reader.

use flowmeter_core::{MeterId, Pulse, Reading};

/// Totals accumulated over a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PulseTally {
    total_samples: u64,
    fm1_pulses: u64,
    fm2_pulses: u64,
    last_pulse: Option<Pulse>,
}

impl PulseTally {
    /// Create an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one reading's samples and pulses to the totals.
    pub fn record(&mut self, reading: &Reading) {
        self.total_samples += reading.samples.len() as u64;
        for pulse in &reading.pulses {
            match pulse.meter {
                MeterId::Fm1 => self.fm1_pulses += 1,
                MeterId::Fm2 => self.fm2_pulses += 1,
            }
        }
        if let Some(last) = reading.pulses.last() {
            self.last_pulse = Some(*last);
        }
    }

    /// Samples seen so far.
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    /// Pulses attributed to `meter`.
    pub fn pulses(&self, meter: MeterId) -> u64 {
        match meter {
            MeterId::Fm1 => self.fm1_pulses,
            MeterId::Fm2 => self.fm2_pulses,
        }
    }

    /// Pulses from both meters.
    pub fn total_pulses(&self) -> u64 {
        self.fm1_pulses + self.fm2_pulses
    }

    /// The most recent pulse, if any.
    pub fn last_pulse(&self) -> Option<&Pulse> {
        self.last_pulse.as_ref()
    }
}
