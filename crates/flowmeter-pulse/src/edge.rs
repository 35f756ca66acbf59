//! Edge following and pulse classification.
//!
//! An edge is a run of samples whose amplitude keeps moving in one
//! direction. Flat steps (zero delta) neither set nor break the direction;
//! the edge ends at the sample just before the first step that moves the
//! other way.
//!
//! ```text
//!  ---|-----|----|--|-|---|---
//!
//!          / \
//!         |   \
//!  \     /     |
//!   \   /      |         / \
//!    \ /       |        /   |
//!              \   / \ /    \
//!               \ /          \
//! ```
//!
//! Each meter ticks by yanking the shared line, so an edge that covers a
//! large amplitude swing within a short time is a pulse. The size of the
//! swing tells the meters apart.

use flowmeter_core::error::{Error, Result};
use flowmeter_core::{AMPLITUDE_MAX, MeterId, NS_PER_SEC, Pulse, Sample};
use tracing::trace;

/// Longest time an edge may take and still count as a pulse: 10 samples at
/// 16 kHz.
pub const MAX_PULSE_DURATION_NS: u64 = 625_000;

/// Meter 1 swing threshold as a fraction of full scale.
pub const FM1_THRESHOLD_RATIO: f64 = 0.15;

/// Meter 2 swing threshold as a fraction of full scale.
pub const FM2_THRESHOLD_RATIO: f64 = 0.75;

/// Minimum absolute swing for a meter 1 pulse, `floor(0.15 * 32767)`.
pub const FM1_THRESHOLD: u32 = 4_915;

/// Minimum absolute swing for a meter 2 pulse, `floor(0.75 * 32767)`.
pub const FM2_THRESHOLD: u32 = 24_575;

/// Longest edge, in samples, a reader may be configured with. The back-fill
/// holds up to this many samples per stream.
pub const MAX_EDGE_SAMPLES: usize = 1 << 20;

/// Convert a pulse duration into a whole number of samples.
///
/// Rounds to the nearest sample and never returns less than one.
pub fn max_pulse_duration_samples(duration_ns: u64, sample_rate: u32) -> usize {
    let scaled = u128::from(duration_ns) * u128::from(sample_rate);
    let rounded = (scaled + u128::from(NS_PER_SEC / 2)) / u128::from(NS_PER_SEC);
    usize::try_from(rounded).unwrap_or(usize::MAX).max(1)
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Integer swing thresholds for the two meters.
///
/// Ratios are converted once, by truncation, so classification never
/// compares floating point values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    fm1: u32,
    fm2: u32,
}

impl Thresholds {
    /// Build thresholds from fractions of full scale.
    ///
    /// Both ratios must be finite and in `(0, 1]`, and `fm1_ratio` must be
    /// strictly lower than `fm2_ratio`.
    pub fn from_ratios(fm1_ratio: f64, fm2_ratio: f64) -> Result<Self> {
        for (name, ratio) in [("fm1", fm1_ratio), ("fm2", fm2_ratio)] {
            if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
                return Err(Error::InvalidParameter(format!(
                    "{name} threshold ratio must be in (0, 1], got {ratio}"
                )));
            }
        }

        let full_scale = f64::from(AMPLITUDE_MAX);
        let fm1 = (fm1_ratio * full_scale) as u32;
        let fm2 = (fm2_ratio * full_scale) as u32;

        if fm1 == 0 {
            return Err(Error::InvalidParameter(format!(
                "fm1 threshold ratio {fm1_ratio} truncates to a zero swing"
            )));
        }
        if fm1 >= fm2 {
            return Err(Error::InvalidParameter(format!(
                "fm1 threshold ({fm1}) must be lower than fm2 threshold ({fm2})"
            )));
        }

        Ok(Thresholds { fm1, fm2 })
    }

    /// Minimum swing for meter 1.
    pub fn fm1(&self) -> u32 {
        self.fm1
    }

    /// Minimum swing for meter 2.
    pub fn fm2(&self) -> u32 {
        self.fm2
    }

    /// Attribute an absolute swing to a meter.
    ///
    /// Meter 2 is checked first: its swing always clears meter 1's
    /// threshold too, and must not be counted twice.
    pub fn classify(&self, abs_delta: u32) -> Option<MeterId> {
        if abs_delta >= self.fm2 {
            Some(MeterId::Fm2)
        } else if abs_delta >= self.fm1 {
            Some(MeterId::Fm1)
        } else {
            None
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            fm1: FM1_THRESHOLD,
            fm2: FM2_THRESHOLD,
        }
    }
}

// ---------------------------------------------------------------------------
// EdgeDetector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Rising,
    Falling,
}

/// Output of one [`EdgeDetector::detect`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    /// Pulses in the order their edges were resolved.
    pub pulses: Vec<Pulse>,
    /// Index of the last sample of the last resolved edge, pulse or not.
    pub last_edge_end: Option<usize>,
}

/// Finds bounded monotonic edges in a sample sequence and classifies them.
///
/// The detector itself is stateless; carrying samples between calls is the
/// reader's job.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    max_duration_samples: usize,
    thresholds: Thresholds,
}

impl EdgeDetector {
    /// Create a detector. `max_duration_samples` is clamped to at least one.
    pub fn new(max_duration_samples: usize, thresholds: Thresholds) -> Self {
        EdgeDetector {
            max_duration_samples: max_duration_samples.max(1),
            thresholds,
        }
    }

    /// Longest edge, in samples, the detector will consider.
    pub fn max_duration_samples(&self) -> usize {
        self.max_duration_samples
    }

    /// Thresholds used for classification.
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Follow the edge starting at `start` and return the index of its last
    /// sample.
    ///
    /// Returns `None` if the edge does not reverse within
    /// `max_duration_samples - 1` steps, or if the samples run out first.
    pub fn follow_edge(&self, samples: &[Sample], start: usize) -> Option<usize> {
        let mut direction = None;

        for step in 1..self.max_duration_samples {
            let current = start + step;
            if current >= samples.len() {
                return None;
            }

            let delta =
                i32::from(samples[current].amplitude) - i32::from(samples[current - 1].amplitude);
            let step_direction = match delta {
                0 => continue,
                d if d > 0 => Direction::Rising,
                _ => Direction::Falling,
            };

            match direction {
                None => direction = Some(step_direction),
                Some(d) if d != step_direction => return Some(current - 1),
                Some(_) => {}
            }
        }

        None
    }

    /// Scan `samples` for edges and classify the ones that are pulses.
    ///
    /// Edge starts are only tried while at least `max_duration_samples`
    /// samples follow them, so every edge that could resolve does resolve
    /// here. Later starts are left for the next call. After a resolved
    /// edge the scan resumes from its last sample, so consecutive edges share
    /// only that sample.
    pub fn detect(&self, samples: &[Sample]) -> Detection {
        let mut detection = Detection::default();

        let mut i = 0;
        while i + self.max_duration_samples < samples.len() {
            let start = i;
            let Some(end) = self.follow_edge(samples, start) else {
                i += 1;
                continue;
            };

            i = end;
            detection.last_edge_end = Some(end);

            let start_sample = samples[start];
            let end_sample = samples[end];
            let delta = i32::from(end_sample.amplitude) - i32::from(start_sample.amplitude);

            if let Some(meter) = self.thresholds.classify(delta.unsigned_abs()) {
                trace!(%meter, delta, time_ns = start_sample.time_ns, "pulse detected");
                detection
                    .pulses
                    .push(Pulse::new(start_sample, end_sample, meter));
            }
        }

        detection
    }
}
