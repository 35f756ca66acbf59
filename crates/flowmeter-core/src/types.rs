//! Core types used throughout flowmeter.
//!
//! These are plain immutable values: decoded [`Sample`]s, classified
//! [`Pulse`]s, and the per-call [`Reading`] that bundles both. Nothing in
//! this module performs I/O or holds stream state.

use std::fmt;
use std::str::FromStr;

/// Number of nanoseconds in one second.
pub const NS_PER_SEC: u64 = 1_000_000_000;

/// Largest amplitude a 16-bit signed PCM sample can carry.
pub const AMPLITUDE_MAX: i16 = i16::MAX;

// ---------------------------------------------------------------------------
// ByteOrder
// ---------------------------------------------------------------------------

/// Byte order of the raw 16-bit PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    /// Least-significant byte first.
    Little,
    /// Most-significant byte first. This is the capture format the meters
    /// were originally recorded with, hence the default.
    #[default]
    Big,
}

impl ByteOrder {
    /// Returns `true` for [`ByteOrder::Big`].
    pub fn is_big_endian(&self) -> bool {
        matches!(self, ByteOrder::Big)
    }

    /// Build a byte order from a big-endian flag.
    pub fn from_big_endian(big_endian: bool) -> Self {
        if big_endian {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::Little => write!(f, "little-endian"),
            ByteOrder::Big => write!(f, "big-endian"),
        }
    }
}

/// Error returned when a string cannot be parsed into a [`ByteOrder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseByteOrderError(String);

impl fmt::Display for ParseByteOrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown byte order: {}", self.0)
    }
}

impl std::error::Error for ParseByteOrderError {}

impl FromStr for ByteOrder {
    type Err = ParseByteOrderError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "le" | "little" | "little-endian" => Ok(ByteOrder::Little),
            "be" | "big" | "big-endian" => Ok(ByteOrder::Big),
            _ => Err(ParseByteOrderError(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Sample
// ---------------------------------------------------------------------------

/// One decoded amplitude value with the time it was captured at.
///
/// `time_ns` is measured from the first sample of the stream, so the first
/// sample always sits at `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sample {
    /// Capture time in nanoseconds since the start of the stream.
    pub time_ns: u64,
    /// Signed 16-bit amplitude.
    pub amplitude: i16,
}

impl Sample {
    /// Create a new sample.
    pub fn new(time_ns: u64, amplitude: i16) -> Self {
        Sample { time_ns, amplitude }
    }
}

// ---------------------------------------------------------------------------
// MeterId
// ---------------------------------------------------------------------------

/// Which of the two flow meters sharing the audio channel produced a pulse.
///
/// Meter 2 produces the larger amplitude swing, so a swing large enough for
/// meter 2 is never also attributed to meter 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MeterId {
    /// Flow meter 1 (small swing).
    Fm1,
    /// Flow meter 2 (large swing).
    Fm2,
}

impl MeterId {
    /// Both meters, in numeric order.
    pub const ALL: [MeterId; 2] = [MeterId::Fm1, MeterId::Fm2];

    /// The 1-based meter number.
    pub fn number(&self) -> u8 {
        match self {
            MeterId::Fm1 => 1,
            MeterId::Fm2 => 2,
        }
    }
}

impl fmt::Display for MeterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FM{}", self.number())
    }
}

// ---------------------------------------------------------------------------
// Pulse
// ---------------------------------------------------------------------------

/// A detected pulse: one edge whose amplitude swing crossed a meter threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pulse {
    /// First sample of the edge.
    pub start: Sample,
    /// Last sample of the edge.
    pub end: Sample,
    /// Meter the swing was attributed to.
    pub meter: MeterId,
}

impl Pulse {
    /// Create a new pulse.
    pub fn new(start: Sample, end: Sample, meter: MeterId) -> Self {
        Pulse { start, end, meter }
    }

    /// Signed amplitude change from the start of the edge to its end.
    pub fn amplitude_delta(&self) -> i32 {
        i32::from(self.end.amplitude) - i32::from(self.start.amplitude)
    }

    /// Time between the first and last sample of the edge.
    pub fn duration_ns(&self) -> u64 {
        self.end.time_ns.saturating_sub(self.start.time_ns)
    }

    /// Returns `true` if the amplitude rose across the edge.
    pub fn is_rising(&self) -> bool {
        self.amplitude_delta() > 0
    }
}

impl fmt::Display for Pulse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pulse at {} ns ({:+} over {} ns)",
            self.meter,
            self.start.time_ns,
            self.amplitude_delta(),
            self.duration_ns()
        )
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Result of processing one chunk of PCM bytes.
///
/// `samples` holds only the samples decoded from this chunk; samples carried
/// over from an earlier chunk for edge detection are never repeated here.
/// `pulses` holds only pulses completed during this call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reading {
    /// Newly decoded samples, in stream order.
    pub samples: Vec<Sample>,
    /// Newly detected pulses, in stream order.
    pub pulses: Vec<Pulse>,
}

impl Reading {
    /// Create a new reading.
    pub fn new(samples: Vec<Sample>, pulses: Vec<Pulse>) -> Self {
        Reading { samples, pulses }
    }

    /// Returns `true` if neither samples nor pulses were produced.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.pulses.is_empty()
    }
}
