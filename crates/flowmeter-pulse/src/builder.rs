//! FlowMeterReaderBuilder -- fluent builder for [`FlowMeterReader`].
//!
//! Separates configuration from construction so that parameter problems
//! surface once, at [`build()`](FlowMeterReaderBuilder::build), instead of
//! deep inside chunk processing. Per-chunk processing never fails.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use flowmeter_core::ByteOrder;
//! use flowmeter_pulse::FlowMeterReaderBuilder;
//!
//! # fn example() -> flowmeter_core::Result<()> {
//! let reader = FlowMeterReaderBuilder::new(44_100)
//!     .max_pulse_duration(Duration::from_micros(500))
//!     .thresholds(0.2, 0.8)
//!     .byte_order(ByteOrder::Little)
//!     .build()?;
//! assert_eq!(reader.max_pulse_duration_samples(), 22);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use std::time::Duration;

use flowmeter_core::ByteOrder;
use flowmeter_core::error::{Error, Result};
use tracing::debug;

use crate::edge::{
    EdgeDetector, FM1_THRESHOLD_RATIO, FM2_THRESHOLD_RATIO, MAX_EDGE_SAMPLES,
    MAX_PULSE_DURATION_NS, Thresholds, max_pulse_duration_samples,
};
use crate::reader::FlowMeterReader;

/// Fluent builder for [`FlowMeterReader`].
///
/// Every setting except the sample rate defaults to the values the meters
/// were characterised with: 625 µs maximum pulse duration, 0.15 / 0.75
/// threshold ratios, big-endian input.
#[derive(Debug, Clone)]
pub struct FlowMeterReaderBuilder {
    sample_rate: u32,
    max_pulse_duration: Duration,
    fm1_ratio: f64,
    fm2_ratio: f64,
    byte_order: ByteOrder,
}

impl FlowMeterReaderBuilder {
    /// Create a builder for a stream at `sample_rate` samples per second.
    pub fn new(sample_rate: u32) -> Self {
        FlowMeterReaderBuilder {
            sample_rate,
            max_pulse_duration: Duration::from_nanos(MAX_PULSE_DURATION_NS),
            fm1_ratio: FM1_THRESHOLD_RATIO,
            fm2_ratio: FM2_THRESHOLD_RATIO,
            byte_order: ByteOrder::Big,
        }
    }

    /// Longest rise or fall that still counts as a pulse (default: 625 µs).
    pub fn max_pulse_duration(mut self, duration: Duration) -> Self {
        self.max_pulse_duration = duration;
        self
    }

    /// Swing thresholds as fractions of full scale (default: 0.15 / 0.75).
    pub fn thresholds(mut self, fm1_ratio: f64, fm2_ratio: f64) -> Self {
        self.fm1_ratio = fm1_ratio;
        self.fm2_ratio = fm2_ratio;
        self
    }

    /// Byte order assumed by [`FlowMeterReader::read`] (default: big-endian).
    pub fn byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    /// Validate the configuration and build the reader.
    pub fn build(self) -> Result<FlowMeterReader> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidParameter(
                "sample rate must be positive".into(),
            ));
        }
        if self.max_pulse_duration.is_zero() {
            return Err(Error::InvalidParameter(
                "max pulse duration must be positive".into(),
            ));
        }

        let duration_ns = u64::try_from(self.max_pulse_duration.as_nanos()).map_err(|_| {
            Error::InvalidParameter(format!(
                "max pulse duration {:?} is out of range",
                self.max_pulse_duration
            ))
        })?;

        let thresholds = Thresholds::from_ratios(self.fm1_ratio, self.fm2_ratio)?;
        let max_samples = max_pulse_duration_samples(duration_ns, self.sample_rate);
        if max_samples > MAX_EDGE_SAMPLES {
            return Err(Error::InvalidParameter(format!(
                "max pulse duration {:?} at {} Hz spans more than {} samples",
                self.max_pulse_duration, self.sample_rate, MAX_EDGE_SAMPLES
            )));
        }

        debug!(
            sample_rate = self.sample_rate,
            max_pulse_duration_samples = max_samples,
            fm1_threshold = thresholds.fm1(),
            fm2_threshold = thresholds.fm2(),
            byte_order = %self.byte_order,
            "flow meter reader configured"
        );

        Ok(FlowMeterReader::from_parts(
            self.sample_rate,
            EdgeDetector::new(max_samples, thresholds),
            self.byte_order,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let reader = FlowMeterReaderBuilder::new(16_000).build().unwrap();
        assert_eq!(reader.max_pulse_duration_samples(), 10);
        assert_eq!(reader.thresholds(), Thresholds::default());
        assert_eq!(reader.byte_order(), ByteOrder::Big);
    }

    #[test]
    fn zero_sample_rate() {
        let err = FlowMeterReaderBuilder::new(0).build().unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
        assert_eq!(err.to_string(), "invalid parameter: sample rate must be positive");
    }

    #[test]
    fn zero_duration() {
        let err = FlowMeterReaderBuilder::new(16_000)
            .max_pulse_duration(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn huge_duration() {
        let err = FlowMeterReaderBuilder::new(16_000)
            .max_pulse_duration(Duration::MAX)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn duration_past_sample_limit() {
        let err = FlowMeterReaderBuilder::new(u32::MAX)
            .max_pulse_duration(Duration::from_secs(10_000_000_000))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));

        let err = FlowMeterReaderBuilder::new(48_000)
            .max_pulse_duration(Duration::from_secs(60))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn duration_at_sample_limit() {
        let reader = FlowMeterReaderBuilder::new(1 << 20)
            .max_pulse_duration(Duration::from_secs(1))
            .build()
            .unwrap();
        assert_eq!(reader.max_pulse_duration_samples(), MAX_EDGE_SAMPLES);
        assert!(reader.backfill().is_empty());
    }

    #[test]
    fn short_duration_clamps_to_one_sample() {
        let reader = FlowMeterReaderBuilder::new(8_000)
            .max_pulse_duration(Duration::from_nanos(1))
            .build()
            .unwrap();
        assert_eq!(reader.max_pulse_duration_samples(), 1);
    }

    #[test]
    fn custom_duration() {
        let reader = FlowMeterReaderBuilder::new(48_000)
            .max_pulse_duration(Duration::from_millis(1))
            .build()
            .unwrap();
        assert_eq!(reader.max_pulse_duration_samples(), 48);
    }

    #[test]
    fn custom_thresholds() {
        let reader = FlowMeterReaderBuilder::new(16_000)
            .thresholds(0.25, 0.5)
            .build()
            .unwrap();
        assert_eq!(reader.thresholds().fm1(), 8_191);
        assert_eq!(reader.thresholds().fm2(), 16_383);
    }

    #[test]
    fn inverted_thresholds() {
        let err = FlowMeterReaderBuilder::new(16_000)
            .thresholds(0.75, 0.15)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }
}
