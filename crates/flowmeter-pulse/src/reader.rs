//! Streaming flow meter reader.
//!
//! [`FlowMeterReader`] is the single entry point of the detector: feed it
//! successive chunks of raw PCM bytes and it returns the samples decoded
//! from each chunk plus any pulses completed by it.
//!
//! Chunks may be any size and need not be sample aligned. Everything needed
//! to bridge one call to the next lives in an explicit [`StreamState`]:
//!
//! - the odd trailing byte the codec is holding,
//! - the running sample counter behind the timestamps,
//! - a back-fill of the most recent samples, at most one pulse long.
//!
//! The back-fill is prepended to the next chunk's samples before edge
//! detection, so an edge that straddles a chunk boundary is found exactly
//! once no matter where the boundary falls.
//!
//! The reader is synchronous and does no locking. Callers must deliver
//! chunks in stream order, one call at a time.

use flowmeter_core::error::Result;
use flowmeter_core::{ByteOrder, Reading, Sample};
use tracing::trace;

use crate::builder::FlowMeterReaderBuilder;
use crate::clock::SampleClock;
use crate::codec::SampleCodec;
use crate::edge::{EdgeDetector, Thresholds};

// ---------------------------------------------------------------------------
// StreamState
// ---------------------------------------------------------------------------

/// Carry-over state for one logical audio stream.
///
/// Owned exclusively by one [`FlowMeterReader`]. Two readers never share
/// state, so independent streams can be processed on independent threads.
#[derive(Debug, Clone)]
pub struct StreamState {
    codec: SampleCodec,
    clock: SampleClock,
    backfill: Vec<Sample>,
    capacity: usize,
}

impl StreamState {
    pub(crate) fn new(sample_rate: u32, capacity: usize) -> Self {
        StreamState {
            codec: SampleCodec::new(),
            clock: SampleClock::new(sample_rate),
            backfill: Vec::new(),
            capacity,
        }
    }

    /// Samples per second of the stream.
    pub fn sample_rate(&self) -> u32 {
        self.clock.sample_rate()
    }

    /// Total samples decoded so far. Never reset.
    pub fn samples_processed(&self) -> u64 {
        self.clock.samples_processed()
    }

    /// The odd byte waiting for its partner, if any.
    pub fn pending_byte(&self) -> Option<u8> {
        self.codec.pending()
    }

    /// Samples held over for the next call's edge detection.
    pub fn backfill(&self) -> &[Sample] {
        &self.backfill
    }

    /// Most samples the back-fill will ever hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Decode and timestamp every whole sample in `bytes`.
    fn decode(&mut self, bytes: &[u8], order: ByteOrder) -> Vec<Sample> {
        let amplitudes = self.codec.decode_chunk(bytes, order);
        amplitudes
            .into_iter()
            .map(|amplitude| self.clock.stamp(amplitude))
            .collect()
    }

    /// Back-fill followed by the new samples.
    fn working_set(&self, new_samples: &[Sample]) -> Vec<Sample> {
        let mut working = Vec::with_capacity(self.backfill.len() + new_samples.len());
        working.extend_from_slice(&self.backfill);
        working.extend_from_slice(new_samples);
        working
    }

    /// Keep the tail of `working` for the next call.
    ///
    /// The tail starts at `max(0, len - capacity, last_edge_end)`. Nothing
    /// before the end of an already resolved edge is kept, so that edge is
    /// never classified a second time.
    fn retain_backfill(&mut self, mut working: Vec<Sample>, last_edge_end: Option<usize>) {
        let mut from = working.len().saturating_sub(self.capacity);
        if let Some(end) = last_edge_end {
            from = from.max(end);
        }
        working.drain(..from);
        self.backfill = working;
    }
}

// ---------------------------------------------------------------------------
// FlowMeterReader
// ---------------------------------------------------------------------------

/// Decodes a 16-bit mono PCM stream and detects flow meter pulses in it.
///
/// # Example
///
/// ```
/// use flowmeter_core::{ByteOrder, MeterId};
/// use flowmeter_pulse::FlowMeterReader;
///
/// let mut reader = FlowMeterReader::new(16_000).unwrap();
///
/// let amplitudes: [i16; 11] = [0, 3000, 9000, 18000, 27000, 27000, 27000, 0, 0, 0, 0];
/// let bytes: Vec<u8> = amplitudes.iter().flat_map(|a| a.to_be_bytes()).collect();
///
/// let reading = reader.process_chunk(&bytes, ByteOrder::Big);
/// assert_eq!(reading.samples.len(), 11);
/// assert_eq!(reading.pulses.len(), 1);
/// assert_eq!(reading.pulses[0].meter, MeterId::Fm2);
/// ```
#[derive(Debug, Clone)]
pub struct FlowMeterReader {
    state: StreamState,
    detector: EdgeDetector,
    byte_order: ByteOrder,
}

impl FlowMeterReader {
    /// Create a reader with the default pulse duration and thresholds.
    ///
    /// Returns [`Error::InvalidParameter`](flowmeter_core::Error::InvalidParameter)
    /// if `sample_rate` is zero.
    pub fn new(sample_rate: u32) -> Result<Self> {
        FlowMeterReaderBuilder::new(sample_rate).build()
    }

    /// Start configuring a reader.
    pub fn builder(sample_rate: u32) -> FlowMeterReaderBuilder {
        FlowMeterReaderBuilder::new(sample_rate)
    }

    pub(crate) fn from_parts(
        sample_rate: u32,
        detector: EdgeDetector,
        byte_order: ByteOrder,
    ) -> Self {
        let state = StreamState::new(sample_rate, detector.max_duration_samples());
        FlowMeterReader {
            state,
            detector,
            byte_order,
        }
    }

    /// Process the next chunk of the stream.
    ///
    /// Returns the samples decoded from `bytes` and the pulses completed by
    /// them. An empty chunk, or a single byte that only completes nothing,
    /// returns an empty [`Reading`] and leaves the back-fill untouched.
    pub fn process_chunk(&mut self, bytes: &[u8], order: ByteOrder) -> Reading {
        let samples = self.state.decode(bytes, order);
        if samples.is_empty() {
            return Reading::default();
        }

        let working = self.state.working_set(&samples);
        let detection = self.detector.detect(&working);

        trace!(
            bytes = bytes.len(),
            samples = samples.len(),
            backfilled = working.len() - samples.len(),
            pulses = detection.pulses.len(),
            "processed chunk"
        );

        self.state.retain_backfill(working, detection.last_edge_end);
        Reading::new(samples, detection.pulses)
    }

    /// Process the next chunk using the reader's configured byte order.
    pub fn read(&mut self, bytes: &[u8]) -> Reading {
        self.process_chunk(bytes, self.byte_order)
    }

    /// Carry-over state, for inspection.
    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Samples per second of the stream.
    pub fn sample_rate(&self) -> u32 {
        self.state.sample_rate()
    }

    /// Longest edge, in samples, that can be a pulse.
    pub fn max_pulse_duration_samples(&self) -> usize {
        self.detector.max_duration_samples()
    }

    /// Total samples decoded so far.
    pub fn samples_processed(&self) -> u64 {
        self.state.samples_processed()
    }

    /// Swing thresholds used for classification.
    pub fn thresholds(&self) -> Thresholds {
        self.detector.thresholds()
    }

    /// Byte order used by [`read`](Self::read).
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Whether an odd byte is waiting for its partner.
    pub fn has_pending_byte(&self) -> bool {
        self.state.pending_byte().is_some()
    }

    /// Samples held over for the next call.
    pub fn backfill(&self) -> &[Sample] {
        self.state.backfill()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowmeter_core::{MeterId, Pulse};
    use flowmeter_test_harness::signal::encode_pcm;

    const SCENARIO: [i16; 11] = [0, 3000, 9000, 18000, 27000, 27000, 27000, 0, 0, 0, 0];

    fn reader() -> FlowMeterReader {
        FlowMeterReader::new(16_000).expect("valid sample rate")
    }

    fn feed_all(reader: &mut FlowMeterReader, chunks: &[&[u8]], order: ByteOrder) -> Reading {
        let mut total = Reading::default();
        for chunk in chunks {
            let reading = reader.process_chunk(chunk, order);
            total.samples.extend(reading.samples);
            total.pulses.extend(reading.pulses);
        }
        total
    }

    // -- construction -------------------------------------------------------

    #[test]
    fn zero_sample_rate_rejected() {
        assert!(FlowMeterReader::new(0).is_err());
    }

    #[test]
    fn derived_constants() {
        let r = reader();
        assert_eq!(r.sample_rate(), 16_000);
        assert_eq!(r.max_pulse_duration_samples(), 10);
        assert_eq!(r.state().capacity(), 10);
        assert_eq!(r.samples_processed(), 0);
        assert!(r.backfill().is_empty());
        assert!(!r.has_pending_byte());
    }

    // -- decoding -----------------------------------------------------------

    #[test]
    fn scenario_single_chunk() {
        let mut r = reader();
        let reading = r.process_chunk(&encode_pcm(&SCENARIO, ByteOrder::Big), ByteOrder::Big);

        assert_eq!(reading.samples.len(), 11);
        assert_eq!(reading.samples[1], Sample::new(62_500, 3000));
        assert_eq!(reading.pulses.len(), 1);

        let pulse = reading.pulses[0];
        assert_eq!(pulse.meter, MeterId::Fm2);
        assert_eq!(pulse.start, Sample::new(0, 0));
        assert_eq!(pulse.amplitude_delta(), 27_000);
    }

    #[test]
    fn little_endian_matches_big_endian() {
        let mut be = reader();
        let mut le = reader();
        let a = be.process_chunk(&encode_pcm(&SCENARIO, ByteOrder::Big), ByteOrder::Big);
        let b = le.process_chunk(&encode_pcm(&SCENARIO, ByteOrder::Little), ByteOrder::Little);
        assert_eq!(a, b);
    }

    #[test]
    fn read_uses_configured_byte_order() {
        let mut r = FlowMeterReader::builder(16_000)
            .byte_order(ByteOrder::Little)
            .build()
            .unwrap();
        let reading = r.read(&encode_pcm(&SCENARIO, ByteOrder::Little));
        assert_eq!(reading.samples[3].amplitude, 18_000);
        assert_eq!(reading.pulses.len(), 1);
    }

    #[test]
    fn odd_byte_is_carried() {
        let mut r = reader();
        let reading = r.process_chunk(&[0x00, 0x01, 0xD2], ByteOrder::Big);
        assert_eq!(reading.samples, vec![Sample::new(0, 1)]);
        assert!(r.has_pending_byte());

        let reading = r.process_chunk(&[0xB5], ByteOrder::Big);
        assert_eq!(reading.samples, vec![Sample::new(62_500, -11595)]);
        assert!(!r.has_pending_byte());
        assert_eq!(r.samples_processed(), 2);
    }

    #[test]
    fn samples_are_never_re_emitted() {
        let mut r = reader();
        let bytes = encode_pcm(&[5; 40], ByteOrder::Big);
        let total = feed_all(&mut r, &[&bytes[..30], &bytes[30..50], &bytes[50..]], ByteOrder::Big);
        assert_eq!(total.samples.len(), 40);
        let times: Vec<u64> = total.samples.iter().map(|s| s.time_ns).collect();
        let expected: Vec<u64> = (0..40).map(|n| n * 62_500).collect();
        assert_eq!(times, expected);
    }

    // -- empty chunks -------------------------------------------------------

    #[test]
    fn empty_chunk_is_a_no_op() {
        let mut r = reader();
        r.process_chunk(&encode_pcm(&SCENARIO, ByteOrder::Big), ByteOrder::Big);
        let backfill_before = r.backfill().to_vec();
        let processed_before = r.samples_processed();

        let reading = r.process_chunk(&[], ByteOrder::Big);
        assert!(reading.is_empty());
        assert_eq!(r.backfill(), backfill_before.as_slice());
        assert_eq!(r.samples_processed(), processed_before);
    }

    #[test]
    fn lone_byte_does_not_touch_backfill() {
        let mut r = reader();
        r.process_chunk(&encode_pcm(&SCENARIO, ByteOrder::Big), ByteOrder::Big);
        let backfill_before = r.backfill().to_vec();

        let reading = r.process_chunk(&[0x7F], ByteOrder::Big);
        assert!(reading.is_empty());
        assert_eq!(r.backfill(), backfill_before.as_slice());
        assert!(r.has_pending_byte());
    }

    // -- back-fill ----------------------------------------------------------

    #[test]
    fn backfill_never_exceeds_capacity() {
        let mut r = reader();
        let signal: Vec<i16> = (0..500).map(|n: i32| ((n * 977) % 30_000) as i16).collect();
        let bytes = encode_pcm(&signal, ByteOrder::Big);
        for chunk in bytes.chunks(7) {
            r.process_chunk(chunk, ByteOrder::Big);
            assert!(r.backfill().len() <= r.state().capacity());
        }
    }

    #[test]
    fn backfill_starts_at_last_resolved_edge() {
        let mut r = reader();
        r.process_chunk(&encode_pcm(&SCENARIO, ByteOrder::Big), ByteOrder::Big);
        // The edge ended at index 6; the four samples after it plus the end
        // sample itself are kept, even though capacity allows ten.
        let amplitudes: Vec<i16> = r.backfill().iter().map(|s| s.amplitude).collect();
        assert_eq!(amplitudes, vec![27000, 0, 0, 0, 0]);
        assert_eq!(r.backfill()[0].time_ns, 6 * 62_500);
    }

    #[test]
    fn backfill_keeps_last_capacity_samples_without_edges() {
        let mut r = reader();
        r.process_chunk(&encode_pcm(&[100; 25], ByteOrder::Big), ByteOrder::Big);
        assert_eq!(r.backfill().len(), 10);
        assert_eq!(r.backfill()[0].time_ns, 15 * 62_500);
    }

    #[test]
    fn resolved_edge_is_not_reclassified() {
        // The lower bound on the back-fill is the end of the last resolved
        // edge, not its start. A pulse resolved in one call must not appear
        // again once more samples arrive, however few were kept.
        let mut r = reader();
        let first = r.process_chunk(&encode_pcm(&SCENARIO, ByteOrder::Big), ByteOrder::Big);
        let second = r.process_chunk(&encode_pcm(&[0; 30], ByteOrder::Big), ByteOrder::Big);
        assert_eq!(first.pulses.len(), 1);
        assert!(second.pulses.is_empty());
    }

    // -- chunk boundaries ---------------------------------------------------

    #[test]
    fn pulse_straddling_boundary_found_once() {
        let mut a = vec![0i16; 20];
        a.extend([8_000, 16_000, 30_000, 10_000, 12_000]);
        a.extend([12_000; 20]);
        let bytes = encode_pcm(&a, ByteOrder::Big);

        let whole = reader().process_chunk(&bytes, ByteOrder::Big).pulses;
        let meters: Vec<MeterId> = whole.iter().map(|p| p.meter).collect();
        assert_eq!(meters, vec![MeterId::Fm2, MeterId::Fm1]);

        for split in 1..bytes.len() {
            let mut r = reader();
            let total = feed_all(&mut r, &[&bytes[..split], &bytes[split..]], ByteOrder::Big);
            assert_eq!(total.pulses, whole, "split at byte {split}");
        }
    }

    #[test]
    fn byte_at_a_time_matches_single_call() {
        let signal: Vec<i16> = (0..300)
            .map(|n: i32| match n % 23 {
                0..=3 => (n % 23) as i16 * 9_000,
                4..=6 => 6_000,
                _ => 0,
            })
            .collect();
        let bytes = encode_pcm(&signal, ByteOrder::Little);

        let whole = reader().process_chunk(&bytes, ByteOrder::Little);
        assert!(!whole.pulses.is_empty());

        let mut r = reader();
        let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
        let total = feed_all(&mut r, &chunks, ByteOrder::Little);
        assert_eq!(total.samples, whole.samples);
        assert_eq!(total.pulses, whole.pulses);
    }

    #[test]
    fn pulse_duration_bound_holds_across_chunks() {
        let signal: Vec<i16> = (0..400)
            .map(|n: i32| ((n * 7919) % 65_536 - 32_768) as i16)
            .collect();
        let bytes = encode_pcm(&signal, ByteOrder::Big);
        let mut r = reader();
        let chunks: Vec<&[u8]> = bytes.chunks(13).collect();
        let total = feed_all(&mut r, &chunks, ByteOrder::Big);

        let bound = 9 * 1_000_000_000 / 16_000;
        assert!(!total.pulses.is_empty());
        assert!(total.pulses.iter().all(|p: &Pulse| p.duration_ns() <= bound));
    }
}
