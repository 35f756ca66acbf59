//! Synthetic PCM signals.
//!
//! [`PulseTrain`] builds an amplitude sequence with pulses at known places;
//! [`encode_pcm`] turns any amplitude sequence into the raw bytes a capture
//! device would deliver.

use flowmeter_core::ByteOrder;

/// Peak of a [`PulseTrain::fm1_pulse`]: well above the meter 1 threshold,
/// well below meter 2's.
pub const FM1_PEAK: i16 = 10_000;

/// Peak of a [`PulseTrain::fm2_pulse`].
pub const FM2_PEAK: i16 = 30_000;

/// Encode amplitudes as 16-bit PCM bytes in `order`.
pub fn encode_pcm(amplitudes: &[i16], order: ByteOrder) -> Vec<u8> {
    amplitudes
        .iter()
        .flat_map(|a| match order {
            ByteOrder::Big => a.to_be_bytes(),
            ByteOrder::Little => a.to_le_bytes(),
        })
        .collect()
}

/// Builder for amplitude sequences made of quiet stretches and spikes.
///
/// A spike rises to its peak over three samples and falls back to zero
/// over two. Its rise is one pulse. Its fall is left unresolved as long as
/// the spike is followed by at least ten quiet samples, so each spike
/// yields exactly one pulse at the default 16 kHz settings.
///
/// ```
/// use flowmeter_test_harness::PulseTrain;
///
/// let amplitudes = PulseTrain::new().quiet(20).fm2_pulse().quiet(20).build();
/// assert_eq!(amplitudes.len(), 45);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PulseTrain {
    amplitudes: Vec<i16>,
}

impl PulseTrain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `n` zero samples.
    pub fn quiet(self, n: usize) -> Self {
        self.hold(0, n)
    }

    /// Append `n` samples at a fixed amplitude.
    pub fn hold(mut self, amplitude: i16, n: usize) -> Self {
        self.amplitudes.extend(std::iter::repeat(amplitude).take(n));
        self
    }

    /// Append a spike to `peak` and back to zero.
    pub fn spike(mut self, peak: i16) -> Self {
        self.amplitudes
            .extend([peak / 3, peak / 3 * 2, peak, peak / 2, 0]);
        self
    }

    /// Append a spike meter 1 would produce.
    pub fn fm1_pulse(self) -> Self {
        self.spike(FM1_PEAK)
    }

    /// Append a spike meter 2 would produce.
    pub fn fm2_pulse(self) -> Self {
        self.spike(FM2_PEAK)
    }

    /// Append arbitrary samples.
    pub fn samples(mut self, amplitudes: &[i16]) -> Self {
        self.amplitudes.extend_from_slice(amplitudes);
        self
    }

    /// Number of samples so far.
    pub fn len(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }

    pub fn build(self) -> Vec<i16> {
        self.amplitudes
    }

    /// Build and encode in one step.
    pub fn encode(self, order: ByteOrder) -> Vec<u8> {
        encode_pcm(&self.amplitudes, order)
    }
}
