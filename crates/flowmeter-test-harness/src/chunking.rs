//! Chunk boundary helpers.
//!
//! Results must not depend on how a byte stream is cut into chunks. These
//! helpers produce the cuts: at explicit offsets, or at seeded random
//! offsets so a failing case can be replayed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Split `bytes` at the given offsets.
///
/// Offsets are clamped to `bytes.len()` and sorted. A repeated offset, or
/// an offset of zero or `bytes.len()`, yields an empty chunk. The chunks
/// always concatenate back to `bytes`.
pub fn split_at_points<'a>(bytes: &'a [u8], points: &[usize]) -> Vec<&'a [u8]> {
    let mut cuts: Vec<usize> = points.iter().map(|&p| p.min(bytes.len())).collect();
    cuts.sort_unstable();

    let mut chunks = Vec::with_capacity(cuts.len() + 1);
    let mut from = 0;
    for cut in cuts {
        chunks.push(&bytes[from..cut]);
        from = cut;
    }
    chunks.push(&bytes[from..]);
    chunks
}

/// Split `bytes` into chunks of random length between 0 and `max_chunk`.
///
/// The same `seed` always produces the same split.
pub fn split_random(bytes: &[u8], seed: u64, max_chunk: usize) -> Vec<&[u8]> {
    let mut rng = StdRng::seed_from_u64(seed);
    let max_chunk = max_chunk.max(1);

    let mut chunks = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        let len = rng.gen_range(0..=max_chunk).min(rest.len());
        let (chunk, tail) = rest.split_at(len);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}
