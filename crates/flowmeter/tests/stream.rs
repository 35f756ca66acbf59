//! End-to-end stream tests: reader state across calls, and the pump driven
//! by a mock source.

use flowmeter::{
    ByteOrder, FlowEvent, FlowMeterReader, MeterId, PulseTally, PumpConfig, StopReason,
    spawn_pump,
};
use flowmeter_test_harness::chunking::split_random;
use flowmeter_test_harness::{MockPcmSource, PulseTrain, encode_pcm};
use tokio::sync::broadcast;

const PERIOD_NS: u64 = 62_500;

fn reader() -> FlowMeterReader {
    FlowMeterReader::new(16_000).unwrap()
}

// ---------------------------------------------------------------------------
// Back-fill
// ---------------------------------------------------------------------------

/// A pulse ends late in a chunk, so only a few samples are kept. An edge
/// starting at that pulse's end must still resolve once enough samples
/// have trickled in, one sample per call.
#[test]
fn short_backfill_still_resolves_next_edge() {
    let first: [i16; 11] = [0, 3000, 9000, 18000, 27000, 27000, 27000, 0, 0, 0, 0];
    let mut rest = vec![0i16, 0, 12_000];
    rest.extend([12_000; 20]);

    let mut all = first.to_vec();
    all.extend(&rest);
    let whole = reader().process_chunk(&encode_pcm(&all, ByteOrder::Big), ByteOrder::Big);
    assert_eq!(whole.pulses.len(), 2);

    let mut r = reader();
    let mut pulses = r
        .process_chunk(&encode_pcm(&first, ByteOrder::Big), ByteOrder::Big)
        .pulses;
    assert_eq!(r.backfill().len(), 5);

    for amplitude in rest {
        let reading = r.process_chunk(&encode_pcm(&[amplitude], ByteOrder::Big), ByteOrder::Big);
        pulses.extend(reading.pulses);
    }

    assert_eq!(pulses, whole.pulses);
    let falling = pulses[1];
    assert_eq!(falling.meter, MeterId::Fm2);
    assert_eq!(falling.start.time_ns, 6 * PERIOD_NS);
    assert_eq!(falling.end.time_ns, 12 * PERIOD_NS);
    assert_eq!(falling.amplitude_delta(), -27_000);
}

#[test]
fn independent_readers_do_not_interfere() {
    let a = PulseTrain::new().quiet(12).fm1_pulse().quiet(12).encode(ByteOrder::Big);
    let b = PulseTrain::new().quiet(12).fm2_pulse().quiet(12).encode(ByteOrder::Big);

    let mut ra = reader();
    let mut rb = reader();
    let mut tally_a = PulseTally::new();
    let mut tally_b = PulseTally::new();

    let mut chunks_a = a.chunks(5);
    let mut chunks_b = b.chunks(7);
    loop {
        let (ca, cb) = (chunks_a.next(), chunks_b.next());
        if ca.is_none() && cb.is_none() {
            break;
        }
        if let Some(chunk) = ca {
            tally_a.record(&ra.process_chunk(chunk, ByteOrder::Big));
        }
        if let Some(chunk) = cb {
            tally_b.record(&rb.process_chunk(chunk, ByteOrder::Big));
        }
    }

    assert_eq!(tally_a.pulses(MeterId::Fm1), 1);
    assert_eq!(tally_a.pulses(MeterId::Fm2), 0);
    assert_eq!(tally_b.pulses(MeterId::Fm1), 0);
    assert_eq!(tally_b.pulses(MeterId::Fm2), 1);
}

// ---------------------------------------------------------------------------
// Pump
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pump_over_random_chunks_matches_single_call() {
    let train = PulseTrain::new()
        .quiet(12)
        .fm2_pulse()
        .quiet(15)
        .fm1_pulse()
        .quiet(20)
        .fm1_pulse()
        .quiet(11)
        .fm2_pulse()
        .quiet(12);
    let bytes = train.encode(ByteOrder::Little);
    let whole = reader().process_chunk(&bytes, ByteOrder::Little);

    let chunks = split_random(&bytes, 0xF10E, 21);
    let source = MockPcmSource::from_chunks(chunks.iter().map(|c| c.to_vec()), ByteOrder::Little);

    let (event_tx, mut events) = broadcast::channel(64);
    let mut pump = spawn_pump(Box::new(source), reader(), PumpConfig::default(), event_tx);

    let mut pulses = Vec::new();
    while let Some(reading) = pump.recv().await {
        pulses.extend(reading.pulses);
    }
    assert_eq!(pulses, whole.pulses);

    let outcome = pump.join().await.unwrap();
    assert_eq!(outcome.stop, StopReason::EndOfStream);
    assert_eq!(outcome.tally.total_pulses(), 4);
    assert_eq!(outcome.tally.last_pulse().map(|p| p.meter), Some(MeterId::Fm2));

    let mut event_pulses = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            FlowEvent::Pulse(p) => event_pulses.push(p),
            FlowEvent::EndOfStream { samples_processed } => {
                assert_eq!(samples_processed, (bytes.len() / 2) as u64);
            }
            FlowEvent::SourceError { message } => panic!("unexpected source error: {message}"),
        }
    }
    assert_eq!(event_pulses, whole.pulses);
}

#[tokio::test]
async fn reader_resumes_after_pump() {
    let first = PulseTrain::new().quiet(12).fm1_pulse().build();
    let second = PulseTrain::new().quiet(12).fm2_pulse().quiet(12).build();

    let source = MockPcmSource::from_chunks([encode_pcm(&first, ByteOrder::Big)], ByteOrder::Big);
    let (event_tx, _) = broadcast::channel(16);
    let pump = spawn_pump(Box::new(source), reader(), PumpConfig::default(), event_tx);
    let mut outcome = pump.join().await.unwrap();

    // The first spike's fall is still pending in the back-fill; the stream
    // continues seamlessly when fed directly.
    let reading = outcome
        .reader
        .process_chunk(&encode_pcm(&second, ByteOrder::Big), ByteOrder::Big);
    outcome.tally.record(&reading);

    assert_eq!(outcome.tally.pulses(MeterId::Fm1), 1);
    assert_eq!(outcome.tally.pulses(MeterId::Fm2), 1);
    assert_eq!(
        outcome.reader.samples_processed(),
        (first.len() + second.len()) as u64
    );
}
