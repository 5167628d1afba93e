//! End-to-end tests for the acquisition pipeline using scripted sources.

use chrono::{NaiveDate, NaiveDateTime};
use qcm_logger::protocol::{InvalidFrame, ProtocolVariant};
use qcm_logger::reading::FixedClock;
use qcm_logger::source::MockSource;
use qcm_logger::storage::{BufferedWriter, MemorySink};
use qcm_logger::{Pipeline, PollOutcome, ShutdownSignal};
use std::time::Duration;

fn fixed_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_milli_opt(10, 0, 0, 500)
        .unwrap()
}

fn build(
    source: MockSource,
    buffer_len: usize,
    variant: ProtocolVariant,
) -> Pipeline<MockSource, MemorySink, FixedClock> {
    Pipeline::new(source, BufferedWriter::new(MemorySink::new(), buffer_len), variant)
        .with_clock(FixedClock(fixed_time()))
        .with_idle_delay(Duration::ZERO)
}

/// Poll until the source is drained.
fn drain(p: &mut Pipeline<MockSource, MemorySink, FixedClock>) -> Vec<PollOutcome> {
    let mut outcomes = Vec::new();
    loop {
        match p.poll_once().unwrap() {
            PollOutcome::NoData if p.source().remaining() == 0 => break,
            outcome => outcomes.push(outcome),
        }
    }
    outcomes
}

#[test]
fn offset_variant_scenario() {
    let source = MockSource::new().with_bytes(b"RAWMONITOR6012345_250\xff");
    let mut p = build(source, 100, ProtocolVariant::Offset);

    assert_eq!(
        p.poll_once().unwrap(),
        PollOutcome::Recorded("2024.01.01,10:00:00:500,9987655,25.0\n".to_string())
    );

    p.shutdown().unwrap();
    assert_eq!(
        p.sink().contents(),
        "2024.01.01,10:00:00:500,9987655,25.0\n"
    );
}

#[test]
fn direct_variant_scenario() {
    let source = MockSource::new().with_bytes(b"RAWMONITOR9987655_253\xff");
    let mut p = build(source, 100, ProtocolVariant::Direct);
    drain(&mut p);
    p.shutdown().unwrap();
    assert_eq!(p.sink().lines(), vec!["2024.01.01,10:00:00:500,9987655,25.3"]);
}

#[test]
fn noise_produces_no_line_and_no_write() {
    let source = MockSource::new().with_bytes(b"NOISE\xff");
    let mut p = build(source, 100, ProtocolVariant::Offset);

    assert!(matches!(p.poll_once().unwrap(), PollOutcome::Dropped(_)));
    p.shutdown().unwrap();

    assert_eq!(p.pending(), 0);
    assert!(p.sink().writes().is_empty());
}

#[test]
fn malformed_frames_are_skipped_between_valid_ones() {
    let mut source = MockSource::new();
    source.push_bytes(b"RAWMONITOR1_10\xff");
    source.push_bytes(b"RAWMONITOR123\xff");
    source.push_bytes(b"RAWMONITORx_1\xff");
    source.push_bytes(b"\xff");
    source.push_bytes(b"RAWMONITOR2_20\xff");
    let mut p = build(source, 100, ProtocolVariant::Direct);

    drain(&mut p);
    p.shutdown().unwrap();

    let stats = p.stats();
    assert_eq!(stats.frames, 5);
    assert_eq!(stats.recorded, 2);
    assert_eq!(stats.dropped, 3);
    assert_eq!(
        p.sink().lines(),
        vec![
            "2024.01.01,10:00:00:500,1,1.0",
            "2024.01.01,10:00:00:500,2,2.0"
        ]
    );
}

#[test]
fn truncated_frame_is_rejected_and_reading_resumes() {
    let mut source = MockSource::new();
    source.push_bytes(b"RAWMONITOR5_5");
    source.push_timeout();
    source.push_bytes(b"RAWMONITOR5_55\xff");
    let mut p = build(source, 100, ProtocolVariant::Direct);

    let outcomes = drain(&mut p);
    assert_eq!(
        outcomes[0],
        PollOutcome::Dropped(InvalidFrame::Truncated { len: 13 })
    );
    assert!(matches!(outcomes[1], PollOutcome::Recorded(_)));
    p.shutdown().unwrap();
    assert_eq!(p.sink().lines(), vec!["2024.01.01,10:00:00:500,5,5.5"]);
}

#[test]
fn well_formed_prefix_cut_by_timeout_is_dropped() {
    // "RAWMONITOR5_5" parses on its own; the device meant to send "_55"
    let mut source = MockSource::new();
    source.push_bytes(b"RAWMONITOR5_5");
    source.push_timeout();
    let mut p = build(source, 100, ProtocolVariant::Direct);

    assert_eq!(
        p.poll_once().unwrap(),
        PollOutcome::Dropped(InvalidFrame::Truncated { len: 13 })
    );
    p.shutdown().unwrap();

    assert_eq!(p.stats().recorded, 0);
    assert_eq!(p.stats().dropped, 1);
    assert!(p.sink().writes().is_empty());
}

#[test]
fn well_formed_prefix_cut_by_length_cap_is_dropped() {
    let source = MockSource::new().with_bytes(b"RAWMONITOR1_2345\xff");
    let mut p = build(source, 100, ProtocolVariant::Direct).with_max_frame_len(13);

    assert_eq!(
        p.poll_once().unwrap(),
        PollOutcome::Dropped(InvalidFrame::Truncated { len: 13 })
    );
    p.shutdown().unwrap();
    assert!(p.sink().writes().is_empty());
}

#[test]
fn threshold_crossing_flushes_exactly_once() {
    let buffer_len = 4;
    let frames = b"RAWMONITOR1_1\xff".repeat(buffer_len + 1);
    let mut p = build(MockSource::new().with_bytes(&frames), buffer_len, ProtocolVariant::Direct);

    for _ in 0..buffer_len {
        p.poll_once().unwrap();
    }
    assert!(p.sink().writes().is_empty());
    assert_eq!(p.pending(), buffer_len);

    p.poll_once().unwrap();
    assert_eq!(p.sink().writes().len(), 1);
    assert_eq!(p.pending(), 0);
    assert_eq!(p.sink().lines().len(), buffer_len + 1);
}

#[test]
fn shutdown_persists_partial_buffer_in_order() {
    let mut source = MockSource::new();
    for i in 0..7 {
        source.push_bytes(&[format!("RAWMONITOR{i}_{i}").as_bytes(), b"\xff"].concat());
    }
    // 7 frames with a threshold of 5: one flush of 6, then 1 pending
    let mut p = build(source, 5, ProtocolVariant::Direct);
    drain(&mut p);
    assert_eq!(p.sink().writes().len(), 1);
    assert_eq!(p.pending(), 1);

    let stats = p.shutdown().unwrap();
    assert_eq!(stats.lines_flushed, 7);
    assert_eq!(p.sink().writes().len(), 2);

    let frequencies: Vec<String> = p
        .sink()
        .lines()
        .iter()
        .map(|l| l.split(',').nth(2).unwrap().to_string())
        .collect();
    assert_eq!(frequencies, vec!["0", "1", "2", "3", "4", "5", "6"]);
}

#[test]
fn run_until_signal_flushes_everything() {
    let frames = b"RAWMONITOR6000000_200\xff".repeat(3);
    let mut p = build(MockSource::new().with_bytes(&frames), 100, ProtocolVariant::Offset);

    let signal = ShutdownSignal::new();
    let stopper = signal.clone();
    let mut echoed = 0;
    let stats = p
        .run(&signal, |line| {
            assert_eq!(line, "2024.01.01,10:00:00:500,10000000,20.0");
            echoed += 1;
            if echoed == 3 {
                stopper.trigger();
            }
        })
        .unwrap();

    assert_eq!(stats.recorded, 3);
    assert_eq!(stats.flushes, 1);
    assert!(p.source().is_closed());
    assert_eq!(p.sink().lines().len(), 3);
}

#[test]
fn sink_failure_is_fatal_and_reports_pending() {
    let frames = b"RAWMONITOR1_1\xff".repeat(3);
    let mut sink = MemorySink::new();
    sink.trigger_failure();
    let mut p = Pipeline::new(
        MockSource::new().with_bytes(&frames),
        BufferedWriter::new(sink, 2),
        ProtocolVariant::Direct,
    )
    .with_clock(FixedClock(fixed_time()))
    .with_idle_delay(Duration::ZERO);

    p.poll_once().unwrap();
    p.poll_once().unwrap();
    let err = p.poll_once().unwrap_err();
    assert_eq!(err.pending_lines(), 3);
    assert_eq!(p.pending(), 3);

    // the injected failure was one-shot, so the shutdown flush recovers the lines
    p.shutdown().unwrap();
    assert_eq!(p.sink().lines().len(), 3);
}
