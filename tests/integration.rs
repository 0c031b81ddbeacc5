//! End-to-end integration tests for the jam responder pipeline.
//!
//! These tests exercise the full data flow:
//!   InputEvent channel → Session (trigger + engine) → Response channel → assertions
//!
//! Events are stamped from a shared SessionClock with real sleeps between
//! them, so the silence trigger runs on wall-clock time exactly as it does
//! behind the simulator.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use jam_responder::event_reader::{self, PerformanceReader};
use jam_responder::session::Session;
use jam_responder::trigger::TriggerController;
use jam_responder::types::*;

// ─── Helpers ───────────────────────────────────────────────────────────────

const THRESHOLD: f64 = 0.1;

struct Harness {
    tx: Sender<InputEvent>,
    rx: Receiver<Response>,
    clock: SessionClock,
    handle: JoinHandle<()>,
}

/// Run a session in a background thread with a short silence threshold.
fn start(mode: Mode) -> Harness {
    start_with_threshold(mode, THRESHOLD)
}

fn start_with_threshold(mode: Mode, threshold: f64) -> Harness {
    let (tx, input_rx) = bounded::<InputEvent>(256);
    let (response_tx, rx) = bounded::<Response>(64);
    let clock = SessionClock::new();
    let controller = TriggerController::new(mode, 1.0, threshold, Some(42));
    let session_clock = clock.clone();
    let handle = thread::Builder::new()
        .name("test-session".into())
        .spawn(move || {
            Session::new(input_rx, vec![response_tx], controller, session_clock).run();
        })
        .unwrap();
    Harness { tx, rx, clock, handle }
}

impl Harness {
    fn press(&self, pitch: u8, velocity: u8) {
        self.tx
            .send(InputEvent::NoteOn(NoteOnEvent {
                pitch,
                velocity,
                timestamp: self.clock.now_secs(),
            }))
            .unwrap();
    }

    fn release(&self, pitch: u8) {
        self.tx
            .send(InputEvent::NoteOff(NoteOffEvent {
                pitch,
                timestamp: self.clock.now_secs(),
            }))
            .unwrap();
    }

    /// Tap each pitch for `ms`, back to back.
    fn play(&self, pitches: &[u8], ms: u64) {
        for &p in pitches {
            self.press(p, 100);
            thread::sleep(Duration::from_millis(ms));
            self.release(p);
        }
    }

    fn expect_response(&self) -> Response {
        self.rx
            .recv_timeout(Duration::from_secs(3))
            .expect("session should respond after silence")
    }

    fn expect_quiet(&self, ms: u64) {
        if let Ok(r) = self.rx.recv_timeout(Duration::from_millis(ms)) {
            panic!("unexpected response: {:?}", r);
        }
    }

    fn finish(self) {
        drop(self.tx);
        self.handle.join().expect("session thread panicked");
    }
}

fn assert_well_formed(response: &Response) {
    assert!(response.notes.len() <= max_output_notes(response.input_count));
    assert!(!response.notes.is_empty());
    for (i, n) in response.notes.iter().enumerate() {
        assert!(n.pitch <= 127);
        assert!((0.0..=1.0).contains(&n.velocity), "velocity {}", n.velocity);
        assert!(n.duration > 0.0 && n.duration <= 10.0, "duration {}", n.duration);
        let expected = i as f64 * response.average_gap;
        assert!((n.offset_secs - expected).abs() < 1e-9);
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[test]
fn test_pipeline_responds_once_after_silence() {
    let h = start(Mode::Harmony);
    h.play(&[60, 64, 67], 20);

    let response = h.expect_response();
    assert_eq!(response.mode, Mode::Harmony);
    assert_eq!(response.input_count, 3);
    assert!(!response.used_fallback());
    assert_well_formed(&response);
    assert!(response.average_gap > 0.0 && response.average_gap < 0.2);

    // No further input, no further response
    h.expect_quiet((response.total_duration() * 1000.0) as u64 + 400);
    h.finish();
}

#[test]
fn test_pipeline_held_note_delays_response() {
    let h = start(Mode::Harmony);
    h.press(62, 90);
    // Held well past the threshold: still capturing
    h.expect_quiet(300);
    h.release(62);

    let response = h.expect_response();
    assert_eq!(response.input_count, 1);
    assert_well_formed(&response);
    h.finish();
}

#[test]
fn test_pipeline_notes_during_response_seed_next_cycle() {
    let h = start(Mode::Harmony);
    h.play(&[60, 67], 150);
    let first = h.expect_response();
    assert_eq!(first.input_count, 2);

    // Performer plays over the reply
    h.play(&[72], 10);

    let second = h.expect_response();
    assert_eq!(second.input_count, 1);
    assert!(
        second.dispatched_at >= first.dispatched_at + first.total_duration() - 1e-6,
        "second pass must wait for the first to finish"
    );
    h.finish();
}

#[test]
fn test_pipeline_mode_and_temperature_changes() {
    let h = start(Mode::Harmony);
    h.tx.send(InputEvent::SetMode(Mode::Groove)).unwrap();
    h.tx.send(InputEvent::SetTemperature(0.5)).unwrap();
    h.play(&[43, 48, 50], 20);

    let response = h.expect_response();
    assert_eq!(response.mode, Mode::Groove);
    assert!((response.temperature - 0.5).abs() < 1e-12);
    assert_well_formed(&response);
    h.finish();
}

#[test]
fn test_pipeline_reset_discards_call() {
    let h = start(Mode::Harmony);
    h.play(&[60, 62], 10);
    h.tx.send(InputEvent::Reset).unwrap();
    h.expect_quiet(400);

    // Session still alive after the reset
    h.play(&[65], 10);
    assert_eq!(h.expect_response().input_count, 1);
    h.finish();
}

#[test]
fn test_pipeline_all_modes_within_budget() {
    for mode in Mode::ALL {
        let h = start(mode);
        h.play(&[57, 60, 64, 62, 69], 15);
        let response = h.expect_response();
        assert_eq!(response.mode, mode);
        assert_eq!(response.input_count, 5);
        assert_well_formed(&response);
        h.finish();
    }
}

#[test]
fn test_pipeline_replayed_performance() {
    let data = concat!(
        r#"{"format":"jam-performance","description":"three-note call"}"#, "\n",
        r#"{"e":"on","p":60,"v":100,"t":0.00}"#, "\n",
        r#"{"e":"off","p":60,"t":0.02}"#, "\n",
        r#"{"e":"on","p":64,"v":100,"t":0.03}"#, "\n",
        "not an event\n",
        r#"{"e":"off","p":64,"t":0.05}"#, "\n",
        r#"{"e":"on","p":67,"v":100,"t":0.06}"#, "\n",
        r#"{"e":"off","p":67,"t":0.08}"#, "\n",
    );
    let reader = PerformanceReader::open(std::io::Cursor::new(data)).unwrap();
    assert_eq!(reader.header.description, "three-note call");
    let events = reader.read_all();
    assert_eq!(events.len(), 6);

    let h = start(Mode::Continue);
    event_reader::replay(&events, &h.clock, &h.tx);
    let response = h.expect_response();
    assert_eq!(response.mode, Mode::Continue);
    assert_eq!(response.input_count, 3);
    assert_well_formed(&response);
    h.finish();
}

#[test]
fn test_pipeline_closes_when_input_closes() {
    let h = start(Mode::Improvise);
    let rx = h.rx.clone();
    h.finish();
    // Session dropped its sender on shutdown
    assert!(rx.recv_timeout(Duration::from_secs(1)).is_err());
}

#[test]
fn test_pipeline_survives_unreachable_silence_deadline() {
    // Deadline far beyond what an Instant can represent
    let h = start_with_threshold(Mode::Harmony, 1e20);
    h.play(&[60, 64], 10);
    h.expect_quiet(200);

    // Still accepting input after arming the deadline
    h.play(&[67], 10);
    h.tx.send(InputEvent::Reset).unwrap();
    h.expect_quiet(100);
    h.finish();
}
