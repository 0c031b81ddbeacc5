//! Silence-triggered response state machine.
//!
//! The controller is the only writer of the note buffer and of the
//! "responding" guard. It is driven entirely by explicit timestamps
//! (note events carry their own, `tick` receives the current session time),
//! so it has no clock or timer of its own; the session loop asks
//! [`TriggerController::next_wakeup`] when to call `tick` next.
//!
//! ```text
//!   Idle ──note-on──▶ Capturing ──last note-off──▶ AwaitingSilence
//!    ▲                    ▲                              │ silence ≥ threshold
//!    │                    └──────note-on─────────────────┤
//!    └──── completion ◀──────────── Responding ◀─────────┘
//! ```

use crate::engine::GenerationEngine;
use crate::metrics::SessionMetrics;
use crate::note_buffer::{self, NoteBuffer};
use crate::types::*;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::BTreeSet;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    /// Nothing held, nothing buffered.
    Idle,
    /// At least one note held, or notes buffered while keys are down.
    Capturing,
    /// All notes released; waiting out the silence threshold.
    AwaitingSilence,
    /// A reply is out; the buffer only collects notes for the next cycle.
    Responding,
}

/// One armed silence check. At most one exists at a time; a note-on or the
/// start of a response disarms it.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SilenceDeadline {
    /// Session time at which `now - last_onset` reaches the threshold.
    due: f64,
}

pub struct TriggerController<R: Rng = StdRng> {
    buffer: NoteBuffer,
    held: BTreeSet<u8>,
    state: TriggerState,
    responding: bool,
    silence: Option<SilenceDeadline>,
    /// When the in-flight reply finishes playing.
    completion_due: Option<f64>,
    last_onset: Option<f64>,
    silence_threshold: f64,
    mode: Mode,
    temperature: f64,
    engine: GenerationEngine<R>,
    metrics: SessionMetrics,
}

impl TriggerController<StdRng> {
    pub fn new(mode: Mode, temperature: f64, silence_threshold: f64, seed: Option<u64>) -> Self {
        Self::with_engine(mode, temperature, silence_threshold, GenerationEngine::new(seed))
    }
}

impl<R: Rng> TriggerController<R> {
    pub fn with_engine(
        mode: Mode,
        temperature: f64,
        silence_threshold: f64,
        engine: GenerationEngine<R>,
    ) -> Self {
        Self {
            buffer: NoteBuffer::new(),
            held: BTreeSet::new(),
            state: TriggerState::Idle,
            responding: false,
            silence: None,
            completion_due: None,
            last_onset: None,
            silence_threshold,
            mode,
            temperature,
            engine,
            metrics: SessionMetrics::default(),
        }
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn is_responding(&self) -> bool {
        self.responding
    }

    pub fn buffered(&self) -> &[TimedNote] {
        self.buffer.notes()
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Takes effect from the next cycle.
    pub fn set_mode(&mut self, mode: Mode) {
        info!("Mode → {}", mode);
        self.mode = mode;
    }

    /// Takes effect from the next cycle.
    pub fn set_temperature(&mut self, temperature: f64) {
        info!("Temperature → {:.2}", temperature);
        self.temperature = temperature;
    }

    pub fn note_on(&mut self, event: &NoteOnEvent) {
        let gap = self
            .buffer
            .append(event.pitch, event.velocity as f64, event.timestamp)
            .gap_from_previous;
        debug!(
            "note-on {} vel={} t={:.3} gap={:.3} (buffered {})",
            midi_to_name(event.pitch),
            event.velocity,
            event.timestamp,
            gap,
            self.buffer.len()
        );
        self.held.insert(event.pitch);
        self.last_onset = Some(event.timestamp);
        self.silence = None;
        if !self.responding {
            self.state = TriggerState::Capturing;
        }
    }

    pub fn note_off(&mut self, event: &NoteOffEvent) {
        self.held.remove(&event.pitch);
        if self.held.is_empty() && !self.responding {
            self.await_silence();
        }
    }

    /// Arm the silence deadline if there is anything to respond to.
    fn await_silence(&mut self) {
        match self.last_onset {
            Some(last_onset) if !self.buffer.is_empty() => {
                self.state = TriggerState::AwaitingSilence;
                self.silence = Some(SilenceDeadline {
                    due: last_onset + self.silence_threshold,
                });
            }
            _ => {
                self.state = TriggerState::Idle;
                self.silence = None;
            }
        }
    }

    /// The earliest session time at which `tick` has something to do.
    pub fn next_wakeup(&self) -> Option<f64> {
        match (self.completion_due, self.silence.map(|s| s.due)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Finish a due response cycle, then run the silence check.
    pub fn tick(&mut self, now: f64) -> Option<Response> {
        if matches!(self.completion_due, Some(due) if now >= due) {
            self.complete_response();
        }
        self.poll(now)
    }

    /// Silence check. Starts exactly one generation pass when the performer
    /// has been quiet for the threshold; returns `None` otherwise.
    pub fn poll(&mut self, now: f64) -> Option<Response> {
        let deadline = self.silence?;
        let last_onset = self.last_onset?;
        if now < deadline.due || self.buffer.is_empty() || self.responding {
            return None;
        }
        debug!("Silence of {:.3}s detected, responding", now - last_onset);
        Some(self.dispatch(now))
    }

    fn dispatch(&mut self, now: f64) -> Response {
        self.silence = None;
        self.responding = true;
        self.state = TriggerState::Responding;

        // Everything buffered so far belongs to this pass; later notes
        // seed the next one.
        let input = self.buffer.take();
        let average_gap = note_buffer::average_gap(&input);
        let params = GenerationParameters::for_input(self.mode, self.temperature, input.len());

        let started = Instant::now();
        let generation = self.engine.respond(&input, &params);
        let elapsed = started.elapsed();

        let notes: Vec<ScheduledNote> = generation
            .notes
            .iter()
            .enumerate()
            .map(|(i, n)| ScheduledNote {
                pitch: n.pitch,
                velocity: n.velocity,
                duration: n.duration,
                offset_secs: i as f64 * average_gap,
            })
            .collect();

        let response = Response {
            dispatched_at: now,
            mode: params.mode,
            temperature: params.temperature,
            input_count: input.len(),
            average_gap,
            notes,
            outcome: generation.outcome,
        };

        self.metrics
            .record(input.len(), response.notes.len(), elapsed, response.used_fallback());
        info!(
            "Response #{}: {} notes ({}{}) for {} input notes, gap {:.3}s, {:.2}ms, confidence {}%",
            self.metrics.cycles,
            response.notes.len(),
            response.mode,
            if response.used_fallback() { ", fallback" } else { "" },
            response.input_count,
            average_gap,
            self.metrics.last_response_ms,
            self.metrics.last_confidence,
        );

        if response.notes.is_empty() {
            self.complete_response();
        } else {
            self.completion_due = Some(now + response.total_duration());
        }
        response
    }

    /// The reply has finished playing: release the guard and pick up
    /// whatever the performer did meanwhile.
    pub fn complete_response(&mut self) {
        self.completion_due = None;
        self.responding = false;
        if !self.held.is_empty() {
            self.state = TriggerState::Capturing;
        } else {
            self.await_silence();
        }
        debug!("Response cycle complete → {:?}", self.state);
    }

    /// End the jam: forget all input and any cycle in flight.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.held.clear();
        self.silence = None;
        self.completion_due = None;
        self.last_onset = None;
        self.responding = false;
        self.state = TriggerState::Idle;
        info!("Jam reset");
    }
}
