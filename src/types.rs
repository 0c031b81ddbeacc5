use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::error::GenerationError;

// ─── Input events from the capture side ─────────────────────────────────────

/// A key press from the performer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteOnEvent {
    /// MIDI pitch 0–127
    pub pitch: u8,
    /// MIDI velocity 1–127 (0 is treated as note-off upstream)
    pub velocity: u8,
    /// Seconds since session start
    pub timestamp: f64,
}

/// A key release from the performer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteOffEvent {
    pub pitch: u8,
    pub timestamp: f64,
}

// ─── Buffered input ─────────────────────────────────────────────────────────

/// One performer note as stored in the note buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedNote {
    pub pitch: u8,
    /// Velocity as received (MIDI scale), normalized only on output.
    pub velocity: f64,
    /// Seconds since session start (monotonic)
    pub onset_time: f64,
    /// Onset distance to the previously buffered note, 0 for the first.
    pub gap_from_previous: f64,
}

// ─── Generated output ───────────────────────────────────────────────────────

/// Raw algorithm output. Pitch may be fractional or out of range and the
/// velocity scale is not fixed; only the validator turns it into something
/// playable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratedNote {
    pub pitch: f64,
    pub velocity: f64,
    pub start_time: f64,
    pub end_time: f64,
}

/// Canonical playable note. Every instance satisfies:
/// pitch in 0..=127, velocity in [0, 1], duration in (0, 10].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidatedNote {
    pub pitch: u8,
    pub velocity: f64,
    pub duration: f64,
}

impl From<&ValidatedNote> for GeneratedNote {
    fn from(n: &ValidatedNote) -> Self {
        Self {
            pitch: n.pitch as f64,
            velocity: n.velocity,
            start_time: 0.0,
            end_time: n.duration,
        }
    }
}

/// A validated note placed on the playback timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledNote {
    pub pitch: u8,
    pub velocity: f64,
    pub duration: f64,
    /// Delay from the start of the response, in seconds.
    pub offset_secs: f64,
}

impl fmt::Display for ScheduledNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{:>6.3}s  {:<4} ({:>3})  vel={:.2}  dur={:.3}s",
            self.offset_secs,
            midi_to_name(self.pitch),
            self.pitch,
            self.velocity,
            self.duration,
        )
    }
}

// ─── Generation parameters ──────────────────────────────────────────────────

/// Which algorithm answers the performer.
/// Serializes as "harmony", "continue", "improvise", "groove".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Harmony,
    Continue,
    Improvise,
    Groove,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Harmony, Mode::Continue, Mode::Improvise, Mode::Groove];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Harmony => "harmony",
            Mode::Continue => "continue",
            Mode::Improvise => "improvise",
            Mode::Groove => "groove",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "harmony" => Ok(Mode::Harmony),
            "continue" | "continuation" => Ok(Mode::Continue),
            "improvise" | "improvisation" => Ok(Mode::Improvise),
            "groove" => Ok(Mode::Groove),
            other => Err(format!(
                "unknown mode '{}' (expected harmony, continue, improvise or groove)",
                other
            )),
        }
    }
}

/// Parameters for one generation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParameters {
    pub mode: Mode,
    /// Randomness/complexity knob, >= 0.
    pub temperature: f64,
    /// Output budget in [MIN_OUTPUT_NOTES, MAX_OUTPUT_NOTES], derived from
    /// the input size.
    pub max_output_notes: usize,
}

impl GenerationParameters {
    pub fn for_input(mode: Mode, temperature: f64, input_count: usize) -> Self {
        Self {
            mode,
            temperature,
            max_output_notes: max_output_notes(input_count),
        }
    }
}

/// Output budget: small phrases get a proportionally larger reply.
pub fn max_output_notes(input_count: usize) -> usize {
    let multiplier = if input_count <= 3 {
        3.0
    } else if input_count <= 8 {
        2.0
    } else {
        1.5
    };
    let scaled = (input_count as f64 * multiplier).ceil() as usize;
    scaled.clamp(MIN_OUTPUT_NOTES, MAX_OUTPUT_NOTES)
}

// ─── Responses ──────────────────────────────────────────────────────────────

/// How a response's notes were produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The selected algorithm produced usable notes.
    Generated,
    /// The algorithm failed or produced nothing; the notes are the fallback.
    Fallback(GenerationError),
}

/// One complete machine reply, handed to the playback side.
#[derive(Debug, Clone)]
pub struct Response {
    /// Session time at which the pass was dispatched
    pub dispatched_at: f64,
    pub mode: Mode,
    pub temperature: f64,
    /// How many performer notes the pass consumed
    pub input_count: usize,
    /// Mean positive inter-onset gap of the consumed notes
    pub average_gap: f64,
    pub notes: Vec<ScheduledNote>,
    pub outcome: Outcome,
}

impl Response {
    /// Time the playback side needs before the next cycle may begin.
    pub fn total_duration(&self) -> f64 {
        self.notes.len() as f64 * self.average_gap
    }

    pub fn used_fallback(&self) -> bool {
        matches!(self.outcome, Outcome::Fallback(_))
    }
}

// ─── Inter-thread messages ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum InputEvent {
    NoteOn(NoteOnEvent),
    NoteOff(NoteOffEvent),
    SetMode(Mode),
    SetTemperature(f64),
    /// End the jam: drop buffered input and any pending cycle.
    Reset,
}

// ─── Session clock ──────────────────────────────────────────────────────────

/// Monotonic clock for the jam session.
#[derive(Clone)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Wall-clock instant corresponding to a session time, or `None` when
    /// the time is not representable (NaN, or too far in the future).
    pub fn instant_at(&self, secs: f64) -> Option<Instant> {
        let offset = std::time::Duration::try_from_secs_f64(secs.max(0.0)).ok()?;
        self.start.checked_add(offset)
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// "C4" for 60, "A#3" for 58.
pub fn midi_to_name(pitch: u8) -> String {
    let octave = (pitch as i32 / 12) - 1;
    format!("{}{}", NOTE_NAMES[(pitch % 12) as usize], octave)
}

// ─── Constants ──────────────────────────────────────────────────────────────

pub const DEFAULT_SILENCE_THRESHOLD_SECS: f64 = 0.5;
/// Longest pause the performer can be asked to leave before a reply.
pub const MAX_SILENCE_THRESHOLD_SECS: f64 = 30.0;
pub const DEFAULT_TEMPERATURE: f64 = 1.0;
/// Playback spacing used when the performer gave no usable gaps.
pub const DEFAULT_NOTE_GAP_SECS: f64 = 0.2;

pub const MIN_OUTPUT_NOTES: usize = 4;
pub const MAX_OUTPUT_NOTES: usize = 24;

/// Range the melodic algorithms keep their pitches inside (C2–C6).
pub const GENERATED_PITCH_MIN: f64 = 36.0;
pub const GENERATED_PITCH_MAX: f64 = 84.0;
