//! Validation and normalization between the generation algorithms and playback.
//!
//! Everything here is total: malformed or out-of-range values are defaulted
//! or clamped and logged, never returned as errors. `fallback` is the
//! degraded reply used when an algorithm yields nothing.

use crate::types::{GeneratedNote, TimedNote, ValidatedNote};
use log::{debug, warn};
use serde_json::Value;

pub const DEFAULT_PITCH: u8 = 60;
pub const DEFAULT_VELOCITY: f64 = 0.7;
pub const DEFAULT_DURATION: f64 = 0.5;
/// Longest note the playback side accepts, in seconds.
pub const MAX_DURATION: f64 = 10.0;

/// Fallback transposition: a major third up.
const FALLBACK_INTERVAL: f64 = 4.0;
const FALLBACK_VELOCITY_SCALE: f64 = 0.8;

/// NaN → middle C, otherwise rounded into 0..=127.
pub fn validate_pitch(pitch: f64) -> u8 {
    if pitch.is_nan() {
        warn!("Invalid pitch value {}, using default {}", pitch, DEFAULT_PITCH);
        return DEFAULT_PITCH;
    }
    pitch.clamp(0.0, 127.0).round() as u8
}

/// Normalize to [0, 1]. Values above 1 and up to 127 are read as MIDI
/// velocities.
pub fn validate_velocity(velocity: f64) -> f64 {
    if velocity.is_nan() {
        warn!("Invalid velocity value {}, using default {}", velocity, DEFAULT_VELOCITY);
        return DEFAULT_VELOCITY;
    }
    if (0.0..=1.0).contains(&velocity) {
        velocity
    } else if velocity > 1.0 && velocity <= 127.0 {
        velocity / 127.0
    } else {
        velocity.clamp(0.0, 1.0)
    }
}

/// `end - start`, or the default when either bound is NaN or the span is
/// not in (0, MAX_DURATION].
pub fn validate_duration(end_time: f64, start_time: f64) -> f64 {
    if end_time.is_nan() || start_time.is_nan() {
        warn!(
            "Invalid duration bounds {} to {}, using default {}",
            start_time, end_time, DEFAULT_DURATION
        );
        return DEFAULT_DURATION;
    }
    let duration = end_time - start_time;
    if duration.is_nan() || duration <= 0.0 || duration > MAX_DURATION {
        debug!("Unusual duration {}, using default {}", duration, DEFAULT_DURATION);
        return DEFAULT_DURATION;
    }
    duration
}

pub fn validate(note: &GeneratedNote) -> ValidatedNote {
    ValidatedNote {
        pitch: validate_pitch(note.pitch),
        velocity: validate_velocity(note.velocity),
        duration: validate_duration(note.end_time, note.start_time),
    }
}

/// Map raw algorithm output onto canonical notes, preserving order.
pub fn convert(raw: &[GeneratedNote]) -> Vec<ValidatedNote> {
    raw.iter().map(validate).collect()
}

/// Tolerant entry point for loosely shaped note data (JSON from an external
/// generator, a hand-written file, ...).
///
/// Accepts an array of note objects or a single object. Each object may
/// name its pitch `pitch` or `note`, and give either `duration` or an
/// `endTime`/`startTime` pair. Missing fields take the defaults; entries
/// that are not objects are dropped.
pub fn prepare(value: &Value) -> Vec<ValidatedNote> {
    let entries: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![value],
        other => {
            warn!("Notes payload is neither an array nor an object: {}", other);
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|entry| {
            let obj = match entry.as_object() {
                Some(obj) => obj,
                None => {
                    warn!("Dropping malformed note entry: {}", entry);
                    return None;
                }
            };

            let pitch = match obj.get("note").or_else(|| obj.get("pitch")) {
                Some(v) => number_or_nan(v),
                None => DEFAULT_PITCH as f64,
            };
            let velocity = obj.get("velocity").map(number_or_nan).unwrap_or(DEFAULT_VELOCITY);
            let duration = match (obj.get("duration"), obj.get("endTime"), obj.get("startTime")) {
                (Some(d), _, _) => number_or_nan(d),
                (None, Some(end), Some(start)) => number_or_nan(end) - number_or_nan(start),
                _ => DEFAULT_DURATION,
            };

            Some(ValidatedNote {
                pitch: validate_pitch(pitch),
                velocity: validate_velocity(velocity),
                duration: validate_duration(duration, 0.0),
            })
        })
        .collect()
}

/// Non-numbers (strings, null, nested values) become NaN so the validators
/// substitute their defaults.
fn number_or_nan(value: &Value) -> f64 {
    value.as_f64().unwrap_or(f64::NAN)
}

/// Deterministic degraded reply: every input note a major third up, a bit
/// softer, at the default length. Non-empty whenever the input is.
pub fn fallback(original: &[TimedNote]) -> Vec<ValidatedNote> {
    debug!("Using fallback response for {} notes", original.len());
    original
        .iter()
        .map(|note| ValidatedNote {
            pitch: validate_pitch(note.pitch as f64 + FALLBACK_INTERVAL),
            velocity: validate_velocity(note.velocity * FALLBACK_VELOCITY_SCALE),
            duration: DEFAULT_DURATION,
        })
        .collect()
}
