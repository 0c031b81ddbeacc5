//! Groove mode: lay the performer's pitches onto a fixed 16-step rhythm.

use crate::error::GenerationError;
use crate::types::{
    GeneratedNote, GenerationParameters, Mode, TimedNote, GENERATED_PITCH_MAX, GENERATED_PITCH_MIN,
};
use rand::Rng;

pub const STEPS_PER_BAR: usize = 16;

/// One bar of sixteenth-note steps, `1` = hit, `0` = rest.
/// Ordered from plainest to busiest; the temperature picks the index.
pub const RHYTHM_TEMPLATES: [[u8; STEPS_PER_BAR]; 5] = [
    [1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0], // four on the floor
    [1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0], // straight eighths
    [1, 0, 0, 1, 0, 1, 0, 0, 1, 0, 0, 1, 0, 1, 0, 0], // syncopated
    [1, 1, 0, 0, 1, 0, 1, 1, 0, 1, 0, 0, 1, 0, 1, 0], // complex
    [1, 0, 1, 0, 0, 0, 1, 0, 1, 0, 0, 1, 0, 0, 1, 0], // sparse
];

const STEP_SECS: f64 = 0.25;
const BAR_SECS: f64 = STEP_SECS * STEPS_PER_BAR as f64;
/// Rough hits per bar, used to size the bar count against the budget.
const AVERAGE_NOTES_PER_BAR: usize = 8;

const PITCH_VARIATIONS: [f64; 7] = [-12.0, -7.0, -5.0, 0.0, 5.0, 7.0, 12.0];
const HARMONY_INTERVALS: [f64; 5] = [3.0, 4.0, 7.0, 10.0, 12.0];

pub fn template_index(temperature: f64) -> usize {
    let groove = temperature.max(0.5);
    ((groove * RHYTHM_TEMPLATES.len() as f64).floor() as usize).min(RHYTHM_TEMPLATES.len() - 1)
}

pub fn generate(
    input: &[TimedNote],
    params: &GenerationParameters,
    rng: &mut impl Rng,
) -> Result<Vec<GeneratedNote>, GenerationError> {
    if input.is_empty() {
        return Err(GenerationError::EmptyInput);
    }
    let t = params.temperature;
    let groove = t.max(0.5);
    let max_bars = (params.max_output_notes / AVERAGE_NOTES_PER_BAR).max(1);
    let bar_count = max_bars.min((t.round() as usize).max(1));
    let pattern = &RHYTHM_TEMPLATES[template_index(t)];
    let harmony_chance = (groove * 0.5).min(0.7);

    let mut notes = Vec::new();

    'bars: for bar in 0..bar_count {
        let bar_start = bar as f64 * BAR_SECS;

        for (step, &hit) in pattern.iter().enumerate() {
            if hit == 0 {
                continue;
            }
            if notes.len() >= params.max_output_notes {
                break 'bars;
            }

            let mut pitch = input[rng.gen_range(0..input.len())].pitch as f64;
            if rng.gen::<f64>() < groove * 0.3 {
                pitch += PITCH_VARIATIONS[rng.gen_range(0..PITCH_VARIATIONS.len())];
                pitch = pitch.clamp(GENERATED_PITCH_MIN, GENERATED_PITCH_MAX);
            }

            let velocity = accent(step) + rng.gen::<f64>() * 0.2;
            let start_time = bar_start + step as f64 * STEP_SECS;
            notes.push(GeneratedNote {
                pitch,
                velocity,
                start_time,
                end_time: start_time + step_length(groove, rng),
            });

            if notes.len() < params.max_output_notes && rng.gen::<f64>() < harmony_chance {
                let interval = HARMONY_INTERVALS[rng.gen_range(0..HARMONY_INTERVALS.len())];
                notes.push(GeneratedNote {
                    pitch: pitch + interval,
                    velocity: velocity * 0.7,
                    start_time,
                    end_time: start_time + step_length(groove, rng),
                });
            }
        }
    }

    if notes.is_empty() {
        return Err(GenerationError::EmptyResult { mode: Mode::Groove });
    }
    Ok(notes)
}

/// Velocity floor by beat position: downbeats, then eighths, then the rest.
fn accent(step: usize) -> f64 {
    if step % 4 == 0 {
        0.7
    } else if step % 2 == 0 {
        0.6
    } else {
        0.4
    }
}

fn step_length(groove: f64, rng: &mut impl Rng) -> f64 {
    0.05 + rng.gen::<f64>() * 0.1 * groove
}
