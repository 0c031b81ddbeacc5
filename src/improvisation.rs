//! Improvisation mode: a free line built from the performer's pitch
//! material, drifting further from it as the temperature rises.

use crate::error::GenerationError;
use crate::types::{
    GeneratedNote, GenerationParameters, Mode, TimedNote, GENERATED_PITCH_MAX, GENERATED_PITCH_MIN,
};
use rand::Rng;

const LEAP_INTERVALS: [f64; 6] = [3.0, 4.0, 5.0, 7.0, 9.0, 12.0];
const HARMONY_INTERVALS: [f64; 3] = [3.0, 4.0, 7.0];
const SIMPLE_DURATIONS: [f64; 2] = [0.25, 0.5];
const COMPLEX_DURATIONS: [f64; 5] = [0.125, 0.25, 0.375, 0.5, 0.75];

pub fn generate(
    input: &[TimedNote],
    params: &GenerationParameters,
    rng: &mut impl Rng,
) -> Result<Vec<GeneratedNote>, GenerationError> {
    let pitches: Vec<f64> = input.iter().map(|n| n.pitch as f64).collect();
    let (lowest, highest) = match pitch_bounds(&pitches) {
        Some(bounds) => bounds,
        None => return Err(GenerationError::EmptyInput),
    };
    let t = params.temperature;
    let creativity = t.max(0.5);
    let base_count = pitches.len().max(4) as f64;
    let note_count = params
        .max_output_notes
        .min((base_count * (0.5 + t / 2.0)).round() as usize);
    let durations: &[f64] = if t > 1.0 { &COMPLEX_DURATIONS } else { &SIMPLE_DURATIONS };
    let harmony_chance = (creativity * 0.5).min(0.8);
    let expanded_range = (highest - lowest) * creativity;

    let mut notes = Vec::with_capacity(note_count * 2);
    let mut start_time = 0.0;

    for i in 0..note_count {
        if notes.len() >= params.max_output_notes {
            break;
        }

        let mut pitch = if rng.gen::<f64>() > creativity * 0.5 {
            pitches[i % pitches.len()]
        } else {
            let mut synthesized = lowest + (rng.gen::<f64>() * expanded_range).floor();
            if rng.gen::<f64>() < creativity * 0.3 {
                let leap = LEAP_INTERVALS[rng.gen_range(0..LEAP_INTERVALS.len())];
                synthesized += if rng.gen::<f64>() > 0.5 { leap } else { -leap };
            }
            synthesized
        };
        pitch = pitch.clamp(GENERATED_PITCH_MIN, GENERATED_PITCH_MAX);

        let duration = durations[rng.gen_range(0..durations.len())];
        notes.push(GeneratedNote {
            pitch,
            velocity: 0.4 + rng.gen::<f64>() * 0.4 * creativity,
            start_time,
            end_time: start_time + duration,
        });

        if notes.len() < params.max_output_notes && rng.gen::<f64>() < harmony_chance {
            let interval = HARMONY_INTERVALS[rng.gen_range(0..HARMONY_INTERVALS.len())];
            notes.push(GeneratedNote {
                pitch: pitch + interval,
                velocity: 0.3 + rng.gen::<f64>() * 0.3,
                start_time,
                end_time: start_time + duration,
            });
        }

        let jitter = rng.gen::<f64>() * 0.1 * creativity - 0.05 * creativity;
        start_time += duration + jitter;
    }

    if notes.is_empty() {
        return Err(GenerationError::EmptyResult { mode: Mode::Improvise });
    }
    Ok(notes)
}

fn pitch_bounds(pitches: &[f64]) -> Option<(f64, f64)> {
    let first = *pitches.first()?;
    Some(
        pitches
            .iter()
            .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p))),
    )
}
