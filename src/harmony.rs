//! Harmony mode: voice a chord under every note the performer played.

use crate::error::GenerationError;
use crate::types::{GeneratedNote, GenerationParameters, Mode, TimedNote};
use rand::Rng;

/// Pitch classes of the C major scale; roots on these get a major third.
const MAJOR_PITCH_CLASSES: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Root, third, fifth, extension.
const VOICE_VELOCITIES: [f64; 4] = [0.8, 0.6, 0.5, 0.4];
const FIFTH: f64 = 7.0;
const MINOR_SEVENTH: f64 = 10.0;
const NINTH: f64 = 14.0;

/// Chords are laid out one per slot, each sounding for CHORD_LENGTH.
const SLOT_SECS: f64 = 0.25;
const CHORD_LENGTH: f64 = 0.2;

pub fn generate(
    input: &[TimedNote],
    params: &GenerationParameters,
    rng: &mut impl Rng,
) -> Result<Vec<GeneratedNote>, GenerationError> {
    if input.is_empty() {
        return Err(GenerationError::EmptyInput);
    }
    let t = params.temperature;
    let randomization = ((t - 0.5) / 1.5).max(0.0);
    let alternate_voicings = t > 0.8;
    let extended_harmonies = t > 1.2;
    let voices_per_input = (params.max_output_notes / input.len()).clamp(1, 4);

    let mut notes = Vec::with_capacity(input.len() * voices_per_input);

    for (index, note) in input.iter().enumerate() {
        let root = note.pitch as f64;
        let start_time = index as f64 * SLOT_SECS;
        let end_time = start_time + CHORD_LENGTH;

        let mut third = if MAJOR_PITCH_CLASSES.contains(&(note.pitch % 12)) { 4.0 } else { 3.0 };
        if alternate_voicings && rng.gen::<f64>() < randomization * 0.5 {
            third = if third == 4.0 { 3.0 } else { 4.0 };
        }

        let mut voices = vec![root, root + third, root + FIFTH];
        if extended_harmonies && rng.gen::<f64>() < randomization {
            let extension = if rng.gen::<f64>() < 0.6 { MINOR_SEVENTH } else { NINTH };
            voices.push(root + extension);
        }

        for (voice, &pitch) in voices.iter().take(voices_per_input).enumerate() {
            if notes.len() >= params.max_output_notes {
                return Ok(notes);
            }
            notes.push(GeneratedNote {
                pitch,
                velocity: VOICE_VELOCITIES[voice],
                start_time,
                end_time,
            });
        }
    }

    if notes.is_empty() {
        return Err(GenerationError::EmptyResult { mode: Mode::Harmony });
    }
    Ok(notes)
}
