//! Continuation mode: play the performer's phrase back, repeating and
//! mutating it, starting where the phrase ended.

use crate::error::GenerationError;
use crate::types::{
    GeneratedNote, GenerationParameters, Mode, TimedNote, GENERATED_PITCH_MAX, GENERATED_PITCH_MIN,
};
use rand::Rng;

const STEP_SECS: f64 = 0.25;
const START_VELOCITY: f64 = 0.7;
/// Notes in the input phrase are assumed to ring this long.
const INPUT_NOTE_LENGTH: f64 = 0.5;

pub fn generate(
    input: &[TimedNote],
    params: &GenerationParameters,
    rng: &mut impl Rng,
) -> Result<Vec<GeneratedNote>, GenerationError> {
    let (first, last) = match (input.first(), input.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(GenerationError::EmptyInput),
    };
    let t = params.temperature;
    let variation = (t / 2.0).max(0.1);
    let pattern_length = input.len();
    let max_repeats = params.max_output_notes / pattern_length;
    let temperature_repeats = ((t * 2.0).round() as usize).max(1);
    let repeats = max_repeats.min(temperature_repeats);
    let vary_first_pass = t > 1.0;

    let mut start_time = last.onset_time - first.onset_time + INPUT_NOTE_LENGTH;
    let mut notes = Vec::with_capacity(pattern_length * repeats);

    for i in 0..pattern_length * repeats {
        let mut pitch = input[i % pattern_length].pitch as f64;

        if i >= pattern_length || vary_first_pass {
            let draw = rng.gen::<f64>() * variation;
            let up = rng.gen::<f64>() > 0.5;
            if draw > 0.7 {
                pitch += if up { 4.0 } else { -3.0 };
            } else if draw > 0.4 {
                pitch += if up { 2.0 } else { -2.0 };
            } else if draw > 0.2 {
                pitch += if up { 1.0 } else { -1.0 };
            }
        }
        pitch = pitch.clamp(GENERATED_PITCH_MIN, GENERATED_PITCH_MAX);

        notes.push(GeneratedNote {
            pitch,
            velocity: START_VELOCITY - i as f64 * 0.02 * variation,
            start_time,
            end_time: start_time + 0.2 + rng.gen::<f64>() * 0.1 * variation,
        });

        let jitter = rng.gen::<f64>() * 0.1 * variation - 0.05 * variation;
        start_time += STEP_SECS + jitter;
    }

    if notes.is_empty() {
        return Err(GenerationError::EmptyResult { mode: Mode::Continue });
    }
    Ok(notes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn phrase(pitches: &[u8], gap: f64) -> Vec<TimedNote> {
        pitches
            .iter()
            .enumerate()
            .map(|(i, &pitch)| TimedNote {
                pitch,
                velocity: 90.0,
                onset_time: 10.0 + i as f64 * gap,
                gap_from_previous: if i == 0 { 0.0 } else { gap },
            })
            .collect()
    }

    #[test]
    fn test_first_pass_is_verbatim_when_cool() {
        let input = phrase(&[60, 62, 64], 0.25);
        let params = GenerationParameters::for_input(Mode::Continue, 1.0, 3);
        let mut rng = StdRng::seed_from_u64(5);
        let notes = generate(&input, &params, &mut rng).unwrap();
        // repeats = min(9 / 3, round(2.0)) = 2
        assert_eq!(notes.len(), 6);
        let first_pass: Vec<f64> = notes.iter().take(3).map(|n| n.pitch).collect();
        assert_eq!(first_pass, vec![60.0, 62.0, 64.0]);
        // variation 0.5 keeps every draw below 0.5, so at most a whole step
        for (i, note) in notes.iter().enumerate().skip(3) {
            let original = input[i % 3].pitch as f64;
            assert!((note.pitch - original).abs() <= 2.0, "step {}: {}", i, note.pitch);
        }
    }

    #[test]
    fn test_starts_after_input_phrase() {
        let input = phrase(&[60, 67], 0.4);
        let params = GenerationParameters::for_input(Mode::Continue, 0.5, 2);
        let mut rng = StdRng::seed_from_u64(9);
        let notes = generate(&input, &params, &mut rng).unwrap();
        // span 0.4 + 0.5 ring
        assert!((notes[0].start_time - 0.9).abs() < 1e-9);
        // variation 0.25 → jitter within ±0.0125
        for pair in notes.windows(2) {
            let step = pair[1].start_time - pair[0].start_time;
            assert!(step >= 0.25 - 0.0125 - 1e-9 && step < 0.25 + 0.0125, "step {}", step);
        }
    }

    #[test]
    fn test_velocity_decays_linearly() {
        let input = phrase(&[60, 62], 0.2);
        let params = GenerationParameters::for_input(Mode::Continue, 1.0, 2);
        let mut rng = StdRng::seed_from_u64(2);
        let notes = generate(&input, &params, &mut rng).unwrap();
        for (i, note) in notes.iter().enumerate() {
            let expected = 0.7 - i as f64 * 0.02 * 0.5;
            assert!((note.velocity - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_hot_pitches_stay_in_range() {
        let input = phrase(&[36, 84, 37, 83], 0.1);
        let params = GenerationParameters::for_input(Mode::Continue, 3.0, 4);
        for seed in 0..30 {
            let mut rng = StdRng::seed_from_u64(seed);
            let notes = generate(&input, &params, &mut rng).unwrap();
            assert!(notes.len() <= params.max_output_notes);
            for note in &notes {
                assert!((36.0..=84.0).contains(&note.pitch));
            }
        }
    }

    #[test]
    fn test_first_pass_varies_only_when_hot() {
        let pitches = [60u8, 62, 64, 65, 67];
        let input = phrase(&pitches, 0.2);
        let literal: Vec<f64> = pitches.iter().map(|&p| p as f64).collect();

        let params = GenerationParameters::for_input(Mode::Continue, 1.0, input.len());
        let mut rng = StdRng::seed_from_u64(11);
        let notes = generate(&input, &params, &mut rng).unwrap();
        let first_pass: Vec<f64> = notes.iter().take(pitches.len()).map(|n| n.pitch).collect();
        assert_eq!(first_pass, literal);

        let params = GenerationParameters::for_input(Mode::Continue, 3.0, input.len());
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let notes = generate(&input, &params, &mut rng).unwrap();
            let first_pass: Vec<f64> = notes.iter().take(pitches.len()).map(|n| n.pitch).collect();
            assert_eq!(first_pass.len(), pitches.len());
            assert_ne!(first_pass, literal, "seed {}: first pass not varied", seed);
        }
    }

    #[test]
    fn test_phrase_longer_than_budget_yields_nothing() {
        let pitches: Vec<u8> = (50..80).collect();
        let input = phrase(&pitches, 0.1);
        let params = GenerationParameters::for_input(Mode::Continue, 1.0, input.len());
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            generate(&input, &params, &mut rng),
            Err(GenerationError::EmptyResult { mode: Mode::Continue })
        );
    }
}
