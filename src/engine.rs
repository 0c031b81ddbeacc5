use crate::error::GenerationError;
use crate::types::*;
use crate::{continuation, groove, harmony, improvisation, validator};
use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Result of one generation pass, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub notes: Vec<ValidatedNote>,
    pub outcome: Outcome,
}

/// Turns the performer's phrase into a reply using one of four algorithms.
///
/// The engine owns its randomness source: a seeded engine replays the same
/// replies for the same input.
///
/// `generate` exposes an algorithm's raw result including its failure;
/// `respond` is the entry point used by the trigger side and never fails:
/// raw output goes through the validator, and a failed or empty pass is
/// replaced by the validator's fallback.
pub struct GenerationEngine<R: Rng = StdRng> {
    rng: R,
}

impl GenerationEngine<StdRng> {
    /// Seeded engine, or entropy-seeded when `seed` is `None`.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

impl<R: Rng> GenerationEngine<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Run the algorithm selected by `params.mode` on the raw input.
    pub fn generate(
        &mut self,
        buffer: &[TimedNote],
        params: &GenerationParameters,
    ) -> Result<Vec<GeneratedNote>, GenerationError> {
        if buffer.is_empty() {
            return Err(GenerationError::EmptyInput);
        }
        if !params.temperature.is_finite() || params.temperature < 0.0 {
            return Err(GenerationError::internal(
                params.mode,
                format!("temperature {} is not a finite value >= 0", params.temperature),
            ));
        }
        let rng = &mut self.rng;
        match params.mode {
            Mode::Harmony => harmony::generate(buffer, params, rng),
            Mode::Continue => continuation::generate(buffer, params, rng),
            Mode::Improvise => improvisation::generate(buffer, params, rng),
            Mode::Groove => groove::generate(buffer, params, rng),
        }
    }

    /// Produce a playable reply, falling back when the algorithm fails.
    /// The result never holds more than `params.max_output_notes` notes.
    pub fn respond(&mut self, buffer: &[TimedNote], params: &GenerationParameters) -> Generation {
        let failure = match self.generate(buffer, params) {
            Ok(raw) => {
                trace!("{} raw output: {:?}", params.mode, raw);
                let notes = validator::convert(&raw);
                if !notes.is_empty() {
                    debug!(
                        "{} (t={:.2}) generated {} notes from {} input notes",
                        params.mode,
                        params.temperature,
                        notes.len(),
                        buffer.len()
                    );
                    return Generation {
                        notes,
                        outcome: Outcome::Generated,
                    };
                }
                GenerationError::EmptyResult { mode: params.mode }
            }
            Err(e) => e,
        };

        warn!("{}; using fallback response", failure);
        let mut notes = validator::fallback(buffer);
        notes.truncate(params.max_output_notes);
        Generation {
            notes,
            outcome: Outcome::Fallback(failure),
        }
    }
}
