use crate::types::Mode;
use thiserror::Error;

/// Why a generation pass did not produce usable notes. The engine never
/// surfaces these to the trigger side; they select the fallback path and
/// are kept on the response for diagnostics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("no input notes to respond to")]
    EmptyInput,

    #[error("{mode} produced no usable notes")]
    EmptyResult { mode: Mode },

    #[error("{mode} generation failed: {reason}")]
    Internal { mode: Mode, reason: String },
}

impl GenerationError {
    pub fn internal(mode: Mode, reason: impl Into<String>) -> Self {
        Self::Internal {
            mode,
            reason: reason.into(),
        }
    }
}
