//! Session settings: generation mode, temperature, silence threshold and
//! RNG seed. Stored as JSON; every field is optional on disk.

use crate::types::{
    Mode, DEFAULT_SILENCE_THRESHOLD_SECS, DEFAULT_TEMPERATURE, MAX_SILENCE_THRESHOLD_SECS,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JamConfig {
    pub mode: Mode,
    pub temperature: f64,
    pub silence_threshold_secs: f64,
    /// Fixed seed for reproducible sessions; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for JamConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            temperature: DEFAULT_TEMPERATURE,
            silence_threshold_secs: DEFAULT_SILENCE_THRESHOLD_SECS,
            seed: None,
        }
    }
}

impl JamConfig {
    /// Load from a JSON file. Returns None if file is absent or malformed.
    pub fn load(path: &Path) -> Option<Self> {
        let data = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str::<JamConfig>(&data) {
            Ok(c) => {
                info!("Loaded config from {:?}", path);
                Some(c.sanitized())
            }
            Err(e) => {
                warn!("Failed to parse config file {:?}: {}", path, e);
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        std::fs::write(path, json)?;
        info!("Config saved to {:?}", path);
        Ok(())
    }

    /// Replace values the session cannot run with by their defaults.
    pub fn sanitized(mut self) -> Self {
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            warn!("Invalid temperature {}, using {}", self.temperature, DEFAULT_TEMPERATURE);
            self.temperature = DEFAULT_TEMPERATURE;
        }
        if !self.silence_threshold_secs.is_finite() || self.silence_threshold_secs <= 0.0 {
            warn!(
                "Invalid silence threshold {}, using {}",
                self.silence_threshold_secs, DEFAULT_SILENCE_THRESHOLD_SECS
            );
            self.silence_threshold_secs = DEFAULT_SILENCE_THRESHOLD_SECS;
        } else if self.silence_threshold_secs > MAX_SILENCE_THRESHOLD_SECS {
            warn!(
                "Silence threshold {} too long, capping at {}",
                self.silence_threshold_secs, MAX_SILENCE_THRESHOLD_SECS
            );
            self.silence_threshold_secs = MAX_SILENCE_THRESHOLD_SECS;
        }
        self
    }
}
