use std::time::Duration;

/// Running statistics for a jam session, updated once per response cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionMetrics {
    pub cycles: u64,
    pub notes_processed: u64,
    pub notes_generated: u64,
    pub fallbacks: u64,
    /// Wall time spent generating the last response.
    pub last_response_ms: f64,
    /// 0–100, see [`confidence`].
    pub last_confidence: u32,
}

impl SessionMetrics {
    pub fn record(&mut self, input_count: usize, output_count: usize, elapsed: Duration, fallback: bool) {
        let ms = elapsed.as_secs_f64() * 1000.0;
        self.cycles += 1;
        self.notes_processed += input_count as u64;
        self.notes_generated += output_count as u64;
        if fallback {
            self.fallbacks += 1;
        }
        self.last_response_ms = ms;
        self.last_confidence = confidence(output_count, ms);
    }
}

/// Heuristic quality score: longer replies (saturating at 5 notes) and
/// faster generation (saturating at 1 s) score higher, weighted 70/30.
pub fn confidence(output_count: usize, response_ms: f64) -> u32 {
    let response_quality = (output_count as f64 / 5.0).min(1.0);
    let time_quality = if response_ms > 0.0 {
        (1000.0 / response_ms).min(1.0)
    } else {
        1.0
    };
    ((response_quality * 0.7 + time_quality * 0.3) * 100.0).round() as u32
}
