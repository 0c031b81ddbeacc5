//! JSONL performance reader: parses recorded note events for replay.
//!
//! Reads the header line (format, optional description) then yields events
//! one at a time. Works with any `BufRead`: files, in-memory buffers, stdin.
//!
//! ```text
//! {"format":"jam-performance","description":"two-note call"}
//! {"e":"on","p":60,"v":100,"t":0.0}
//! {"e":"off","p":60,"t":0.2}
//! ```

use crate::types::{InputEvent, NoteOffEvent, NoteOnEvent, SessionClock};
use crossbeam_channel::Sender;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::thread;
use std::time::Duration;

pub const FORMAT: &str = "jam-performance";

/// Longest pause replayed between two recorded events.
pub const MAX_REPLAY_GAP_SECS: f64 = 30.0;

/// Short-key event line. `t` is seconds from the start of the recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "e", rename_all = "lowercase")]
pub enum CompactEvent {
    On { p: u8, v: u8, t: f64 },
    Off { p: u8, t: f64 },
}

impl CompactEvent {
    pub fn time(&self) -> f64 {
        match self {
            CompactEvent::On { t, .. } | CompactEvent::Off { t, .. } => *t,
        }
    }

    /// Convert to a session event stamped at `timestamp`.
    pub fn at(&self, timestamp: f64) -> InputEvent {
        match *self {
            // velocity 0 is a release, as on the wire
            CompactEvent::On { p, v: 0, .. } | CompactEvent::Off { p, .. } => {
                InputEvent::NoteOff(NoteOffEvent { pitch: p, timestamp })
            }
            CompactEvent::On { p, v, .. } => InputEvent::NoteOn(NoteOnEvent {
                pitch: p,
                velocity: v,
                timestamp,
            }),
        }
    }
}

/// Parsed JSONL header (first line of a performance file).
#[derive(Debug)]
pub struct PerformanceHeader {
    pub format: String,
    pub description: String,
    pub raw: serde_json::Value,
}

/// Line-by-line JSONL performance reader.
pub struct PerformanceReader<R: BufRead> {
    reader: R,
    pub header: PerformanceHeader,
    line_buf: String,
}

impl<R: BufRead> PerformanceReader<R> {
    /// Read and validate the header line. Returns an error if the header
    /// is missing, unparseable, or lacks a `"format": "jam-performance"` field.
    pub fn open(mut reader: R) -> Result<Self, String> {
        let mut first_line = String::new();
        reader
            .read_line(&mut first_line)
            .map_err(|e| format!("read header: {}", e))?;

        let first_line = first_line.trim();
        if first_line.is_empty() {
            return Err("empty file".into());
        }

        let raw: serde_json::Value =
            serde_json::from_str(first_line).map_err(|e| format!("parse header: {}", e))?;

        let format = raw["format"]
            .as_str()
            .ok_or("missing \"format\" field")?
            .to_string();
        if format != FORMAT {
            return Err(format!("unknown format: {}", format));
        }
        let description = raw["description"].as_str().unwrap_or("").to_string();

        Ok(Self {
            reader,
            header: PerformanceHeader {
                format,
                description,
                raw,
            },
            line_buf: String::new(),
        })
    }

    /// Read the next event. Returns `None` at EOF, `Err` for unparseable lines.
    pub fn next_event(&mut self) -> Option<Result<CompactEvent, String>> {
        loop {
            self.line_buf.clear();
            match self.reader.read_line(&mut self.line_buf) {
                Ok(0) => return None,
                Ok(_) => {
                    let trimmed = self.line_buf.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some(
                        serde_json::from_str::<CompactEvent>(trimmed)
                            .map_err(|e| format!("parse event: {}", e)),
                    );
                }
                Err(e) => return Some(Err(format!("read line: {}", e))),
            }
        }
    }

    /// Read all remaining events, skipping malformed lines, ordered by time.
    pub fn read_all(mut self) -> Vec<CompactEvent> {
        let mut events = Vec::new();
        let mut line = 1;
        while let Some(result) = self.next_event() {
            line += 1;
            match result {
                Ok(event) => events.push(event),
                Err(e) => warn!("Skipping performance line {}: {}", line, e),
            }
        }
        events.sort_by(|a, b| a.time().total_cmp(&b.time()));
        events
    }
}

/// Send recorded events into a session in real time, preserving the
/// recorded gaps and restamping each event with the session clock.
/// Blocks the calling thread.
pub fn replay(events: &[CompactEvent], clock: &SessionClock, tx: &Sender<InputEvent>) {
    info!("Replaying {} recorded events", events.len());
    let mut previous = events.first().map(|e| e.time()).unwrap_or(0.0);
    for event in events {
        let wait = replay_gap(previous, event.time());
        if !wait.is_zero() {
            thread::sleep(wait);
        }
        previous = event.time();
        if tx.send(event.at(clock.now_secs())).is_err() {
            break;
        }
    }
    info!("Replay complete");
}

/// Pause before an event recorded at `next`, following one at `previous`.
/// Backwards or unrepresentable gaps are zero; long ones are capped.
pub fn replay_gap(previous: f64, next: f64) -> Duration {
    let gap = next - previous;
    if gap.is_nan() || gap <= 0.0 {
        return Duration::ZERO;
    }
    if gap > MAX_REPLAY_GAP_SECS {
        warn!("Recorded pause of {}s capped at {}s", gap, MAX_REPLAY_GAP_SECS);
    }
    Duration::from_secs_f64(gap.min(MAX_REPLAY_GAP_SECS))
}
