//! Ordered store of the performer's notes for the current call.

use crate::types::{TimedNote, DEFAULT_NOTE_GAP_SECS};

#[derive(Debug, Default)]
pub struct NoteBuffer {
    notes: Vec<TimedNote>,
}

impl NoteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a note, computing its gap from the previous onset.
    pub fn append(&mut self, pitch: u8, velocity: f64, onset_time: f64) -> &TimedNote {
        let gap_from_previous = match self.notes.last() {
            Some(prev) => (onset_time - prev.onset_time).max(0.0),
            None => 0.0,
        };
        self.notes.push(TimedNote {
            pitch,
            velocity,
            onset_time,
            gap_from_previous,
        });
        &self.notes[self.notes.len() - 1]
    }

    pub fn notes(&self) -> &[TimedNote] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn last_onset(&self) -> Option<f64> {
        self.notes.last().map(|n| n.onset_time)
    }

    /// Hand over every buffered note and leave the buffer empty.
    pub fn take(&mut self) -> Vec<TimedNote> {
        std::mem::take(&mut self.notes)
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    pub fn average_gap(&self) -> f64 {
        average_gap(&self.notes)
    }
}

/// Mean of the positive inter-onset gaps, or `DEFAULT_NOTE_GAP_SECS` when
/// there are none (single note, or a chord struck at one instant).
pub fn average_gap(notes: &[TimedNote]) -> f64 {
    let (total, count) = notes
        .iter()
        .filter(|n| n.gap_from_previous > 0.0)
        .fold((0.0, 0usize), |(sum, n), note| (sum + note.gap_from_previous, n + 1));
    if count > 0 {
        total / count as f64
    } else {
        DEFAULT_NOTE_GAP_SECS
    }
}
