use crate::types::*;
use crossbeam_channel::Receiver;
use std::io::{self, Write};

/// Prints every machine reply as a small score: one line per note with its
/// offset, name, velocity bar and length.
pub struct ConsoleDisplay {
    rx: Receiver<Response>,
}

impl ConsoleDisplay {
    pub fn new(rx: Receiver<Response>) -> Self {
        Self { rx }
    }

    pub fn run(&self) {
        let mut stdout = io::stdout();
        let mut count: u64 = 0;

        for response in self.rx.iter() {
            count += 1;
            let _ = stdout.write_all(render(count, &response).as_bytes());
            let _ = stdout.flush();
        }
    }
}

pub fn render(index: u64, response: &Response) -> String {
    let mut out = String::new();
    let source = match &response.outcome {
        Outcome::Generated => response.mode.to_string(),
        Outcome::Fallback(reason) => format!("{} → fallback ({})", response.mode, reason),
    };
    out.push_str("╔══════════════════════════════════════════════════════════╗\n");
    out.push_str(&format!(
        "║  RESPONSE #{:<4} {:<41}║\n",
        index,
        truncate(&source, 41)
    ));
    out.push_str(&format!(
        "║  in: {:>2} notes   out: {:>2} notes   t={:.2}   gap={:.3}s    ║\n",
        response.input_count,
        response.notes.len(),
        response.temperature,
        response.average_gap,
    ));
    out.push_str("╠══════════════════════════════════════════════════════════╣\n");
    for note in &response.notes {
        out.push_str(&format!(
            "║  +{:>6.3}s  {:<4} {} {:.3}s{}║\n",
            note.offset_secs,
            midi_to_name(note.pitch),
            make_bar(note.velocity, 20),
            note.duration,
            " ".repeat(11),
        ));
    }
    out.push_str("╚══════════════════════════════════════════════════════════╝\n");
    out
}

fn make_bar(val: f64, width: usize) -> String {
    let filled = (val.clamp(0.0, 1.0) * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
