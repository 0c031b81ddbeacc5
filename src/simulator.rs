use crate::types::*;
use crossbeam_channel::Sender;
use log::info;
use std::thread;
use std::time::Duration;

/// Plays scripted phrases into the session as if a performer were at the
/// keyboard, with real-time pauses so the silence trigger fires between
/// calls. Exercises the full pipeline without any MIDI hardware.
pub struct Simulator {
    clock: SessionClock,
    tx: Sender<InputEvent>,
}

impl Simulator {
    pub fn new(clock: SessionClock, tx: Sender<InputEvent>) -> Self {
        Self { clock, tx }
    }

    /// Run the named demo sequence once. Blocks the calling thread.
    pub fn run(&self, demo: &str) {
        let steps = match demo {
            "tour" => tour_sequence(),
            "chords" => chord_sequence(),
            "basic" => basic_sequence(),
            other => {
                info!("Unknown demo '{}', playing 'basic'", other);
                basic_sequence()
            }
        };
        info!("Simulator starting '{}' demo ({} steps)...", demo, steps.len());

        for step in &steps {
            self.execute(step);
        }

        info!("Demo sequence complete.");
    }

    fn execute(&self, step: &Step) {
        match step {
            Step::Note { pitch, velocity, ms } => {
                self.press(&[*pitch], *velocity);
                thread::sleep(Duration::from_millis(*ms as u64));
                self.release(&[*pitch]);
            }

            Step::Chord { pitches, velocity, ms } => {
                let names: Vec<String> = pitches.iter().map(|&p| midi_to_name(p)).collect();
                info!("  chord [{}]", names.join(" "));
                self.press(pitches, *velocity);
                thread::sleep(Duration::from_millis(*ms as u64));
                self.release(pitches);
            }

            Step::Rest { ms } => {
                thread::sleep(Duration::from_millis(*ms as u64));
            }

            Step::Mode(mode) => {
                info!("  mode → {}", mode);
                let _ = self.tx.send(InputEvent::SetMode(*mode));
            }

            Step::Temperature(t) => {
                info!("  temperature → {:.2}", t);
                let _ = self.tx.send(InputEvent::SetTemperature(*t));
            }
        }
    }

    fn press(&self, pitches: &[u8], velocity: u8) {
        for &pitch in pitches {
            let _ = self.tx.send(InputEvent::NoteOn(NoteOnEvent {
                pitch,
                velocity,
                timestamp: self.clock.now_secs(),
            }));
        }
    }

    fn release(&self, pitches: &[u8]) {
        for &pitch in pitches {
            let _ = self.tx.send(InputEvent::NoteOff(NoteOffEvent {
                pitch,
                timestamp: self.clock.now_secs(),
            }));
        }
    }
}

// ─── Script steps ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    /// Press, hold for `ms`, release.
    Note { pitch: u8, velocity: u8, ms: u32 },
    /// Press all pitches together, hold, release.
    Chord { pitches: Vec<u8>, velocity: u8, ms: u32 },
    /// Hands off the keys.
    Rest { ms: u32 },
    Mode(Mode),
    Temperature(f64),
}

/// Long enough past the default silence threshold for the reply to play
/// out before the next call.
const ANSWER_REST_MS: u32 = 3000;

fn phrase(pitches: &[u8], velocity: u8, ms: u32) -> Vec<Step> {
    pitches
        .iter()
        .map(|&pitch| Step::Note { pitch, velocity, ms })
        .collect()
}

/// Three short calls in harmony mode.
pub(crate) fn basic_sequence() -> Vec<Step> {
    let mut steps = vec![Step::Rest { ms: 300 }];

    // C major arpeggio
    steps.extend(phrase(&[60, 64, 67, 72], 96, 180));
    steps.push(Step::Rest { ms: ANSWER_REST_MS });

    // A single held note is a valid call
    steps.push(Step::Note { pitch: 62, velocity: 110, ms: 400 });
    steps.push(Step::Rest { ms: ANSWER_REST_MS });

    // Descending minor line
    steps.extend(phrase(&[69, 67, 65, 64, 62, 60], 80, 140));
    steps.push(Step::Rest { ms: ANSWER_REST_MS });

    steps
}

/// One call per mode, warming up the temperature as it goes.
pub(crate) fn tour_sequence() -> Vec<Step> {
    let mut steps = vec![Step::Rest { ms: 300 }];
    let calls: [(Mode, f64, &[u8]); 4] = [
        (Mode::Harmony, 0.7, &[60, 62, 64, 65, 67]),
        (Mode::Continue, 1.0, &[57, 60, 64, 62]),
        (Mode::Improvise, 1.4, &[50, 53, 57, 60, 62]),
        (Mode::Groove, 0.9, &[43, 48, 50]),
    ];
    for (mode, temperature, pitches) in calls {
        steps.push(Step::Mode(mode));
        steps.push(Step::Temperature(temperature));
        steps.extend(phrase(pitches, 100, 160));
        steps.push(Step::Rest { ms: ANSWER_REST_MS + 2000 });
    }
    steps
}

/// Block chords: zero-gap onsets exercise the default playback spacing.
pub(crate) fn chord_sequence() -> Vec<Step> {
    vec![
        Step::Rest { ms: 300 },
        Step::Chord { pitches: vec![60, 64, 67], velocity: 90, ms: 600 },
        Step::Rest { ms: ANSWER_REST_MS },
        Step::Chord { pitches: vec![57, 60, 64], velocity: 90, ms: 300 },
        Step::Chord { pitches: vec![53, 57, 60], velocity: 90, ms: 300 },
        Step::Chord { pitches: vec![55, 59, 62], velocity: 100, ms: 500 },
        Step::Rest { ms: ANSWER_REST_MS },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Each call must end with a rest long enough for the silence trigger.
    fn assert_calls_are_answered(steps: &[Step]) {
        let threshold_ms = (DEFAULT_SILENCE_THRESHOLD_SECS * 1000.0) as u32;
        let mut pending_notes = false;
        for step in steps {
            match step {
                Step::Note { .. } | Step::Chord { .. } => pending_notes = true,
                Step::Rest { ms } if pending_notes => {
                    assert!(*ms > threshold_ms, "rest of {}ms after a call is too short", ms);
                    pending_notes = false;
                }
                _ => {}
            }
        }
        assert!(!pending_notes, "sequence ends mid-call");
    }

    #[test]
    fn test_demo_sequences_leave_room_to_answer() {
        assert_calls_are_answered(&basic_sequence());
        assert_calls_are_answered(&tour_sequence());
        assert_calls_are_answered(&chord_sequence());
    }

    #[test]
    fn test_tour_visits_every_mode() {
        let modes: Vec<Mode> = tour_sequence()
            .into_iter()
            .filter_map(|s| match s {
                Step::Mode(m) => Some(m),
                _ => None,
            })
            .collect();
        assert_eq!(modes, Mode::ALL.to_vec());
    }

    #[test]
    fn test_events_reach_the_channel() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let sim = Simulator::new(SessionClock::new(), tx);
        sim.execute(&Step::Chord { pitches: vec![60, 64], velocity: 80, ms: 1 });
        let events: Vec<InputEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], InputEvent::NoteOn(NoteOnEvent { pitch: 60, velocity: 80, .. })));
        assert!(matches!(events[3], InputEvent::NoteOff(NoteOffEvent { pitch: 64, .. })));
    }
}
