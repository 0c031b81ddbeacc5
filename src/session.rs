use crate::trigger::TriggerController;
use crate::types::*;
use crossbeam_channel::{at, never, select, Receiver, Sender};
use log::{debug, info};

/// The session receives InputEvents (note on/off and control changes),
/// drives the trigger controller, and fans finished Responses out to the
/// playback-side consumers (console, OSC, tests).
///
/// Everything runs on the session's own thread; the controller is never
/// touched from anywhere else. Between events the loop sleeps on a single
/// deadline: whichever of the armed silence check and the pending response
/// completion comes first. A note-on that cancels the silence check simply
/// changes what the next iteration waits for.
pub struct Session {
    input_rx: Receiver<InputEvent>,
    response_txs: Vec<Sender<Response>>,
    controller: TriggerController,
    clock: SessionClock,
}

impl Session {
    pub fn new(
        input_rx: Receiver<InputEvent>,
        response_txs: Vec<Sender<Response>>,
        controller: TriggerController,
        clock: SessionClock,
    ) -> Self {
        Self {
            input_rx,
            response_txs,
            controller,
            clock,
        }
    }

    /// Run until the input channel closes. Blocks the calling thread.
    pub fn run(&mut self) {
        info!(
            "Session running (mode: {}, temperature: {:.2})",
            self.controller.mode(),
            self.controller.temperature()
        );

        loop {
            // An unrepresentable deadline never comes due.
            let deadline = self
                .controller
                .next_wakeup()
                .and_then(|t| self.clock.instant_at(t));
            let wakeup = match deadline {
                Some(instant) => at(instant),
                None => never(),
            };

            let received = select! {
                recv(self.input_rx) -> msg => Some(msg),
                recv(wakeup) -> _ => None,
            };
            match received {
                Some(Ok(event)) => self.handle(event),
                Some(Err(_)) => break,
                None => {}
            }

            if let Some(response) = self.controller.tick(self.clock.now_secs()) {
                self.publish(response);
            }
        }

        let m = self.controller.metrics();
        info!(
            "Session shutting down after {} responses ({} notes in, {} out, {} fallbacks)",
            m.cycles, m.notes_processed, m.notes_generated, m.fallbacks
        );
    }

    fn handle(&mut self, event: InputEvent) {
        match event {
            InputEvent::NoteOn(e) => self.controller.note_on(&e),
            InputEvent::NoteOff(e) => self.controller.note_off(&e),
            InputEvent::SetMode(mode) => self.controller.set_mode(mode),
            InputEvent::SetTemperature(t) => self.controller.set_temperature(t),
            InputEvent::Reset => self.controller.reset(),
        }
    }

    fn publish(&self, response: Response) {
        debug!(
            "Publishing {} notes to {} consumers",
            response.notes.len(),
            self.response_txs.len()
        );
        for tx in &self.response_txs {
            let _ = tx.send(response.clone());
        }
    }
}
