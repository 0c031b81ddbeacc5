use crate::types::*;
use crossbeam_channel::Receiver;
use log::{debug, error, info};
use rosc::{OscMessage, OscPacket, OscType};
use std::net::UdpSocket;

/// Hands each response to an external synth over OSC.
///
/// Per response: one `/jam/response [count, mode]` header, then one
/// `/jam/note [pitch, velocity, duration, offset]` per scheduled note.
/// The receiving side does its own timing from the offsets.
pub struct OscSender {
    rx: Receiver<Response>,
    target: String,
}

impl OscSender {
    pub fn new(rx: Receiver<Response>, target: String) -> Self {
        Self { rx, target }
    }

    /// Run the OSC sender loop. Blocks the calling thread.
    pub fn run(&self) {
        let socket = match UdpSocket::bind("0.0.0.0:0") {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to bind UDP socket: {}", e);
                return;
            }
        };
        info!("OSC sender → {}", self.target);

        for response in self.rx.iter() {
            if let Err(e) = self.send_response(&socket, &response) {
                debug!("OSC send error: {}", e);
            }
        }
        info!("OSC sender shutting down");
    }

    fn send_response(
        &self,
        socket: &UdpSocket,
        response: &Response,
    ) -> Result<(), Box<dyn std::error::Error>> {
        for packet in response_packets(response) {
            let buf = rosc::encoder::encode(&packet)?;
            socket.send_to(&buf, &self.target)?;
        }
        Ok(())
    }
}

/// The OSC messages describing one response, in send order.
pub fn response_packets(response: &Response) -> Vec<OscPacket> {
    let mut packets = Vec::with_capacity(response.notes.len() + 1);
    packets.push(OscPacket::Message(OscMessage {
        addr: "/jam/response".to_string(),
        args: vec![
            OscType::Int(response.notes.len() as i32),
            OscType::String(response.mode.to_string()),
        ],
    }));
    for note in &response.notes {
        packets.push(OscPacket::Message(OscMessage {
            addr: "/jam/note".to_string(),
            args: vec![
                OscType::Int(note.pitch as i32),
                OscType::Float(note.velocity as f32),
                OscType::Float(note.duration as f32),
                OscType::Float(note.offset_secs as f32),
            ],
        }));
    }
    packets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packets_header_then_notes() {
        let response = Response {
            dispatched_at: 0.0,
            mode: Mode::Groove,
            temperature: 1.0,
            input_count: 2,
            average_gap: 0.25,
            notes: vec![
                ScheduledNote { pitch: 48, velocity: 0.75, duration: 0.1, offset_secs: 0.0 },
                ScheduledNote { pitch: 55, velocity: 0.5, duration: 0.1, offset_secs: 0.25 },
            ],
            outcome: Outcome::Generated,
        };
        let packets = response_packets(&response);
        assert_eq!(packets.len(), 3);
        match &packets[0] {
            OscPacket::Message(m) => {
                assert_eq!(m.addr, "/jam/response");
                assert_eq!(m.args[0], OscType::Int(2));
                assert_eq!(m.args[1], OscType::String("groove".into()));
            }
            _ => panic!("expected message"),
        }
        match &packets[2] {
            OscPacket::Message(m) => {
                assert_eq!(m.addr, "/jam/note");
                assert_eq!(m.args[0], OscType::Int(55));
                assert_eq!(m.args[3], OscType::Float(0.25));
            }
            _ => panic!("expected message"),
        }
        // every packet must encode
        for p in &packets {
            assert!(rosc::encoder::encode(p).is_ok());
        }
    }
}
