// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::fmt;

use crossbeam_channel::{Sender, TrySendError};
use midir::{MidiInput, MidiInputConnection, MidiInputPort};
use midly::live::LiveEvent;
use midly::MidiMessage;
use tracing::{debug, info, warn};

use crate::engine::NoteEvent;

/// An open MIDI input. Notes stop flowing when this is dropped.
pub struct MidiIn {
    name: String,
    _connection: MidiInputConnection<()>,
}

impl MidiIn {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for MidiIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidiIn").field("name", &self.name).finish()
    }
}

/// Lists the names of the available MIDI input ports, sorted.
pub fn list_ports() -> Result<Vec<String>, Box<dyn Error>> {
    let input = MidiInput::new("tdrum input listing")?;
    let mut names = input
        .ports()
        .iter()
        .map(|port| input.port_name(port))
        .collect::<Result<Vec<String>, _>>()?;
    names.sort();
    Ok(names)
}

/// Connects to the input port whose name contains `name` and forwards every
/// note-on to `notes`. The engine drains `notes` at the start of each cycle.
///
/// midir's timestamp is ignored, so live notes are quantized to the start of
/// the audio callback that picks them up: up to one device buffer of jitter.
pub fn connect(name: &str, notes: Sender<NoteEvent>) -> Result<MidiIn, Box<dyn Error>> {
    let input = MidiInput::new("tdrum input")?;
    let mut matches: Vec<(String, MidiInputPort)> = Vec::new();
    for port in input.ports() {
        let port_name = input.port_name(&port)?;
        if port_name.contains(name) {
            matches.push((port_name, port));
        }
    }

    let (port_name, port) = match matches.len() {
        0 => return Err(format!("no MIDI input found with name {}", name).into()),
        1 => matches.remove(0),
        _ => {
            return Err(format!(
                "found too many MIDI inputs that match ({}), use a less ambiguous name",
                matches
                    .iter()
                    .map(|(name, _)| name.clone())
                    .collect::<Vec<String>>()
                    .join(", ")
            )
            .into())
        }
    };

    let connection = input.connect(
        &port,
        "tdrum note input",
        move |_, raw_event, _| {
            let Some(event) = note_event(raw_event) else {
                return;
            };
            debug!(key = event.key, velocity = event.velocity, "Received note");
            if let Err(TrySendError::Full(event)) = notes.try_send(event) {
                warn!(key = event.key, "Note queue full, dropping note");
            }
        },
        (),
    )?;

    info!(port = port_name, "Listening for notes");
    Ok(MidiIn {
        name: port_name,
        _connection: connection,
    })
}

/// Turns a raw MIDI message into a note event with offset 0. Only note-ons
/// with a non-zero velocity count; a zero-velocity note-on is a note-off.
pub fn note_event(raw_event: &[u8]) -> Option<NoteEvent> {
    match LiveEvent::parse(raw_event).ok()? {
        LiveEvent::Midi {
            message: MidiMessage::NoteOn { key, vel },
            ..
        } if vel.as_int() > 0 => Some(NoteEvent::new(key.as_int(), vel.as_int(), 0)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on() {
        assert_eq!(
            note_event(&[0x90, 38, 100]),
            Some(NoteEvent::new(38, 100, 0))
        );
        // Any channel.
        assert_eq!(
            note_event(&[0x99, 36, 1]),
            Some(NoteEvent::new(36, 1, 0))
        );
    }

    #[test]
    fn test_ignored_messages() {
        // Note-on with zero velocity.
        assert_eq!(note_event(&[0x90, 38, 0]), None);
        // Note-off.
        assert_eq!(note_event(&[0x80, 38, 64]), None);
        // Control change.
        assert_eq!(note_event(&[0xB0, 7, 100]), None);
        // Garbage.
        assert_eq!(note_event(&[]), None);
    }
}
