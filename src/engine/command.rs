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
use crate::mixer::{BusId, MixBus};
use crate::samples::{Instrument, InstrumentId};

/// A note-on delivered to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteEvent {
    pub key: u8,
    pub velocity: u8,
    /// Frames into the cycle at which the note starts.
    pub offset: usize,
}

impl NoteEvent {
    pub fn new(key: u8, velocity: u8, offset: usize) -> NoteEvent {
        NoteEvent {
            key,
            velocity,
            offset,
        }
    }
}

/// A change to the engine, built on the control thread and applied at the
/// start of the next cycle. Everything a command carries is allocated before
/// it is sent.
pub enum Command {
    /// Appends a bus. It takes the next bus id.
    AddBus(MixBus),
    SetGain {
        bus: BusId,
        gain: f32,
    },
    SetDownstream {
        bus: BusId,
        downstream: Option<BusId>,
    },
    AddSource {
        parent: BusId,
        child: BusId,
    },
    AddTopLevel(BusId),
    /// Installs an instrument, replacing whatever was in its slot.
    SetInstrument {
        id: InstrumentId,
        instrument: Box<Instrument>,
    },
    BindKey {
        key: u8,
        instrument: InstrumentId,
    },
    UnbindKey(u8),
    Trigger(NoteEvent),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::AddBus(bus) => write!(f, "AddBus({})", bus.name()),
            Command::SetGain { bus, gain } => write!(f, "SetGain({}, {})", bus, gain),
            Command::SetDownstream { bus, downstream } => {
                write!(f, "SetDownstream({}, {:?})", bus, downstream)
            }
            Command::AddSource { parent, child } => write!(f, "AddSource({}, {})", parent, child),
            Command::AddTopLevel(bus) => write!(f, "AddTopLevel({})", bus),
            Command::SetInstrument { id, instrument } => {
                write!(f, "SetInstrument({}, {})", id, instrument.name())
            }
            Command::BindKey { key, instrument } => write!(f, "BindKey({}, {})", key, instrument),
            Command::UnbindKey(key) => write!(f, "UnbindKey({})", key),
            Command::Trigger(event) => write!(f, "Trigger({:?})", event),
        }
    }
}

/// Something the audio thread let go of. It's sent back so that freeing it
/// happens on the control thread.
pub enum Retired {
    Instrument(Box<Instrument>),
    Bus(MixBus),
}
