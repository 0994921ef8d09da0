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
use crate::mixer::BusId;
use crate::samples::{InstrumentId, SampleError};

/// Errors returned by the engine's configuration surface.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Unknown bus {0}")]
    UnknownBus(BusId),

    #[error("Unknown instrument {0}")]
    UnknownInstrument(InstrumentId),

    #[error("Engine is limited to {0} buses")]
    TooManyBuses(usize),

    #[error("Engine is limited to {0} instruments")]
    TooManyInstruments(usize),

    #[error("Routing {bus} to {downstream} would loop back to {bus}")]
    DownstreamLoop { bus: BusId, downstream: BusId },

    #[error("Bus {0} cannot be its own source")]
    SelfSource(BusId),

    #[error("Bus {child} is already a source of {parent}")]
    DuplicateSource { parent: BusId, child: BusId },

    #[error("Bus {0} is already a top-level bus")]
    AlreadyTopLevel(BusId),

    #[error("Key {0} is out of range (0-127)")]
    InvalidKey(u8),

    #[error("Gain {0} is not a finite number")]
    InvalidGain(f32),

    #[error("Command queue is full")]
    QueueFull,

    #[error("Engine has been dropped")]
    Disconnected,

    #[error("Sample error: {0}")]
    Sample(#[from] SampleError),
}
