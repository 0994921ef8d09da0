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

//! Sample data and the things that pick and play it.
//!
//! This module provides:
//! - Decoded, shared sample data and round-robin layers
//! - Velocity-layered instruments
//! - Voices with sample-accurate pre-roll, and the pool they live in
//! - Loading samples from files into memory

mod error;
mod instrument;
mod loader;
mod registry;
mod sample;
mod voice;

pub use error::SampleError;
pub use instrument::{Instrument, InstrumentId, MAX_VELOCITY};
pub use loader::{DecodedSample, SampleLoader};
pub use registry::SampleRegistry;
pub use sample::{RoundRobinSample, Sample};
pub use voice::{PlayingVoice, VoiceId, VoicePool};
