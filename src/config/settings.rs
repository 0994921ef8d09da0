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
use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Default sample rate the engine expects its samples at.
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Default maximum number of frames produced in one cycle.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default number of voices that can sound at once.
pub const DEFAULT_MAX_VOICES: usize = 64;

/// Default number of buses an engine can hold.
pub const DEFAULT_MAX_BUSES: usize = 32;

/// Default number of instruments an engine can hold.
pub const DEFAULT_MAX_INSTRUMENTS: usize = 128;

/// Default depth of the configuration command queue.
pub const DEFAULT_COMMAND_QUEUE_SIZE: usize = 1024;

/// Sizes fixed when an engine is built. Nothing on the audio thread grows
/// past these.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct EngineSettings {
    /// Sample rate of the output device.
    pub sample_rate: u32,

    /// Maximum frames per cycle. Longer host buffers are processed in chunks.
    pub buffer_size: usize,

    /// Voices that can sound at once. The oldest voice is cut when exceeded.
    pub max_voices: usize,

    pub max_buses: usize,

    pub max_instruments: usize,

    /// Configuration commands that can wait for the audio thread.
    pub command_queue_size: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            sample_rate: DEFAULT_SAMPLE_RATE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_voices: DEFAULT_MAX_VOICES,
            max_buses: DEFAULT_MAX_BUSES,
            max_instruments: DEFAULT_MAX_INSTRUMENTS,
            command_queue_size: DEFAULT_COMMAND_QUEUE_SIZE,
        }
    }
}

impl EngineSettings {
    /// Makes sure every size is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("sample_rate", self.sample_rate as usize),
            ("buffer_size", self.buffer_size),
            ("max_voices", self.max_voices),
            ("max_buses", self.max_buses),
            ("max_instruments", self.max_instruments),
            ("command_queue_size", self.command_queue_size),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(ConfigError::InvalidSetting {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Number of sources each bus reserves room for: every voice plus every
    /// other bus.
    pub fn bus_source_capacity(&self) -> usize {
        self.max_voices + self.max_buses
    }
}
