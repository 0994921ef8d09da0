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

use crate::engine::EngineError;

/// Typed error for kit load/parse failures so callers can tell a malformed
/// file from a kit the engine refused.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value {value} for {name}")]
    InvalidSetting { name: String, value: String },

    #[error("Bus {0} is defined more than once")]
    DuplicateBus(String),

    #[error("Instrument {0} is defined more than once")]
    DuplicateInstrument(String),

    #[error("{referenced_by} refers to unknown bus {name}")]
    UnknownBus { referenced_by: String, name: String },

    #[error("Engine rejected kit: {0}")]
    Engine(#[from] EngineError),
}
