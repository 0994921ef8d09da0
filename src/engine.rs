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

//! The note-triggered mixing engine.
//!
//! An engine comes in two halves that share nothing but a pair of channels
//! and a set of counters:
//! - [`Engine`] runs on the audio thread. It applies queued changes, starts
//!   voices for note events and mixes every top-level bus once per cycle.
//! - [`Controller`] runs anywhere else. It validates changes, builds
//!   everything that needs memory and queues the result for the engine.
//!
//! Objects the engine replaces travel back to the controller so they are
//! freed off the audio thread.

use std::sync::Arc;

mod command;
mod controller;
mod dispatch;
mod error;
mod stats;

pub use command::{Command, NoteEvent, Retired};
pub use controller::{BusLayout, Controller};
pub use dispatch::{Engine, KEY_COUNT};
pub use error::EngineError;
pub use stats::EngineStats;

use crate::config::EngineSettings;
use crate::notify::Notifier;

/// Builds an engine and the controller that configures it.
pub fn new(settings: EngineSettings, notifier: Arc<dyn Notifier>) -> (Controller, Engine) {
    let queue_size = settings.command_queue_size.max(1);
    let (command_tx, command_rx) = crossbeam_channel::bounded(queue_size);
    let (retired_tx, retired_rx) = crossbeam_channel::bounded(queue_size);
    let stats = Arc::new(EngineStats::default());

    let engine = Engine::new(&settings, command_rx, retired_tx, Arc::clone(&stats));
    let controller = Controller::new(settings, command_tx, retired_rx, stats, notifier);
    (controller, engine)
}
