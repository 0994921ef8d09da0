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

//! A note-triggered sample mixing engine.
//!
//! Note events pick a velocity-layered, round-robin sample from an
//! instrument and start a voice on the instrument's bus. Once per cycle every
//! top-level bus pulls its voices and child buses into its output, mixing a
//! bus shared by several paths only once.

pub mod config;
pub mod engine;
pub mod host;
pub mod mixer;
pub mod notify;
pub mod samples;
#[cfg(test)]
mod testutil;
