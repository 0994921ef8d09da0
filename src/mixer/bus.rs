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
use std::fmt;

use crate::samples::VoiceId;

/// Default gain of a new bus.
pub const DEFAULT_GAIN: f32 = 1.0;

/// Identifies a bus inside an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BusId(pub(crate) usize);

impl BusId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus#{}", self.0)
    }
}

/// Something a bus sums: a playing voice, or another bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Voice(VoiceId),
    Bus(BusId),
}

/// A node in the mixing graph.
///
/// A bus owns the voices attached to it. Child buses and the downstream bus
/// are referenced by id only.
pub struct MixBus {
    name: String,
    gain: f32,
    downstream: Option<BusId>,
    /// Dedicated output buffer, if this bus has an output of its own.
    pub(super) output: Option<Vec<f32>>,
    /// Capacity is reserved up front; see `add_source`.
    pub(super) sources: Vec<Source>,
    /// Set once the bus has contributed to the current cycle.
    pub(super) mixed: bool,
}

impl MixBus {
    /// Creates a bus without an output of its own. `source_capacity` bounds how
    /// many voices and child buses can be attached at once.
    pub fn new(name: &str, source_capacity: usize) -> MixBus {
        MixBus {
            name: name.to_string(),
            gain: DEFAULT_GAIN,
            downstream: None,
            output: None,
            sources: Vec::with_capacity(source_capacity),
            mixed: false,
        }
    }

    /// Creates a bus with a dedicated output buffer of `max_frames` frames.
    pub fn with_output(name: &str, source_capacity: usize, max_frames: usize) -> MixBus {
        let mut bus = MixBus::new(name, source_capacity);
        bus.output = Some(vec![0.0; max_frames]);
        bus
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    pub fn downstream(&self) -> Option<BusId> {
        self.downstream
    }

    pub fn set_downstream(&mut self, downstream: Option<BusId>) {
        self.downstream = downstream;
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// The dedicated output buffer, as left by the last mix.
    pub fn output(&self) -> Option<&[f32]> {
        self.output.as_deref()
    }

    /// Attaches a source. Refuses (returns false) rather than grow the source
    /// list past the capacity reserved at creation.
    pub fn add_source(&mut self, source: Source) -> bool {
        if self.sources.len() >= self.sources.capacity() {
            return false;
        }
        self.sources.push(source);
        true
    }

    /// Detaches a source. Returns true if it was attached.
    pub fn remove_source(&mut self, source: Source) -> bool {
        let before = self.sources.len();
        self.sources.retain(|s| *s != source);
        before != self.sources.len()
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Number of voices currently attached.
    pub fn voice_count(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| matches!(s, Source::Voice(_)))
            .count()
    }

    pub fn is_mixed(&self) -> bool {
        self.mixed
    }

    pub fn unmark_mixed(&mut self) {
        self.mixed = false;
    }
}

impl fmt::Debug for MixBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixBus")
            .field("name", &self.name)
            .field("gain", &self.gain)
            .field("downstream", &self.downstream)
            .field("has_output", &self.has_output())
            .field("sources", &self.sources.len())
            .finish()
    }
}
