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

//! The bus graph and its evaluation.
//!
//! Buses live in a fixed-capacity arena and refer to each other by [`BusId`].
//! Voices live in the [`VoicePool`] and are referenced from exactly one bus.
//!
//! Evaluating a bus pulls every source into a working buffer. A bus reachable
//! through several paths (a shared sub-bus in a diamond) is only summed the
//! first time it is reached in a cycle; the `mixed` flag on each bus guards
//! that and is cleared by [`BusGraph::unmark_all`] once every top-level mix of
//! the cycle is done.

use super::bus::{BusId, MixBus, Source};
use crate::samples::{PlayingVoice, VoiceId, VoicePool};

/// What happened when a voice was started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceStart {
    /// The voice took a free slot.
    Started(VoiceId),
    /// The pool was full; the oldest voice was cut to make room.
    Stole(VoiceId),
    /// The voice's bus doesn't exist or can't take another source.
    Rejected,
}

/// Buses plus the voices playing through them.
pub struct BusGraph {
    buses: Vec<MixBus>,
    voices: VoicePool,
}

impl BusGraph {
    /// Creates an empty graph with room for `bus_capacity` buses and
    /// `voice_capacity` simultaneous voices.
    pub fn new(bus_capacity: usize, voice_capacity: usize) -> BusGraph {
        BusGraph {
            buses: Vec::with_capacity(bus_capacity),
            voices: VoicePool::new(voice_capacity),
        }
    }

    /// Adds a bus, handing it back if the arena is full.
    pub fn add_bus(&mut self, bus: MixBus) -> Result<BusId, MixBus> {
        if self.buses.len() >= self.buses.capacity() {
            return Err(bus);
        }
        self.buses.push(bus);
        Ok(BusId(self.buses.len() - 1))
    }

    pub fn bus(&self, id: BusId) -> Option<&MixBus> {
        self.buses.get(id.0)
    }

    pub fn bus_mut(&mut self, id: BusId) -> Option<&mut MixBus> {
        self.buses.get_mut(id.0)
    }

    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    pub fn voices(&self) -> &VoicePool {
        &self.voices
    }

    /// Attaches a voice to the bus recorded in it.
    pub fn start_voice(&mut self, voice: PlayingVoice) -> VoiceStart {
        let bus_id = voice.bus();
        match self.buses.get(bus_id.0) {
            Some(bus) if bus.sources.len() < bus.sources.capacity() => {}
            _ => return VoiceStart::Rejected,
        }

        let (id, stole) = match self.voices.allocate(voice) {
            Ok(id) => (id, false),
            Err(voice) => {
                let Some(victim) = self.voices.oldest() else {
                    return VoiceStart::Rejected;
                };
                self.cut_voice(victim);
                match self.voices.allocate(voice) {
                    Ok(id) => (id, true),
                    Err(_) => return VoiceStart::Rejected,
                }
            }
        };

        let attached = self
            .buses
            .get_mut(bus_id.0)
            .is_some_and(|bus| bus.add_source(Source::Voice(id)));
        if !attached {
            self.voices.release(id);
            return VoiceStart::Rejected;
        }

        if stole {
            VoiceStart::Stole(id)
        } else {
            VoiceStart::Started(id)
        }
    }

    /// Stops a voice immediately and detaches it from its bus.
    pub fn cut_voice(&mut self, id: VoiceId) -> bool {
        let Some(voice) = self.voices.release(id) else {
            return false;
        };
        if let Some(bus) = self.buses.get_mut(voice.bus().0) {
            bus.remove_source(Source::Voice(id));
        }
        true
    }

    /// Mixes `frames` frames of a bus.
    ///
    /// With `dest` set the bus sums into it. Without, a bus that has a
    /// downstream bus hands the call on to it instead of mixing itself, and a
    /// bus with neither a destination nor an output of its own does nothing.
    pub fn mix(&mut self, id: BusId, frames: usize, dest: Option<&mut [f32]>, gain: f32) {
        let Some(bus) = self.buses.get(id.0) else {
            return;
        };
        if bus.mixed {
            return;
        }
        if dest.is_none() {
            if let Some(downstream) = bus.downstream() {
                self.mix(downstream, frames, None, 1.0);
                return;
            }
        }

        let bus = &mut self.buses[id.0];
        bus.mixed = true;
        let bus_gain = bus.gain() * gain;
        let mut output = bus.output.take();
        let mut sources = std::mem::take(&mut bus.sources);

        match (output.as_mut(), dest) {
            (Some(out), dest) => {
                let len = frames.min(out.len());
                let working = &mut out[..len];
                working.fill(0.0);
                self.mix_sources(&mut sources, working, bus_gain);
                if let Some(dest) = dest {
                    for (d, w) in dest.iter_mut().zip(working.iter()) {
                        *d += *w;
                    }
                }
            }
            (None, Some(dest)) => {
                let len = frames.min(dest.len());
                self.mix_sources(&mut sources, &mut dest[..len], bus_gain);
            }
            (None, None) => {}
        }

        let bus = &mut self.buses[id.0];
        bus.output = output;
        bus.sources = sources;
    }

    /// Pulls every source into `working`, then drops finished voices.
    fn mix_sources(&mut self, sources: &mut Vec<Source>, working: &mut [f32], gain: f32) {
        for source in sources.iter() {
            match *source {
                Source::Voice(id) => {
                    if let Some(voice) = self.voices.get_mut(id) {
                        voice.mix(working, gain);
                    }
                }
                Source::Bus(child) => {
                    self.mix(child, working.len(), Some(&mut *working), gain);
                }
            }
        }

        let voices = &mut self.voices;
        sources.retain(|source| match *source {
            Source::Voice(id) => {
                if voices.is_done(id) {
                    voices.release(id);
                    false
                } else {
                    true
                }
            }
            Source::Bus(_) => true,
        });
    }

    /// Clears the mixed flag on every bus, readying the graph for the next cycle.
    pub fn unmark_all(&mut self) {
        for bus in self.buses.iter_mut() {
            bus.unmark_mixed();
        }
    }

    /// Returns the dedicated output buffer of a bus.
    pub fn output(&self, id: BusId) -> Option<&[f32]> {
        self.bus(id).and_then(|bus| bus.output())
    }
}

impl std::fmt::Debug for BusGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusGraph")
            .field("buses", &self.buses)
            .field("voices", &self.voices)
            .finish()
    }
}
