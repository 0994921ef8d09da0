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
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use super::command::{Command, NoteEvent, Retired};
use super::stats::EngineStats;
use crate::config::EngineSettings;
use crate::mixer::{BusGraph, BusId, Source, VoiceStart};
use crate::samples::{Instrument, InstrumentId, PlayingVoice};

/// Number of addressable keys (MIDI note numbers).
pub const KEY_COUNT: usize = 128;

/// The real-time half of the engine.
///
/// An `Engine` lives on the audio thread. It turns note events into voices
/// and drives one mix of every top-level bus per cycle. Nothing here blocks,
/// and nothing allocates: buses, instruments and voice slots are all sized
/// when the engine is built, and configuration arrives ready-made through
/// the command queue.
pub struct Engine {
    graph: BusGraph,
    instruments: Vec<Option<Box<Instrument>>>,
    keys: [Option<InstrumentId>; KEY_COUNT],
    /// Mixed in this order every cycle.
    top_level: Vec<BusId>,
    max_frames: usize,
    commands: Receiver<Command>,
    retired: Sender<Retired>,
    stats: Arc<EngineStats>,
}

impl Engine {
    pub(crate) fn new(
        settings: &EngineSettings,
        commands: Receiver<Command>,
        retired: Sender<Retired>,
        stats: Arc<EngineStats>,
    ) -> Engine {
        Engine {
            graph: BusGraph::new(settings.max_buses, settings.max_voices),
            instruments: (0..settings.max_instruments).map(|_| None).collect(),
            keys: [None; KEY_COUNT],
            top_level: Vec::with_capacity(settings.max_buses),
            max_frames: settings.buffer_size,
            commands,
            retired,
            stats,
        }
    }

    /// The most frames a single cycle will produce.
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Applies every queued command without waiting for more. Returns how
    /// many were applied.
    pub fn apply_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
            applied += 1;
        }
        applied
    }

    /// Applies a single command.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::AddBus(bus) => {
                if let Err(bus) = self.graph.add_bus(bus) {
                    self.retire(Retired::Bus(bus));
                }
            }
            Command::SetGain { bus, gain } => {
                if let Some(bus) = self.graph.bus_mut(bus) {
                    bus.set_gain(gain);
                }
            }
            Command::SetDownstream { bus, downstream } => {
                if let Some(bus) = self.graph.bus_mut(bus) {
                    bus.set_downstream(downstream);
                }
            }
            Command::AddSource { parent, child } => {
                if let Some(parent) = self.graph.bus_mut(parent) {
                    parent.add_source(Source::Bus(child));
                }
            }
            Command::AddTopLevel(bus) => {
                if self.top_level.len() < self.top_level.capacity() {
                    self.top_level.push(bus);
                }
            }
            Command::SetInstrument { id, instrument } => {
                let old = match self.instruments.get_mut(id.0) {
                    Some(slot) => slot.replace(instrument),
                    None => Some(instrument),
                };
                if let Some(old) = old {
                    self.retire(Retired::Instrument(old));
                }
            }
            Command::BindKey { key, instrument } => {
                self.bind_key(key, instrument);
            }
            Command::UnbindKey(key) => {
                self.unbind_key(key);
            }
            Command::Trigger(event) => {
                self.trigger(event.key, event.velocity, event.offset);
            }
        }
    }

    /// Binds a key to an instrument, replacing the key's previous binding.
    /// An instrument answers to one key at a time, so any other key bound to
    /// it is released. Returns false if the key is out of range.
    pub fn bind_key(&mut self, key: u8, instrument: InstrumentId) -> bool {
        if key as usize >= KEY_COUNT {
            return false;
        }
        for slot in self.keys.iter_mut() {
            if *slot == Some(instrument) {
                *slot = None;
            }
        }
        self.keys[key as usize] = Some(instrument);
        true
    }

    pub fn unbind_key(&mut self, key: u8) {
        if let Some(slot) = self.keys.get_mut(key as usize) {
            *slot = None;
        }
    }

    pub fn key_binding(&self, key: u8) -> Option<InstrumentId> {
        self.keys.get(key as usize).copied().flatten()
    }

    /// Starts a voice for `key`, silent for the first `offset` frames of the
    /// next cycle. Returns false when the trigger produced nothing: the key is
    /// unbound, its instrument has no layers or no bus, or the bus is gone.
    pub fn trigger(&mut self, key: u8, velocity: u8, offset: usize) -> bool {
        let Some(instrument) = self
            .key_binding(key)
            .and_then(|id| self.instruments.get_mut(id.0))
            .and_then(|slot| slot.as_deref_mut())
        else {
            self.stats.record_ignored();
            return false;
        };
        let (Some(bus), Some(sample)) = (instrument.bus(), instrument.resolve(velocity)) else {
            self.stats.record_ignored();
            return false;
        };

        match self.graph.start_voice(PlayingVoice::new(sample, offset, bus)) {
            VoiceStart::Started(_) => {
                self.stats.record_started(false);
                true
            }
            VoiceStart::Stole(_) => {
                self.stats.record_started(true);
                true
            }
            VoiceStart::Rejected => {
                self.stats.record_ignored();
                false
            }
        }
    }

    /// Mixes every top-level bus once, then clears every bus's mixed flag.
    /// The two passes must stay separate: clearing early would let a shared
    /// bus be mixed twice.
    pub fn run_cycle(&mut self, frames: usize) {
        let frames = frames.min(self.max_frames);
        for id in self.top_level.iter() {
            self.graph.mix(*id, frames, None, 1.0);
        }
        self.graph.unmark_all();
        self.stats.record_cycle(self.graph.voices().active_count());
    }

    /// Runs one whole cycle: pending configuration, then this cycle's note
    /// events, then the mix.
    pub fn process(&mut self, frames: usize, events: &[NoteEvent]) {
        self.apply_pending();
        for event in events {
            self.trigger(event.key, event.velocity, event.offset);
        }
        self.run_cycle(frames);
    }

    /// The dedicated output buffer of a bus after the last cycle. Only the
    /// first `frames` values of the last `run_cycle` are meaningful.
    pub fn bus_output(&self, bus: BusId) -> Option<&[f32]> {
        self.graph.output(bus)
    }

    pub fn graph(&self) -> &BusGraph {
        &self.graph
    }

    pub fn instrument(&self, id: InstrumentId) -> Option<&Instrument> {
        self.instruments.get(id.0).and_then(|slot| slot.as_deref())
    }

    pub fn top_level(&self) -> &[BusId] {
        &self.top_level
    }

    pub fn stats(&self) -> &Arc<EngineStats> {
        &self.stats
    }

    /// Hands an object back to the control thread. If the way back is full
    /// it's dropped here instead.
    ///
    /// The retired channel is as deep as the command queue, and every command
    /// retires at most one object. `Controller::ensure_room` drains the
    /// retired channel before it sends, so the channel can't fill while the
    /// controller keeps that call.
    fn retire(&self, item: Retired) {
        let _ = self.retired.try_send(item);
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("graph", &self.graph)
            .field("top_level", &self.top_level)
            .field("max_frames", &self.max_frames)
            .finish()
    }
}
