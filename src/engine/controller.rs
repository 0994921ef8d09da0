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
use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, info};

use super::command::{Command, NoteEvent, Retired};
use super::dispatch::KEY_COUNT;
use super::error::EngineError;
use super::stats::EngineStats;
use crate::config::EngineSettings;
use crate::mixer::{BusId, MixBus, DEFAULT_GAIN};
use crate::notify::{Notifier, Severity};
use crate::samples::{Instrument, InstrumentId, Sample, SampleLoader, SampleRegistry};

/// The control thread's view of a bus.
#[derive(Clone, Debug, PartialEq)]
pub struct BusLayout {
    pub name: String,
    pub gain: f32,
    pub downstream: Option<BusId>,
    /// Child buses, in the order they were attached.
    pub sources: Vec<BusId>,
    pub has_output: bool,
}

/// The non-real-time half of the engine.
///
/// Every change is checked against a copy of the engine's layout kept here,
/// so a change the engine couldn't honor is refused with an error instead of
/// reaching the audio thread. Accepted changes are queued and take effect at
/// the start of the engine's next cycle.
pub struct Controller {
    settings: EngineSettings,
    commands: Sender<Command>,
    retired: Receiver<Retired>,
    stats: Arc<EngineStats>,
    notifier: Arc<dyn Notifier>,
    loader: SampleLoader,
    registry: SampleRegistry,
    buses: Vec<BusLayout>,
    instruments: Vec<Instrument>,
    keys: [Option<InstrumentId>; KEY_COUNT],
    top_level: Vec<BusId>,
}

impl Controller {
    pub(crate) fn new(
        settings: EngineSettings,
        commands: Sender<Command>,
        retired: Receiver<Retired>,
        stats: Arc<EngineStats>,
        notifier: Arc<dyn Notifier>,
    ) -> Controller {
        Controller {
            settings,
            commands,
            retired,
            stats,
            notifier,
            loader: SampleLoader::new(),
            registry: SampleRegistry::new(),
            buses: Vec::new(),
            instruments: Vec::new(),
            keys: [None; KEY_COUNT],
            top_level: Vec::new(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn stats(&self) -> &Arc<EngineStats> {
        &self.stats
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Creates a bus. With `with_output` the bus gets a dedicated output
    /// buffer that the host can read after each cycle.
    pub fn add_bus(&mut self, name: &str, with_output: bool) -> Result<BusId, EngineError> {
        if self.buses.len() >= self.settings.max_buses {
            return Err(EngineError::TooManyBuses(self.settings.max_buses));
        }
        self.ensure_room()?;

        let capacity = self.settings.bus_source_capacity();
        let bus = if with_output {
            MixBus::with_output(name, capacity, self.settings.buffer_size)
        } else {
            MixBus::new(name, capacity)
        };
        let id = BusId(self.buses.len());
        self.buses.push(BusLayout {
            name: name.to_string(),
            gain: DEFAULT_GAIN,
            downstream: None,
            sources: Vec::new(),
            has_output: with_output,
        });
        self.send(Command::AddBus(bus))?;

        debug!(bus = name, id = %id, output = with_output, "Added bus");
        Ok(id)
    }

    pub fn set_gain(&mut self, bus: BusId, gain: f32) -> Result<(), EngineError> {
        self.check_bus(bus)?;
        if !gain.is_finite() {
            return Err(EngineError::InvalidGain(gain));
        }
        self.ensure_room()?;

        self.buses[bus.0].gain = gain;
        self.send(Command::SetGain { bus, gain })
    }

    /// Points a bus at its downstream bus, or clears the link. A chain of
    /// downstream links that comes back around to `bus` is refused.
    pub fn set_downstream(
        &mut self,
        bus: BusId,
        downstream: Option<BusId>,
    ) -> Result<(), EngineError> {
        self.check_bus(bus)?;
        if let Some(downstream) = downstream {
            self.check_bus(downstream)?;
            let mut next = Some(downstream);
            let mut steps = 0;
            while let Some(current) = next {
                if current == bus || steps > self.buses.len() {
                    return Err(EngineError::DownstreamLoop { bus, downstream });
                }
                next = self.buses[current.0].downstream;
                steps += 1;
            }
        }
        self.ensure_room()?;

        self.buses[bus.0].downstream = downstream;
        self.send(Command::SetDownstream { bus, downstream })
    }

    /// Makes `child` a source of `parent`.
    pub fn add_source(&mut self, parent: BusId, child: BusId) -> Result<(), EngineError> {
        self.check_bus(parent)?;
        self.check_bus(child)?;
        if parent == child {
            return Err(EngineError::SelfSource(parent));
        }
        if self.buses[parent.0].sources.contains(&child) {
            return Err(EngineError::DuplicateSource { parent, child });
        }
        self.ensure_room()?;

        self.buses[parent.0].sources.push(child);
        self.send(Command::AddSource { parent, child })
    }

    /// Adds a bus to the ones mixed every cycle, after those already added.
    pub fn add_top_level(&mut self, bus: BusId) -> Result<(), EngineError> {
        self.check_bus(bus)?;
        if self.top_level.contains(&bus) {
            return Err(EngineError::AlreadyTopLevel(bus));
        }
        self.ensure_room()?;

        self.top_level.push(bus);
        self.send(Command::AddTopLevel(bus))
    }

    pub fn add_instrument(&mut self, name: &str) -> Result<InstrumentId, EngineError> {
        if self.instruments.len() >= self.settings.max_instruments {
            return Err(EngineError::TooManyInstruments(
                self.settings.max_instruments,
            ));
        }
        self.ensure_room()?;

        let id = InstrumentId(self.instruments.len());
        self.instruments.push(Instrument::new(name));
        self.push_instrument(id)?;

        debug!(instrument = name, id = %id, "Added instrument");
        Ok(id)
    }

    /// Routes an instrument's voices to a bus. Voices already playing stay
    /// where they are.
    pub fn set_instrument_bus(
        &mut self,
        id: InstrumentId,
        bus: Option<BusId>,
    ) -> Result<(), EngineError> {
        self.check_instrument(id)?;
        if let Some(bus) = bus {
            self.check_bus(bus)?;
        }
        self.ensure_room()?;

        self.instruments[id.0].set_bus(bus);
        self.push_instrument(id)
    }

    pub fn add_layer(
        &mut self,
        id: InstrumentId,
        sample: Sample,
        velocity: u8,
    ) -> Result<(), EngineError> {
        self.add_layers(id, [(sample, velocity)])
    }

    /// Adds several samples in one change. Either all of them are added or,
    /// if any velocity is out of range, none are.
    pub fn add_layers<I>(&mut self, id: InstrumentId, layers: I) -> Result<(), EngineError>
    where
        I: IntoIterator<Item = (Sample, u8)>,
    {
        self.check_instrument(id)?;
        self.ensure_room()?;

        let mut updated = self.instruments[id.0].clone();
        let mut added = Vec::new();
        for (sample, velocity) in layers {
            updated.add_layer(sample.clone(), velocity)?;
            added.push(sample);
        }
        for sample in added.iter() {
            self.registry.register(sample);
        }

        self.instruments[id.0] = updated;
        self.push_instrument(id)
    }

    /// Decodes a sample file. Failures are reported to the notifier as well
    /// as returned.
    pub fn load_sample(&mut self, path: &Path) -> Result<Sample, EngineError> {
        let subject = format!("reading file {}", path.display());
        let decoded = match self.loader.load(path) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.notifier
                    .notify(Severity::Error, &subject, &e.to_string());
                return Err(e.into());
            }
        };

        if decoded.sample_rate != self.settings.sample_rate {
            self.notifier.notify(
                Severity::Warning,
                &subject,
                &format!(
                    "sample rate {} differs from the engine's {}, playing it unconverted",
                    decoded.sample_rate, self.settings.sample_rate
                ),
            );
        }
        Ok(decoded.sample)
    }

    /// Decodes a sample file and adds it to an instrument's layer for
    /// `velocity`. A file that won't decode is reported and not added.
    pub fn load_layer(
        &mut self,
        id: InstrumentId,
        path: &Path,
        velocity: u8,
    ) -> Result<(), EngineError> {
        self.check_instrument(id)?;
        let sample = self.load_sample(path)?;
        self.add_layer(id, sample, velocity)
    }

    /// Moves a sample to a different velocity layer of the same instrument.
    pub fn reassign_velocity(
        &mut self,
        id: InstrumentId,
        sample: &Sample,
        velocity: u8,
    ) -> Result<(), EngineError> {
        self.check_instrument(id)?;
        self.ensure_room()?;

        let mut updated = self.instruments[id.0].clone();
        updated.reassign_velocity(sample, velocity)?;
        self.instruments[id.0] = updated;
        self.push_instrument(id)
    }

    /// Removes every layer of an instrument. Its samples are freed by the
    /// next `purge_unused_samples` once nothing else uses them.
    pub fn clear_layers(&mut self, id: InstrumentId) -> Result<(), EngineError> {
        self.check_instrument(id)?;
        self.ensure_room()?;

        self.instruments[id.0].clear_layers();
        self.push_instrument(id)
    }

    /// Binds a key to an instrument. The key's previous binding is replaced,
    /// and the instrument is released from any other key it was bound to.
    pub fn bind_key(&mut self, key: u8, id: InstrumentId) -> Result<(), EngineError> {
        if key as usize >= KEY_COUNT {
            return Err(EngineError::InvalidKey(key));
        }
        self.check_instrument(id)?;
        self.ensure_room()?;

        for slot in self.keys.iter_mut() {
            if *slot == Some(id) {
                *slot = None;
            }
        }
        self.keys[key as usize] = Some(id);
        self.send(Command::BindKey {
            key,
            instrument: id,
        })
    }

    pub fn unbind_key(&mut self, key: u8) -> Result<(), EngineError> {
        if key as usize >= KEY_COUNT {
            return Err(EngineError::InvalidKey(key));
        }
        self.ensure_room()?;

        self.keys[key as usize] = None;
        self.send(Command::UnbindKey(key))
    }

    /// Plays a key as if a note arrived at the start of the next cycle.
    pub fn audition(&mut self, key: u8, velocity: u8) -> Result<(), EngineError> {
        if key as usize >= KEY_COUNT {
            return Err(EngineError::InvalidKey(key));
        }
        self.ensure_room()?;
        self.send(Command::Trigger(NoteEvent::new(key, velocity, 0)))
    }

    /// Drops the decode cache and frees every sample no instrument uses
    /// anymore. Returns how many samples were freed.
    pub fn purge_unused_samples(&mut self) -> usize {
        self.collect_retired();
        self.loader.clear();
        let purged = self.registry.purge_unused();
        if purged > 0 {
            info!(
                purged,
                remaining = self.registry.len(),
                memory_kb = self.registry.memory_usage() / 1024,
                "Purged unused samples"
            );
        }
        purged
    }

    /// Frees whatever the engine has handed back. Returns how many objects
    /// were freed.
    pub fn collect_retired(&mut self) -> usize {
        self.retired.try_iter().count()
    }

    pub fn bus(&self, id: BusId) -> Option<&BusLayout> {
        self.buses.get(id.0)
    }

    pub fn buses(&self) -> impl Iterator<Item = (BusId, &BusLayout)> {
        self.buses
            .iter()
            .enumerate()
            .map(|(index, layout)| (BusId(index), layout))
    }

    /// Finds the first bus with the given name.
    pub fn bus_id(&self, name: &str) -> Option<BusId> {
        self.buses
            .iter()
            .position(|layout| layout.name == name)
            .map(BusId)
    }

    pub fn instrument(&self, id: InstrumentId) -> Option<&Instrument> {
        self.instruments.get(id.0)
    }

    pub fn instruments(&self) -> impl Iterator<Item = (InstrumentId, &Instrument)> {
        self.instruments
            .iter()
            .enumerate()
            .map(|(index, instrument)| (InstrumentId(index), instrument))
    }

    /// Finds the first instrument with the given name.
    pub fn instrument_id(&self, name: &str) -> Option<InstrumentId> {
        self.instruments
            .iter()
            .position(|instrument| instrument.name() == name)
            .map(InstrumentId)
    }

    pub fn key_binding(&self, key: u8) -> Option<InstrumentId> {
        self.keys.get(key as usize).copied().flatten()
    }

    pub fn top_level(&self) -> &[BusId] {
        &self.top_level
    }

    pub fn registry(&self) -> &SampleRegistry {
        &self.registry
    }

    fn check_bus(&self, id: BusId) -> Result<(), EngineError> {
        if id.0 < self.buses.len() {
            Ok(())
        } else {
            Err(EngineError::UnknownBus(id))
        }
    }

    fn check_instrument(&self, id: InstrumentId) -> Result<(), EngineError> {
        if id.0 < self.instruments.len() {
            Ok(())
        } else {
            Err(EngineError::UnknownInstrument(id))
        }
    }

    /// Makes sure the next command will fit in the queue. The controller is
    /// the only sender, so room seen here is still there when sending.
    fn ensure_room(&mut self) -> Result<(), EngineError> {
        self.collect_retired();
        if self.commands.is_full() {
            return Err(EngineError::QueueFull);
        }
        Ok(())
    }

    fn push_instrument(&mut self, id: InstrumentId) -> Result<(), EngineError> {
        let instrument = Box::new(self.instruments[id.0].clone());
        self.send(Command::SetInstrument { id, instrument })
    }

    fn send(&self, command: Command) -> Result<(), EngineError> {
        self.commands.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => EngineError::QueueFull,
            TrySendError::Disconnected(_) => EngineError::Disconnected,
        })
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("buses", &self.buses.len())
            .field("instruments", &self.instruments.len())
            .field("top_level", &self.top_level)
            .field("loader", &self.loader)
            .field("registered_samples", &self.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{self, Engine};
    use crate::notify::RecordingNotifier;
    use crate::samples::SampleError;
    use crate::testutil::write_wav;

    fn setup(settings: EngineSettings) -> (Controller, Engine, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let (controller, engine) = engine::new(settings, notifier.clone());
        (controller, engine, notifier)
    }

    fn small() -> EngineSettings {
        EngineSettings {
            buffer_size: 4,
            max_voices: 4,
            max_buses: 4,
            max_instruments: 2,
            command_queue_size: 16,
            ..Default::default()
        }
    }

    #[test]
    fn test_changes_reach_engine() {
        let (mut controller, mut engine, _) = setup(small());
        let master = controller.add_bus("master", true).unwrap();
        controller.add_top_level(master).unwrap();
        controller.set_gain(master, 0.5).unwrap();
        let kick = controller.add_instrument("kick").unwrap();
        controller.set_instrument_bus(kick, Some(master)).unwrap();
        controller
            .add_layer(kick, Sample::new(vec![1.0, 1.0]), 0)
            .unwrap();
        controller.bind_key(36, kick).unwrap();

        engine.process(2, &[NoteEvent::new(36, 90, 0)]);
        assert_eq!(&engine.bus_output(master).unwrap()[..2], &[0.5, 0.5]);
        assert_eq!(controller.stats().voices_started(), 1);
        assert_eq!(engine.key_binding(36), Some(kick));
    }

    #[test]
    fn test_audition_plays_at_next_cycle() {
        let (mut controller, mut engine, _) = setup(small());
        let master = controller.add_bus("master", true).unwrap();
        controller.add_top_level(master).unwrap();
        let kick = controller.add_instrument("kick").unwrap();
        controller.set_instrument_bus(kick, Some(master)).unwrap();
        controller.add_layer(kick, Sample::new(vec![0.25]), 0).unwrap();
        controller.bind_key(36, kick).unwrap();
        controller.audition(36, 127).unwrap();

        engine.process(4, &[]);
        assert_eq!(engine.bus_output(master).unwrap(), &[0.25, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_downstream_loop_rejected() {
        let (mut controller, _engine, _) = setup(small());
        let a = controller.add_bus("a", false).unwrap();
        let b = controller.add_bus("b", false).unwrap();
        let c = controller.add_bus("c", true).unwrap();
        controller.set_downstream(a, Some(b)).unwrap();
        controller.set_downstream(b, Some(c)).unwrap();

        assert!(matches!(
            controller.set_downstream(c, Some(a)),
            Err(EngineError::DownstreamLoop { .. })
        ));
        assert!(matches!(
            controller.set_downstream(a, Some(a)),
            Err(EngineError::DownstreamLoop { .. })
        ));
        assert_eq!(controller.bus(c).unwrap().downstream, None);

        // Clearing and re-pointing is fine.
        controller.set_downstream(a, None).unwrap();
        controller.set_downstream(c, Some(a)).unwrap();
    }

    #[test]
    fn test_retired_drained_before_each_send() {
        let (mut controller, mut engine, _) = setup(EngineSettings {
            command_queue_size: 1,
            ..small()
        });
        let kick = controller.add_instrument("kick").unwrap();
        engine.apply_pending();
        controller.collect_retired();

        // Each layer change replaces the engine's instrument, sending the old
        // one back. The way back never holds more than one.
        for i in 0..5 {
            controller
                .add_layer(kick, Sample::new(vec![i as f32]), 0)
                .unwrap();
            assert!(controller.retired.is_empty());
            engine.apply_pending();
            assert_eq!(controller.retired.len(), 1);
        }
        assert_eq!(controller.collect_retired(), 1);
    }

    #[test]
    fn test_source_validation() {
        let (mut controller, _engine, _) = setup(small());
        let a = controller.add_bus("a", true).unwrap();
        let b = controller.add_bus("b", false).unwrap();

        assert!(matches!(
            controller.add_source(a, a),
            Err(EngineError::SelfSource(_))
        ));
        controller.add_source(a, b).unwrap();
        assert!(matches!(
            controller.add_source(a, b),
            Err(EngineError::DuplicateSource { .. })
        ));
        assert!(matches!(
            controller.add_source(a, BusId(9)),
            Err(EngineError::UnknownBus(_))
        ));
        assert_eq!(controller.bus(a).unwrap().sources, vec![b]);

        controller.add_top_level(a).unwrap();
        assert!(matches!(
            controller.add_top_level(a),
            Err(EngineError::AlreadyTopLevel(_))
        ));
    }

    #[test]
    fn test_capacity_limits() {
        let (mut controller, _engine, _) = setup(small());
        for i in 0..4 {
            controller.add_bus(&format!("bus{}", i), false).unwrap();
        }
        assert!(matches!(
            controller.add_bus("extra", false),
            Err(EngineError::TooManyBuses(4))
        ));

        controller.add_instrument("one").unwrap();
        controller.add_instrument("two").unwrap();
        assert!(matches!(
            controller.add_instrument("three"),
            Err(EngineError::TooManyInstruments(2))
        ));
    }

    #[test]
    fn test_queue_full_leaves_layout_alone() {
        let settings = EngineSettings {
            command_queue_size: 2,
            ..small()
        };
        let (mut controller, mut engine, _) = setup(settings);
        let a = controller.add_bus("a", true).unwrap();
        controller.set_gain(a, 0.5).unwrap();
        assert!(matches!(
            controller.set_gain(a, 0.25),
            Err(EngineError::QueueFull)
        ));
        assert_eq!(controller.bus(a).unwrap().gain, 0.5);

        engine.apply_pending();
        controller.set_gain(a, 0.25).unwrap();
        engine.apply_pending();
        assert_eq!(engine.graph().bus(a).unwrap().gain(), 0.25);
    }

    #[test]
    fn test_invalid_inputs() {
        let (mut controller, _engine, _) = setup(small());
        let a = controller.add_bus("a", true).unwrap();
        let kick = controller.add_instrument("kick").unwrap();

        assert!(matches!(
            controller.set_gain(a, f32::NAN),
            Err(EngineError::InvalidGain(_))
        ));
        assert!(matches!(
            controller.bind_key(128, kick),
            Err(EngineError::InvalidKey(128))
        ));
        assert!(matches!(
            controller.bind_key(1, InstrumentId(5)),
            Err(EngineError::UnknownInstrument(_))
        ));
        assert!(matches!(
            controller.add_layer(kick, Sample::new(vec![1.0]), 128),
            Err(EngineError::Sample(SampleError::VelocityOutOfRange(128)))
        ));
        assert_eq!(controller.instrument(kick).unwrap().layer_count(), 0);
    }

    #[test]
    fn test_add_layers_is_all_or_nothing() {
        let (mut controller, _engine, _) = setup(small());
        let kick = controller.add_instrument("kick").unwrap();
        let result = controller.add_layers(
            kick,
            [
                (Sample::new(vec![1.0]), 10),
                (Sample::new(vec![1.0]), 200),
            ],
        );
        assert!(result.is_err());
        assert_eq!(controller.instrument(kick).unwrap().layer_count(), 0);
        assert!(controller.registry().is_empty());
    }

    #[test]
    fn test_bind_key_moves_instrument() {
        let (mut controller, mut engine, _) = setup(small());
        let kick = controller.add_instrument("kick").unwrap();
        controller.bind_key(36, kick).unwrap();
        controller.bind_key(35, kick).unwrap();
        assert_eq!(controller.key_binding(36), None);
        assert_eq!(controller.key_binding(35), Some(kick));

        engine.apply_pending();
        assert_eq!(engine.key_binding(36), None);
        assert_eq!(engine.key_binding(35), Some(kick));

        controller.unbind_key(35).unwrap();
        engine.apply_pending();
        assert_eq!(engine.key_binding(35), None);
    }

    #[test]
    fn test_reassign_velocity_reaches_engine() {
        let (mut controller, mut engine, _) = setup(small());
        let snare = controller.add_instrument("snare").unwrap();
        let soft = Sample::new(vec![0.1]);
        let hard = Sample::new(vec![0.9]);
        controller
            .add_layers(snare, [(soft.clone(), 0), (hard.clone(), 0)])
            .unwrap();
        controller.reassign_velocity(snare, &hard, 100).unwrap();

        engine.apply_pending();
        let instrument = engine.instrument(snare).unwrap();
        assert_eq!(instrument.velocities(), &[0, 100]);
        assert!(instrument.layer(100).unwrap().contains(&hard));

        assert!(matches!(
            controller.reassign_velocity(snare, &Sample::new(vec![0.0]), 50),
            Err(EngineError::Sample(SampleError::UnknownSample))
        ));
    }

    #[test]
    fn test_load_layer_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, _engine, notifier) = setup(small());
        let kick = controller.add_instrument("kick").unwrap();

        let missing = dir.path().join("missing.wav");
        assert!(controller.load_layer(kick, &missing, 0).is_err());
        let errors = notifier.with_severity(Severity::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].subject,
            format!("reading file {}", missing.display())
        );
        assert_eq!(controller.instrument(kick).unwrap().layer_count(), 0);

        let path = dir.path().join("kick.wav");
        write_wav(&path, 1, 44100, &[0.5, 0.25]).unwrap();
        controller.load_layer(kick, &path, 0).unwrap();
        assert_eq!(controller.instrument(kick).unwrap().layer_count(), 1);
        // 44.1k against the default 48k engine.
        assert_eq!(notifier.with_severity(Severity::Warning).len(), 1);
    }

    #[test]
    fn test_purge_unused_samples() {
        let (mut controller, mut engine, _) = setup(small());
        let kick = controller.add_instrument("kick").unwrap();
        controller
            .add_layer(kick, Sample::new(vec![1.0]), 0)
            .unwrap();
        engine.apply_pending();
        assert_eq!(controller.purge_unused_samples(), 0);
        assert_eq!(controller.registry().len(), 1);

        // The engine's previous copy of the instrument still holds the
        // sample until it has been handed back.
        controller.clear_layers(kick).unwrap();
        assert_eq!(controller.purge_unused_samples(), 0);

        engine.apply_pending();
        assert_eq!(controller.purge_unused_samples(), 1);
        assert!(controller.registry().is_empty());
    }
}
