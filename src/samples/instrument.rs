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

//! Velocity layering for a single instrument.

use std::collections::BTreeMap;
use std::fmt;

use super::error::SampleError;
use super::sample::{RoundRobinSample, Sample};
use crate::mixer::BusId;

/// Highest valid MIDI velocity.
pub const MAX_VELOCITY: u8 = 127;

/// Identifies an instrument inside an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentId(pub(crate) usize);

impl InstrumentId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instrument#{}", self.0)
    }
}

/// An instrument maps trigger velocities onto layers of samples.
///
/// Each layer is keyed by the lowest velocity that selects it. A velocity
/// selects the layer with the greatest threshold at or below it; velocities
/// under every threshold fall back to the lowest layer.
#[derive(Clone)]
pub struct Instrument {
    name: String,
    layers: BTreeMap<u8, RoundRobinSample>,
    /// Sorted ascending, mirrors the keys of `layers`.
    velocities: Vec<u8>,
    bus: Option<BusId>,
}

impl Instrument {
    pub fn new(name: &str) -> Instrument {
        Instrument {
            name: name.to_string(),
            layers: BTreeMap::new(),
            velocities: Vec::new(),
            bus: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bus that voices of this instrument are attached to.
    pub fn bus(&self) -> Option<BusId> {
        self.bus
    }

    pub fn set_bus(&mut self, bus: Option<BusId>) {
        self.bus = bus;
    }

    /// Adds a sample to the layer for `velocity`, creating the layer if needed.
    pub fn add_layer(&mut self, sample: Sample, velocity: u8) -> Result<(), SampleError> {
        if velocity > MAX_VELOCITY {
            return Err(SampleError::VelocityOutOfRange(velocity));
        }

        self.layers.entry(velocity).or_default().push(sample);
        if let Err(pos) = self.velocities.binary_search(&velocity) {
            self.velocities.insert(pos, velocity);
        }
        Ok(())
    }

    /// Picks the next sample for the given velocity. Returns None when the
    /// instrument has no layers.
    pub fn resolve(&mut self, velocity: u8) -> Option<Sample> {
        let threshold = self.threshold_for(velocity)?;
        self.layers
            .get_mut(&threshold)
            .and_then(|layer| layer.next_sample())
            .cloned()
    }

    /// Returns the layer threshold that `velocity` selects.
    pub fn threshold_for(&self, velocity: u8) -> Option<u8> {
        let lowest = *self.velocities.first()?;
        let index = self.velocities.partition_point(|v| *v <= velocity);
        if index == 0 {
            Some(lowest)
        } else {
            Some(self.velocities[index - 1])
        }
    }

    /// Moves a previously added sample to the layer for `velocity`. The old
    /// layer is removed once it has no samples left.
    pub fn reassign_velocity(&mut self, sample: &Sample, velocity: u8) -> Result<(), SampleError> {
        if velocity > MAX_VELOCITY {
            return Err(SampleError::VelocityOutOfRange(velocity));
        }

        let old_velocity = self
            .layers
            .iter()
            .find(|(_, layer)| layer.contains(sample))
            .map(|(v, _)| *v)
            .ok_or(SampleError::UnknownSample)?;

        if old_velocity == velocity {
            return Ok(());
        }

        if let Some(layer) = self.layers.get_mut(&old_velocity) {
            layer.remove(sample);
            if layer.is_empty() {
                self.layers.remove(&old_velocity);
                if let Ok(pos) = self.velocities.binary_search(&old_velocity) {
                    self.velocities.remove(pos);
                }
            }
        }

        self.add_layer(sample.clone(), velocity)
    }

    /// Removes every layer. The instrument keeps its name and bus.
    pub fn clear_layers(&mut self) {
        self.layers.clear();
        self.velocities.clear();
    }

    /// Registered velocity thresholds, ascending.
    pub fn velocities(&self) -> &[u8] {
        &self.velocities
    }

    /// Returns the layer registered at exactly `velocity`.
    pub fn layer(&self, velocity: u8) -> Option<&RoundRobinSample> {
        self.layers.get(&velocity)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Iterates over every sample in every layer.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.layers.values().flat_map(|layer| layer.iter())
    }
}

impl fmt::Debug for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrument")
            .field("name", &self.name)
            .field("velocities", &self.velocities)
            .field("bus", &self.bus)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(tag: f32) -> Sample {
        Sample::new(vec![tag])
    }

    fn assert_synchronized(instrument: &Instrument) {
        let keys: Vec<u8> = instrument.layers.keys().copied().collect();
        assert_eq!(keys, instrument.velocities);
        assert!(instrument.layers.values().all(|l| !l.is_empty()));
    }

    #[test]
    fn test_velocity_layers() {
        let mut instrument = Instrument::new("snare");
        instrument.add_layer(tagged(100.0), 100).unwrap();
        instrument.add_layer(tagged(20.0), 20).unwrap();
        instrument.add_layer(tagged(60.0), 60).unwrap();
        assert_eq!(instrument.velocities(), &[20, 60, 100]);
        assert_synchronized(&instrument);

        let resolve = |i: &mut Instrument, v: u8| i.resolve(v).unwrap().frame(0);
        assert_eq!(resolve(&mut instrument, 10), 20.0);
        assert_eq!(resolve(&mut instrument, 20), 20.0);
        assert_eq!(resolve(&mut instrument, 60), 60.0);
        assert_eq!(resolve(&mut instrument, 95), 60.0);
        assert_eq!(resolve(&mut instrument, 127), 100.0);
    }

    #[test]
    fn test_resolve_matches_threshold_rule() {
        let thresholds = [5u8, 33, 34, 90, 127];
        let mut instrument = Instrument::new("tom");
        for t in thresholds {
            instrument.add_layer(tagged(t as f32), t).unwrap();
        }

        for velocity in 0..=127u8 {
            let expected = thresholds
                .iter()
                .copied()
                .filter(|t| *t <= velocity)
                .max()
                .unwrap_or(thresholds[0]);
            let sample = instrument.resolve(velocity).unwrap();
            assert_eq!(sample.frame(0), expected as f32, "velocity {}", velocity);
        }
    }

    #[test]
    fn test_no_layers() {
        let mut instrument = Instrument::new("empty");
        assert!(instrument.resolve(64).is_none());
        assert!(instrument.threshold_for(64).is_none());

        instrument.add_layer(Sample::new(vec![1.0]), 10).unwrap();
        instrument.clear_layers();
        assert!(instrument.resolve(64).is_none());
        assert!(instrument.velocities().is_empty());
    }

    #[test]
    fn test_round_robin_within_layer() {
        let mut instrument = Instrument::new("hat");
        let samples: Vec<Sample> = (0..4).map(|i| tagged(i as f32)).collect();
        for s in &samples {
            instrument.add_layer(s.clone(), 64).unwrap();
        }
        assert_eq!(instrument.layer_count(), 1);

        for expected in samples.iter().chain(samples.iter()) {
            let sample = instrument.resolve(100).unwrap();
            assert!(sample.ptr_eq(expected));
        }
    }

    #[test]
    fn test_velocity_out_of_range() {
        let mut instrument = Instrument::new("kick");
        assert!(matches!(
            instrument.add_layer(tagged(0.0), 128),
            Err(SampleError::VelocityOutOfRange(128))
        ));
        assert!(instrument.velocities().is_empty());
    }

    #[test]
    fn test_reassign_velocity() {
        let mut instrument = Instrument::new("snare");
        let soft = tagged(1.0);
        let hard = tagged(2.0);
        let ghost = tagged(3.0);
        instrument.add_layer(soft.clone(), 0).unwrap();
        instrument.add_layer(ghost.clone(), 0).unwrap();
        instrument.add_layer(hard.clone(), 100).unwrap();

        // Moving one sample out of a shared layer keeps the layer.
        instrument.reassign_velocity(&ghost, 40).unwrap();
        assert_eq!(instrument.velocities(), &[0, 40, 100]);
        assert_eq!(instrument.layer(0).unwrap().len(), 1);
        assert_synchronized(&instrument);

        // Moving the last sample removes the layer and its threshold.
        instrument.reassign_velocity(&hard, 40).unwrap();
        assert_eq!(instrument.velocities(), &[0, 40]);
        assert!(instrument.layer(100).is_none());
        assert_eq!(instrument.layer(40).unwrap().len(), 2);
        assert_synchronized(&instrument);

        assert!(instrument.resolve(127).unwrap().ptr_eq(&ghost));
        assert!(instrument.resolve(127).unwrap().ptr_eq(&hard));
    }

    #[test]
    fn test_reassign_unknown_sample() {
        let mut instrument = Instrument::new("snare");
        instrument.add_layer(tagged(1.0), 10).unwrap();
        assert!(matches!(
            instrument.reassign_velocity(&tagged(1.0), 20),
            Err(SampleError::UnknownSample)
        ));
        assert_eq!(instrument.velocities(), &[10]);
    }

    #[test]
    fn test_reassign_same_velocity_is_noop() {
        let mut instrument = Instrument::new("snare");
        let s = tagged(1.0);
        instrument.add_layer(s.clone(), 10).unwrap();
        instrument.reassign_velocity(&s, 10).unwrap();
        assert_eq!(instrument.velocities(), &[10]);
        assert_eq!(instrument.layer(10).unwrap().len(), 1);
    }
}
