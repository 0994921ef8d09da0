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
use std::collections::{HashMap, HashSet};
use std::path::Path;

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::ConfigError;
use super::settings::EngineSettings;
use crate::engine::{Controller, EngineError};
use crate::mixer::{BusId, DEFAULT_GAIN};

fn default_gain() -> f32 {
    DEFAULT_GAIN
}

/// A YAML representation of a drum kit: the engine's sizes, its buses and the
/// instruments that play through them.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Kit {
    #[serde(default)]
    engine: EngineSettings,

    /// Buses are created in the order listed, so the first bus gets the first id.
    #[serde(default)]
    buses: Vec<BusDefinition>,

    #[serde(default)]
    instruments: Vec<InstrumentDefinition>,
}

/// A YAML representation of a bus.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct BusDefinition {
    name: String,

    #[serde(default = "default_gain")]
    gain: f32,

    /// Gives the bus a dedicated output buffer.
    #[serde(default)]
    output: bool,

    /// Mix this bus directly every cycle.
    #[serde(default)]
    top_level: bool,

    downstream: Option<String>,

    /// Names of the buses this one sums.
    #[serde(default)]
    sources: Vec<String>,
}

/// A YAML representation of an instrument.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct InstrumentDefinition {
    name: String,

    bus: Option<String>,

    /// The MIDI note that plays this instrument.
    note: Option<u8>,

    #[serde(default)]
    layers: Vec<LayerDefinition>,
}

/// A YAML representation of one sample in a velocity layer.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct LayerDefinition {
    /// Path to the sample, relative to the kit file.
    file: String,

    /// Lowest velocity that selects this layer.
    #[serde(default)]
    velocity: u8,
}

/// What applying a kit produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KitReport {
    pub buses: usize,
    pub instruments: usize,
    pub layers: usize,
    /// Layer files that could not be loaded. Each was reported to the
    /// controller's notifier.
    pub skipped_layers: usize,
}

impl Kit {
    /// Parse a kit from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Kit, ConfigError> {
        let kit = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Kit>()?;
        kit.engine.validate()?;
        Ok(kit)
    }

    /// Parse a kit from YAML text.
    pub fn parse(yaml: &str) -> Result<Kit, ConfigError> {
        let kit = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<Kit>()?;
        kit.engine.validate()?;
        Ok(kit)
    }

    /// The engine settings the kit asks for.
    pub fn settings(&self) -> &EngineSettings {
        &self.engine
    }

    pub fn buses(&self) -> &[BusDefinition] {
        &self.buses
    }

    pub fn instruments(&self) -> &[InstrumentDefinition] {
        &self.instruments
    }

    /// Checks that bus names are unique and every bus reference resolves.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for bus in self.buses.iter() {
            if !names.insert(bus.name.as_str()) {
                return Err(ConfigError::DuplicateBus(bus.name.clone()));
            }
        }

        let check = |referenced_by: &str, name: &str| {
            if names.contains(name) {
                Ok(())
            } else {
                Err(ConfigError::UnknownBus {
                    referenced_by: referenced_by.to_string(),
                    name: name.to_string(),
                })
            }
        };
        for bus in self.buses.iter() {
            if let Some(downstream) = &bus.downstream {
                check(&bus.name, downstream)?;
            }
            for source in bus.sources.iter() {
                check(&bus.name, source)?;
            }
        }

        let mut instruments = HashSet::new();
        for instrument in self.instruments.iter() {
            if !instruments.insert(instrument.name.as_str()) {
                return Err(ConfigError::DuplicateInstrument(instrument.name.clone()));
            }
            if let Some(bus) = &instrument.bus {
                check(&instrument.name, bus)?;
            }
        }
        Ok(())
    }

    /// Builds the kit through the controller. Layer files are resolved
    /// against `base_path`. A layer that fails to load is skipped; anything
    /// the engine refuses stops the load.
    pub fn apply(
        &self,
        controller: &mut Controller,
        base_path: &Path,
    ) -> Result<KitReport, ConfigError> {
        self.validate()?;
        let mut report = KitReport::default();

        let mut bus_ids: HashMap<&str, BusId> = HashMap::new();
        for bus in self.buses.iter() {
            let id = controller.add_bus(&bus.name, bus.output)?;
            if bus.gain != DEFAULT_GAIN {
                controller.set_gain(id, bus.gain)?;
            }
            bus_ids.insert(bus.name.as_str(), id);
            report.buses += 1;
        }

        // Every bus exists now, so links can point anywhere in the list.
        for bus in self.buses.iter() {
            let id = lookup(&bus_ids, &bus.name, &bus.name)?;
            if let Some(downstream) = &bus.downstream {
                let downstream = lookup(&bus_ids, &bus.name, downstream)?;
                controller.set_downstream(id, Some(downstream))?;
            }
            for source in bus.sources.iter() {
                controller.add_source(id, lookup(&bus_ids, &bus.name, source)?)?;
            }
            if bus.top_level {
                controller.add_top_level(id)?;
            }
        }

        for definition in self.instruments.iter() {
            let id = controller.add_instrument(&definition.name)?;
            if let Some(bus) = &definition.bus {
                let bus = lookup(&bus_ids, &definition.name, bus)?;
                controller.set_instrument_bus(id, Some(bus))?;
            }

            let mut layers = Vec::with_capacity(definition.layers.len());
            for layer in definition.layers.iter() {
                match controller.load_sample(&base_path.join(&layer.file)) {
                    Ok(sample) => layers.push((sample, layer.velocity)),
                    Err(EngineError::Sample(e)) => {
                        warn!(
                            instrument = definition.name,
                            file = layer.file,
                            err = %e,
                            "Skipping layer"
                        );
                        report.skipped_layers += 1;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            if !layers.is_empty() {
                report.layers += layers.len();
                controller.add_layers(id, layers)?;
            }

            if let Some(note) = definition.note {
                controller.bind_key(note, id)?;
            }
            report.instruments += 1;
        }

        info!(
            buses = report.buses,
            instruments = report.instruments,
            layers = report.layers,
            skipped = report.skipped_layers,
            "Kit loaded"
        );
        Ok(report)
    }
}

fn lookup(
    bus_ids: &HashMap<&str, BusId>,
    referenced_by: &str,
    name: &str,
) -> Result<BusId, ConfigError> {
    bus_ids
        .get(name)
        .copied()
        .ok_or_else(|| ConfigError::UnknownBus {
            referenced_by: referenced_by.to_string(),
            name: name.to_string(),
        })
}

impl BusDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn output(&self) -> bool {
        self.output
    }

    pub fn top_level(&self) -> bool {
        self.top_level
    }

    pub fn downstream(&self) -> Option<&str> {
        self.downstream.as_deref()
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

impl InstrumentDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bus(&self) -> Option<&str> {
        self.bus.as_deref()
    }

    pub fn note(&self) -> Option<u8> {
        self.note
    }

    pub fn layers(&self) -> &[LayerDefinition] {
        &self.layers
    }
}

impl LayerDefinition {
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine;
    use crate::notify::{RecordingNotifier, Severity};

    #[test]
    fn test_parse_kit() {
        let kit = Kit::parse(
            r#"
            engine:
              sample_rate: 44100
              buffer_size: 256
            buses:
              - name: master
                output: true
                top_level: true
                sources: [drums]
              - name: drums
                gain: 0.8
                downstream: master
            instruments:
              - name: snare
                bus: drums
                note: 38
                layers:
                  - { file: snare-soft.wav, velocity: 0 }
                  - { file: snare-hard.wav, velocity: 100 }
              - name: silent
        "#,
        )
        .unwrap();

        assert_eq!(kit.settings().sample_rate, 44100);
        assert_eq!(kit.settings().buffer_size, 256);
        assert_eq!(kit.settings().max_voices, 64);

        let master = &kit.buses()[0];
        assert_eq!(master.name(), "master");
        assert_eq!(master.gain(), DEFAULT_GAIN);
        assert!(master.output());
        assert!(master.top_level());
        assert_eq!(master.sources(), &["drums".to_string()]);

        let drums = &kit.buses()[1];
        assert_eq!(drums.gain(), 0.8);
        assert_eq!(drums.downstream(), Some("master"));
        assert!(!drums.output());

        let snare = &kit.instruments()[0];
        assert_eq!(snare.bus(), Some("drums"));
        assert_eq!(snare.note(), Some(38));
        assert_eq!(snare.layers()[1].file(), "snare-hard.wav");
        assert_eq!(snare.layers()[1].velocity(), 100);

        let silent = &kit.instruments()[1];
        assert!(silent.bus().is_none());
        assert!(silent.note().is_none());
        assert!(silent.layers().is_empty());

        assert!(kit.validate().is_ok());
    }

    #[test]
    fn test_invalid_engine_settings() {
        let result = Kit::parse(
            r#"
            engine:
              buffer_size: 0
        "#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidSetting { .. })));
    }

    #[test]
    fn test_validate_references() {
        let duplicate = Kit::parse(
            r#"
            buses:
              - name: master
              - name: master
        "#,
        )
        .unwrap();
        assert!(matches!(
            duplicate.validate(),
            Err(ConfigError::DuplicateBus(name)) if name == "master"
        ));

        let unknown = Kit::parse(
            r#"
            buses:
              - name: master
            instruments:
              - name: kick
                bus: drums
        "#,
        )
        .unwrap();
        match unknown.validate() {
            Err(ConfigError::UnknownBus {
                referenced_by,
                name,
            }) => {
                assert_eq!(referenced_by, "kick");
                assert_eq!(name, "drums");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let unknown_source = Kit::parse(
            r#"
            buses:
              - name: master
                sources: [nowhere]
        "#,
        )
        .unwrap();
        assert!(matches!(
            unknown_source.validate(),
            Err(ConfigError::UnknownBus { .. })
        ));
    }

    #[test]
    fn test_apply_skips_bad_layers() {
        let dir = tempfile::tempdir().unwrap();
        let kit = Kit::parse(
            r#"
            buses:
              - name: master
                output: true
                top_level: true
            instruments:
              - name: kick
                bus: master
                note: 36
                layers:
                  - file: missing.wav
        "#,
        )
        .unwrap();

        let notifier = Arc::new(RecordingNotifier::new());
        let (mut controller, _engine) = engine::new(kit.settings().clone(), notifier.clone());
        let report = kit.apply(&mut controller, dir.path()).unwrap();

        assert_eq!(
            report,
            KitReport {
                buses: 1,
                instruments: 1,
                layers: 0,
                skipped_layers: 1,
            }
        );
        assert_eq!(notifier.with_severity(Severity::Error).len(), 1);

        let kick = controller.instrument_id("kick").unwrap();
        assert_eq!(controller.key_binding(36), Some(kick));
        assert_eq!(controller.instrument(kick).unwrap().layer_count(), 0);
        assert_eq!(controller.top_level(), &[controller.bus_id("master").unwrap()]);
    }

    #[test]
    fn test_apply_refuses_downstream_loop() {
        let dir = tempfile::tempdir().unwrap();
        let kit = Kit::parse(
            r#"
            buses:
              - name: a
                downstream: b
              - name: b
                downstream: a
        "#,
        )
        .unwrap();

        let (mut controller, _engine) =
            engine::new(kit.settings().clone(), Arc::new(RecordingNotifier::new()));
        assert!(matches!(
            kit.apply(&mut controller, dir.path()),
            Err(ConfigError::Engine(EngineError::DownstreamLoop { .. }))
        ));
    }
}
