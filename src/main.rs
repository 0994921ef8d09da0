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
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use tdrum::config;
use tdrum::engine::{self, Controller, KEY_COUNT};
use tdrum::host;
use tdrum::mixer::BusId;
use tdrum::notify::{RecordingNotifier, Severity, TracingNotifier};
use tracing::{debug, info};

/// Notes that can wait for the audio thread before new ones are dropped.
const NOTE_QUEUE_SIZE: usize = 1024;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A MIDI-triggered drum sampler."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the available MIDI input devices.
    MidiDevices {},
    /// Loads a kit and reports its buses, instruments and any problems.
    Verify {
        /// The path to the kit file.
        kit_path: String,
    },
    /// Plays a kit from MIDI input through an audio device.
    Play {
        /// The path to the kit file.
        kit_path: String,
        /// The audio device to play through. Defaults to the system default.
        #[arg[short, long]]
        device: Option<String>,
        /// The MIDI input to take notes from.
        #[arg[short, long]]
        midi_device: Option<String>,
        /// The bus sent to the audio device. Defaults to the first top-level
        /// bus with an output.
        #[arg[short, long]]
        output_bus: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = host::cpal::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::MidiDevices {} => {
            let devices = host::midi::list_ports()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Verify { kit_path } => {
            let kit_path = PathBuf::from(kit_path);
            let kit = config::load_kit(&kit_path)?;
            let notifier = Arc::new(RecordingNotifier::new());
            let (mut controller, _engine) = engine::new(kit.settings().clone(), notifier.clone());
            let report = kit.apply(&mut controller, base_path(&kit_path))?;

            print_kit(&controller);
            println!(
                "\nLoaded {} layers ({} skipped), {} KB of sample data.",
                report.layers,
                report.skipped_layers,
                controller.registry().memory_usage() / 1024
            );

            let notifications = notifier.notifications();
            if !notifications.is_empty() {
                println!("\nProblems:");
                for n in notifications.iter() {
                    println!("- [{}] {}: {}", n.severity, n.subject, n.detail);
                }
            }
            let errors = notifier.with_severity(Severity::Error).len();
            if errors > 0 {
                return Err(format!("kit {} has {} errors", kit_path.display(), errors).into());
            }
        }
        Commands::Play {
            kit_path,
            device,
            midi_device,
            output_bus,
        } => {
            let kit_path = PathBuf::from(kit_path);
            let kit = config::load_kit(&kit_path)?;
            let (mut controller, mut engine) =
                engine::new(kit.settings().clone(), Arc::new(TracingNotifier));
            kit.apply(&mut controller, base_path(&kit_path))?;
            engine.apply_pending();
            controller.collect_retired();

            let output_bus = pick_output_bus(&controller, output_bus.as_deref())?;
            let (note_tx, note_rx) = crossbeam_channel::bounded(NOTE_QUEUE_SIZE);
            let _midi = midi_device
                .as_deref()
                .map(|name| host::midi::connect(name, note_tx.clone()))
                .transpose()?;
            let stream = host::cpal::play(
                device.as_deref(),
                kit.settings().sample_rate,
                engine,
                output_bus,
                note_rx,
            )?;
            info!(
                kit = kit_path.display().to_string(),
                device = stream.device(),
                "Playing"
            );

            loop {
                thread::sleep(Duration::from_secs(1));
                controller.collect_retired();
                let stats = controller.stats();
                debug!(
                    cycles = stats.cycles(),
                    active_voices = stats.active_voices(),
                    voices_started = stats.voices_started(),
                    voices_stolen = stats.voices_stolen(),
                    triggers_ignored = stats.triggers_ignored(),
                    "Engine stats"
                );
            }
        }
    }

    Ok(())
}

/// Layer paths in a kit are relative to the kit file.
fn base_path(kit_path: &Path) -> &Path {
    kit_path.parent().unwrap_or(Path::new("."))
}

fn pick_output_bus(controller: &Controller, name: Option<&str>) -> Result<BusId, Box<dyn Error>> {
    let id = match name {
        Some(name) => controller
            .bus_id(name)
            .ok_or_else(|| format!("no bus named {}", name))?,
        None => controller
            .top_level()
            .iter()
            .copied()
            .find(|id| controller.bus(*id).is_some_and(|bus| bus.has_output))
            .or_else(|| {
                controller
                    .buses()
                    .find(|(_, bus)| bus.has_output)
                    .map(|(id, _)| id)
            })
            .ok_or("kit has no bus with an output")?,
    };

    match controller.bus(id) {
        Some(bus) if bus.has_output => Ok(id),
        _ => Err(format!("bus {} has no output", id).into()),
    }
}

fn print_kit(controller: &Controller) {
    println!("Buses:");
    for (id, bus) in controller.buses() {
        let top_level = if controller.top_level().contains(&id) {
            ", top level"
        } else {
            ""
        };
        let output = if bus.has_output { ", output" } else { "" };
        println!("- {} (gain={}{}{})", bus.name, bus.gain, output, top_level);
        if let Some(downstream) = bus.downstream.and_then(|d| controller.bus(d)) {
            println!("  downstream: {}", downstream.name);
        }
        for source in bus.sources.iter().filter_map(|s| controller.bus(*s)) {
            println!("  source: {}", source.name);
        }
    }

    println!("\nInstruments:");
    for (id, instrument) in controller.instruments() {
        let key = (0..KEY_COUNT as u8).find(|key| controller.key_binding(*key) == Some(id));
        let bus = instrument
            .bus()
            .and_then(|bus| controller.bus(bus))
            .map_or("none", |bus| bus.name.as_str());
        match key {
            Some(key) => println!("- {} (note={}, bus={})", instrument.name(), key, bus),
            None => println!("- {} (unbound, bus={})", instrument.name(), bus),
        }
        for velocity in instrument.velocities() {
            let count = instrument.layer(*velocity).map_or(0, |layer| layer.len());
            println!("  velocity {}: {} samples", velocity, count);
        }
    }
}
