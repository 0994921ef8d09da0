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
use std::fmt;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use crossbeam_channel::Receiver;
use tracing::{error, info};

use super::thread_priority::CallbackPriority;
use crate::engine::{Engine, NoteEvent};
use crate::mixer::BusId;

/// Most note events taken from the queue in one callback.
const MAX_EVENTS_PER_CALLBACK: usize = 256;

/// An output device that can be played through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputDevice {
    pub name: String,
    pub host: String,
    pub max_channels: u16,
}

impl fmt::Display for OutputDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name, self.max_channels, self.host
        )
    }
}

/// Lists every output device on every available host, sorted by name.
pub fn list_devices() -> Result<Vec<OutputDevice>, Box<dyn Error>> {
    let mut devices = Vec::new();
    for host_id in cpal::available_hosts() {
        let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
            Ok(host_devices) => host_devices,
            Err(e) => {
                error!(
                    err = e.to_string(),
                    host = host_id.name(),
                    "Unable to list devices for host"
                );
                continue;
            }
        };

        for device in host_devices {
            let Ok(configs) = device.supported_output_configs() else {
                continue;
            };
            let max_channels = configs.map(|c| c.channels()).max().unwrap_or(0);
            if max_channels > 0 {
                devices.push(OutputDevice {
                    name: device.name()?,
                    host: host_id.name().to_string(),
                    max_channels,
                });
            }
        }
    }

    devices.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(devices)
}

/// Runs the engine from inside an audio callback.
///
/// Each callback drains pending note events, then produces the device buffer
/// in chunks of at most the engine's cycle size. The chosen bus's output is
/// copied to every device channel.
pub struct Renderer {
    engine: Engine,
    output_bus: BusId,
    notes: Receiver<NoteEvent>,
    events: Vec<NoteEvent>,
    channels: usize,
    priority: CallbackPriority,
}

impl Renderer {
    pub fn new(
        engine: Engine,
        output_bus: BusId,
        notes: Receiver<NoteEvent>,
        channels: u16,
        priority: CallbackPriority,
    ) -> Renderer {
        Renderer {
            engine,
            output_bus,
            notes,
            events: Vec::with_capacity(MAX_EVENTS_PER_CALLBACK),
            channels: usize::from(channels.max(1)),
            priority,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Fills an interleaved device buffer.
    pub fn render<T>(&mut self, data: &mut [T])
    where
        T: SizedSample + FromSample<f32>,
    {
        self.priority.apply_once();

        let total_frames = data.len() / self.channels;
        let max_frames = self.engine.max_frames().max(1);

        self.events.clear();
        while self.events.len() < MAX_EVENTS_PER_CALLBACK {
            match self.notes.try_recv() {
                Ok(event) => self.events.push(event),
                Err(_) => break,
            }
        }

        let mut written = 0;
        while written < total_frames {
            let frames = (total_frames - written).min(max_frames);
            // Notes land at the start of the callback's first chunk, keeping
            // whatever offset they arrived with.
            let events: &[NoteEvent] = if written == 0 { &self.events } else { &[] };
            self.engine.process(frames, events);

            let output = self.engine.bus_output(self.output_bus);
            let chunk = &mut data[written * self.channels..(written + frames) * self.channels];
            for (i, frame) in chunk.chunks_exact_mut(self.channels).enumerate() {
                let value = output.and_then(|o| o.get(i)).copied().unwrap_or(0.0);
                frame.fill(T::from_sample(value));
            }
            written += frames;
        }

        // Anything that doesn't make up a whole frame stays silent.
        data[total_frames * self.channels..].fill(T::from_sample(0.0f32));
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("engine", &self.engine)
            .field("output_bus", &self.output_bus)
            .field("channels", &self.channels)
            .finish()
    }
}

/// A playing output stream. Audio stops when this is dropped.
pub struct OutputStream {
    device: String,
    channels: u16,
    sample_rate: u32,
    _stream: cpal::Stream,
}

impl OutputStream {
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputStream")
            .field("device", &self.device)
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

/// Opens an output device (the default one when `name` is None) at
/// `sample_rate` and starts running the engine from its callback.
pub fn play(
    name: Option<&str>,
    sample_rate: u32,
    engine: Engine,
    output_bus: BusId,
    notes: Receiver<NoteEvent>,
) -> Result<OutputStream, Box<dyn Error>> {
    let host = cpal::default_host();
    let device = match name {
        Some(name) => host
            .output_devices()?
            .find(|device| device.name().is_ok_and(|n| n.trim() == name))
            .ok_or_else(|| format!("no device found with name {}", name))?,
        None => host
            .default_output_device()
            .ok_or("no default output device")?,
    };
    let device_name = device.name()?;

    let default_config = device.default_output_config()?;
    let channels = default_config.channels();
    let config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };
    let renderer = Renderer::new(
        engine,
        output_bus,
        notes,
        channels,
        CallbackPriority::from_env(),
    );

    let stream = match default_config.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, renderer)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, renderer)?,
        cpal::SampleFormat::I32 => build_stream::<i32>(&device, &config, renderer)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, renderer)?,
        other => return Err(format!("unsupported sample format {:?}", other).into()),
    };
    stream.play()?;

    info!(
        device = device_name,
        channels,
        sample_rate,
        "Output stream started"
    );
    Ok(OutputStream {
        device: device_name,
        channels,
        sample_rate,
        _stream: stream,
    })
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut renderer: Renderer,
) -> Result<cpal::Stream, Box<dyn Error>>
where
    T: SizedSample + FromSample<f32>,
{
    Ok(device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| renderer.render(data),
        |err| error!("CPAL output stream error: {}", err),
        None,
    )?)
}
