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

//! Sample loading and caching for triggered samples.
//!
//! Samples are decoded entirely into memory ahead of time so that triggering
//! never waits on storage.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info, warn};

use super::error::SampleError;
use super::sample::Sample;

/// A file decoded to mono frames.
#[derive(Clone, Debug)]
pub struct DecodedSample {
    pub sample: Sample,
    /// Sample rate the file was recorded at.
    pub sample_rate: u32,
    /// Channel count of the file before downmixing.
    pub channel_count: usize,
}

/// Decodes sample files and caches them by path.
pub struct SampleLoader {
    cache: HashMap<PathBuf, DecodedSample>,
}

impl SampleLoader {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Loads a sample from a file into memory.
    /// Returns a cached version if already loaded.
    pub fn load(&mut self, path: &Path) -> Result<DecodedSample, SampleError> {
        if let Some(decoded) = self.cache.get(path) {
            debug!(path = ?path, "Using cached sample");
            return Ok(decoded.clone());
        }

        info!(path = ?path, "Loading sample into memory");
        let decoded = decode_file(path)?;

        let duration = Duration::from_secs_f64(
            decoded.sample.len() as f64 / decoded.sample_rate.max(1) as f64,
        );
        info!(
            path = ?path,
            channels = decoded.channel_count,
            sample_rate = decoded.sample_rate,
            duration_ms = duration.as_millis(),
            memory_kb = decoded.sample.memory_size() / 1024,
            "Sample loaded"
        );

        self.cache.insert(path.to_path_buf(), decoded.clone());
        Ok(decoded)
    }

    /// Drops a cached file so the next load decodes it again.
    pub fn evict(&mut self, path: &Path) -> bool {
        self.cache.remove(path).is_some()
    }

    /// Drops every cached file.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Returns the total memory used by cached samples.
    pub fn total_memory_usage(&self) -> usize {
        self.cache.values().map(|d| d.sample.memory_size()).sum()
    }
}

impl Default for SampleLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SampleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleLoader")
            .field("cached_samples", &self.cache.len())
            .field("total_memory_kb", &(self.total_memory_usage() / 1024))
            .finish()
    }
}

/// Decodes the first audio track of a file and averages its channels to mono.
fn decode_file(path: &Path) -> Result<DecodedSample, SampleError> {
    let file = File::open(path).map_err(|e| {
        SampleError::IoError(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| SampleError::NoAudioTrack(path.to_path_buf()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channel_count = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(0);

    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut frames = Vec::new();
    let mut sample_buffer: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // A corrupt packet costs us a few frames, not the whole sample.
                warn!(path = ?path, error = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channel_count = spec.channels.count();

        let needed = decoded.capacity() * channel_count;
        if sample_buffer
            .as_ref()
            .map_or(true, |buffer| buffer.capacity() < needed)
        {
            sample_buffer = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }
        if let Some(buffer) = sample_buffer.as_mut() {
            buffer.copy_interleaved_ref(decoded);
            downmix_into(buffer.samples(), channel_count, &mut frames);
        }
    }

    if frames.is_empty() {
        return Err(SampleError::Empty(path.to_path_buf()));
    }

    Ok(DecodedSample {
        sample: Sample::new(frames),
        sample_rate,
        channel_count,
    })
}

/// Averages interleaved frames down to one channel, appending to `out`.
fn downmix_into(interleaved: &[f32], channel_count: usize, out: &mut Vec<f32>) {
    if channel_count <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    let scale = 1.0 / channel_count as f32;
    out.extend(
        interleaved
            .chunks_exact(channel_count)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}
