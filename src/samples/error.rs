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
use std::path::PathBuf;

/// Error types for sample loading and instrument layering
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("Velocity {0} is out of range (0-127)")]
    VelocityOutOfRange(u8),

    #[error("Sample is not part of this instrument")]
    UnknownSample,

    #[error("No audio track found in {0}")]
    NoAudioTrack(PathBuf),

    #[error("{0} contains no audio")]
    Empty(PathBuf),

    #[error("Audio file error: {0}")]
    AudioError(#[from] symphonia::core::errors::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
