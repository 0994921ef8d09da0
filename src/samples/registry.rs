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
use super::sample::Sample;

/// Holds a handle to every sample given to the engine.
///
/// As long as a sample is registered, the audio thread never drops the last
/// handle to its data, so freeing sample memory always happens here, on the
/// control thread.
#[derive(Debug, Default)]
pub struct SampleRegistry {
    samples: Vec<Sample>,
}

impl SampleRegistry {
    pub fn new() -> SampleRegistry {
        SampleRegistry::default()
    }

    /// Registers a sample. Registering the same data twice is a no-op.
    pub fn register(&mut self, sample: &Sample) {
        if !self.samples.iter().any(|s| s.ptr_eq(sample)) {
            self.samples.push(sample.clone());
        }
    }

    /// Releases samples nobody else holds a handle to. Returns how many were
    /// released.
    pub fn purge_unused(&mut self) -> usize {
        let before = self.samples.len();
        self.samples.retain(|s| s.handle_count() > 1);
        before - self.samples.len()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the memory size in bytes of every registered sample.
    pub fn memory_usage(&self) -> usize {
        self.samples.iter().map(|s| s.memory_size()).sum()
    }
}
