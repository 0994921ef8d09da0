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

/// Decoded mono audio held in memory.
/// The frame data is stored in an Arc so every voice playing it shares one copy;
/// it is never written to after construction.
#[derive(Clone)]
pub struct Sample {
    data: Arc<[f32]>,
}

impl Sample {
    /// Creates a sample from decoded mono frames.
    pub fn new(frames: Vec<f32>) -> Sample {
        Sample {
            data: frames.into(),
        }
    }

    /// Returns the amplitude at `index`, or silence past the end.
    #[inline]
    pub fn frame(&self, index: usize) -> f32 {
        self.data.get(index).copied().unwrap_or(0.0)
    }

    /// Returns the number of frames.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the frame data.
    pub fn frames(&self) -> &[f32] {
        &self.data
    }

    /// True if both handles refer to the same frame data.
    pub fn ptr_eq(&self, other: &Sample) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Number of live handles to this sample's data.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.data)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

impl fmt::Debug for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sample")
            .field("frames", &self.data.len())
            .field("data", &Arc::as_ptr(&self.data))
            .finish()
    }
}

/// The samples registered at one velocity threshold, played in rotation.
#[derive(Clone, Debug, Default)]
pub struct RoundRobinSample {
    samples: Vec<Sample>,
    /// Always in `[0, samples.len())` while the layer is non-empty.
    cursor: usize,
}

impl RoundRobinSample {
    pub fn new() -> RoundRobinSample {
        RoundRobinSample::default()
    }

    /// Appends a sample to the end of the rotation.
    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Returns the sample under the cursor and advances the cursor, wrapping
    /// around at the end. Returns None for an empty layer.
    pub fn next_sample(&mut self) -> Option<&Sample> {
        if self.samples.is_empty() {
            return None;
        }
        let current = self.cursor;
        self.cursor = (self.cursor + 1) % self.samples.len();
        self.samples.get(current)
    }

    /// Removes a sample by identity. Returns true if it was present.
    pub fn remove(&mut self, sample: &Sample) -> bool {
        let Some(index) = self.samples.iter().position(|s| s.ptr_eq(sample)) else {
            return false;
        };
        self.samples.remove(index);

        // Keep the cursor on the sample that would have played next.
        if index < self.cursor {
            self.cursor -= 1;
        }
        if self.cursor >= self.samples.len() {
            self.cursor = 0;
        }
        true
    }

    pub fn contains(&self, sample: &Sample) -> bool {
        self.samples.iter().any(|s| s.ptr_eq(sample))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Position of the next sample to be played.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_frames() {
        let sample = Sample::new(vec![0.25, -0.5, 1.0]);
        assert_eq!(sample.len(), 3);
        assert!(!sample.is_empty());
        assert_eq!(sample.frame(0), 0.25);
        assert_eq!(sample.frame(2), 1.0);
        assert_eq!(sample.frame(3), 0.0);
        assert_eq!(sample.frame(usize::MAX), 0.0);
        assert_eq!(sample.memory_size(), 12);
    }

    #[test]
    fn test_sample_identity() {
        let a = Sample::new(vec![1.0]);
        let b = Sample::new(vec![1.0]);
        let a2 = a.clone();

        assert!(a.ptr_eq(&a2));
        assert!(!a.ptr_eq(&b));
        assert_eq!(a.handle_count(), 2);
    }

    #[test]
    fn test_round_robin_rotation() {
        let samples: Vec<Sample> = (0..3).map(|i| Sample::new(vec![i as f32])).collect();
        let mut rr = RoundRobinSample::new();
        for s in &samples {
            rr.push(s.clone());
        }

        // Every sample exactly once, in insertion order, then repeat.
        for round in 0..2 {
            for (i, expected) in samples.iter().enumerate() {
                let next = rr.next_sample().unwrap();
                assert!(next.ptr_eq(expected), "round {} index {}", round, i);
            }
        }
        assert_eq!(rr.cursor(), 0);
    }

    #[test]
    fn test_round_robin_empty() {
        let mut rr = RoundRobinSample::new();
        assert!(rr.next_sample().is_none());
        assert!(rr.is_empty());
    }

    #[test]
    fn test_round_robin_remove_keeps_cursor_valid() {
        let samples: Vec<Sample> = (0..3).map(|i| Sample::new(vec![i as f32])).collect();
        let mut rr = RoundRobinSample::new();
        for s in &samples {
            rr.push(s.clone());
        }

        // Advance to the last sample, then remove it.
        rr.next_sample();
        rr.next_sample();
        assert_eq!(rr.cursor(), 2);
        assert!(rr.remove(&samples[2]));
        assert_eq!(rr.cursor(), 0);
        assert_eq!(rr.len(), 2);

        // Removing before the cursor shifts it back.
        rr.next_sample();
        assert_eq!(rr.cursor(), 1);
        assert!(rr.remove(&samples[0]));
        assert_eq!(rr.cursor(), 0);
        assert!(rr.next_sample().unwrap().ptr_eq(&samples[1]));

        assert!(!rr.remove(&samples[0]));
        assert!(!rr.contains(&samples[0]));
    }
}
