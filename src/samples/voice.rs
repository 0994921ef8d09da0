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

//! Voices and the fixed-size pool they live in.
//!
//! The pool is sized once when the engine is built. Starting a voice reuses a
//! free slot, or steals the oldest voice when the pool is full, so triggering
//! never touches the allocator on the audio thread.

use super::sample::Sample;
use crate::mixer::BusId;

/// Identifier for a voice slot in the pool.
pub type VoiceId = usize;

/// One in-flight playback of a sample.
///
/// The cursor starts negative when the voice has pre-roll: it counts up
/// through the silent frames, then through the sample data.
pub struct PlayingVoice {
    sample: Sample,
    cursor: isize,
    bus: BusId,
    /// Start order, used to pick the oldest voice when stealing.
    serial: u64,
}

impl PlayingVoice {
    /// Creates a voice that stays silent for `offset` frames before playing.
    pub fn new(sample: Sample, offset: usize, bus: BusId) -> PlayingVoice {
        PlayingVoice {
            sample,
            cursor: -(offset as isize),
            bus,
            serial: 0,
        }
    }

    /// Produces the next frame.
    #[inline]
    pub fn next_frame(&mut self) -> f32 {
        if self.is_done() {
            return 0.0;
        }
        if self.cursor < 0 {
            self.cursor += 1;
            return 0.0;
        }
        let value = self.sample.frame(self.cursor as usize);
        self.cursor += 1;
        value
    }

    /// True once every frame of the sample has been produced.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.cursor >= self.sample.len() as isize
    }

    /// True while the voice is still in its pre-roll.
    pub fn is_pending(&self) -> bool {
        self.cursor < 0
    }

    /// Accumulates up to `dest.len()` frames, scaled by `gain`, into `dest`.
    /// Stops early once the voice is done.
    pub fn mix(&mut self, dest: &mut [f32], gain: f32) {
        for out in dest.iter_mut() {
            if self.is_done() {
                break;
            }
            *out += gain * self.next_frame();
        }
    }

    /// The bus this voice was attached to.
    pub fn bus(&self) -> BusId {
        self.bus
    }

    pub fn sample(&self) -> &Sample {
        &self.sample
    }

    pub fn cursor(&self) -> isize {
        self.cursor
    }
}

/// Pre-sized pool of voice slots.
pub struct VoicePool {
    slots: Vec<Option<PlayingVoice>>,
    /// Stack of free slot indices. Never grows past the slot count.
    free: Vec<VoiceId>,
    next_serial: u64,
}

impl VoicePool {
    /// Creates a pool with room for `capacity` simultaneous voices.
    pub fn new(capacity: usize) -> VoicePool {
        VoicePool {
            slots: (0..capacity).map(|_| None).collect(),
            free: (0..capacity).rev().collect(),
            next_serial: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Count of occupied slots.
    pub fn active_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    /// Places a voice in a free slot. Hands the voice back if the pool is full.
    pub fn allocate(&mut self, mut voice: PlayingVoice) -> Result<VoiceId, PlayingVoice> {
        let Some(id) = self.free.pop() else {
            return Err(voice);
        };
        voice.serial = self.next_serial;
        self.next_serial += 1;
        self.slots[id] = Some(voice);
        Ok(id)
    }

    /// Returns the slot holding the oldest voice, if any.
    pub fn oldest(&self) -> Option<VoiceId> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|v| (id, v.serial)))
            .min_by_key(|(_, serial)| *serial)
            .map(|(id, _)| id)
    }

    pub fn get(&self, id: VoiceId) -> Option<&PlayingVoice> {
        self.slots.get(id).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, id: VoiceId) -> Option<&mut PlayingVoice> {
        self.slots.get_mut(id).and_then(|s| s.as_mut())
    }

    /// Frees a slot, returning the voice that was in it.
    pub fn release(&mut self, id: VoiceId) -> Option<PlayingVoice> {
        let voice = self.slots.get_mut(id)?.take()?;
        self.free.push(id);
        Some(voice)
    }

    /// True if the slot is empty or its voice has finished.
    pub fn is_done(&self, id: VoiceId) -> bool {
        self.get(id).map_or(true, |v| v.is_done())
    }
}

impl std::fmt::Debug for VoicePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoicePool")
            .field("active_voices", &self.active_count())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(frames: Vec<f32>, offset: usize) -> PlayingVoice {
        PlayingVoice::new(Sample::new(frames), offset, BusId(0))
    }

    #[test]
    fn test_voice_plays_sample() {
        let mut v = voice(vec![0.1, 0.2, 0.3], 0);
        assert!(!v.is_pending());
        assert_eq!(v.next_frame(), 0.1);
        assert_eq!(v.next_frame(), 0.2);
        assert!(!v.is_done());
        assert_eq!(v.next_frame(), 0.3);
        assert!(v.is_done());

        // Done voices stay silent and don't move.
        assert_eq!(v.next_frame(), 0.0);
        assert_eq!(v.cursor(), 3);
    }

    #[test]
    fn test_voice_pre_roll() {
        for offset in 0..8 {
            let mut v = voice(vec![1.0, 2.0], offset);
            let produced: Vec<f32> = (0..offset + 2).map(|_| v.next_frame()).collect();
            let mut expected = vec![0.0; offset];
            expected.extend([1.0, 2.0]);
            assert_eq!(produced, expected, "offset {}", offset);
            assert!(v.is_done());
        }
    }

    #[test]
    fn test_voice_mix_accumulates_and_stops() {
        let mut v = voice(vec![1.0, 1.0], 1);
        let mut buf = vec![0.5; 4];
        v.mix(&mut buf, 0.5);
        assert_eq!(buf, vec![0.5, 1.0, 1.0, 0.5]);
        assert!(v.is_done());
    }

    #[test]
    fn test_voice_mix_across_cycles() {
        let mut v = voice(vec![1.0; 5], 0);
        let mut heard = 0;
        for _ in 0..3 {
            let mut buf = vec![0.0; 2];
            v.mix(&mut buf, 1.0);
            heard += buf.iter().filter(|s| **s != 0.0).count();
        }
        assert_eq!(heard, 5);
        assert!(v.is_done());
    }

    #[test]
    fn test_voice_gain_zero_still_advances() {
        let mut v = voice(vec![1.0, 1.0], 0);
        let mut buf = vec![0.0; 2];
        v.mix(&mut buf, 0.0);
        assert_eq!(buf, vec![0.0, 0.0]);
        assert!(v.is_done());
    }

    #[test]
    fn test_pool_allocate_and_release() {
        let mut pool = VoicePool::new(2);
        assert_eq!(pool.capacity(), 2);

        let a = pool.allocate(voice(vec![1.0], 0)).ok().unwrap();
        let b = pool.allocate(voice(vec![1.0], 0)).ok().unwrap();
        assert_ne!(a, b);
        assert!(pool.is_full());
        assert!(pool.allocate(voice(vec![1.0], 0)).is_err());

        assert!(pool.release(a).is_some());
        assert!(pool.release(a).is_none());
        assert_eq!(pool.active_count(), 1);
        assert!(pool.is_done(a));

        let c = pool.allocate(voice(vec![1.0], 0)).ok().unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn test_pool_oldest() {
        let mut pool = VoicePool::new(3);
        assert!(pool.oldest().is_none());

        let a = pool.allocate(voice(vec![1.0], 0)).ok().unwrap();
        let b = pool.allocate(voice(vec![1.0], 0)).ok().unwrap();
        assert_eq!(pool.oldest(), Some(a));

        pool.release(a);
        let c = pool.allocate(voice(vec![1.0], 0)).ok().unwrap();
        assert_eq!(c, a);
        assert_eq!(pool.oldest(), Some(b));
    }
}
