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
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters written by the audio thread and readable from anywhere.
#[derive(Debug, Default)]
pub struct EngineStats {
    cycles: AtomicU64,
    active_voices: AtomicUsize,
    voices_started: AtomicU64,
    voices_stolen: AtomicU64,
    /// Triggers that produced nothing: unbound key, no layers or no bus.
    triggers_ignored: AtomicU64,
}

impl EngineStats {
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn active_voices(&self) -> usize {
        self.active_voices.load(Ordering::Relaxed)
    }

    pub fn voices_started(&self) -> u64 {
        self.voices_started.load(Ordering::Relaxed)
    }

    pub fn voices_stolen(&self) -> u64 {
        self.voices_stolen.load(Ordering::Relaxed)
    }

    pub fn triggers_ignored(&self) -> u64 {
        self.triggers_ignored.load(Ordering::Relaxed)
    }

    pub(crate) fn record_cycle(&self, active_voices: usize) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.active_voices.store(active_voices, Ordering::Relaxed);
    }

    pub(crate) fn record_started(&self, stolen: bool) {
        self.voices_started.fetch_add(1, Ordering::Relaxed);
        if stolen {
            self.voices_stolen.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_ignored(&self) {
        self.triggers_ignored.fetch_add(1, Ordering::Relaxed);
    }
}
