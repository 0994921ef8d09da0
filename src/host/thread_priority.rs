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
use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

/// Priority for the audio callback thread when TDRUM_THREAD_PRIORITY is unset.
const DEFAULT_CALLBACK_THREAD_PRIORITY: u8 = 70;

/// Raises the priority of the audio callback thread the first time the
/// callback runs. The environment is read when this is built, never from
/// the callback.
#[derive(Debug)]
pub struct CallbackPriority {
    priority: Option<ThreadPriorityValue>,
    rt_audio: bool,
    applied: bool,
}

impl CallbackPriority {
    /// Reads TDRUM_THREAD_PRIORITY (0-99) and TDRUM_DISABLE_RT_AUDIO.
    pub fn from_env() -> CallbackPriority {
        let priority = parse_priority(std::env::var("TDRUM_THREAD_PRIORITY").ok().as_deref());
        let rt_audio = !std::env::var("TDRUM_DISABLE_RT_AUDIO")
            .ok()
            .as_deref()
            .is_some_and(parse_flag);
        CallbackPriority {
            priority,
            rt_audio,
            applied: false,
        }
    }

    /// Leaves the callback thread alone.
    pub fn disabled() -> CallbackPriority {
        CallbackPriority {
            priority: None,
            rt_audio: false,
            applied: true,
        }
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// Raises the current thread's priority, once. Later calls do nothing.
    pub fn apply_once(&mut self) {
        if self.applied {
            return;
        }
        self.applied = true;

        let Some(value) = self.priority else {
            return;
        };
        let priority = ThreadPriority::Crossplatform(value);
        if let Err(e) = set_current_thread_priority(priority) {
            warn!(error = ?e, "Failed to raise audio callback thread priority");
        }

        #[cfg(unix)]
        if self.rt_audio {
            use thread_priority::unix::{
                set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
                ThreadSchedulePolicy,
            };
            match set_thread_priority_and_policy(
                thread_native_id(),
                priority,
                ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
            ) {
                Ok(()) => info!("Enabled RT SCHED_FIFO for audio callback thread"),
                Err(e) => warn!(
                    error = ?e,
                    "Failed to set RT SCHED_FIFO for audio callback thread"
                ),
            }
        }
    }
}

/// Parses a priority in 0-99, falling back to the default for anything else.
fn parse_priority(value: Option<&str>) -> Option<ThreadPriorityValue> {
    let priority = value
        .and_then(|v| v.trim().parse::<u8>().ok())
        .filter(|n| *n < 100)
        .unwrap_or(DEFAULT_CALLBACK_THREAD_PRIORITY);
    ThreadPriorityValue::try_from(priority).ok()
}

fn parse_flag(value: &str) -> bool {
    value == "1"
        || value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
        || value.eq_ignore_ascii_case("on")
}
