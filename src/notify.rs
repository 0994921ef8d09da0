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

//! Diagnostic notifications.
//!
//! Failures that the engine survives (a sample that won't decode, a kit that
//! references something odd) are reported through a [`Notifier`] handed to the
//! controller at construction time. The engine itself never aborts on them.

use std::fmt;

use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

/// How serious a notification is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Verbose,
    Trace,
    Debug,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Verbose => "verbose",
            Severity::Trace => "trace",
            Severity::Debug => "debug",
        };
        f.write_str(name)
    }
}

/// A sink for diagnostics. `subject` is a short description of what was being
/// attempted, `detail` is why it went wrong.
pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, subject: &str, detail: &str);
}

/// Forwards notifications to `tracing` at the matching level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, subject: &str, detail: &str) {
        match severity {
            Severity::Error => error!(subject, detail, "Engine notification"),
            Severity::Warning => warn!(subject, detail, "Engine notification"),
            Severity::Info => info!(subject, detail, "Engine notification"),
            Severity::Verbose | Severity::Debug => debug!(subject, detail, "Engine notification"),
            Severity::Trace => trace!(subject, detail, "Engine notification"),
        }
    }
}

/// A single recorded notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub subject: String,
    pub detail: String,
}

/// Keeps every notification in memory. Handy for front ends that want to
/// show a list of problems after loading a kit, and for tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> RecordingNotifier {
        RecordingNotifier::default()
    }

    /// Returns a copy of everything recorded so far.
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    /// Returns the recorded notifications at the given severity.
    pub fn with_severity(&self, severity: Severity) -> Vec<Notification> {
        self.notifications
            .lock()
            .iter()
            .filter(|n| n.severity == severity)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.notifications.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, subject: &str, detail: &str) {
        self.notifications.lock().push(Notification {
            severity,
            subject: subject.to_string(),
            detail: detail.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Severity::Error, "reading file kick.wav", "no such file");
        notifier.notify(Severity::Warning, "sample rate", "44100 != 48000");

        let all = notifier.notifications();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].severity, Severity::Error);
        assert_eq!(all[0].subject, "reading file kick.wav");
        assert_eq!(all[0].detail, "no such file");

        assert_eq!(notifier.with_severity(Severity::Warning).len(), 1);
        assert!(notifier.with_severity(Severity::Debug).is_empty());

        notifier.clear();
        assert!(notifier.notifications().is_empty());
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Error.to_string(), "error");
        assert_eq!(Severity::Verbose.to_string(), "verbose");
        assert_eq!(Severity::Debug.to_string(), "debug");
    }
}
