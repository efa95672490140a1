//! Digest alert payload: one message listing every stopped and missing
//! service on the host.

use serde::Serialize;

use crate::tracker::PollDelta;
use crate::types::{ServiceName, Timestamp};

/// A service listed in an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertEntry {
    pub service_name: ServiceName,
    /// Human-readable name; equals `service_name` when none could be found.
    pub display_name: String,
}

/// Everything the notifier needs to render an alert.
#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload {
    pub host: String,
    pub timestamp: Timestamp,
    pub stopped: Vec<AlertEntry>,
    pub missing: Vec<AlertEntry>,
}

impl AlertPayload {
    /// Build the payload from the current snapshot in `delta`.
    ///
    /// Healthy services are never listed. `display_name` is a best-effort
    /// lookup; blank answers fall back to the raw service name.
    pub fn compose<F>(delta: &PollDelta, host: &str, timestamp: Timestamp, mut display_name: F) -> Self
    where
        F: FnMut(&str) -> String,
    {
        let mut entry = |name: &ServiceName| {
            let resolved = display_name(name);
            let label = match resolved.trim() {
                "" => name.clone(),
                trimmed => trimmed.to_string(),
            };
            AlertEntry {
                service_name: name.clone(),
                display_name: label,
            }
        };

        let stopped = delta.all_stopped.iter().map(&mut entry).collect();
        let missing = delta.all_missing.iter().map(&mut entry).collect();

        Self {
            host: host.to_string(),
            timestamp,
            stopped,
            missing,
        }
    }

    /// Total number of services listed.
    pub fn service_count(&self) -> usize {
        self.stopped.len() + self.missing.len()
    }
}
