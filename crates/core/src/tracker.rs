//! Status tracker: folds per-cycle probe results into the last-known
//! classification of every rostered service.
//!
//! Pure logic. The caller fetches the roster and runs the probes, then hands
//! both to [`StatusTracker::update`], which diffs them against the previous
//! cycle and reports what changed.

use std::collections::{BTreeSet, HashMap};

use crate::status::{ProbeOutcome, ServiceClassification};
use crate::types::ServiceName;

// ---------------------------------------------------------------------------
// PollDelta
// ---------------------------------------------------------------------------

/// Outcome of one poll.
///
/// The `all_*` lists are the full snapshot of services classified this cycle;
/// the `newly_*` lists hold the subset whose classification changed since the
/// previous successful observation (or that were seen for the first time).
/// Every list follows roster order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollDelta {
    pub all_healthy: Vec<ServiceName>,
    pub all_stopped: Vec<ServiceName>,
    pub all_missing: Vec<ServiceName>,
    pub newly_healthy: Vec<ServiceName>,
    pub newly_stopped: Vec<ServiceName>,
    pub newly_missing: Vec<ServiceName>,
}

impl PollDelta {
    /// A service moved into Stopped or Missing this cycle.
    pub fn has_new_issue(&self) -> bool {
        !self.newly_stopped.is_empty() || !self.newly_missing.is_empty()
    }

    /// At least one service is currently Stopped or Missing.
    pub fn has_ongoing_issue(&self) -> bool {
        !self.all_stopped.is_empty() || !self.all_missing.is_empty()
    }

    /// Names of every service currently in a bad state, stopped first.
    pub fn issues(&self) -> impl Iterator<Item = &ServiceName> {
        self.all_stopped.iter().chain(self.all_missing.iter())
    }

    fn record_current(&mut self, name: &ServiceName, classification: ServiceClassification) {
        let list = match classification {
            ServiceClassification::Healthy => &mut self.all_healthy,
            ServiceClassification::Stopped => &mut self.all_stopped,
            ServiceClassification::Missing => &mut self.all_missing,
        };
        list.push(name.clone());
    }

    fn record_transition(&mut self, name: &ServiceName, classification: ServiceClassification) {
        let list = match classification {
            ServiceClassification::Healthy => &mut self.newly_healthy,
            ServiceClassification::Stopped => &mut self.newly_stopped,
            ServiceClassification::Missing => &mut self.newly_missing,
        };
        list.push(name.clone());
    }
}

// ---------------------------------------------------------------------------
// ProbeFailure
// ---------------------------------------------------------------------------

/// A rostered service whose state could not be determined this cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeFailure {
    #[error("Access denied for service {service}")]
    AccessDenied { service: ServiceName },

    #[error("Error checking service {service}: {detail}")]
    Unknown {
        service: ServiceName,
        detail: String,
    },
}

impl ProbeFailure {
    pub fn service(&self) -> &str {
        match self {
            Self::AccessDenied { service } | Self::Unknown { service, .. } => service,
        }
    }
}

/// Everything a single [`StatusTracker::update`] call produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    pub delta: PollDelta,
    /// Services skipped this cycle; their tracker entries were left as is.
    pub failures: Vec<ProbeFailure>,
    /// Services dropped from the tracker because they left the roster.
    pub pruned: Vec<ServiceName>,
}

// ---------------------------------------------------------------------------
// StatusTracker
// ---------------------------------------------------------------------------

/// Last-known classification per rostered service.
///
/// Owned by the poll loop; starts empty, so the first cycle after a restart
/// reports every non-healthy service as a new transition.
#[derive(Debug, Default)]
pub struct StatusTracker {
    record: HashMap<ServiceName, ServiceClassification>,
}

impl StatusTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last committed classification for `name`, if any.
    pub fn get(&self, name: &str) -> Option<ServiceClassification> {
        self.record.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.record.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }

    /// Names currently tracked, in sorted order.
    pub fn names(&self) -> BTreeSet<&str> {
        self.record.keys().map(String::as_str).collect()
    }

    /// Fold one cycle's probe results into the tracker.
    ///
    /// `probe` is consulted exactly once per roster entry. The delta is fully
    /// assembled before any entry is written, and entries for names outside
    /// `roster` are removed afterwards, so the tracked key set ends up as a
    /// subset of the roster (equal to it minus never-classified names).
    pub fn update<F>(&mut self, roster: &BTreeSet<ServiceName>, mut probe: F) -> PollReport
    where
        F: FnMut(&str) -> ProbeOutcome,
    {
        let mut delta = PollDelta::default();
        let mut failures = Vec::new();
        let mut staged = Vec::new();

        for name in roster {
            let outcome = probe(name);
            let Some(classification) = outcome.classification() else {
                failures.push(match outcome {
                    ProbeOutcome::UnknownError(detail) => ProbeFailure::Unknown {
                        service: name.clone(),
                        detail,
                    },
                    _ => ProbeFailure::AccessDenied {
                        service: name.clone(),
                    },
                });
                continue;
            };

            delta.record_current(name, classification);

            if self.get(name) != Some(classification) {
                delta.record_transition(name, classification);
                staged.push((name.clone(), classification));
            }
        }

        self.record.extend(staged);

        let mut pruned: Vec<ServiceName> = self
            .record
            .keys()
            .filter(|name| !roster.contains(*name))
            .cloned()
            .collect();
        pruned.sort();
        self.record.retain(|name, _| roster.contains(name));

        PollReport {
            delta,
            failures,
            pruned,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
