//! In-memory collaborators for driving [`ServiceMonitor`] in tests.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Local, TimeZone};

use watchdog_agent::monitor::ServiceMonitor;
use watchdog_core::providers::{DisplayNameLookup, Notifier, RosterProvider, ServiceProbe};
use watchdog_core::{AlertPayload, FetchError, ProbeOutcome, SendError, ServiceName, Timestamp};

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeRoster {
    names: Mutex<BTreeSet<ServiceName>>,
    failure: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl FakeRoster {
    pub fn set(&self, names: &[&str]) {
        *self.names.lock().unwrap() = names.iter().map(|n| n.to_string()).collect();
        *self.failure.lock().unwrap() = None;
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RosterProvider for FakeRoster {
    async fn fetch(&self, _host: &str) -> Result<BTreeSet<ServiceName>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(FetchError::Request(message));
        }
        Ok(self.names.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// Probe
// ---------------------------------------------------------------------------

/// Answers from a fixed table; unknown names are reported as not found.
#[derive(Default)]
pub struct FakeProbe {
    states: Mutex<HashMap<ServiceName, ProbeOutcome>>,
}

impl FakeProbe {
    pub fn set(&self, name: &str, outcome: ProbeOutcome) {
        self.states.lock().unwrap().insert(name.to_string(), outcome);
    }
}

#[async_trait]
impl ServiceProbe for FakeProbe {
    async fn query(&self, name: &str) -> ProbeOutcome {
        self.states
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or(ProbeOutcome::NotFound)
    }
}

// ---------------------------------------------------------------------------
// Display names
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeDisplayNames {
    names: HashMap<String, String>,
}

impl FakeDisplayNames {
    pub fn with(pairs: &[(&str, &str)]) -> Self {
        Self {
            names: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl DisplayNameLookup for FakeDisplayNames {
    async fn resolve(&self, name: &str) -> String {
        self.names
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Records every payload it is asked to send, delivered or not.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<AlertPayload>>,
    failing: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<AlertPayload> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, payload: &AlertPayload) -> Result<(), SendError> {
        self.sent.lock().unwrap().push(payload.clone());
        if *self.failing.lock().unwrap() {
            return Err(SendError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub roster: Arc<FakeRoster>,
    pub probe: Arc<FakeProbe>,
    pub notifier: Arc<RecordingNotifier>,
    pub monitor: ServiceMonitor,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_display_names(FakeDisplayNames::default())
    }

    pub fn with_display_names(display_names: FakeDisplayNames) -> Self {
        let roster = Arc::new(FakeRoster::default());
        let probe = Arc::new(FakeProbe::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = ServiceMonitor::new(
            "web-01",
            roster.clone(),
            probe.clone(),
            Arc::new(display_names),
            notifier.clone(),
        );
        Self {
            roster,
            probe,
            notifier,
            monitor,
        }
    }
}

/// Local timestamp on 2024-03-`day` at `hour`:00.
pub fn at(day: u32, hour: u32) -> Timestamp {
    Local
        .with_ymd_and_hms(2024, 3, day, hour, 0, 0)
        .single()
        .expect("unambiguous local time")
}
