//! Poll loop driving one host's watchdog.
//!
//! Each cycle fetches the roster, probes every rostered service, folds the
//! results into the [`StatusTracker`], asks the scheduler whether an alert is
//! due and, if so, composes and sends it. A failed roster fetch aborts only
//! the current cycle; the next tick retries.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use watchdog_core::providers::{DisplayNameLookup, Notifier, RosterProvider, ServiceProbe};
use watchdog_core::{
    decide, AlertClock, AlertClockPolicy, AlertPayload, AlertReason, FetchError, PollDelta,
    ProbeOutcome, SendError, ServiceName, StatusTracker, Timestamp,
};

const DEFAULT_PROBE_CONCURRENCY: usize = 4;

/// Shortest interval accepted by [`ServiceMonitor::run`].
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Result of one [`ServiceMonitor::run_cycle`].
#[derive(Debug)]
pub enum CycleOutcome {
    /// The roster could not be fetched; tracker and clock are untouched.
    Aborted(FetchError),
    Completed { delta: PollDelta, alert: AlertOutcome },
}

/// What happened on the alert side of a completed cycle.
#[derive(Debug)]
pub enum AlertOutcome {
    NotDue,
    Sent(AlertReason),
    Failed { reason: AlertReason, error: SendError },
}

// ---------------------------------------------------------------------------
// ServiceMonitor
// ---------------------------------------------------------------------------

/// Owns the tracker and alert clock for one host and drives the poll loop.
pub struct ServiceMonitor {
    host: String,
    roster: Arc<dyn RosterProvider>,
    probe: Arc<dyn ServiceProbe>,
    display_names: Arc<dyn DisplayNameLookup>,
    notifier: Arc<dyn Notifier>,
    tracker: StatusTracker,
    clock: AlertClock,
    policy: AlertClockPolicy,
    probe_concurrency: usize,
}

impl ServiceMonitor {
    pub fn new(
        host: impl Into<String>,
        roster: Arc<dyn RosterProvider>,
        probe: Arc<dyn ServiceProbe>,
        display_names: Arc<dyn DisplayNameLookup>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            host: host.into(),
            roster,
            probe,
            display_names,
            notifier,
            tracker: StatusTracker::new(),
            clock: AlertClock::never(),
            policy: AlertClockPolicy::default(),
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
        }
    }

    pub fn with_clock_policy(mut self, policy: AlertClockPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Maximum number of probes in flight at once (at least one).
    pub fn with_probe_concurrency(mut self, limit: usize) -> Self {
        self.probe_concurrency = limit.max(1);
        self
    }

    pub fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    pub fn clock(&self) -> AlertClock {
        self.clock
    }

    /// Run cycles every `interval` until `cancel` fires.
    ///
    /// The first cycle starts immediately. Cancellation is observed between
    /// cycles; a cycle in progress runs to completion. Intervals shorter than
    /// [`MIN_CHECK_INTERVAL`] are raised to it.
    pub async fn run(&mut self, interval: Duration, cancel: CancellationToken) {
        if interval < MIN_CHECK_INTERVAL {
            tracing::warn!(
                requested_ms = interval.as_millis() as u64,
                min_secs = MIN_CHECK_INTERVAL.as_secs(),
                "Check interval too short, using the minimum",
            );
        }
        let interval = interval.max(MIN_CHECK_INTERVAL);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            host = %self.host,
            interval_secs = interval.as_secs(),
            "Service monitor started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(host = %self.host, "Service monitor cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle(chrono::Local::now()).await;
                }
            }
        }
    }

    /// Execute one poll cycle as of `now`.
    pub async fn run_cycle(&mut self, now: Timestamp) -> CycleOutcome {
        let roster = match self.roster.fetch(&self.host).await {
            Ok(roster) => roster,
            Err(e) => {
                tracing::error!(host = %self.host, error = %e, "Failed to retrieve service roster");
                return CycleOutcome::Aborted(e);
            }
        };

        let outcomes = self.probe_all(&roster).await;
        let report = self.tracker.update(&roster, |name| {
            outcomes
                .get(name)
                .cloned()
                .unwrap_or_else(|| ProbeOutcome::UnknownError("no probe result".to_string()))
        });

        for failure in &report.failures {
            tracing::error!(service = %failure.service(), error = %failure, "Service check failed");
        }
        for name in &report.pruned {
            tracing::info!(service = %name, "Removing stale service entry");
        }
        log_transitions(&report.delta);

        let decision = decide(&report.delta, self.clock, now.date_naive());
        let alert = match decision.reason {
            Some(reason) => {
                let payload = self.compose_payload(&report.delta, now).await;
                match self.notifier.send(&payload).await {
                    Ok(()) => {
                        tracing::info!(
                            host = %self.host,
                            reason = %reason,
                            services = payload.service_count(),
                            "Alert sent",
                        );
                        AlertOutcome::Sent(reason)
                    }
                    Err(error) => {
                        tracing::error!(host = %self.host, reason = %reason, error = %error, "Failed to send alert");
                        AlertOutcome::Failed { reason, error }
                    }
                }
            }
            None => AlertOutcome::NotDue,
        };

        let delivered = matches!(alert, AlertOutcome::Sent(_));
        self.clock = self.policy.settle(self.clock, &decision, delivered);

        log_snapshot(&self.host, &report.delta);
        CycleOutcome::Completed {
            delta: report.delta,
            alert,
        }
    }

    async fn probe_all(&self, roster: &BTreeSet<ServiceName>) -> HashMap<ServiceName, ProbeOutcome> {
        let probe = self.probe.as_ref();
        futures::stream::iter(roster.iter().cloned())
            .map(|name| async move {
                let outcome = probe.query(&name).await;
                (name, outcome)
            })
            .buffer_unordered(self.probe_concurrency)
            .collect()
            .await
    }

    async fn compose_payload(&self, delta: &PollDelta, now: Timestamp) -> AlertPayload {
        let mut display_names = HashMap::new();
        for name in delta.issues() {
            let display = self.display_names.resolve(name).await;
            display_names.insert(name.clone(), display);
        }

        AlertPayload::compose(delta, &self.host, now, |name| {
            display_names
                .get(name)
                .cloned()
                .unwrap_or_else(|| name.to_string())
        })
    }
}

fn log_transitions(delta: &PollDelta) {
    for name in &delta.newly_stopped {
        tracing::warn!(service = %name, "Service stopped");
    }
    for name in &delta.newly_missing {
        tracing::warn!(service = %name, "Service not found");
    }
    for name in &delta.newly_healthy {
        tracing::info!(service = %name, "Service running");
    }
}

fn log_snapshot(host: &str, delta: &PollDelta) {
    tracing::info!(
        host = %host,
        running = delta.all_healthy.len(),
        stopped = delta.all_stopped.len(),
        missing = delta.all_missing.len(),
        running_services = %delta.all_healthy.join(", "),
        stopped_services = %delta.all_stopped.join(", "),
        missing_services = %delta.all_missing.join(", "),
        "Service status snapshot",
    );
}
