//! Alert scheduling: decides whether a poll warrants an email.
//!
//! New Stopped/Missing transitions alert immediately. Unresolved issues with
//! no new transition alert at most once per calendar day.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::tracker::PollDelta;

// ---------------------------------------------------------------------------
// AlertClock
// ---------------------------------------------------------------------------

/// Calendar date of the last dispatched alert; `None` means never.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertClock {
    last_alert_date: Option<NaiveDate>,
}

impl AlertClock {
    /// A clock that has never fired.
    pub fn never() -> Self {
        Self::default()
    }

    pub fn last_alert_date(&self) -> Option<NaiveDate> {
        self.last_alert_date
    }

    /// True when no alert has gone out on `today` or later.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.last_alert_date.map_or(true, |last| last < today)
    }

    /// Record an alert on `today`. The date never moves backwards, even if the
    /// host clock does.
    pub fn advanced_to(self, today: NaiveDate) -> Self {
        let last_alert_date = match self.last_alert_date {
            Some(last) if last >= today => last,
            _ => today,
        };
        Self {
            last_alert_date: Some(last_alert_date),
        }
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Why an alert is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertReason {
    /// A service moved into Stopped or Missing this cycle.
    NewIssue,
    /// Issues persist and nothing has been sent yet today.
    DailyReminder,
}

impl fmt::Display for AlertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NewIssue => "new_issue",
            Self::DailyReminder => "daily_reminder",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertDecision {
    pub should_send: bool,
    /// `Some` exactly when `should_send` is true.
    pub reason: Option<AlertReason>,
    /// The clock to keep if the alert is sent (unchanged when not sending).
    pub clock: AlertClock,
}

/// Decide whether the poll summarized by `delta` should produce an alert.
pub fn decide(delta: &PollDelta, clock: AlertClock, today: NaiveDate) -> AlertDecision {
    let reason = if delta.has_new_issue() {
        Some(AlertReason::NewIssue)
    } else if clock.is_due(today) && delta.has_ongoing_issue() {
        Some(AlertReason::DailyReminder)
    } else {
        None
    };

    match reason {
        Some(_) => AlertDecision {
            should_send: true,
            reason,
            clock: clock.advanced_to(today),
        },
        None => AlertDecision {
            should_send: false,
            reason: None,
            clock,
        },
    }
}

// ---------------------------------------------------------------------------
// AlertClockPolicy
// ---------------------------------------------------------------------------

/// When a send attempt consumes the day's reminder slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlertClockPolicy {
    /// Advance the clock as soon as a send is attempted, even if it fails.
    #[default]
    OnAttempt,
    /// Advance the clock only after the notifier reports success, so a failed
    /// send is repeated on the next tick.
    OnDelivery,
}

impl AlertClockPolicy {
    /// Clock to keep after acting on `decision`.
    pub fn settle(self, previous: AlertClock, decision: &AlertDecision, delivered: bool) -> AlertClock {
        match self {
            Self::OnDelivery if !delivered => previous,
            _ => decision.clock,
        }
    }
}

impl FromStr for AlertClockPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on-attempt" | "on_attempt" | "attempt" => Ok(Self::OnAttempt),
            "on-delivery" | "on_delivery" | "delivery" => Ok(Self::OnDelivery),
            other => Err(format!(
                "unknown alert clock policy '{other}' (expected 'on-attempt' or 'on-delivery')"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
