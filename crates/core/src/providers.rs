//! Collaborator traits for the poll loop.
//!
//! The agent wires concrete implementations (HTTP roster client, systemd
//! probe, SMTP notifier); tests substitute in-memory fakes.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::alert::AlertPayload;
use crate::error::{FetchError, SendError};
use crate::status::ProbeOutcome;
use crate::types::ServiceName;

/// Resolves which services a host is expected to run.
#[async_trait]
pub trait RosterProvider: Send + Sync {
    async fn fetch(&self, host: &str) -> Result<BTreeSet<ServiceName>, FetchError>;
}

/// Queries the live state of one service.
#[async_trait]
pub trait ServiceProbe: Send + Sync {
    async fn query(&self, name: &str) -> ProbeOutcome;
}

/// Best-effort human-readable service names. Never fails; implementations
/// return `name` unchanged when nothing better is known.
#[async_trait]
pub trait DisplayNameLookup: Send + Sync {
    async fn resolve(&self, name: &str) -> String;
}

/// Delivers an alert to its recipients.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, payload: &AlertPayload) -> Result<(), SendError>;
}
