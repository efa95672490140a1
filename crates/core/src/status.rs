//! Probe outcomes and the tracker's durable service classifications.

use std::fmt;

use serde::Serialize;

/// The tracker's judgement about a single service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceClassification {
    /// The service exists and is running.
    Healthy,
    /// The service exists but is not running.
    Stopped,
    /// The service could not be located on the host at all.
    Missing,
}

impl ServiceClassification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Stopped => "stopped",
            Self::Missing => "missing",
        }
    }
}

impl fmt::Display for ServiceClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw result of querying the OS service manager for one service.
///
/// Only the first three variants carry information. `AccessDenied` and
/// `UnknownError` leave the tracker's knowledge of the service unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Running,
    NotRunning,
    NotFound,
    AccessDenied,
    UnknownError(String),
}

impl ProbeOutcome {
    /// Map the outcome onto a classification, or `None` when the probe could
    /// not determine one.
    pub fn classification(&self) -> Option<ServiceClassification> {
        match self {
            Self::Running => Some(ServiceClassification::Healthy),
            Self::NotRunning => Some(ServiceClassification::Stopped),
            Self::NotFound => Some(ServiceClassification::Missing),
            Self::AccessDenied | Self::UnknownError(_) => None,
        }
    }
}
