//! Domain logic for the service watchdog.
//!
//! Everything here is pure (no I/O): the status tracker that turns probe
//! results into transitions, the scheduler that debounces alerts to new
//! issues plus one daily reminder, the alert payload, and the traits the
//! agent implements to feed them.

pub mod alert;
pub mod error;
pub mod providers;
pub mod scheduler;
pub mod status;
pub mod tracker;
pub mod types;

pub use alert::{AlertEntry, AlertPayload};
pub use error::{FetchError, SendError};
pub use scheduler::{decide, AlertClock, AlertClockPolicy, AlertDecision, AlertReason};
pub use status::{ProbeOutcome, ServiceClassification};
pub use tracker::{PollDelta, PollReport, ProbeFailure, StatusTracker};
pub use types::{ServiceName, Timestamp};
