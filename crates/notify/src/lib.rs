//! Outbound alert delivery for the service watchdog.
//!
//! - [`EmailDelivery`]: SMTP transport implementing
//!   [`Notifier`](watchdog_core::providers::Notifier).
//! - [`render`]: subject and body rendering for digest alerts.

pub mod email;
pub mod render;

pub use email::{EmailConfig, EmailDelivery, EmailError, SmtpSecurity};
