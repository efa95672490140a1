/// Opaque service identifier as it appears in a host's roster.
pub type ServiceName = String;

/// Alert timestamps are host-local, matching the calendar used for the daily
/// reminder rule.
pub type Timestamp = chrono::DateTime<chrono::Local>;
