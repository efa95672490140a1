//! Agent configuration loaded from environment variables.
//!
//! | Variable               | Required | Default        | Description                              |
//! |------------------------|----------|----------------|------------------------------------------|
//! | `ROSTER_API_BASE_URL`  | yes      | --             | Base URL of the roster API               |
//! | `HOST_IDENTITY`        | no       | local hostname | Host whose roster is monitored           |
//! | `CHECK_INTERVAL_SECS`  | no       | `60`           | Seconds between poll cycles (must be > 0)|
//! | `PROBE_CONCURRENCY`    | no       | `4`            | Probes in flight at once                 |
//! | `PROBE_TIMEOUT_SECS`   | no       | `10`           | Timeout of one probe command             |
//! | `ROSTER_TIMEOUT_SECS`  | no       | `30`           | HTTP timeout of the roster request       |
//! | `ALERT_CLOCK_POLICY`   | no       | `on-attempt`   | `on-attempt` or `on-delivery`            |
//!
//! SMTP settings and `ALERT_RECIPIENTS` are read by
//! [`EmailConfig`](watchdog_notify::EmailConfig).

use std::str::FromStr;
use std::time::Duration;

use watchdog_core::AlertClockPolicy;
use watchdog_notify::EmailConfig;

const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;
const DEFAULT_PROBE_CONCURRENCY: usize = 4;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_ROSTER_TIMEOUT_SECS: u64 = 30;

/// Used when neither `HOST_IDENTITY`, `HOSTNAME` nor `/etc/hostname` yields a name.
const FALLBACK_HOST: &str = "localhost";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Runtime settings for the monitor process.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub roster_api_base_url: String,
    pub host_identity: String,
    pub check_interval: Duration,
    pub probe_concurrency: usize,
    pub probe_timeout: Duration,
    pub roster_timeout: Duration,
    pub clock_policy: AlertClockPolicy,
    pub email: EmailConfig,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let roster_api_base_url = non_blank(&lookup, "ROSTER_API_BASE_URL")
            .ok_or(ConfigError::Missing("ROSTER_API_BASE_URL"))?;

        let host_identity = non_blank(&lookup, "HOST_IDENTITY")
            .or_else(|| non_blank(&lookup, "HOSTNAME"))
            .unwrap_or_else(system_hostname);

        let check_interval_secs: u64 =
            parse_or(&lookup, "CHECK_INTERVAL_SECS", DEFAULT_CHECK_INTERVAL_SECS)?;
        if check_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "CHECK_INTERVAL_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let probe_concurrency: usize =
            parse_or(&lookup, "PROBE_CONCURRENCY", DEFAULT_PROBE_CONCURRENCY)?;

        let clock_policy = match non_blank(&lookup, "ALERT_CLOCK_POLICY") {
            Some(raw) => raw
                .parse::<AlertClockPolicy>()
                .map_err(|reason| ConfigError::Invalid {
                    name: "ALERT_CLOCK_POLICY",
                    reason,
                })?,
            None => AlertClockPolicy::default(),
        };

        let email = EmailConfig::from_lookup(&lookup).ok_or(ConfigError::Missing("SMTP_HOST"))?;
        if email.recipients.is_empty() {
            return Err(ConfigError::Missing("ALERT_RECIPIENTS"));
        }

        Ok(Self {
            roster_api_base_url,
            host_identity,
            check_interval: Duration::from_secs(check_interval_secs),
            probe_concurrency: probe_concurrency.max(1),
            probe_timeout: Duration::from_secs(parse_or(
                &lookup,
                "PROBE_TIMEOUT_SECS",
                DEFAULT_PROBE_TIMEOUT_SECS,
            )?),
            roster_timeout: Duration::from_secs(parse_or(
                &lookup,
                "ROSTER_TIMEOUT_SECS",
                DEFAULT_ROSTER_TIMEOUT_SECS,
            )?),
            clock_policy,
            email,
        })
    }
}

fn non_blank<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_blank(lookup, name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: format!("'{raw}': {e}"),
        }),
        None => Ok(default),
    }
}

fn system_hostname() -> String {
    std::fs::read_to_string("/etc/hostname")
        .ok()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| FALLBACK_HOST.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
