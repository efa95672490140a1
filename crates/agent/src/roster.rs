//! HTTP client for the roster API.
//!
//! The roster of a host is served at
//! `GET {base}/WatchDogWinServices/GetWinServicesByServername/{host}` inside
//! the API's standard `{ message, result, data }` envelope.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Url;
use serde::Deserialize;

use watchdog_core::providers::RosterProvider;
use watchdog_core::{FetchError, ServiceName};

/// Path segments appended to the base URL, before the host segment.
const ROSTER_PATH: [&str; 2] = ["WatchDogWinServices", "GetWinServicesByServername"];

/// Response envelope shared by every roster API endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    #[serde(default, alias = "Message")]
    pub message: Option<String>,
    #[serde(default, alias = "Result")]
    pub result: bool,
    #[serde(default, alias = "Data")]
    pub data: Option<T>,
}

/// One monitored-service row as returned by the roster API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoredService {
    #[serde(default, alias = "Pid")]
    pub pid: Option<i64>,
    #[serde(default, alias = "ServiceName")]
    pub service_name: Option<String>,
    #[serde(default, alias = "ServerName")]
    pub server_name: Option<String>,
}

/// Decode a roster response body into the set of service names.
///
/// `data` is decoded only once the envelope reports success, so a rejected
/// request may carry any payload shape. Rows with a blank service name are
/// skipped.
pub fn parse_roster(body: &str) -> Result<BTreeSet<ServiceName>, FetchError> {
    let envelope: ApiResponse<serde_json::Value> =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    if !envelope.result {
        return Err(FetchError::Rejected(
            envelope
                .message
                .unwrap_or_else(|| "no message".to_string()),
        ));
    }

    let rows: Vec<MonitoredService> = match envelope.data {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(data) => {
            serde_json::from_value(data).map_err(|e| FetchError::Decode(e.to_string()))?
        }
    };

    let mut roster = BTreeSet::new();
    for row in rows {
        match row.service_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                roster.insert(name.to_string());
            }
            _ => tracing::warn!(
                pid = ?row.pid,
                server = ?row.server_name,
                "Skipping roster entry with blank service name",
            ),
        }
    }
    Ok(roster)
}

// ---------------------------------------------------------------------------
// RosterClient
// ---------------------------------------------------------------------------

/// [`RosterProvider`] backed by the roster HTTP API.
#[derive(Debug, Clone)]
pub struct RosterClient {
    client: reqwest::Client,
    base_url: Url,
}

impl RosterClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| FetchError::Endpoint(format!("'{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::Endpoint(format!(
                "'{base_url}' cannot be used as a base URL"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Roster URL for `host`. The host is percent-encoded as a single path
    /// segment.
    pub fn roster_url(&self, host: &str) -> Result<Url, FetchError> {
        if host.trim().is_empty() {
            return Err(FetchError::Endpoint("host identity is empty".to_string()));
        }

        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                FetchError::Endpoint(format!("'{}' cannot be used as a base URL", self.base_url))
            })?;
            segments.pop_if_empty().extend(ROSTER_PATH).push(host);
        }
        Ok(url)
    }
}

#[async_trait]
impl RosterProvider for RosterClient {
    async fn fetch(&self, host: &str) -> Result<BTreeSet<ServiceName>, FetchError> {
        let url = self.roster_url(host)?;
        tracing::debug!(url = %url, "Fetching service roster");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;
        parse_roster(&body)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
