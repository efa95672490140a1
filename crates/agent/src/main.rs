//! `watchdog-agent` -- service watchdog daemon.
//!
//! Fetches the list of services this host must run from the roster API,
//! checks each one through systemd on a fixed interval and emails a digest
//! when a service stops or disappears, plus one reminder per day while any
//! issue persists.
//!
//! See [`watchdog_agent::config`] for the environment variables. `LOG_DIR`
//! additionally enables a daily rolling log file.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use watchdog_agent::config::AgentConfig;
use watchdog_agent::logging;
use watchdog_agent::monitor::ServiceMonitor;
use watchdog_agent::probe::SystemctlProbe;
use watchdog_agent::roster::RosterClient;
use watchdog_notify::EmailDelivery;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init_tracing();

    let config = AgentConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        host = %config.host_identity,
        roster_api = %config.roster_api_base_url,
        interval_secs = config.check_interval.as_secs(),
        probe_concurrency = config.probe_concurrency,
        clock_policy = ?config.clock_policy,
        recipients = config.email.recipients.len(),
        "Starting watchdog-agent",
    );

    let roster = RosterClient::new(&config.roster_api_base_url, config.roster_timeout)
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to build roster client");
            std::process::exit(1);
        });

    let notifier = EmailDelivery::new(config.email.clone()).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build SMTP transport");
        std::process::exit(1);
    });

    let probe = Arc::new(SystemctlProbe::new(config.probe_timeout));

    let mut monitor = ServiceMonitor::new(
        config.host_identity.clone(),
        Arc::new(roster),
        probe.clone(),
        probe,
        Arc::new(notifier),
    )
    .with_clock_policy(config.clock_policy)
    .with_probe_concurrency(config.probe_concurrency);

    let cancel = CancellationToken::new();
    let interval = config.check_interval;
    let monitor_handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { monitor.run(interval, cancel).await }
    });

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping after the current cycle");
    cancel.cancel();

    if let Err(e) = monitor_handle.await {
        tracing::error!(error = %e, "Service monitor task failed");
    }
    tracing::info!("watchdog-agent stopped");
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
