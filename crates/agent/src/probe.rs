//! Service state probe backed by systemd.
//!
//! Runs `systemctl show <unit> --property=LoadState,ActiveState` and maps the
//! result onto a [`ProbeOutcome`]. The same command with `Description`
//! supplies the display names used in alert emails.

use std::io::ErrorKind;
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use watchdog_core::providers::{DisplayNameLookup, ServiceProbe};
use watchdog_core::ProbeOutcome;

const SYSTEMCTL: &str = "systemctl";

/// Longest unit name accepted (systemd's own limit).
const MAX_UNIT_NAME_LEN: usize = 256;

/// Unit name characters systemd accepts. A leading `-` is refused so a name
/// can never be read as an option.
pub fn is_safe_service_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_UNIT_NAME_LEN
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | ':'))
}

fn is_denied_message(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    lower.contains("access denied")
        || lower.contains("permission denied")
        || lower.contains("interactive authentication required")
}

/// Map the output of `systemctl show --property=LoadState,ActiveState`.
pub fn classify_show_output(success: bool, stdout: &str, stderr: &str) -> ProbeOutcome {
    if is_denied_message(stderr) {
        return ProbeOutcome::AccessDenied;
    }
    if !success {
        let detail = stderr.trim();
        return ProbeOutcome::UnknownError(if detail.is_empty() {
            "systemctl exited with a failure status".to_string()
        } else {
            detail.to_string()
        });
    }

    let mut load_state = None;
    let mut active_state = None;
    for line in stdout.lines() {
        match line.split_once('=') {
            Some(("LoadState", value)) => load_state = Some(value.trim()),
            Some(("ActiveState", value)) => active_state = Some(value.trim()),
            _ => {}
        }
    }

    match (load_state, active_state) {
        (Some("not-found"), _) => ProbeOutcome::NotFound,
        (Some(_), Some("active" | "reloading")) => ProbeOutcome::Running,
        (Some(_), Some(_)) => ProbeOutcome::NotRunning,
        _ => ProbeOutcome::UnknownError(format!(
            "unexpected systemctl output: {}",
            stdout.trim()
        )),
    }
}

enum CommandFailure {
    Denied(String),
    Failed(String),
}

/// systemd-backed [`ServiceProbe`] and [`DisplayNameLookup`].
#[derive(Debug, Clone)]
pub struct SystemctlProbe {
    program: String,
    timeout: Duration,
}

impl SystemctlProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: SYSTEMCTL.to_string(),
            timeout,
        }
    }

    async fn show(&self, unit: &str, property_args: &[&str]) -> Result<Output, CommandFailure> {
        let result = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .arg("show")
                .arg(unit)
                .args(property_args)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) if e.kind() == ErrorKind::PermissionDenied => Err(CommandFailure::Denied(
                format!("Failed to execute {}: {e}", self.program),
            )),
            Ok(Err(e)) => Err(CommandFailure::Failed(format!(
                "Failed to execute {}: {e}",
                self.program
            ))),
            Err(_) => Err(CommandFailure::Failed(format!(
                "{} timed out after {:?}",
                self.program, self.timeout
            ))),
        }
    }
}

#[async_trait]
impl ServiceProbe for SystemctlProbe {
    async fn query(&self, name: &str) -> ProbeOutcome {
        if !is_safe_service_name(name) {
            return ProbeOutcome::UnknownError(format!("invalid service name '{name}'"));
        }

        match self.show(name, &["--property=LoadState,ActiveState"]).await {
            Ok(output) => classify_show_output(
                output.status.success(),
                &String::from_utf8_lossy(&output.stdout),
                &String::from_utf8_lossy(&output.stderr),
            ),
            Err(CommandFailure::Denied(detail)) => {
                tracing::debug!(service = %name, detail = %detail, "Probe denied");
                ProbeOutcome::AccessDenied
            }
            Err(CommandFailure::Failed(detail)) => ProbeOutcome::UnknownError(detail),
        }
    }
}

#[async_trait]
impl DisplayNameLookup for SystemctlProbe {
    async fn resolve(&self, name: &str) -> String {
        if !is_safe_service_name(name) {
            return name.to_string();
        }

        match self.show(name, &["--property=Description", "--value"]).await {
            Ok(output) if output.status.success() => {
                let description = String::from_utf8_lossy(&output.stdout);
                match description.trim() {
                    "" => name.to_string(),
                    trimmed => trimmed.to_string(),
                }
            }
            Ok(_) | Err(_) => {
                tracing::debug!(service = %name, "Display name lookup failed, using unit name");
                name.to_string()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn safe_service_names() {
        assert!(is_safe_service_name("nginx"));
        assert!(is_safe_service_name("nginx.service"));
        assert!(is_safe_service_name("getty@tty1.service"));
        assert!(is_safe_service_name("my-worker_1"));
    }

    #[test]
    fn unsafe_service_names() {
        assert!(!is_safe_service_name(""));
        assert!(!is_safe_service_name("foo; rm -rf /"));
        assert!(!is_safe_service_name("$(evil)"));
        assert!(!is_safe_service_name("foo bar"));
        assert!(!is_safe_service_name("--all"));
        assert!(!is_safe_service_name(&"a".repeat(300)));
    }

    #[test]
    fn active_unit_is_running() {
        let out = "LoadState=loaded\nActiveState=active\n";
        assert_eq!(classify_show_output(true, out, ""), ProbeOutcome::Running);
        let out = "ActiveState=reloading\nLoadState=loaded\n";
        assert_eq!(classify_show_output(true, out, ""), ProbeOutcome::Running);
    }

    #[test]
    fn inactive_or_failed_unit_is_not_running() {
        for state in ["inactive", "failed", "activating", "deactivating"] {
            let out = format!("LoadState=loaded\nActiveState={state}\n");
            assert_eq!(
                classify_show_output(true, &out, ""),
                ProbeOutcome::NotRunning,
                "state {state}"
            );
        }
    }

    #[test]
    fn unknown_unit_is_not_found() {
        let out = "LoadState=not-found\nActiveState=inactive\n";
        assert_eq!(classify_show_output(true, out, ""), ProbeOutcome::NotFound);
    }

    #[test]
    fn denial_on_stderr_is_access_denied() {
        let err = "Failed to get properties: Access denied\n";
        assert_eq!(classify_show_output(false, "", err), ProbeOutcome::AccessDenied);
    }

    #[test]
    fn other_failures_are_unknown_errors() {
        assert_matches!(
            classify_show_output(false, "", "Failed to connect to bus: No such file or directory"),
            ProbeOutcome::UnknownError(detail) if detail.contains("connect to bus")
        );
        assert_matches!(
            classify_show_output(true, "garbage", ""),
            ProbeOutcome::UnknownError(_)
        );
    }

    #[tokio::test]
    async fn unsafe_name_is_not_executed() {
        let probe = SystemctlProbe::new(Duration::from_secs(1));
        assert_matches!(probe.query("a b").await, ProbeOutcome::UnknownError(_));
        assert_eq!(probe.resolve("a b").await, "a b");
    }

    #[tokio::test]
    async fn missing_binary_is_an_unknown_error() {
        let probe = SystemctlProbe {
            program: "/nonexistent/systemctl".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert_matches!(probe.query("nginx").await, ProbeOutcome::UnknownError(_));
        assert_eq!(probe.resolve("nginx").await, "nginx");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_command_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let script = std::env::temp_dir().join(format!(
            "watchdog-slow-systemctl-{}",
            std::process::id()
        ));
        std::fs::write(&script, "#!/bin/sh\nexec sleep 5\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let probe = SystemctlProbe {
            program: script.display().to_string(),
            timeout: Duration::from_millis(50),
        };
        let outcome = probe.query("nginx").await;
        let display = probe.resolve("nginx").await;
        std::fs::remove_file(&script).ok();

        assert_matches!(
            outcome,
            ProbeOutcome::UnknownError(detail) if detail.contains("timed out after 50ms")
        );
        assert_eq!(display, "nginx");
    }
}
