//! Alert delivery via SMTP.
//!
//! [`EmailDelivery`] wraps the `lettre` async SMTP transport and sends one
//! multipart (plain text + HTML) digest per alert to every configured
//! recipient. Configuration is read from environment variables; if
//! `SMTP_HOST` is not set, [`EmailConfig::from_lookup`] returns `None`.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use watchdog_core::alert::AlertPayload;
use watchdog_core::error::SendError;
use watchdog_core::providers::Notifier;

use crate::render;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// A recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// `ALERT_RECIPIENTS` is empty.
    #[error("No alert recipients configured")]
    NoRecipients,
}

impl From<EmailError> for SendError {
    fn from(value: EmailError) -> Self {
        match value {
            EmailError::Transport(e) => SendError::Transport(e.to_string()),
            EmailError::Address(e) => SendError::Address(e.to_string()),
            EmailError::Build(e) => SendError::Build(e),
            EmailError::NoRecipients => SendError::NoRecipients,
        }
    }
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "watchdog@localhost";

/// Default SMTP command timeout.
const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 30;

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Plain connection upgraded with STARTTLS.
    #[default]
    StartTls,
    /// Implicit TLS from the first byte (usually port 465).
    Tls,
    /// Unencrypted; only for local relays.
    None,
}

impl FromStr for SmtpSecurity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "starttls" => Ok(Self::StartTls),
            "tls" | "ssl" => Ok(Self::Tls),
            "none" | "plain" => Ok(Self::None),
            other => Err(format!("unknown SMTP security mode '{other}'")),
        }
    }
}

/// Configuration for the SMTP email delivery service.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    pub security: SmtpSecurity,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Every alert goes to all of these addresses.
    pub recipients: Vec<String>,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
    pub timeout: Duration,
}

impl EmailConfig {
    /// Load configuration through `lookup`, normally `std::env::var`.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured.
    ///
    /// | Variable            | Required | Default              |
    /// |---------------------|----------|----------------------|
    /// | `SMTP_HOST`         | yes      | --                    |
    /// | `SMTP_PORT`         | no       | `587`                |
    /// | `SMTP_SECURITY`     | no       | `starttls`           |
    /// | `SMTP_FROM`         | no       | `watchdog@localhost` |
    /// | `SMTP_USER`         | no       | --                    |
    /// | `SMTP_PASSWORD`     | no       | --                    |
    /// | `SMTP_TIMEOUT_SECS` | no       | `30`                 |
    /// | `ALERT_RECIPIENTS`  | no       | --                    |
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let smtp_host = lookup("SMTP_HOST").filter(|h| !h.trim().is_empty())?;

        let security = match lookup("SMTP_SECURITY") {
            Some(raw) => raw.parse::<SmtpSecurity>().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to STARTTLS");
                SmtpSecurity::default()
            }),
            None => SmtpSecurity::default(),
        };

        Some(Self {
            smtp_host,
            smtp_port: lookup("SMTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            security,
            from_address: lookup("SMTP_FROM").unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
            recipients: lookup("ALERT_RECIPIENTS")
                .map(|raw| parse_recipients(&raw))
                .unwrap_or_default(),
            smtp_user: lookup("SMTP_USER"),
            smtp_password: lookup("SMTP_PASSWORD"),
            timeout: Duration::from_secs(
                lookup("SMTP_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_SMTP_TIMEOUT_SECS),
            ),
        })
    }
}

/// Split a `;` or `,` separated address list, dropping blanks.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split([';', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends digest alert emails via SMTP.
pub struct EmailDelivery {
    config: EmailConfig,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailDelivery {
    /// Build the SMTP transport for `config`.
    ///
    /// Fails if the relay hostname is unusable for TLS. No connection is made
    /// until the first send.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let builder = match config.security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?,
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            }
        };

        let mut builder = builder
            .port(config.smtp_port)
            .timeout(Some(config.timeout));

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            config,
        })
    }

    /// Assemble the MIME message for `payload` without sending it.
    pub fn build_message(&self, payload: &AlertPayload) -> Result<Message, EmailError> {
        if self.config.recipients.is_empty() {
            return Err(EmailError::NoRecipients);
        }

        let from: Mailbox = self.config.from_address.parse()?;
        let mut builder = Message::builder()
            .from(from)
            .subject(render::subject(payload));

        for recipient in &self.config.recipients {
            let to: Mailbox = recipient.parse()?;
            builder = builder.to(to);
        }

        builder
            .multipart(MultiPart::alternative_plain_html(
                render::text_body(payload),
                render::html_body(payload),
            ))
            .map_err(|e| EmailError::Build(e.to_string()))
    }

    /// Send the alert for `payload` to every configured recipient.
    pub async fn deliver(&self, payload: &AlertPayload) -> Result<(), EmailError> {
        let email = self.build_message(payload)?;
        self.mailer.send(email).await?;

        tracing::info!(
            host = %payload.host,
            recipients = self.config.recipients.len(),
            services = payload.service_count(),
            "Alert email sent",
        );
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailDelivery {
    async fn send(&self, payload: &AlertPayload) -> Result<(), SendError> {
        self.deliver(payload).await.map_err(SendError::from)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
