//! SMTP delivery for queued mail.
//!
//! [`SmtpMailer`] wraps the `lettre` async SMTP transport to send queued
//! plain-text messages. Configuration is loaded from environment variables;
//! if `SMTP_HOST` is not set, [`EmailConfig::from_env`] returns `None` and
//! the drain loop is skipped entirely — absent credentials are a logged
//! configuration gap, not a crash.

use opsdesk_db::models::mail::QueuedMail;

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
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@opsdesk.local";

/// Configuration for the SMTP delivery service.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured and should be skipped.
    ///
    /// | Variable        | Required | Default                  |
    /// |-----------------|----------|--------------------------|
    /// | `SMTP_HOST`     | yes      | —                        |
    /// | `SMTP_PORT`     | no       | `587`                    |
    /// | `SMTP_FROM`     | no       | `noreply@opsdesk.local`  |
    /// | `SMTP_USER`     | no       | —                        |
    /// | `SMTP_PASSWORD` | no       | —                        |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        let smtp_port = std::env::var("SMTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_SMTP_PORT);
        let from_address =
            std::env::var("SMTP_FROM").unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string());
        Some(Self {
            smtp_host,
            smtp_port,
            from_address,
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }

    /// Username/password pair, present only when both halves are set.
    fn credentials(&self) -> Option<(String, String)> {
        match (&self.smtp_user, &self.smtp_password) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SmtpMailer
// ---------------------------------------------------------------------------

/// Sends queued mail rows via SMTP.
pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    /// Create a new mailer with the given configuration.
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Deliver one queued message to all of its recipients.
    pub async fn deliver(&self, mail: &QueuedMail) -> Result<(), EmailError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let mut builder = Message::builder().from(self.config.from_address.parse()?);
        for recipient in &mail.recipients {
            builder = builder.to(recipient.parse()?);
        }
        let email = builder
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
                .port(self.config.smtp_port);

        if let Some((user, pass)) = self.config.credentials() {
            transport_builder = transport_builder.credentials(Credentials::new(user, pass));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;

        tracing::info!(mail_id = mail.id, subject = %mail.subject, "Queued mail delivered");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_host: "relay.internal".to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            from_address: DEFAULT_FROM_ADDRESS.to_string(),
            smtp_user: None,
            smtp_password: None,
        }
    }

    fn queued(recipients: &[&str]) -> QueuedMail {
        QueuedMail {
            id: 1,
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
            subject: "Renewal due".to_string(),
            body: "The license renews next week.".to_string(),
            created_at: Utc::now(),
            sent_at: None,
        }
    }

    // One test for all the environment-dependent behavior, so nothing
    // races on the process environment.
    #[test]
    fn from_env_requires_host_and_fills_defaults() {
        for var in ["SMTP_HOST", "SMTP_PORT", "SMTP_FROM", "SMTP_USER", "SMTP_PASSWORD"] {
            std::env::remove_var(var);
        }
        assert!(EmailConfig::from_env().is_none());

        std::env::set_var("SMTP_HOST", "relay.internal");
        let config = EmailConfig::from_env().unwrap();
        std::env::remove_var("SMTP_HOST");

        assert_eq!(config.smtp_host, "relay.internal");
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.from_address, "noreply@opsdesk.local");
        assert!(config.credentials().is_none());
    }

    #[test]
    fn credentials_require_both_halves() {
        let mut config = config();
        config.smtp_user = Some("mailer".to_string());
        assert!(config.credentials().is_none());
        config.smtp_password = Some("hunter2".to_string());
        assert_eq!(
            config.credentials(),
            Some(("mailer".to_string(), "hunter2".to_string()))
        );
    }

    // Both failures below happen while assembling the message, before any
    // connection attempt.
    #[tokio::test]
    async fn deliver_rejects_malformed_recipient() {
        let mailer = SmtpMailer::new(config());
        let err = mailer
            .deliver(&queued(&["not an address"]))
            .await
            .unwrap_err();
        assert_matches!(err, EmailError::Address(_));
    }

    #[tokio::test]
    async fn deliver_requires_at_least_one_recipient() {
        let mailer = SmtpMailer::new(config());
        let err = mailer.deliver(&queued(&[])).await.unwrap_err();
        assert_matches!(err, EmailError::Build(_));
    }
}
