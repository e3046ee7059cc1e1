// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email transports.
//!
//! [`SmtpSender`] relays through the configured SMTP server with STARTTLS.
//! [`NoopSender`] is used when email is disabled and only logs.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{debug, info, warn};

use tusk_config::model::EmailConfig;
use tusk_core::{
    AdapterType, EmailContent, EmailSender, HealthStatus, PluginAdapter, TuskError,
};

pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpSender {
    pub fn new(config: &EmailConfig) -> Result<Self, TuskError> {
        let host = config
            .smtp_host
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| TuskError::Config("email.smtp_host is required".into()))?;
        let from: Mailbox = config
            .from
            .as_deref()
            .ok_or_else(|| TuskError::Config("email.from is required".into()))?
            .parse()
            .map_err(|e| TuskError::Config(format!("invalid email.from address: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| TuskError::Config(format!("invalid SMTP relay `{host}`: {e}")))?
            .port(config.smtp_port);
        if let (Some(user), Some(pass)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl PluginAdapter for SmtpSender {
    fn name(&self) -> &str {
        "smtp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Email
    }

    async fn health_check(&self) -> Result<HealthStatus, TuskError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(HealthStatus::Healthy),
            Ok(false) => Ok(HealthStatus::Degraded("SMTP server refused NOOP".into())),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("SMTP unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), TuskError> {
        Ok(())
    }
}

#[async_trait]
impl EmailSender for SmtpSender {
    async fn send(&self, address: &str, content: &EmailContent) -> Result<(), TuskError> {
        let to: Mailbox = address.parse().map_err(|e| {
            TuskError::MalformedMessage(format!("invalid recipient address `{address}`: {e}"))
        })?;
        let email = lettre::Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(content.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(content.body.clone())
            .map_err(|e| TuskError::Internal(format!("failed to build email: {e}")))?;

        self.transport.send(email).await.map_err(|e| {
            warn!(kind = %content.kind, error = %e, "SMTP send failed");
            TuskError::Email {
                message: format!("failed to send {} email", content.kind),
                source: Some(Box::new(e)),
            }
        })?;
        debug!(kind = %content.kind, "email sent");
        Ok(())
    }
}

/// Drops every email. Used when `[email] enabled = false`.
#[derive(Debug, Default)]
pub struct NoopSender;

#[async_trait]
impl PluginAdapter for NoopSender {
    fn name(&self) -> &str {
        "noop-email"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Email
    }

    async fn health_check(&self) -> Result<HealthStatus, TuskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TuskError> {
        Ok(())
    }
}

#[async_trait]
impl EmailSender for NoopSender {
    async fn send(&self, _address: &str, content: &EmailContent) -> Result<(), TuskError> {
        info!(kind = %content.kind, "email disabled, not sending");
        Ok(())
    }
}

/// The sender `[email]` asks for.
pub fn sender_from_config(config: &EmailConfig) -> Result<Arc<dyn EmailSender>, TuskError> {
    if config.enabled {
        Ok(Arc::new(SmtpSender::new(config)?))
    } else {
        Ok(Arc::new(NoopSender))
    }
}
