// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email sender that records instead of sending.
//!
//! `RecordingEmailSender` captures every successful `send()` for assertions
//! and can be told to fail the next N sends with a transient error.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tusk_core::{
    AdapterType, EmailContent, EmailKind, EmailSender, HealthStatus, PluginAdapter, TuskError,
};

/// One captured email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub address: String,
    pub content: EmailContent,
}

pub struct RecordingEmailSender {
    sent: Arc<Mutex<Vec<SentEmail>>>,
    failures_left: Arc<Mutex<usize>>,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failures_left: Arc::new(Mutex::new(0)),
        }
    }

    /// Make the next `n` sends fail with a transient email error.
    pub async fn fail_next(&self, n: usize) {
        *self.failures_left.lock().await = n;
    }

    /// Every email sent so far, in send order.
    pub async fn sent_emails(&self) -> Vec<SentEmail> {
        self.sent.lock().await.clone()
    }

    /// Emails of one kind sent so far.
    pub async fn sent_of_kind(&self, kind: EmailKind) -> Vec<SentEmail> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|e| e.content.kind == kind)
            .cloned()
            .collect()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

impl Default for RecordingEmailSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for RecordingEmailSender {
    fn name(&self) -> &str {
        "recording-email"
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
impl EmailSender for RecordingEmailSender {
    async fn send(&self, address: &str, content: &EmailContent) -> Result<(), TuskError> {
        {
            let mut left = self.failures_left.lock().await;
            if *left > 0 {
                *left -= 1;
                return Err(TuskError::Email {
                    message: format!("injected failure sending to {address}"),
                    source: None,
                });
            }
        }
        self.sent.lock().await.push(SentEmail {
            address: address.to_string(),
            content: content.clone(),
        });
        Ok(())
    }
}
