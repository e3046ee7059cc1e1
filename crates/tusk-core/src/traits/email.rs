// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound email transport.

use async_trait::async_trait;

use crate::error::TuskError;
use crate::model::EmailKind;
use crate::traits::adapter::PluginAdapter;

/// A rendered email, ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub kind: EmailKind,
    pub subject: String,
    pub body: String,
}

/// Sends templated content to a single address.
#[async_trait]
pub trait EmailSender: PluginAdapter {
    async fn send(&self, address: &str, content: &EmailContent) -> Result<(), TuskError>;
}
