// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request headers derived from the body alone: `Date`, `Host`, `Digest`.
//!
//! Key-based signatures come from a [`Signer`] the host process provides;
//! this one is used when none is configured and as the base a key signer
//! can sign over.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use tusk_core::{Account, AdapterType, HealthStatus, PluginAdapter, Signer, TuskError};

#[derive(Debug, Default, Clone, Copy)]
pub struct DigestSigner;

impl DigestSigner {
    pub fn new() -> Self {
        Self
    }
}

/// `SHA-256=<base64>` digest of the request body.
pub fn body_digest(body: &[u8]) -> String {
    format!("SHA-256={}", STANDARD.encode(Sha256::digest(body)))
}

/// IMF-fixdate, as used by the HTTP `Date` header.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[async_trait]
impl PluginAdapter for DigestSigner {
    fn name(&self) -> &str {
        "digest"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Signer
    }

    async fn health_check(&self) -> Result<HealthStatus, TuskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TuskError> {
        Ok(())
    }
}

impl Signer for DigestSigner {
    fn sign(
        &self,
        _actor: &Account,
        inbox: &str,
        body: &[u8],
    ) -> Result<Vec<(String, String)>, TuskError> {
        let url = reqwest::Url::parse(inbox).map_err(|e| TuskError::Delivery {
            inbox: inbox.to_string(),
            kind: tusk_core::FailureKind::Permanent,
            message: format!("invalid inbox url: {e}"),
        })?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(TuskError::Delivery {
                    inbox: inbox.to_string(),
                    kind: tusk_core::FailureKind::Permanent,
                    message: "inbox url has no host".to_string(),
                });
            }
        };

        Ok(vec![
            ("date".to_string(), http_date(Utc::now())),
            ("host".to_string(), host),
            ("digest".to_string(), body_digest(body)),
        ])
    }
}
