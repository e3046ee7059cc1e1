// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signer that emits one fixed `signature` header.

use async_trait::async_trait;

use tusk_core::{Account, AdapterType, HealthStatus, PluginAdapter, Signer, TuskError};

/// Adds `signature: keyId="<actor uri>#main-key",test` to every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticSigner;

impl StaticSigner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PluginAdapter for StaticSigner {
    fn name(&self) -> &str {
        "static-signer"
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

impl Signer for StaticSigner {
    fn sign(
        &self,
        actor: &Account,
        _inbox: &str,
        _body: &[u8],
    ) -> Result<Vec<(String, String)>, TuskError> {
        Ok(vec![(
            "signature".to_string(),
            format!("keyId=\"{}#main-key\",test", actor.uri),
        )])
    }
}
