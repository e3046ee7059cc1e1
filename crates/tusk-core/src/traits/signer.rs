// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request signing for outbound federation.

use crate::error::TuskError;
use crate::model::Account;
use crate::traits::adapter::PluginAdapter;

/// Computes the headers that authenticate an outbound POST as `actor`.
///
/// The signature scheme itself lives outside the pipeline; the delivery
/// client only attaches whatever headers the signer returns.
pub trait Signer: PluginAdapter {
    fn sign(
        &self,
        actor: &Account,
        inbox: &str,
        body: &[u8],
    ) -> Result<Vec<(String, String)>, TuskError>;
}
