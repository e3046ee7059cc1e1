// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The unit of side-effect work.

use async_trait::async_trait;

use crate::error::TuskError;
use crate::types::{HandlerContext, Message};

/// One independent side effect, registered in the dispatch table.
///
/// Handlers are invoked at least once per message and must tolerate replays:
/// upsert instead of insert, and check stored markers before sending anything.
/// Handlers only read the message.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Stable name used in logs, metrics, and retry bookkeeping.
    fn name(&self) -> &'static str;

    async fn handle(&self, ctx: &HandlerContext, msg: &Message) -> Result<(), TuskError>;
}
