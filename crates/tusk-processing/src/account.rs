// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use tusk_cache::EntityCache;
use tusk_core::{
    ActivityType, Handler, HandlerContext, Message, ObjectType, Payload, TuskError,
};

use crate::conversation::ConversationIndex;

/// Removes what the pipeline derived for an account that was deleted.
pub struct AccountCascadeHandler {
    conversations: ConversationIndex,
    cache: Arc<EntityCache>,
}

impl AccountCascadeHandler {
    pub fn new(conversations: ConversationIndex, cache: Arc<EntityCache>) -> Self {
        Self {
            conversations,
            cache,
        }
    }
}

#[async_trait]
impl Handler for AccountCascadeHandler {
    fn name(&self) -> &'static str {
        "account_cascade"
    }

    async fn handle(&self, _ctx: &HandlerContext, msg: &Message) -> Result<(), TuskError> {
        if let (ObjectType::Person, ActivityType::Delete, Payload::Account(id)) =
            (msg.object_type(), msg.activity_type(), msg.payload())
        {
            self.conversations.delete_for(id).await?;
            self.cache.invalidate_account(id);
            info!(account_id = %id, "account conversations removed");
        }
        Ok(())
    }
}
