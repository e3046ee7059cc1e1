// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Home timeline fan-out and conversation upkeep for statuses.
//!
//! Conversation rows are written before the owners' cached conversation
//! lists are dropped, inside this one handler.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use tusk_cache::EntityCache;
use tusk_core::{
    AccountId, ActivityType, Handler, HandlerContext, Message, ObjectType, Payload, Status,
    StatusId, StorageAdapter, TuskError, Visibility,
};

use crate::conversation::ConversationIndex;

pub struct TimelineHandler {
    storage: Arc<dyn StorageAdapter>,
    conversations: ConversationIndex,
    cache: Arc<EntityCache>,
}

impl TimelineHandler {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        conversations: ConversationIndex,
        cache: Arc<EntityCache>,
    ) -> Self {
        Self {
            storage,
            conversations,
            cache,
        }
    }

    /// Local home timelines `status` belongs in.
    async fn audience(&self, status: &Status) -> Result<BTreeSet<AccountId>, TuskError> {
        let mut owners: BTreeSet<AccountId> = self
            .conversations
            .participants(status)
            .await?
            .into_iter()
            .collect();
        if status.visibility != Visibility::Direct {
            owners.extend(self.storage.local_followers(&status.account_id).await?);
        }
        Ok(owners)
    }

    async fn status_filed(&self, id: &StatusId) -> Result<(), TuskError> {
        let Some(status) = self.storage.get_status(id).await? else {
            debug!(status_id = %id, "status is gone, nothing to file");
            return Ok(());
        };

        let owners = self.audience(&status).await?;
        for owner in &owners {
            self.storage.timeline_insert(owner, &status.id).await?;
        }

        for conversation in self.conversations.file_status(&status).await? {
            self.cache.invalidate_conversations(&conversation.account_id);
        }
        debug!(status_id = %id, timelines = owners.len(), "status fanned out");
        Ok(())
    }

    async fn status_deleted(&self, id: &StatusId) -> Result<(), TuskError> {
        self.storage.timeline_remove_status(id).await?;
        for owner in self.conversations.remove_status(id).await? {
            self.cache.invalidate_conversations(&owner);
        }
        Ok(())
    }
}

#[async_trait]
impl Handler for TimelineHandler {
    fn name(&self) -> &'static str {
        "timeline"
    }

    async fn handle(&self, _ctx: &HandlerContext, msg: &Message) -> Result<(), TuskError> {
        match (msg.object_type(), msg.activity_type(), msg.payload()) {
            (ObjectType::Note, ActivityType::Create | ActivityType::Update, Payload::Status(id)) => {
                self.status_filed(id).await
            }
            (ObjectType::Note, ActivityType::Delete, Payload::Status(id)) => {
                self.status_deleted(id).await
            }
            _ => Ok(()),
        }
    }
}
