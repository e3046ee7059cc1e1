// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-account conversation index.
//!
//! A direct status is filed into one conversation per local participant
//! (the author when local, plus every local mention). Filing is an atomic
//! upsert in storage, so concurrent statuses in one thread cannot lose an
//! update to `last_status_id` or `read`.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use tusk_core::{
    AccountId, Conversation, ConversationId, Status, StatusId, StorageAdapter, TuskError,
    Visibility,
};

#[derive(Clone)]
pub struct ConversationIndex {
    storage: Arc<dyn StorageAdapter>,
}

impl ConversationIndex {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Local accounts taking part in `status`, sorted.
    pub async fn participants(&self, status: &Status) -> Result<Vec<AccountId>, TuskError> {
        let mut participants = BTreeSet::new();
        for id in std::iter::once(&status.account_id).chain(&status.mentions) {
            if let Some(account) = self.storage.get_account(id).await?
                && account.is_local()
            {
                participants.insert(account.id);
            }
        }
        Ok(participants.into_iter().collect())
    }

    /// File `status` into its participants' conversations.
    ///
    /// Non-direct statuses have no conversations and return nothing.
    pub async fn file_status(&self, status: &Status) -> Result<Vec<Conversation>, TuskError> {
        if status.visibility != Visibility::Direct {
            return Ok(Vec::new());
        }
        let mut filed = Vec::new();
        for owner in self.participants(status).await? {
            let conversation = self
                .storage
                .upsert_conversation(&owner, &status.thread_id, &status.id)
                .await?;
            debug!(
                conversation_id = %conversation.id,
                account_id = %owner,
                last_status_id = %conversation.last_status_id,
                "conversation updated"
            );
            filed.push(conversation);
        }
        Ok(filed)
    }

    /// Unlink a deleted status. Returns the owners whose conversations changed.
    pub async fn remove_status(&self, id: &StatusId) -> Result<Vec<AccountId>, TuskError> {
        self.storage.remove_status_from_conversations(id).await
    }

    /// The one transition not driven by the pipeline: the owner read it.
    pub async fn mark_read(&self, id: &ConversationId) -> Result<(), TuskError> {
        self.storage.mark_conversation_read(id).await
    }

    pub async fn delete_for(&self, owner: &AccountId) -> Result<(), TuskError> {
        self.storage.delete_conversations_by_owner(owner).await
    }
}
