// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, in-memory).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{FailureKind, TuskError};
use crate::model::{
    Account, Conversation, DeadLetter, EmailKind, Follow, Notification, NotificationKind, Report,
    Status, User,
};
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    AccountId, ConversationId, FollowId, MessageId, ReportId, StatusId, ThreadId, UserId,
};

/// Adapter for storage and persistence backends.
///
/// Primary rows (accounts, users, statuses, follows, reports) are written by
/// the request path before a message is pushed. Everything else here is
/// derived state owned by the pipeline.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), TuskError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), TuskError>;

    // --- Primary rows ---

    async fn put_account(&self, account: &Account) -> Result<(), TuskError>;
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, TuskError>;

    async fn put_user(&self, user: &User) -> Result<(), TuskError>;
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, TuskError>;
    async fn get_user_by_account(&self, account_id: &AccountId)
    -> Result<Option<User>, TuskError>;

    /// Approved, enabled moderators, ordered by user id.
    async fn moderators(&self) -> Result<Vec<User>, TuskError>;

    /// Record that a confirmation email carrying `token` went out at `sent_at`.
    async fn update_user_confirmation(
        &self,
        id: &UserId,
        token: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), TuskError>;

    async fn put_status(&self, status: &Status) -> Result<(), TuskError>;
    async fn get_status(&self, id: &StatusId) -> Result<Option<Status>, TuskError>;
    async fn delete_status(&self, id: &StatusId) -> Result<(), TuskError>;

    async fn put_follow(&self, follow: &Follow) -> Result<(), TuskError>;
    async fn get_follow(&self, id: &FollowId) -> Result<Option<Follow>, TuskError>;

    async fn put_report(&self, report: &Report) -> Result<(), TuskError>;
    async fn get_report(&self, id: &ReportId) -> Result<Option<Report>, TuskError>;

    /// Local accounts following `account_id`.
    async fn local_followers(&self, account_id: &AccountId) -> Result<Vec<AccountId>, TuskError>;

    /// Distinct delivery inboxes of remote accounts following `account_id`.
    async fn remote_follower_inboxes(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<String>, TuskError>;

    // --- Home timelines ---

    /// Insert a status into an account's home timeline. Re-inserting is a no-op.
    async fn timeline_insert(
        &self,
        owner: &AccountId,
        status_id: &StatusId,
    ) -> Result<(), TuskError>;

    /// Remove a status from every home timeline.
    async fn timeline_remove_status(&self, status_id: &StatusId) -> Result<(), TuskError>;

    /// Status ids in an account's home timeline, newest first.
    async fn home_timeline(&self, owner: &AccountId) -> Result<Vec<StatusId>, TuskError>;

    // --- Conversations ---

    /// Atomically file `status_id` into the `(account_id, thread_id)` conversation.
    ///
    /// Creates the row if absent. A status not yet linked to the conversation
    /// becomes the last status when it is the newest, and marks the row unread.
    /// Filing an already-linked status changes nothing.
    async fn upsert_conversation(
        &self,
        account_id: &AccountId,
        thread_id: &ThreadId,
        status_id: &StatusId,
    ) -> Result<Conversation, TuskError>;

    async fn get_conversation(
        &self,
        account_id: &AccountId,
        thread_id: &ThreadId,
    ) -> Result<Option<Conversation>, TuskError>;

    async fn conversations_for(&self, account_id: &AccountId)
    -> Result<Vec<Conversation>, TuskError>;

    async fn mark_conversation_read(&self, id: &ConversationId) -> Result<(), TuskError>;

    /// Unlink a status from every conversation.
    ///
    /// Conversations whose last status it was point at the newest remaining
    /// status, or are deleted when none remain. Returns the owners of every
    /// touched conversation.
    async fn remove_status_from_conversations(
        &self,
        status_id: &StatusId,
    ) -> Result<Vec<AccountId>, TuskError>;

    /// Delete every conversation owned by `account_id`.
    async fn delete_conversations_by_owner(&self, account_id: &AccountId)
    -> Result<(), TuskError>;

    // --- Delivery bookkeeping ---

    async fn is_delivered(&self, message_id: &MessageId, inbox: &str) -> Result<bool, TuskError>;

    /// True once `inbox` needs nothing more for this message: it was
    /// delivered, or it failed permanently or ran out of attempts.
    async fn is_delivery_settled(&self, message_id: &MessageId, inbox: &str)
    -> Result<bool, TuskError>;

    async fn mark_delivered(&self, message_id: &MessageId, inbox: &str) -> Result<(), TuskError>;

    async fn record_delivery_failure(
        &self,
        message_id: &MessageId,
        inbox: &str,
        kind: FailureKind,
        error: &str,
    ) -> Result<(), TuskError>;

    // --- Email bookkeeping ---

    async fn email_sent(&self, message_id: &MessageId, kind: EmailKind)
    -> Result<bool, TuskError>;

    /// Like [`email_sent`](Self::email_sent), for emails that go to several addresses.
    async fn email_sent_to(
        &self,
        message_id: &MessageId,
        kind: EmailKind,
        address: &str,
    ) -> Result<bool, TuskError>;

    async fn record_email_sent(
        &self,
        message_id: &MessageId,
        kind: EmailKind,
        address: &str,
    ) -> Result<(), TuskError>;

    // --- Notifications ---

    /// Store `notification` unless one for the same event exists.
    ///
    /// Returns false when it was already there.
    async fn put_notification(&self, notification: &Notification) -> Result<bool, TuskError>;

    async fn delete_notification(
        &self,
        kind: NotificationKind,
        target: &AccountId,
        origin: &AccountId,
        status_id: Option<&StatusId>,
    ) -> Result<(), TuskError>;

    /// Notifications for `target`, newest first.
    async fn notifications_for(&self, target: &AccountId)
    -> Result<Vec<Notification>, TuskError>;

    // --- Dead letters ---

    async fn record_dead_letter(&self, dead_letter: &DeadLetter) -> Result<(), TuskError>;

    async fn dead_letters(&self, limit: usize) -> Result<Vec<DeadLetter>, TuskError>;
}
