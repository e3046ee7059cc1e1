// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory `StorageAdapter` for tests that do not need SQLite.
//!
//! Mirrors the SQLite adapter's semantics (conversation upsert rules,
//! delivered rows never downgraded, email guard) with plain collections
//! behind one mutex.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tusk_core::{
    Account, AccountId, AdapterType, Conversation, ConversationId, DeadLetter, EmailKind,
    FailureKind, Follow, FollowId, HealthStatus, MessageId, Notification, NotificationKind,
    PluginAdapter, Report, ReportId, Status, StatusId, StorageAdapter, ThreadId, TuskError, User,
    UserId,
};

/// A recorded delivery failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDelivery {
    pub inbox: String,
    pub kind: FailureKind,
    pub error: String,
}

#[derive(Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    users: HashMap<UserId, User>,
    statuses: HashMap<StatusId, Status>,
    follows: HashMap<FollowId, Follow>,
    reports: HashMap<ReportId, Report>,
    timelines: BTreeSet<(AccountId, StatusId)>,
    conversations: HashMap<ConversationId, Conversation>,
    conversation_statuses: BTreeSet<(ConversationId, StatusId)>,
    delivered: HashSet<(MessageId, String)>,
    failed: HashMap<(MessageId, String), FailedDelivery>,
    sent_emails: HashSet<(MessageId, EmailKind, String)>,
    notifications: Vec<Notification>,
    dead_letters: Vec<DeadLetter>,
}

#[derive(Default)]
pub struct InMemoryStorage {
    tables: Mutex<Tables>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Failures recorded for `message_id` that were never followed by a success.
    pub fn failed_deliveries(&self, message_id: &MessageId) -> Vec<FailedDelivery> {
        let tables = self.tables();
        let mut failures: Vec<FailedDelivery> = tables
            .failed
            .iter()
            .filter(|((id, inbox), _)| {
                id == message_id && !tables.delivered.contains(&(id.clone(), inbox.clone()))
            })
            .map(|(_, failure)| failure.clone())
            .collect();
        failures.sort_by(|a, b| a.inbox.cmp(&b.inbox));
        failures
    }
}

#[async_trait]
impl PluginAdapter for InMemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, TuskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TuskError> {
        Ok(())
    }
}

fn not_found(entity: &'static str, id: &str) -> TuskError {
    TuskError::NotFound {
        entity,
        id: id.to_string(),
    }
}

#[async_trait]
impl StorageAdapter for InMemoryStorage {
    async fn initialize(&self) -> Result<(), TuskError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), TuskError> {
        Ok(())
    }

    async fn put_account(&self, account: &Account) -> Result<(), TuskError> {
        self.tables()
            .accounts
            .insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, TuskError> {
        Ok(self.tables().accounts.get(id).cloned())
    }

    async fn put_user(&self, user: &User) -> Result<(), TuskError> {
        self.tables().users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, TuskError> {
        Ok(self.tables().users.get(id).cloned())
    }

    async fn get_user_by_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<User>, TuskError> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|u| &u.account_id == account_id)
            .cloned())
    }

    async fn moderators(&self) -> Result<Vec<User>, TuskError> {
        let mut moderators: Vec<User> = self
            .tables()
            .users
            .values()
            .filter(|u| u.moderator && u.approved && !u.disabled)
            .cloned()
            .collect();
        moderators.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(moderators)
    }

    async fn update_user_confirmation(
        &self,
        id: &UserId,
        token: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), TuskError> {
        let mut tables = self.tables();
        let user = tables
            .users
            .get_mut(id)
            .ok_or_else(|| not_found("user", id.as_str()))?;
        user.confirmation_token = Some(token.to_string());
        user.confirmation_sent_at = Some(sent_at);
        user.last_emailed_at = Some(sent_at);
        Ok(())
    }

    async fn put_status(&self, status: &Status) -> Result<(), TuskError> {
        let mut status = status.clone();
        status.mentions.sort();
        status.mentions.dedup();
        self.tables().statuses.insert(status.id.clone(), status);
        Ok(())
    }

    async fn get_status(&self, id: &StatusId) -> Result<Option<Status>, TuskError> {
        Ok(self.tables().statuses.get(id).cloned())
    }

    async fn delete_status(&self, id: &StatusId) -> Result<(), TuskError> {
        self.tables().statuses.remove(id);
        Ok(())
    }

    async fn put_follow(&self, follow: &Follow) -> Result<(), TuskError> {
        self.tables()
            .follows
            .entry(follow.id.clone())
            .and_modify(|f| f.pending = follow.pending)
            .or_insert_with(|| follow.clone());
        Ok(())
    }

    async fn get_follow(&self, id: &FollowId) -> Result<Option<Follow>, TuskError> {
        Ok(self.tables().follows.get(id).cloned())
    }

    async fn put_report(&self, report: &Report) -> Result<(), TuskError> {
        self.tables()
            .reports
            .insert(report.id.clone(), report.clone());
        Ok(())
    }

    async fn get_report(&self, id: &ReportId) -> Result<Option<Report>, TuskError> {
        Ok(self.tables().reports.get(id).cloned())
    }

    async fn local_followers(&self, account_id: &AccountId) -> Result<Vec<AccountId>, TuskError> {
        let tables = self.tables();
        let followers: BTreeSet<AccountId> = tables
            .follows
            .values()
            .filter(|f| &f.target_account_id == account_id)
            .filter(|f| tables.accounts.get(&f.account_id).is_some_and(Account::is_local))
            .map(|f| f.account_id.clone())
            .collect();
        Ok(followers.into_iter().collect())
    }

    async fn remote_follower_inboxes(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<String>, TuskError> {
        let tables = self.tables();
        let inboxes: BTreeSet<String> = tables
            .follows
            .values()
            .filter(|f| &f.target_account_id == account_id)
            .filter_map(|f| tables.accounts.get(&f.account_id))
            .filter(|a| !a.is_local())
            .map(|a| a.delivery_inbox().to_string())
            .collect();
        Ok(inboxes.into_iter().collect())
    }

    async fn timeline_insert(
        &self,
        owner: &AccountId,
        status_id: &StatusId,
    ) -> Result<(), TuskError> {
        self.tables()
            .timelines
            .insert((owner.clone(), status_id.clone()));
        Ok(())
    }

    async fn timeline_remove_status(&self, status_id: &StatusId) -> Result<(), TuskError> {
        self.tables().timelines.retain(|(_, s)| s != status_id);
        Ok(())
    }

    async fn home_timeline(&self, owner: &AccountId) -> Result<Vec<StatusId>, TuskError> {
        Ok(self
            .tables()
            .timelines
            .iter()
            .rev()
            .filter(|(o, _)| o == owner)
            .map(|(_, s)| s.clone())
            .collect())
    }

    async fn upsert_conversation(
        &self,
        account_id: &AccountId,
        thread_id: &ThreadId,
        status_id: &StatusId,
    ) -> Result<Conversation, TuskError> {
        let mut tables = self.tables();
        let now = Utc::now();
        let existing = tables
            .conversations
            .values()
            .find(|c| &c.account_id == account_id && &c.thread_id == thread_id)
            .map(|c| c.id.clone());
        let id = match existing {
            Some(id) => id,
            None => {
                let conversation = Conversation {
                    id: ConversationId::generate(),
                    account_id: account_id.clone(),
                    thread_id: thread_id.clone(),
                    last_status_id: status_id.clone(),
                    read: false,
                    updated_at: now,
                };
                let id = conversation.id.clone();
                tables.conversations.insert(id.clone(), conversation);
                id
            }
        };

        let newly_linked = tables
            .conversation_statuses
            .insert((id.clone(), status_id.clone()));
        let conversation = tables
            .conversations
            .get_mut(&id)
            .ok_or_else(|| not_found("conversation", id.as_str()))?;
        if newly_linked {
            if status_id > &conversation.last_status_id {
                conversation.last_status_id = status_id.clone();
            }
            conversation.read = false;
            conversation.updated_at = now;
        }
        Ok(conversation.clone())
    }

    async fn get_conversation(
        &self,
        account_id: &AccountId,
        thread_id: &ThreadId,
    ) -> Result<Option<Conversation>, TuskError> {
        Ok(self
            .tables()
            .conversations
            .values()
            .find(|c| &c.account_id == account_id && &c.thread_id == thread_id)
            .cloned())
    }

    async fn conversations_for(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Conversation>, TuskError> {
        let mut conversations: Vec<Conversation> = self
            .tables()
            .conversations
            .values()
            .filter(|c| &c.account_id == account_id)
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.last_status_id.cmp(&a.last_status_id));
        Ok(conversations)
    }

    async fn mark_conversation_read(&self, id: &ConversationId) -> Result<(), TuskError> {
        let mut tables = self.tables();
        let conversation = tables
            .conversations
            .get_mut(id)
            .ok_or_else(|| not_found("conversation", id.as_str()))?;
        conversation.read = true;
        Ok(())
    }

    async fn remove_status_from_conversations(
        &self,
        status_id: &StatusId,
    ) -> Result<Vec<AccountId>, TuskError> {
        let mut tables = self.tables();
        let affected: Vec<ConversationId> = tables
            .conversation_statuses
            .iter()
            .filter(|(_, s)| s == status_id)
            .map(|(c, _)| c.clone())
            .collect();
        tables.conversation_statuses.retain(|(_, s)| s != status_id);

        let mut owners = BTreeSet::new();
        for id in affected {
            let newest = tables
                .conversation_statuses
                .iter()
                .filter(|(c, _)| c == &id)
                .map(|(_, s)| s.clone())
                .max();
            let Some(conversation) = tables.conversations.get_mut(&id) else {
                continue;
            };
            owners.insert(conversation.account_id.clone());
            if &conversation.last_status_id != status_id {
                continue;
            }
            match newest {
                Some(newest) => {
                    conversation.last_status_id = newest;
                    conversation.updated_at = Utc::now();
                }
                None => {
                    tables.conversations.remove(&id);
                }
            }
        }
        Ok(owners.into_iter().collect())
    }

    async fn delete_conversations_by_owner(
        &self,
        account_id: &AccountId,
    ) -> Result<(), TuskError> {
        let mut tables = self.tables();
        let owned: HashSet<ConversationId> = tables
            .conversations
            .values()
            .filter(|c| &c.account_id == account_id)
            .map(|c| c.id.clone())
            .collect();
        tables.conversations.retain(|id, _| !owned.contains(id));
        tables
            .conversation_statuses
            .retain(|(c, _)| !owned.contains(c));
        Ok(())
    }

    async fn is_delivered(&self, message_id: &MessageId, inbox: &str) -> Result<bool, TuskError> {
        Ok(self
            .tables()
            .delivered
            .contains(&(message_id.clone(), inbox.to_string())))
    }

    async fn is_delivery_settled(
        &self,
        message_id: &MessageId,
        inbox: &str,
    ) -> Result<bool, TuskError> {
        let key = (message_id.clone(), inbox.to_string());
        let tables = self.tables();
        Ok(tables.delivered.contains(&key)
            || tables
                .failed
                .get(&key)
                .is_some_and(|f| f.kind != FailureKind::Transient))
    }

    async fn mark_delivered(&self, message_id: &MessageId, inbox: &str) -> Result<(), TuskError> {
        self.tables()
            .delivered
            .insert((message_id.clone(), inbox.to_string()));
        Ok(())
    }

    async fn record_delivery_failure(
        &self,
        message_id: &MessageId,
        inbox: &str,
        kind: FailureKind,
        error: &str,
    ) -> Result<(), TuskError> {
        let key = (message_id.clone(), inbox.to_string());
        let mut tables = self.tables();
        if !tables.delivered.contains(&key) {
            tables.failed.insert(
                key,
                FailedDelivery {
                    inbox: inbox.to_string(),
                    kind,
                    error: error.to_string(),
                },
            );
        }
        Ok(())
    }

    async fn email_sent(&self, message_id: &MessageId, kind: EmailKind) -> Result<bool, TuskError> {
        Ok(self
            .tables()
            .sent_emails
            .iter()
            .any(|(id, k, _)| id == message_id && *k == kind))
    }

    async fn email_sent_to(
        &self,
        message_id: &MessageId,
        kind: EmailKind,
        address: &str,
    ) -> Result<bool, TuskError> {
        Ok(self
            .tables()
            .sent_emails
            .contains(&(message_id.clone(), kind, address.to_string())))
    }

    async fn record_email_sent(
        &self,
        message_id: &MessageId,
        kind: EmailKind,
        address: &str,
    ) -> Result<(), TuskError> {
        self.tables()
            .sent_emails
            .insert((message_id.clone(), kind, address.to_string()));
        Ok(())
    }

    async fn put_notification(&self, notification: &Notification) -> Result<bool, TuskError> {
        let mut tables = self.tables();
        if tables.notifications.iter().any(|n| n.same_event(notification)) {
            return Ok(false);
        }
        tables.notifications.push(notification.clone());
        Ok(true)
    }

    async fn delete_notification(
        &self,
        kind: NotificationKind,
        target: &AccountId,
        origin: &AccountId,
        status_id: Option<&StatusId>,
    ) -> Result<(), TuskError> {
        self.tables().notifications.retain(|n| {
            !(n.kind == kind
                && &n.target_account_id == target
                && &n.origin_account_id == origin
                && n.status_id.as_ref() == status_id)
        });
        Ok(())
    }

    async fn notifications_for(
        &self,
        target: &AccountId,
    ) -> Result<Vec<Notification>, TuskError> {
        let mut found: Vec<Notification> = self
            .tables()
            .notifications
            .iter()
            .filter(|n| &n.target_account_id == target)
            .cloned()
            .collect();
        found.sort_by(|a, b| (b.created_at, &b.id).cmp(&(a.created_at, &a.id)));
        Ok(found)
    }

    async fn record_dead_letter(&self, dead_letter: &DeadLetter) -> Result<(), TuskError> {
        let mut tables = self.tables();
        tables.dead_letters.retain(|d| d.id != dead_letter.id);
        tables.dead_letters.push(dead_letter.clone());
        Ok(())
    }

    async fn dead_letters(&self, limit: usize) -> Result<Vec<DeadLetter>, TuskError> {
        Ok(self
            .tables()
            .dead_letters
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{local_account, reply, status};
    use tusk_core::Visibility;

    #[tokio::test]
    async fn conversation_rolls_back_to_newest_remaining_status() {
        let storage = InMemoryStorage::new();
        let alice = local_account("alice");
        let root = status(&alice, Visibility::Direct, &[]);
        let child = reply(&root, &alice, &[]);

        storage
            .upsert_conversation(&alice.id, &root.thread_id, &root.id)
            .await
            .unwrap();
        let conversation = storage
            .upsert_conversation(&alice.id, &root.thread_id, &child.id)
            .await
            .unwrap();
        assert_eq!(conversation.last_status_id, child.id);

        let owners = storage
            .remove_status_from_conversations(&child.id)
            .await
            .unwrap();
        assert_eq!(owners, vec![alice.id.clone()]);
        let conversation = storage
            .get_conversation(&alice.id, &root.thread_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.last_status_id, root.id);

        storage
            .remove_status_from_conversations(&root.id)
            .await
            .unwrap();
        assert!(
            storage
                .get_conversation(&alice.id, &root.thread_id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn failures_after_delivery_are_ignored() {
        let storage = InMemoryStorage::new();
        let id = MessageId::generate();
        storage.mark_delivered(&id, "https://a.example/inbox").await.unwrap();
        storage
            .record_delivery_failure(&id, "https://a.example/inbox", FailureKind::Transient, "late")
            .await
            .unwrap();
        assert!(storage.failed_deliveries(&id).is_empty());
    }
}
