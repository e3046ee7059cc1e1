// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use tusk_config::model::StorageConfig;
use tusk_core::{
    Account, AccountId, AdapterType, Conversation, ConversationId, DeadLetter, EmailKind,
    FailureKind, Follow, FollowId, HealthStatus, MessageId, Notification, NotificationKind,
    PluginAdapter, Report, ReportId, Status, StatusId, StorageAdapter, ThreadId, TuskError, User,
    UserId,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The database is opened on the first call to [`StorageAdapter::initialize`];
/// every other operation fails with a storage error until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, TuskError> {
        self.db.get().ok_or_else(|| TuskError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, TuskError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TuskError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), TuskError> {
        let path = self.config.database_path.clone();
        if let Some(parent) = std::path::Path::new(&path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(TuskError::storage)?;
        }
        let db = Database::open(&path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| TuskError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), TuskError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Primary rows ---

    async fn put_account(&self, account: &Account) -> Result<(), TuskError> {
        queries::accounts::put_account(self.db()?, account).await
    }

    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, TuskError> {
        queries::accounts::get_account(self.db()?, id).await
    }

    async fn put_user(&self, user: &User) -> Result<(), TuskError> {
        queries::accounts::put_user(self.db()?, user).await
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, TuskError> {
        queries::accounts::get_user(self.db()?, id).await
    }

    async fn get_user_by_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<User>, TuskError> {
        queries::accounts::get_user_by_account(self.db()?, account_id).await
    }

    async fn moderators(&self) -> Result<Vec<User>, TuskError> {
        queries::accounts::moderators(self.db()?).await
    }

    async fn update_user_confirmation(
        &self,
        id: &UserId,
        token: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), TuskError> {
        queries::accounts::update_user_confirmation(self.db()?, id, token, sent_at).await
    }

    async fn put_status(&self, status: &Status) -> Result<(), TuskError> {
        queries::statuses::put_status(self.db()?, status).await
    }

    async fn get_status(&self, id: &StatusId) -> Result<Option<Status>, TuskError> {
        queries::statuses::get_status(self.db()?, id).await
    }

    async fn delete_status(&self, id: &StatusId) -> Result<(), TuskError> {
        queries::statuses::delete_status(self.db()?, id).await
    }

    async fn put_follow(&self, follow: &Follow) -> Result<(), TuskError> {
        queries::accounts::put_follow(self.db()?, follow).await
    }

    async fn get_follow(&self, id: &FollowId) -> Result<Option<Follow>, TuskError> {
        queries::accounts::get_follow(self.db()?, id).await
    }

    async fn put_report(&self, report: &Report) -> Result<(), TuskError> {
        queries::accounts::put_report(self.db()?, report).await
    }

    async fn get_report(&self, id: &ReportId) -> Result<Option<Report>, TuskError> {
        queries::accounts::get_report(self.db()?, id).await
    }

    async fn local_followers(&self, account_id: &AccountId) -> Result<Vec<AccountId>, TuskError> {
        queries::accounts::local_followers(self.db()?, account_id).await
    }

    async fn remote_follower_inboxes(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<String>, TuskError> {
        queries::accounts::remote_follower_inboxes(self.db()?, account_id).await
    }

    // --- Home timelines ---

    async fn timeline_insert(
        &self,
        owner: &AccountId,
        status_id: &StatusId,
    ) -> Result<(), TuskError> {
        queries::timelines::insert(self.db()?, owner, status_id).await
    }

    async fn timeline_remove_status(&self, status_id: &StatusId) -> Result<(), TuskError> {
        queries::timelines::remove_status(self.db()?, status_id).await
    }

    async fn home_timeline(&self, owner: &AccountId) -> Result<Vec<StatusId>, TuskError> {
        queries::timelines::home_timeline(self.db()?, owner).await
    }

    // --- Conversations ---

    async fn upsert_conversation(
        &self,
        account_id: &AccountId,
        thread_id: &ThreadId,
        status_id: &StatusId,
    ) -> Result<Conversation, TuskError> {
        queries::conversations::upsert(self.db()?, account_id, thread_id, status_id).await
    }

    async fn get_conversation(
        &self,
        account_id: &AccountId,
        thread_id: &ThreadId,
    ) -> Result<Option<Conversation>, TuskError> {
        queries::conversations::get(self.db()?, account_id, thread_id).await
    }

    async fn conversations_for(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Conversation>, TuskError> {
        queries::conversations::list_for(self.db()?, account_id).await
    }

    async fn mark_conversation_read(&self, id: &ConversationId) -> Result<(), TuskError> {
        queries::conversations::mark_read(self.db()?, id).await
    }

    async fn remove_status_from_conversations(
        &self,
        status_id: &StatusId,
    ) -> Result<Vec<AccountId>, TuskError> {
        queries::conversations::remove_status(self.db()?, status_id).await
    }

    async fn delete_conversations_by_owner(
        &self,
        account_id: &AccountId,
    ) -> Result<(), TuskError> {
        queries::conversations::delete_by_owner(self.db()?, account_id).await
    }

    // --- Delivery bookkeeping ---

    async fn is_delivered(&self, message_id: &MessageId, inbox: &str) -> Result<bool, TuskError> {
        queries::deliveries::is_delivered(self.db()?, message_id, inbox).await
    }

    async fn is_delivery_settled(
        &self,
        message_id: &MessageId,
        inbox: &str,
    ) -> Result<bool, TuskError> {
        queries::deliveries::is_settled(self.db()?, message_id, inbox).await
    }

    async fn mark_delivered(&self, message_id: &MessageId, inbox: &str) -> Result<(), TuskError> {
        queries::deliveries::mark_delivered(self.db()?, message_id, inbox).await
    }

    async fn record_delivery_failure(
        &self,
        message_id: &MessageId,
        inbox: &str,
        kind: FailureKind,
        error: &str,
    ) -> Result<(), TuskError> {
        queries::deliveries::record_failure(self.db()?, message_id, inbox, kind, error).await
    }

    // --- Email bookkeeping ---

    async fn email_sent(&self, message_id: &MessageId, kind: EmailKind) -> Result<bool, TuskError> {
        queries::emails::was_sent(self.db()?, message_id, kind).await
    }

    async fn record_email_sent(
        &self,
        message_id: &MessageId,
        kind: EmailKind,
        address: &str,
    ) -> Result<(), TuskError> {
        queries::emails::record_sent(self.db()?, message_id, kind, address).await
    }

    async fn email_sent_to(
        &self,
        message_id: &MessageId,
        kind: EmailKind,
        address: &str,
    ) -> Result<bool, TuskError> {
        queries::emails::was_sent_to(self.db()?, message_id, kind, address).await
    }

    // --- Notifications ---

    async fn put_notification(&self, notification: &Notification) -> Result<bool, TuskError> {
        queries::notifications::insert(self.db()?, notification).await
    }

    async fn delete_notification(
        &self,
        kind: NotificationKind,
        target: &AccountId,
        origin: &AccountId,
        status_id: Option<&StatusId>,
    ) -> Result<(), TuskError> {
        queries::notifications::delete(self.db()?, kind, target, origin, status_id).await
    }

    async fn notifications_for(
        &self,
        target: &AccountId,
    ) -> Result<Vec<Notification>, TuskError> {
        queries::notifications::for_target(self.db()?, target).await
    }

    // --- Dead letters ---

    async fn record_dead_letter(&self, dead_letter: &DeadLetter) -> Result<(), TuskError> {
        queries::dead_letters::insert(self.db()?, dead_letter).await
    }

    async fn dead_letters(&self, limit: usize) -> Result<Vec<DeadLetter>, TuskError> {
        queries::dead_letters::list(self.db()?, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tusk_core::{ActivityType, Message, ObjectType, Payload, Visibility};

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    async fn open(dir: &tempfile::TempDir, name: &str) -> SqliteStorage {
        let db_path = dir.path().join(name);
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        storage
    }

    fn account(id: &str, domain: Option<&str>) -> Account {
        let host = domain.unwrap_or("local.example");
        Account {
            id: AccountId::from(id),
            username: id.to_string(),
            domain: domain.map(str::to_string),
            uri: format!("https://{host}/users/{id}"),
            inbox_uri: format!("https://{host}/users/{id}/inbox"),
            shared_inbox_uri: domain.map(|d| format!("https://{d}/inbox")),
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("dir").join("tusk.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let storage = open(&dir, "double_init.db").await;
        assert!(storage.initialize().await.is_err(), "second initialize should fail");
    }

    #[tokio::test]
    async fn health_check_tracks_initialization() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("health.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert!(storage.health_check().await.is_err());
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        storage.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn status_round_trips_with_mentions() {
        let dir = tempdir().unwrap();
        let storage = open(&dir, "status.db").await;
        storage.put_account(&account("alice", None)).await.unwrap();

        let status = Status {
            id: StatusId::generate(),
            account_id: AccountId::from("alice"),
            uri: "https://local.example/statuses/1".into(),
            thread_id: ThreadId::generate(),
            in_reply_to_id: None,
            visibility: Visibility::Direct,
            mentions: vec![AccountId::from("bob"), AccountId::from("carol")],
            created_at: Utc::now(),
        };
        storage.put_status(&status).await.unwrap();

        let loaded = storage.get_status(&status.id).await.unwrap().unwrap();
        assert_eq!(loaded.mentions, status.mentions);
        assert_eq!(loaded.visibility, Visibility::Direct);

        storage.delete_status(&status.id).await.unwrap();
        assert!(storage.get_status(&status.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn followers_split_into_local_ids_and_remote_inboxes() {
        let dir = tempdir().unwrap();
        let storage = open(&dir, "followers.db").await;
        for a in [
            account("alice", None),
            account("bob", None),
            account("r1", Some("remote.example")),
            account("r2", Some("remote.example")),
        ] {
            storage.put_account(&a).await.unwrap();
        }
        for follower in ["bob", "r1", "r2"] {
            storage
                .put_follow(&Follow {
                    id: FollowId::generate(),
                    account_id: AccountId::from(follower),
                    target_account_id: AccountId::from("alice"),
                    uri: format!("https://x/follows/{follower}"),
                    pending: false,
                })
                .await
                .unwrap();
        }

        let local = storage.local_followers(&AccountId::from("alice")).await.unwrap();
        assert_eq!(local, vec![AccountId::from("bob")]);

        // Both remote followers share one inbox.
        let inboxes = storage
            .remote_follower_inboxes(&AccountId::from("alice"))
            .await
            .unwrap();
        assert_eq!(inboxes, vec!["https://remote.example/inbox".to_string()]);
    }

    #[tokio::test]
    async fn delivered_inboxes_are_never_downgraded() {
        let dir = tempdir().unwrap();
        let storage = open(&dir, "deliveries.db").await;
        let msg = MessageId::generate();
        let inbox = "https://remote.example/inbox";

        assert!(!storage.is_delivered(&msg, inbox).await.unwrap());
        storage
            .record_delivery_failure(&msg, inbox, FailureKind::Transient, "503")
            .await
            .unwrap();
        assert!(!storage.is_delivered(&msg, inbox).await.unwrap());

        storage.mark_delivered(&msg, inbox).await.unwrap();
        storage
            .record_delivery_failure(&msg, inbox, FailureKind::Permanent, "late failure")
            .await
            .unwrap();
        assert!(storage.is_delivered(&msg, inbox).await.unwrap());
    }

    #[tokio::test]
    async fn terminal_failures_settle_an_inbox() {
        let dir = tempdir().unwrap();
        let storage = open(&dir, "settled.db").await;
        let msg = MessageId::generate();
        let flaky = "https://flaky.example/inbox";
        let gone = "https://gone.example/inbox";

        storage
            .record_delivery_failure(&msg, flaky, FailureKind::Transient, "deadline")
            .await
            .unwrap();
        storage
            .record_delivery_failure(&msg, gone, FailureKind::Permanent, "410")
            .await
            .unwrap();

        assert!(!storage.is_delivery_settled(&msg, flaky).await.unwrap());
        assert!(storage.is_delivery_settled(&msg, gone).await.unwrap());
        assert!(!storage.is_delivered(&msg, gone).await.unwrap());

        storage.mark_delivered(&msg, flaky).await.unwrap();
        assert!(storage.is_delivery_settled(&msg, flaky).await.unwrap());
    }

    #[tokio::test]
    async fn email_guard_is_per_message_and_kind() {
        let dir = tempdir().unwrap();
        let storage = open(&dir, "emails.db").await;
        let msg = MessageId::generate();

        assert!(!storage.email_sent(&msg, EmailKind::ConfirmEmail).await.unwrap());
        storage
            .record_email_sent(&msg, EmailKind::ConfirmEmail, "a@example.org")
            .await
            .unwrap();
        storage
            .record_email_sent(&msg, EmailKind::ConfirmEmail, "a@example.org")
            .await
            .unwrap();
        assert!(storage.email_sent(&msg, EmailKind::ConfirmEmail).await.unwrap());
        assert!(!storage.email_sent(&msg, EmailKind::ReportClosed).await.unwrap());
    }

    #[tokio::test]
    async fn moderator_emails_are_guarded_per_address() {
        let dir = tempdir().unwrap();
        let storage = open(&dir, "admin-emails.db").await;
        let msg = MessageId::generate();
        let kind = EmailKind::AdminReportOpened;

        storage
            .record_email_sent(&msg, kind, "mod1@example.org")
            .await
            .unwrap();
        storage
            .record_email_sent(&msg, kind, "mod2@example.org")
            .await
            .unwrap();
        assert!(storage.email_sent_to(&msg, kind, "mod1@example.org").await.unwrap());
        assert!(storage.email_sent_to(&msg, kind, "mod2@example.org").await.unwrap());
        assert!(!storage.email_sent_to(&msg, kind, "mod3@example.org").await.unwrap());
    }

    #[tokio::test]
    async fn only_active_moderators_are_listed() {
        let dir = tempdir().unwrap();
        let storage = open(&dir, "moderators.db").await;
        for (id, moderator, disabled) in [
            ("u-admin", true, false),
            ("u-plain", false, false),
            ("u-suspended", true, true),
        ] {
            let acct = account(id, None);
            storage.put_account(&acct).await.unwrap();
            storage
                .put_user(&User {
                    id: UserId::from(id),
                    account_id: acct.id.clone(),
                    email: Some(format!("{id}@example.org")),
                    unconfirmed_email: None,
                    confirmation_token: None,
                    confirmation_sent_at: None,
                    confirmed_at: Some(Utc::now()),
                    approved: true,
                    disabled,
                    moderator,
                    last_emailed_at: None,
                })
                .await
                .unwrap();
        }

        let moderators = storage.moderators().await.unwrap();
        assert_eq!(moderators.len(), 1);
        assert_eq!(moderators[0].id, UserId::from("u-admin"));
        assert!(moderators[0].moderator);
    }

    #[tokio::test]
    async fn notifications_are_unique_per_event() {
        let dir = tempdir().unwrap();
        let storage = open(&dir, "notifications.db").await;
        let alice = AccountId::from("alice");
        let bob = AccountId::from("bob");
        let status = StatusId::generate();

        let fave = Notification::new(NotificationKind::Favourite, &alice, &bob, Some(&status));
        assert!(storage.put_notification(&fave).await.unwrap());
        let again = Notification::new(NotificationKind::Favourite, &alice, &bob, Some(&status));
        assert!(!storage.put_notification(&again).await.unwrap());

        let request = Notification::new(NotificationKind::FollowRequest, &alice, &bob, None);
        assert!(storage.put_notification(&request).await.unwrap());
        assert!(
            !storage
                .put_notification(&Notification::new(
                    NotificationKind::FollowRequest,
                    &alice,
                    &bob,
                    None
                ))
                .await
                .unwrap()
        );

        let stored = storage.notifications_for(&alice).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().any(|n| n.same_event(&fave)));
        assert!(stored.iter().any(|n| n.same_event(&request) && n.status_id.is_none()));

        storage
            .delete_notification(NotificationKind::FollowRequest, &alice, &bob, None)
            .await
            .unwrap();
        let stored = storage.notifications_for(&alice).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].kind, NotificationKind::Favourite);
        assert!(storage.notifications_for(&bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dead_letters_keep_the_full_message() {
        let dir = tempdir().unwrap();
        let storage = open(&dir, "dead.db").await;
        let message = Message::new(
            ObjectType::Note,
            ActivityType::Create,
            AccountId::from("alice"),
            Payload::Status(StatusId::generate()),
        )
        .with_target(AccountId::from("bob"));

        storage
            .record_dead_letter(&DeadLetter {
                id: "dl-1".into(),
                message: message.clone(),
                attempts: 5,
                error: "delivery error".into(),
                dead_lettered_at: Utc::now(),
            })
            .await
            .unwrap();

        let letters = storage.dead_letters(10).await.unwrap();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].message, message);
        assert_eq!(letters[0].attempts, 5);
        storage.close().await.unwrap();
    }
}
