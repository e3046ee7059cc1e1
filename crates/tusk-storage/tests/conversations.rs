// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation bookkeeping against a real SQLite file.

use std::sync::Arc;

use tempfile::TempDir;
use tusk_config::model::StorageConfig;
use tusk_core::{AccountId, StatusId, StorageAdapter, ThreadId};
use tusk_storage::SqliteStorage;

async fn storage() -> (TempDir, Arc<SqliteStorage>) {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::new(StorageConfig {
        database_path: dir.path().join("conv.db").to_string_lossy().into_owned(),
        wal_mode: true,
    });
    storage.initialize().await.unwrap();
    (dir, Arc::new(storage))
}

#[tokio::test]
async fn first_status_creates_unread_conversation() {
    let (_dir, storage) = storage().await;
    let bob = AccountId::from("bob");
    let thread = ThreadId::generate();
    let s1 = StatusId::generate();

    let conv = storage.upsert_conversation(&bob, &thread, &s1).await.unwrap();
    assert_eq!(conv.last_status_id, s1);
    assert!(!conv.read);
    assert_eq!(storage.conversations_for(&bob).await.unwrap().len(), 1);
}

#[tokio::test]
async fn newer_status_advances_and_reopens_read_conversation() {
    let (_dir, storage) = storage().await;
    let bob = AccountId::from("bob");
    let thread = ThreadId::generate();
    let s1 = StatusId::generate();
    let s2 = StatusId::generate();

    let conv = storage.upsert_conversation(&bob, &thread, &s1).await.unwrap();
    storage.mark_conversation_read(&conv.id).await.unwrap();
    assert!(storage.get_conversation(&bob, &thread).await.unwrap().unwrap().read);

    let conv2 = storage.upsert_conversation(&bob, &thread, &s2).await.unwrap();
    assert_eq!(conv2.id, conv.id, "same thread must reuse the row");
    assert_eq!(conv2.last_status_id, s2);
    assert!(!conv2.read);
}

#[tokio::test]
async fn replaying_a_status_changes_nothing() {
    let (_dir, storage) = storage().await;
    let bob = AccountId::from("bob");
    let thread = ThreadId::generate();
    let s1 = StatusId::generate();

    let conv = storage.upsert_conversation(&bob, &thread, &s1).await.unwrap();
    storage.mark_conversation_read(&conv.id).await.unwrap();

    let replay = storage.upsert_conversation(&bob, &thread, &s1).await.unwrap();
    assert!(replay.read, "re-filing a linked status must not mark unread");
    assert_eq!(replay.last_status_id, s1);
}

#[tokio::test]
async fn older_status_arriving_late_keeps_newest_last() {
    let (_dir, storage) = storage().await;
    let bob = AccountId::from("bob");
    let thread = ThreadId::generate();
    let older = StatusId::generate();
    let newer = StatusId::generate();

    storage.upsert_conversation(&bob, &thread, &newer).await.unwrap();
    let conv = storage.upsert_conversation(&bob, &thread, &older).await.unwrap();
    assert_eq!(conv.last_status_id, newer);
}

#[tokio::test]
async fn concurrent_upserts_produce_one_row() {
    let (_dir, storage) = storage().await;
    let bob = AccountId::from("bob");
    let thread = ThreadId::generate();
    let statuses: Vec<StatusId> = (0..16).map(|_| StatusId::generate()).collect();
    let newest = statuses.last().cloned().unwrap();

    let mut tasks = Vec::new();
    for status in statuses {
        let storage = Arc::clone(&storage);
        let bob = bob.clone();
        let thread = thread.clone();
        tasks.push(tokio::spawn(async move {
            storage.upsert_conversation(&bob, &thread, &status).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let rows = storage.conversations_for(&bob).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].last_status_id, newest);
}

#[tokio::test]
async fn removing_last_status_rolls_back_or_deletes() {
    let (_dir, storage) = storage().await;
    let bob = AccountId::from("bob");
    let carol = AccountId::from("carol");
    let thread = ThreadId::generate();
    let s1 = StatusId::generate();
    let s2 = StatusId::generate();

    storage.upsert_conversation(&bob, &thread, &s1).await.unwrap();
    storage.upsert_conversation(&bob, &thread, &s2).await.unwrap();
    storage.upsert_conversation(&carol, &thread, &s2).await.unwrap();

    let owners = storage.remove_status_from_conversations(&s2).await.unwrap();
    assert_eq!(owners, vec![bob.clone(), carol.clone()]);

    let bob_conv = storage.get_conversation(&bob, &thread).await.unwrap().unwrap();
    assert_eq!(bob_conv.last_status_id, s1);
    assert!(storage.get_conversation(&carol, &thread).await.unwrap().is_none());

    // Unknown statuses touch nothing.
    let owners = storage
        .remove_status_from_conversations(&StatusId::generate())
        .await
        .unwrap();
    assert!(owners.is_empty());
}

#[tokio::test]
async fn deleting_by_owner_leaves_other_accounts_alone() {
    let (_dir, storage) = storage().await;
    let bob = AccountId::from("bob");
    let carol = AccountId::from("carol");
    let thread = ThreadId::generate();
    let s1 = StatusId::generate();

    storage.upsert_conversation(&bob, &thread, &s1).await.unwrap();
    storage.upsert_conversation(&carol, &thread, &s1).await.unwrap();
    storage.delete_conversations_by_owner(&bob).await.unwrap();

    assert!(storage.conversations_for(&bob).await.unwrap().is_empty());
    assert_eq!(storage.conversations_for(&carol).await.unwrap().len(), 1);
}

#[tokio::test]
async fn marking_unknown_conversation_is_not_found() {
    let (_dir, storage) = storage().await;
    let err = storage
        .mark_conversation_read(&tusk_core::ConversationId::from("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, tusk_core::TuskError::NotFound { .. }));
}
