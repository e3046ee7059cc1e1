// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status messages through the running pipeline over SQLite.

use std::time::Duration;

use tusk_core::{
    Account, ActivityType, Message, ObjectType, Payload, Status, StorageAdapter, Visibility,
};
use tusk_test_utils::TestHarness;
use tusk_test_utils::fixtures::{follow, local_account, reply, status};

const IDLE: Duration = Duration::from_secs(10);

async fn harness() -> TestHarness {
    TestHarness::builder().build().await.unwrap()
}

async fn accounts(h: &TestHarness, names: &[&str]) -> Vec<Account> {
    let mut out = Vec::new();
    for name in names {
        let account = local_account(name);
        h.storage.put_account(&account).await.unwrap();
        out.push(account);
    }
    out
}

async fn post(h: &TestHarness, status: &Status) {
    h.storage.put_status(status).await.unwrap();
    h.push(Message::new(
        ObjectType::Note,
        ActivityType::Create,
        status.account_id.clone(),
        Payload::Status(status.id.clone()),
    ))
    .unwrap();
    assert!(h.wait_idle(IDLE).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn direct_thread_keeps_one_conversation_per_participant() {
    let h = harness().await;
    let people = accounts(&h, &["alice", "bob"]).await;
    let (alice, bob) = (&people[0], &people[1]);

    // (a) first status creates an unread conversation.
    let s1 = status(alice, Visibility::Direct, &[bob]);
    post(&h, &s1).await;
    let c1 = h
        .storage
        .get_conversation(&alice.id, &s1.thread_id)
        .await
        .unwrap()
        .expect("conversation created");
    assert_eq!(c1.last_status_id, s1.id);
    assert!(!c1.read);
    assert!(
        h.storage
            .get_conversation(&bob.id, &s1.thread_id)
            .await
            .unwrap()
            .is_some()
    );

    // (b) a reply updates the same row.
    let s2 = reply(&s1, bob, &[alice]);
    post(&h, &s2).await;
    let c2 = h
        .storage
        .get_conversation(&alice.id, &s1.thread_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(c2.id, c1.id);
    assert_eq!(c2.last_status_id, s2.id);
    assert!(!c2.read);

    // (c) reading then replying marks it unread again.
    h.processor.conversations().mark_read(&c2.id).await.unwrap();
    let s3 = reply(&s2, alice, &[bob]);
    post(&h, &s3).await;
    let c3 = h
        .storage
        .get_conversation(&alice.id, &s1.thread_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(c3.id, c1.id);
    assert_eq!(c3.last_status_id, s3.id);
    assert!(!c3.read);
    assert_eq!(h.storage.conversations_for(&alice.id).await.unwrap().len(), 1);

    // Deleting the newest status rolls the conversation back.
    h.storage.delete_status(&s3.id).await.unwrap();
    h.push(
        Message::new(
            ObjectType::Note,
            ActivityType::Delete,
            alice.id.clone(),
            Payload::Status(s3.id.clone()),
        )
        .with_target_uri(s3.uri.clone()),
    )
    .unwrap();
    assert!(h.wait_idle(IDLE).await);
    let rolled_back = h
        .storage
        .get_conversation(&alice.id, &s1.thread_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rolled_back.last_status_id, s2.id);
    assert!(!h.storage.home_timeline(&alice.id).await.unwrap().contains(&s3.id));

    h.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn public_statuses_reach_follower_timelines_without_conversations() {
    let h = harness().await;
    let people = accounts(&h, &["alice", "carol", "dave"]).await;
    let (alice, carol, dave) = (&people[0], &people[1], &people[2]);
    h.storage.put_follow(&follow(carol, alice)).await.unwrap();

    let note = status(alice, Visibility::Public, &[]);
    post(&h, &note).await;

    assert_eq!(h.storage.home_timeline(&alice.id).await.unwrap(), vec![note.id.clone()]);
    assert_eq!(h.storage.home_timeline(&carol.id).await.unwrap(), vec![note.id.clone()]);
    assert!(h.storage.home_timeline(&dave.id).await.unwrap().is_empty());
    assert!(h.storage.conversations_for(&alice.id).await.unwrap().is_empty());

    h.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_replies_leave_the_newest_last() {
    let h = harness().await;
    let names: Vec<String> = (0..8).map(|i| format!("author{i}")).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let mut people = accounts(&h, &["alice"]).await;
    people.extend(accounts(&h, &name_refs).await);
    let alice = people[0].clone();

    let root = status(&alice, Visibility::Direct, &[]);
    post(&h, &root).await;

    let mut replies = Vec::new();
    for author in &people[1..] {
        let r = reply(&root, author, &[&alice]);
        h.storage.put_status(&r).await.unwrap();
        replies.push(r);
    }
    // Different origins, so these may run in parallel.
    for r in &replies {
        h.push(Message::new(
            ObjectType::Note,
            ActivityType::Create,
            r.account_id.clone(),
            Payload::Status(r.id.clone()),
        ))
        .unwrap();
    }
    assert!(h.wait_idle(IDLE).await);

    let conversations = h.storage.conversations_for(&alice.id).await.unwrap();
    assert_eq!(conversations.len(), 1);
    let newest = replies.iter().map(|r| r.id.clone()).max().unwrap();
    assert_eq!(conversations[0].last_status_id, newest);
    assert!(!conversations[0].read);

    h.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn account_deletion_removes_conversations_and_cache() {
    let h = harness().await;
    let people = accounts(&h, &["alice", "bob"]).await;
    let (alice, bob) = (&people[0], &people[1]);

    let note = status(alice, Visibility::Direct, &[bob]);
    post(&h, &note).await;

    let cached = h
        .processor
        .cache()
        .conversations(h.storage.as_ref(), &alice.id)
        .await
        .unwrap();
    assert_eq!(cached.len(), 1);

    h.push(Message::new(
        ObjectType::Person,
        ActivityType::Delete,
        alice.id.clone(),
        Payload::Account(alice.id.clone()),
    ))
    .unwrap();
    assert!(h.wait_idle(IDLE).await);

    assert!(h.storage.conversations_for(&alice.id).await.unwrap().is_empty());
    let cached = h
        .processor
        .cache()
        .conversations(h.storage.as_ref(), &alice.id)
        .await
        .unwrap();
    assert!(cached.is_empty());
    // Bob's side of the thread is untouched.
    assert_eq!(h.storage.conversations_for(&bob.id).await.unwrap().len(), 1);

    h.stop().await.unwrap();
}
