// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Federation fan-out against wiremock inboxes.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tusk_config::model::{BackoffConfig, DeliveryConfig};
use tusk_core::{
    Account, ActivityType, FailureKind, Handler, HandlerContext, Message, ObjectType, Payload,
    StorageAdapter, TuskError, Visibility,
};
use tusk_federation::{DeliveryClient, FederationHandler};
use tusk_test_utils::fixtures::{follow, local_account, remote_account, report, status};
use tusk_test_utils::{InMemoryStorage, StaticSigner};

fn delivery_config(max_attempts: u32) -> DeliveryConfig {
    DeliveryConfig {
        retry: BackoffConfig {
            max_attempts,
            base_ms: 10,
            max_ms: 40,
            multiplier: 2.0,
        },
        ..DeliveryConfig::default()
    }
}

fn ctx() -> HandlerContext {
    HandlerContext::new(1, Duration::from_secs(30))
}

struct Fixture {
    storage: Arc<InMemoryStorage>,
    handler: FederationHandler,
    alice: Account,
}

async fn fixture(config: &DeliveryConfig, followers: &[&Account]) -> Fixture {
    let storage = Arc::new(InMemoryStorage::new());
    let alice = local_account("alice");
    storage.put_account(&alice).await.unwrap();
    for follower in followers {
        storage.put_account(follower).await.unwrap();
        storage.put_follow(&follow(follower, &alice)).await.unwrap();
    }
    let client = DeliveryClient::new(config, Arc::new(StaticSigner::new())).unwrap();
    let handler = FederationHandler::new(storage.clone(), client, config.concurrency);
    Fixture {
        storage,
        handler,
        alice,
    }
}

async fn note_create(fx: &Fixture, visibility: Visibility, mentions: &[&Account]) -> Message {
    let note = status(&fx.alice, visibility, mentions);
    fx.storage.put_status(&note).await.unwrap();
    Message::new(
        ObjectType::Note,
        ActivityType::Create,
        fx.alice.id.clone(),
        Payload::Status(note.id),
    )
}

fn inbox_path(account: &Account) -> String {
    format!("/users/{}/inbox", account.username)
}

#[tokio::test]
async fn failing_inbox_is_retried_without_redelivering_to_the_others() {
    let server = MockServer::start().await;
    let first = remote_account("first", &server.uri());
    let second = remote_account("second", &server.uri());
    let third = remote_account("third", &server.uri());

    Mock::given(method("POST"))
        .and(path(inbox_path(&first)))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(inbox_path(&second)))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(inbox_path(&second)))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(inbox_path(&third)))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let fx = fixture(&delivery_config(3), &[&first, &second, &third]).await;
    let msg = note_create(&fx, Visibility::Public, &[]).await;

    fx.handler.handle(&ctx(), &msg).await.unwrap();

    for account in [&first, &second, &third] {
        assert!(fx.storage.is_delivered(msg.id(), &account.inbox_uri).await.unwrap());
    }
    // Replaying the message finds every inbox delivered and sends nothing.
    fx.handler.handle(&ctx(), &msg).await.unwrap();
}

#[tokio::test]
async fn exhausted_inbox_is_reported_alone() {
    let server = MockServer::start().await;
    let first = remote_account("first", &server.uri());
    let second = remote_account("second", &server.uri());
    let third = remote_account("third", &server.uri());

    for ok in [&first, &third] {
        Mock::given(method("POST"))
            .and(path(inbox_path(ok)))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path(inbox_path(&second)))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let fx = fixture(&delivery_config(2), &[&first, &second, &third]).await;
    let msg = note_create(&fx, Visibility::Public, &[]).await;

    let err = fx.handler.handle(&ctx(), &msg).await.unwrap_err();
    assert!(!err.is_transient());
    match err {
        TuskError::FanOut { total, failures } => {
            assert_eq!(total, 3);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].inbox, second.inbox_uri);
            assert_eq!(failures[0].kind, FailureKind::Exhausted);
        }
        other => panic!("expected fan-out error, got {other:?}"),
    }

    // The exhausted inbox is settled; running the message again sends nothing.
    fx.handler.handle(&ctx(), &msg).await.unwrap();

    let recorded = fx.storage.failed_deliveries(msg.id());
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].kind, FailureKind::Exhausted);
}

#[tokio::test]
async fn gone_inbox_does_not_stop_a_transient_one_from_retrying() {
    let server = MockServer::start().await;
    let first = remote_account("first", &server.uri());
    let gone = remote_account("gone", &server.uri());
    let slow = remote_account("slow", &server.uri());

    Mock::given(method("POST"))
        .and(path(inbox_path(&first)))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(inbox_path(&gone)))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(inbox_path(&slow)))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(inbox_path(&slow)))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    // The backoff after the 502 overruns the deadline, so the inbox stays transient.
    let mut config = delivery_config(5);
    config.retry.base_ms = 60_000;
    config.retry.max_ms = 60_000;
    let fx = fixture(&config, &[&first, &gone, &slow]).await;
    let msg = note_create(&fx, Visibility::Public, &[]).await;
    let short = HandlerContext::new(1, Duration::from_secs(5));

    let err = fx.handler.handle(&short, &msg).await.unwrap_err();
    assert!(err.is_transient(), "got: {err}");
    let settled: Vec<_> = err.settled_recipients().collect();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].inbox, gone.inbox_uri);
    assert_eq!(settled[0].kind, FailureKind::Permanent);

    // The next attempt only reaches the transient inbox.
    fx.handler
        .handle(&HandlerContext::new(2, Duration::from_secs(5)), &msg)
        .await
        .unwrap();
    assert!(fx.storage.is_delivered(msg.id(), &slow.inbox_uri).await.unwrap());
    assert!(!fx.storage.is_delivered(msg.id(), &gone.inbox_uri).await.unwrap());
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    let gone = remote_account("gone", &server.uri());

    Mock::given(method("POST"))
        .and(path(inbox_path(&gone)))
        .respond_with(ResponseTemplate::new(410).set_body_string("account deleted"))
        .expect(1)
        .mount(&server)
        .await;

    let fx = fixture(&delivery_config(4), &[&gone]).await;
    let msg = note_create(&fx, Visibility::Public, &[]).await;

    let err = fx.handler.handle(&ctx(), &msg).await.unwrap_err();
    assert!(!err.is_transient());
    assert!(err.to_string().contains("account deleted"), "got: {err}");
}

#[tokio::test]
async fn rate_limited_delivery_waits_and_succeeds() {
    let server = MockServer::start().await;
    let bob = remote_account("bob", &server.uri());

    Mock::given(method("POST"))
        .and(path(inbox_path(&bob)))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(inbox_path(&bob)))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let config = delivery_config(3);
    let client = DeliveryClient::new(&config, Arc::new(StaticSigner::new())).unwrap();
    let alice = local_account("alice");

    client
        .deliver(&ctx(), &alice, &bob.inbox_uri, br#"{"type":"Create"}"#)
        .await
        .unwrap();
}

#[tokio::test]
async fn deliveries_carry_activity_headers_and_document() {
    let server = MockServer::start().await;
    let bob = remote_account("bob", &server.uri());

    let fx = fixture(&delivery_config(1), &[&bob]).await;
    let msg = note_create(&fx, Visibility::Public, &[]).await;

    Mock::given(method("POST"))
        .and(path(inbox_path(&bob)))
        .and(header("content-type", "application/activity+json"))
        .and(header_exists("signature"))
        .and(header_exists("user-agent"))
        .and(body_partial_json(json!({
            "type": "Create",
            "actor": fx.alice.uri,
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    fx.handler.handle(&ctx(), &msg).await.unwrap();
}

#[tokio::test]
async fn direct_statuses_reach_only_mentioned_accounts() {
    let server = MockServer::start().await;
    let follower = remote_account("follower", &server.uri());
    let mentioned = remote_account("mentioned", &server.uri());

    Mock::given(method("POST"))
        .and(path(inbox_path(&follower)))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(inbox_path(&mentioned)))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let fx = fixture(&delivery_config(1), &[&follower]).await;
    fx.storage.put_account(&mentioned).await.unwrap();
    let msg = note_create(&fx, Visibility::Direct, &[&mentioned]).await;

    fx.handler.handle(&ctx(), &msg).await.unwrap();
}

#[tokio::test]
async fn backoff_past_the_deadline_is_transient() {
    let server = MockServer::start().await;
    let bob = remote_account("bob", &server.uri());

    Mock::given(method("POST"))
        .and(path(inbox_path(&bob)))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = delivery_config(5);
    config.retry.base_ms = 60_000;
    config.retry.max_ms = 60_000;
    let fx = fixture(&config, &[&bob]).await;
    let msg = note_create(&fx, Visibility::Public, &[]).await;

    let err = fx
        .handler
        .handle(&HandlerContext::new(1, Duration::from_secs(5)), &msg)
        .await
        .unwrap_err();
    assert!(err.is_transient(), "got: {err}");
}

#[tokio::test]
async fn remote_origins_are_not_federated() {
    let server = MockServer::start().await;
    let fx = fixture(&delivery_config(1), &[]).await;
    let remote = remote_account("carol", &server.uri());
    fx.storage.put_account(&remote).await.unwrap();

    let note = status(&remote, Visibility::Public, &[]);
    fx.storage.put_status(&note).await.unwrap();
    let msg = Message::new(
        ObjectType::Note,
        ActivityType::Create,
        remote.id.clone(),
        Payload::Status(note.id),
    );

    fx.handler.handle(&ctx(), &msg).await.unwrap();
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

async fn flag_for(fx: &Fixture, target: &Account, forwarded: bool) -> Message {
    let opened = report(&fx.alice, target, forwarded);
    fx.storage.put_report(&opened).await.unwrap();
    Message::new(
        ObjectType::Flag,
        ActivityType::Create,
        fx.alice.id.clone(),
        Payload::Report(opened.id),
    )
    .with_target(target.id.clone())
}

#[tokio::test]
async fn forwarded_reports_send_a_flag_to_the_reported_server() {
    let server = MockServer::start().await;
    let troll = remote_account("troll", &server.uri());

    Mock::given(method("POST"))
        .and(path(inbox_path(&troll)))
        .and(body_partial_json(json!({
            "type": "Flag",
            "object": troll.uri,
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let fx = fixture(&delivery_config(1), &[]).await;
    fx.storage.put_account(&troll).await.unwrap();
    let msg = flag_for(&fx, &troll, true).await;

    fx.handler.handle(&ctx(), &msg).await.unwrap();
    assert!(fx.storage.is_delivered(msg.id(), &troll.inbox_uri).await.unwrap());
}

#[tokio::test]
async fn reports_stay_local_unless_forwarded() {
    let server = MockServer::start().await;
    let troll = remote_account("troll", &server.uri());
    let fx = fixture(&delivery_config(1), &[]).await;
    fx.storage.put_account(&troll).await.unwrap();

    let msg = flag_for(&fx, &troll, false).await;
    fx.handler.handle(&ctx(), &msg).await.unwrap();

    let local = local_account("neighbour");
    fx.storage.put_account(&local).await.unwrap();
    let msg = flag_for(&fx, &local, true).await;
    fx.handler.handle(&ctx(), &msg).await.unwrap();

    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
