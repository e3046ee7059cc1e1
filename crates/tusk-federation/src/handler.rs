// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The federation delivery handler.
//!
//! Works out the remote inboxes in an activity's audience and delivers to
//! each independently. Inboxes settled on an earlier attempt (delivered, or
//! failed for good) are skipped; one inbox failing never stops the others.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use tusk_core::{
    Account, AccountId, ActivityType, FailureKind, Handler, HandlerContext, Message, ObjectType,
    Payload, RecipientFailure, StorageAdapter, TuskError, Visibility,
};

use crate::activity::build_activity;
use crate::client::DeliveryClient;
use crate::recording;

/// What to send and where.
#[derive(Debug, PartialEq, Eq)]
pub struct DeliveryPlan {
    pub object_uri: String,
    pub inboxes: BTreeSet<String>,
}

pub struct FederationHandler {
    storage: Arc<dyn StorageAdapter>,
    client: DeliveryClient,
    concurrency: usize,
}

impl FederationHandler {
    pub fn new(storage: Arc<dyn StorageAdapter>, client: DeliveryClient, concurrency: usize) -> Self {
        Self {
            storage,
            client,
            concurrency: concurrency.max(1),
        }
    }

    async fn remote_inbox(&self, id: &AccountId) -> Result<Option<String>, TuskError> {
        Ok(self
            .storage
            .get_account(id)
            .await?
            .filter(|account| !account.is_local())
            .map(|account| account.delivery_inbox().to_string()))
    }

    async fn follower_inboxes(&self, actor: &Account) -> Result<BTreeSet<String>, TuskError> {
        Ok(self
            .storage
            .remote_follower_inboxes(&actor.id)
            .await?
            .into_iter()
            .collect())
    }

    /// Resolve the audience. `None` means there is nothing to send.
    pub async fn plan(&self, actor: &Account, msg: &Message) -> Result<Option<DeliveryPlan>, TuskError> {
        let mut inboxes = BTreeSet::new();

        let object_uri = match (msg.object_type(), msg.payload()) {
            (ObjectType::Note, Payload::Status(id)) => {
                let status = self.storage.get_status(id).await?;
                let object_uri = match (&status, msg.target_uri()) {
                    (_, Some(uri)) if msg.activity_type() == ActivityType::Delete => uri.to_string(),
                    (Some(status), _) => status.uri.clone(),
                    (None, _) => {
                        info!(status_id = %id, "status is gone, nothing to federate");
                        return Ok(None);
                    }
                };
                let direct = status
                    .as_ref()
                    .is_some_and(|s| s.visibility == Visibility::Direct);
                if !direct {
                    inboxes.extend(self.follower_inboxes(actor).await?);
                }
                if let Some(status) = &status {
                    for mention in &status.mentions {
                        inboxes.extend(self.remote_inbox(mention).await?);
                    }
                }
                object_uri
            }

            (ObjectType::Person, Payload::Account(_)) => {
                inboxes.extend(self.follower_inboxes(actor).await?);
                actor.uri.clone()
            }

            (ObjectType::Follow, Payload::Follow(id)) => {
                let follow = self.storage.get_follow(id).await?;
                let other = match (&follow, msg.target()) {
                    (Some(f), _) if f.account_id == actor.id => f.target_account_id.clone(),
                    (Some(f), _) => f.account_id.clone(),
                    (None, Some(target)) => target.clone(),
                    (None, None) => {
                        info!(follow_id = %id, "follow is gone and has no target, nothing to federate");
                        return Ok(None);
                    }
                };
                inboxes.extend(self.remote_inbox(&other).await?);
                let other_uri = self.storage.get_account(&other).await?.map(|a| a.uri);
                match (msg.activity_type(), &follow, msg.target_uri()) {
                    (ActivityType::Create, _, _) => match other_uri {
                        Some(uri) => uri,
                        None => return Ok(None),
                    },
                    (_, Some(f), _) => f.uri.clone(),
                    (_, None, Some(uri)) => uri.to_string(),
                    (_, None, None) => return Ok(None),
                }
            }

            (ObjectType::Like | ObjectType::Announce, Payload::Status(id)) => {
                let status = self.storage.get_status(id).await?;
                let (author, uri) = match (&status, msg.target(), msg.target_uri()) {
                    (Some(s), _, _) => (s.account_id.clone(), s.uri.clone()),
                    (None, Some(target), Some(uri)) => (target.clone(), uri.to_string()),
                    _ => {
                        info!(status_id = %id, "boosted or liked status is gone, nothing to federate");
                        return Ok(None);
                    }
                };
                inboxes.extend(self.remote_inbox(&author).await?);
                if msg.object_type() == ObjectType::Announce {
                    inboxes.extend(self.follower_inboxes(actor).await?);
                }
                uri
            }

            // Only sent when the reporter asked for it. The message origin
            // is the actor the Flag is sent as.
            (ObjectType::Flag, Payload::Report(id))
                if msg.activity_type() == ActivityType::Create =>
            {
                let Some(report) = self.storage.get_report(id).await? else {
                    info!(report_id = %id, "report is gone, nothing to forward");
                    return Ok(None);
                };
                if !report.forwarded {
                    debug!(report_id = %id, "report not marked for forwarding");
                    return Ok(None);
                }
                let Some(reported) = self.storage.get_account(&report.target_account_id).await?
                else {
                    return Ok(None);
                };
                if !reported.is_local() {
                    inboxes.insert(reported.delivery_inbox().to_string());
                }
                reported.uri
            }

            (ObjectType::Block, Payload::Account(target)) => {
                let Some(blocked) = self.storage.get_account(target).await? else {
                    return Ok(None);
                };
                if !blocked.is_local() {
                    inboxes.insert(blocked.delivery_inbox().to_string());
                }
                blocked.uri
            }

            _ => return Ok(None),
        };

        if inboxes.is_empty() {
            return Ok(None);
        }
        Ok(Some(DeliveryPlan {
            object_uri,
            inboxes,
        }))
    }

    async fn deliver_to(
        &self,
        ctx: &HandlerContext,
        actor: &Account,
        msg: &Message,
        inbox: &str,
        body: &[u8],
    ) -> Result<(), RecipientFailure> {
        let failure = |kind: FailureKind, message: String| RecipientFailure {
            inbox: inbox.to_string(),
            kind,
            message,
        };

        match self.storage.is_delivery_settled(msg.id(), inbox).await {
            Ok(true) => {
                debug!(inbox, "settled on an earlier attempt");
                return Ok(());
            }
            Ok(false) => {}
            Err(e) => return Err(failure(FailureKind::Transient, e.to_string())),
        }

        let (kind, message) = match self.client.deliver(ctx, actor, inbox, body).await {
            Ok(()) => {
                recording::delivery("delivered");
                return self
                    .storage
                    .mark_delivered(msg.id(), inbox)
                    .await
                    .map_err(|e| failure(FailureKind::Transient, e.to_string()));
            }
            Err(TuskError::Delivery { kind, message, .. }) => (kind, message),
            Err(e) if e.is_transient() => (FailureKind::Transient, e.to_string()),
            Err(e) => (FailureKind::Permanent, e.to_string()),
        };

        recording::delivery(&kind.to_string());
        // A lost record only means a settled inbox is tried once more.
        if let Err(e) = self
            .storage
            .record_delivery_failure(msg.id(), inbox, kind, &message)
            .await
        {
            debug!(inbox, error = %e, "failed to record delivery failure");
        }
        Err(failure(kind, message))
    }
}

#[async_trait]
impl Handler for FederationHandler {
    fn name(&self) -> &'static str {
        "federation"
    }

    async fn handle(&self, ctx: &HandlerContext, msg: &Message) -> Result<(), TuskError> {
        let actor = self
            .storage
            .get_account(msg.origin())
            .await?
            .ok_or_else(|| TuskError::NotFound {
                entity: "account",
                id: msg.origin().to_string(),
            })?;
        if !actor.is_local() {
            debug!(origin = %actor.id, "origin is remote, not federating");
            return Ok(());
        }

        let Some(plan) = self.plan(&actor, msg).await? else {
            return Ok(());
        };
        let Some(document) = build_activity(&actor, msg, &plan.object_uri) else {
            return Ok(());
        };
        let body = serde_json::to_vec(&document)
            .map_err(|e| TuskError::Internal(format!("failed to encode activity: {e}")))?;

        let total = plan.inboxes.len();
        debug!(message_id = %msg.id(), recipients = total, "federating activity");

        let actor = &actor;
        let body = body.as_slice();
        let failures: Vec<RecipientFailure> = stream::iter(plan.inboxes)
            .map(|inbox| async move { self.deliver_to(ctx, actor, msg, &inbox, body).await })
            .buffer_unordered(self.concurrency)
            .filter_map(|result| async move { result.err() })
            .collect()
            .await;

        if failures.is_empty() {
            Ok(())
        } else {
            Err(TuskError::FanOut { total, failures })
        }
    }
}
