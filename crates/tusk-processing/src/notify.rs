// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-app notifications for local accounts.
//!
//! A notification is stored at most once per event, so replaying a message
//! never notifies twice. Remote targets and self-interactions are skipped.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use tusk_core::{
    AccountId, ActivityType, FollowId, Handler, HandlerContext, Message, Notification,
    NotificationKind, ObjectType, Payload, StatusId, StorageAdapter, TuskError, UserId,
};

pub struct NotifyHandler {
    storage: Arc<dyn StorageAdapter>,
}

impl NotifyHandler {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    async fn notify(
        &self,
        kind: NotificationKind,
        target: &AccountId,
        origin: &AccountId,
        status_id: Option<&StatusId>,
    ) -> Result<(), TuskError> {
        if target == origin {
            return Ok(());
        }
        match self.storage.get_account(target).await? {
            Some(account) if account.is_local() => {}
            _ => return Ok(()),
        }
        let notification = Notification::new(kind, target, origin, status_id);
        if self.storage.put_notification(&notification).await? {
            debug!(%kind, target = %target, origin = %origin, "notification stored");
        }
        Ok(())
    }

    async fn mentioned(&self, id: &StatusId) -> Result<(), TuskError> {
        let Some(status) = self.storage.get_status(id).await? else {
            debug!(status_id = %id, "status is gone, no mentions to notify");
            return Ok(());
        };
        for mention in &status.mentions {
            self.notify(
                NotificationKind::Mention,
                mention,
                &status.account_id,
                Some(&status.id),
            )
            .await?;
        }
        Ok(())
    }

    /// A follow notification replaces the request it came from.
    async fn followed(&self, id: &FollowId, accepted: bool) -> Result<(), TuskError> {
        let Some(follow) = self.storage.get_follow(id).await? else {
            debug!(follow_id = %id, "follow is gone, nothing to notify");
            return Ok(());
        };
        let (target, origin) = (&follow.target_account_id, &follow.account_id);
        if follow.pending && !accepted {
            return self
                .notify(NotificationKind::FollowRequest, target, origin, None)
                .await;
        }
        self.storage
            .delete_notification(NotificationKind::FollowRequest, target, origin, None)
            .await?;
        self.notify(NotificationKind::Follow, target, origin, None)
            .await
    }

    /// Fave or boost: tell the status author.
    async fn interacted(
        &self,
        kind: NotificationKind,
        origin: &AccountId,
        id: &StatusId,
    ) -> Result<(), TuskError> {
        let Some(status) = self.storage.get_status(id).await? else {
            return Ok(());
        };
        self.notify(kind, &status.account_id, origin, Some(&status.id))
            .await
    }

    async fn signed_up(&self, id: &UserId) -> Result<(), TuskError> {
        let Some(user) = self.storage.get_user(id).await? else {
            debug!(user_id = %id, "user is gone, no sign-up to notify");
            return Ok(());
        };
        for moderator in self.storage.moderators().await? {
            self.notify(
                NotificationKind::AdminSignup,
                &moderator.account_id,
                &user.account_id,
                None,
            )
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Handler for NotifyHandler {
    fn name(&self) -> &'static str {
        "notify"
    }

    async fn handle(&self, _ctx: &HandlerContext, msg: &Message) -> Result<(), TuskError> {
        match (msg.object_type(), msg.activity_type(), msg.payload()) {
            (ObjectType::Note, ActivityType::Create, Payload::Status(id)) => {
                self.mentioned(id).await
            }
            (ObjectType::Follow, ActivityType::Create, Payload::Follow(id)) => {
                self.followed(id, false).await
            }
            (ObjectType::Follow, ActivityType::Accept, Payload::Follow(id)) => {
                self.followed(id, true).await
            }
            (ObjectType::Like, ActivityType::Create, Payload::Status(id)) => {
                self.interacted(NotificationKind::Favourite, msg.origin(), id)
                    .await
            }
            (ObjectType::Announce, ActivityType::Create, Payload::Status(id)) => {
                self.interacted(NotificationKind::Reblog, msg.origin(), id)
                    .await
            }
            (ObjectType::Profile, ActivityType::Create, Payload::User(id)) => {
                self.signed_up(id).await
            }
            _ => Ok(()),
        }
    }
}
