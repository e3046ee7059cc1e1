// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The notification handler: turns profile and report events into email.
//!
//! Every send is recorded against the message id, so replaying a message
//! never sends the same email twice. Moderator emails are recorded per
//! address, so a retry only reaches the moderators that were missed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use tusk_core::{
    ActivityType, EmailContent, EmailKind, EmailSender, Handler, HandlerContext, Message,
    ObjectType, Payload, ReportId, StorageAdapter, TuskError, User, UserId,
};

use crate::templates::Templates;

pub struct NotificationHandler {
    storage: Arc<dyn StorageAdapter>,
    sender: Arc<dyn EmailSender>,
    templates: Templates,
}

impl NotificationHandler {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        sender: Arc<dyn EmailSender>,
        templates: Templates,
    ) -> Self {
        Self {
            storage,
            sender,
            templates,
        }
    }

    async fn user(&self, id: &UserId) -> Result<User, TuskError> {
        self.storage
            .get_user(id)
            .await?
            .ok_or_else(|| TuskError::NotFound {
                entity: "user",
                id: id.to_string(),
            })
    }

    async fn username(&self, user: &User) -> Result<String, TuskError> {
        self.storage
            .get_account(&user.account_id)
            .await?
            .map(|a| a.username)
            .ok_or_else(|| TuskError::NotFound {
                entity: "account",
                id: user.account_id.to_string(),
            })
    }

    async fn already_sent(&self, msg: &Message, kind: EmailKind) -> Result<bool, TuskError> {
        let sent = self.storage.email_sent(msg.id(), kind).await?;
        if sent {
            debug!(message_id = %msg.id(), %kind, "email already sent for this message");
        }
        Ok(sent)
    }

    async fn send_and_record(
        &self,
        msg: &Message,
        address: &str,
        content: EmailContent,
    ) -> Result<(), TuskError> {
        self.sender.send(address, &content).await?;
        self.storage
            .record_email_sent(msg.id(), content.kind, address)
            .await?;
        info!(message_id = %msg.id(), kind = %content.kind, "notification email sent");
        Ok(())
    }

    /// Send `content` to every moderator who can receive notices.
    async fn email_moderators(&self, msg: &Message, content: EmailContent) -> Result<(), TuskError> {
        let addresses: Vec<String> = self
            .storage
            .moderators()
            .await?
            .into_iter()
            .filter(User::can_receive_notices)
            .filter_map(|u| u.email)
            .collect();
        if addresses.is_empty() {
            debug!(kind = %content.kind, "no moderator addresses, skipping");
            return Ok(());
        }
        for address in &addresses {
            if self
                .storage
                .email_sent_to(msg.id(), content.kind, address)
                .await?
            {
                continue;
            }
            self.send_and_record(msg, address, content.clone()).await?;
        }
        Ok(())
    }

    /// Signup or email change: confirm the new address.
    async fn confirm_email(&self, msg: &Message, id: &UserId) -> Result<(), TuskError> {
        if self.already_sent(msg, EmailKind::ConfirmEmail).await? {
            return Ok(());
        }
        let user = self.user(id).await?;
        if !user.needs_confirmation() {
            debug!(user_id = %id, "no unconfirmed address, skipping confirmation");
            return Ok(());
        }
        let Some(address) = user.unconfirmed_email.clone() else {
            return Ok(());
        };
        let username = self.username(&user).await?;

        let token = Uuid::new_v4().to_string();
        self.storage
            .update_user_confirmation(&user.id, &token, Utc::now())
            .await?;
        let content = self.templates.confirm_email(&username, &token);
        self.send_and_record(msg, &address, content).await
    }

    async fn password_changed(&self, msg: &Message, id: &UserId) -> Result<(), TuskError> {
        if self.already_sent(msg, EmailKind::PasswordChanged).await? {
            return Ok(());
        }
        let user = self.user(id).await?;
        let Some(address) = user.email.clone().filter(|e| !e.is_empty()) else {
            debug!(user_id = %id, "user has no confirmed address, skipping");
            return Ok(());
        };
        let content = self.templates.password_changed(&self.username(&user).await?);
        self.send_and_record(msg, &address, content).await
    }

    async fn signup_approved(&self, msg: &Message, id: &UserId) -> Result<(), TuskError> {
        if self.already_sent(msg, EmailKind::SignupApproved).await? {
            return Ok(());
        }
        let user = self.user(id).await?;
        let Some(address) = user
            .email
            .clone()
            .or_else(|| user.unconfirmed_email.clone())
            .filter(|e| !e.is_empty())
        else {
            debug!(user_id = %id, "approved user has no address, skipping");
            return Ok(());
        };
        let content = self.templates.signup_approved(&self.username(&user).await?);
        self.send_and_record(msg, &address, content).await
    }

    async fn signup_rejected(
        &self,
        msg: &Message,
        address: &str,
        reason: Option<&str>,
    ) -> Result<(), TuskError> {
        if address.trim().is_empty() || self.already_sent(msg, EmailKind::SignupRejected).await? {
            return Ok(());
        }
        let content = self.templates.signup_rejected(reason);
        self.send_and_record(msg, address, content).await
    }

    async fn admin_new_signup(&self, msg: &Message, id: &UserId) -> Result<(), TuskError> {
        let user = self.user(id).await?;
        let address = user
            .unconfirmed_email
            .as_deref()
            .or(user.email.as_deref())
            .unwrap_or_default();
        let username = self.username(&user).await?;
        let content =
            self.templates
                .admin_new_signup(&username, address, user.account_id.as_str());
        self.email_moderators(msg, content).await
    }

    async fn admin_report_opened(&self, msg: &Message, id: &ReportId) -> Result<(), TuskError> {
        let report = self
            .storage
            .get_report(id)
            .await?
            .ok_or_else(|| TuskError::NotFound {
                entity: "report",
                id: id.to_string(),
            })?;
        let reporter = self.storage.get_account(&report.account_id).await?;
        let target = self.storage.get_account(&report.target_account_id).await?;
        let content = self.templates.admin_report_opened(
            report.id.as_str(),
            reporter.as_ref().and_then(|a| a.domain.as_deref()),
            target.as_ref().and_then(|a| a.domain.as_deref()),
        );
        self.email_moderators(msg, content).await
    }

    /// Tell a local reporter their report was closed.
    async fn report_closed(&self, msg: &Message, id: &ReportId) -> Result<(), TuskError> {
        if self.already_sent(msg, EmailKind::ReportClosed).await? {
            return Ok(());
        }
        let report = self
            .storage
            .get_report(id)
            .await?
            .ok_or_else(|| TuskError::NotFound {
                entity: "report",
                id: id.to_string(),
            })?;

        let Some(reporter) = self.storage.get_account(&report.account_id).await? else {
            return Ok(());
        };
        if !reporter.is_local() {
            debug!(report_id = %id, "reporter is remote, no email");
            return Ok(());
        }
        let Some(user) = self.storage.get_user_by_account(&reporter.id).await? else {
            return Ok(());
        };
        if !user.can_receive_notices() {
            debug!(report_id = %id, user_id = %user.id, "reporter cannot receive notices");
            return Ok(());
        }
        let Some(address) = user.email.as_deref() else {
            return Ok(());
        };

        let reported = match self.storage.get_account(&report.target_account_id).await? {
            Some(target) => match &target.domain {
                Some(domain) => format!("@{}@{domain}", target.username),
                None => format!("@{}", target.username),
            },
            None => "an account".to_string(),
        };
        let content = self.templates.report_closed(
            &reporter.username,
            &reported,
            report.action_taken.as_deref(),
        );
        self.send_and_record(msg, address, content).await
    }
}

#[async_trait]
impl Handler for NotificationHandler {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn handle(&self, _ctx: &HandlerContext, msg: &Message) -> Result<(), TuskError> {
        match (msg.object_type(), msg.activity_type(), msg.payload()) {
            (ObjectType::Profile, ActivityType::Create, Payload::User(id)) => {
                self.confirm_email(msg, id).await?;
                self.admin_new_signup(msg, id).await
            }
            (ObjectType::Profile, ActivityType::Update, Payload::User(id)) => {
                self.confirm_email(msg, id).await
            }
            (ObjectType::Profile, ActivityType::Update, Payload::PasswordChange(id)) => {
                self.password_changed(msg, id).await
            }
            (ObjectType::Profile, ActivityType::Accept, Payload::User(id)) => {
                self.signup_approved(msg, id).await
            }
            (ObjectType::Profile, ActivityType::Reject, Payload::DeniedUser { email, reason }) => {
                self.signup_rejected(msg, email, reason.as_deref()).await
            }
            (ObjectType::Flag, ActivityType::Create, Payload::Report(id)) => {
                self.admin_report_opened(msg, id).await
            }
            (ObjectType::Flag, ActivityType::Update, Payload::Report(id)) => {
                self.report_closed(msg, id).await
            }
            (object_type, activity_type, _) => {
                debug!(%object_type, %activity_type, "no email for this event");
                Ok(())
            }
        }
    }
}
