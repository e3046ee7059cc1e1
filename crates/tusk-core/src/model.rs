// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain rows the pipeline reads and writes through [`StorageAdapter`](crate::StorageAdapter).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::{
    AccountId, ConversationId, FollowId, Message, ReportId, StatusId, ThreadId, UserId,
};

/// A federated actor. Local accounts have no domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub domain: Option<String>,
    pub uri: String,
    pub inbox_uri: String,
    /// Shared inbox of the account's server, preferred for fan-out when present.
    pub shared_inbox_uri: Option<String>,
}

impl Account {
    pub fn is_local(&self) -> bool {
        self.domain.is_none()
    }

    /// The inbox deliveries to this account should go to.
    pub fn delivery_inbox(&self) -> &str {
        self.shared_inbox_uri.as_deref().unwrap_or(&self.inbox_uri)
    }
}

/// The login record attached to a local account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub account_id: AccountId,
    pub email: Option<String>,
    pub unconfirmed_email: Option<String>,
    pub confirmation_token: Option<String>,
    pub confirmation_sent_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub approved: bool,
    pub disabled: bool,
    /// Handles reports and sign-ups, and hears about new ones.
    pub moderator: bool,
    pub last_emailed_at: Option<DateTime<Utc>>,
}

impl User {
    /// True when the user has an address they have not confirmed yet.
    pub fn needs_confirmation(&self) -> bool {
        match self.unconfirmed_email.as_deref() {
            None | Some("") => false,
            Some(unconfirmed) => self.email.as_deref() != Some(unconfirmed),
        }
    }

    /// True when notices (report closed, etc.) may be emailed to this user.
    pub fn can_receive_notices(&self) -> bool {
        self.confirmed_at.is_some()
            && self.approved
            && !self.disabled
            && self.email.as_deref().is_some_and(|e| !e.is_empty())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Unlisted,
    FollowersOnly,
    /// Visible only to the author and mentioned accounts.
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: StatusId,
    pub account_id: AccountId,
    pub uri: String,
    pub thread_id: ThreadId,
    pub in_reply_to_id: Option<StatusId>,
    pub visibility: Visibility,
    pub mentions: Vec<AccountId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub id: FollowId,
    pub account_id: AccountId,
    pub target_account_id: AccountId,
    pub uri: String,
    /// Waiting for the target to approve it.
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub account_id: AccountId,
    pub target_account_id: AccountId,
    pub uri: String,
    pub action_taken: Option<String>,
    /// The reporter asked for a copy to go to the reported account's server.
    pub forwarded: bool,
}

/// Per-account view of one thread.
///
/// At most one row exists per `(account_id, thread_id)`. `last_status_id`
/// always points at a status linked to `thread_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub account_id: AccountId,
    pub thread_id: ThreadId,
    pub last_status_id: StatusId,
    pub read: bool,
    pub updated_at: DateTime<Utc>,
}

/// A message set aside for operator inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub id: String,
    pub message: Message,
    pub attempts: u32,
    pub error: String,
    pub dead_lettered_at: DateTime<Utc>,
}

/// Transactional email templates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EmailKind {
    ConfirmEmail,
    PasswordChanged,
    SignupApproved,
    SignupRejected,
    ReportClosed,
    /// To moderators: someone opened a report.
    AdminReportOpened,
    /// To moderators: someone signed up.
    AdminNewSignup,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Mention,
    Follow,
    FollowRequest,
    Favourite,
    Reblog,
    /// A new sign-up, shown to moderators.
    AdminSignup,
}

/// An in-app notification for a local account.
///
/// At most one exists per `(kind, target, origin, status)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub target_account_id: AccountId,
    pub origin_account_id: AccountId,
    pub status_id: Option<StatusId>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        target: &AccountId,
        origin: &AccountId,
        status_id: Option<&StatusId>,
    ) -> Self {
        Self {
            id: crate::types::new_ulid(),
            kind,
            target_account_id: target.clone(),
            origin_account_id: origin.clone(),
            status_id: status_id.cloned(),
            created_at: Utc::now(),
        }
    }

    /// True when both describe the same event.
    pub fn same_event(&self, other: &Notification) -> bool {
        self.kind == other.kind
            && self.target_account_id == other.target_account_id
            && self.origin_account_id == other.origin_account_id
            && self.status_id == other.status_id
    }
}
