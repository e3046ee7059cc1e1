// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifiers, the message envelope, and common types shared by every crate.

use std::fmt;
use std::sync::{LazyLock, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use ulid::{Generator, Ulid};

use crate::error::TuskError;

static ULID_GENERATOR: LazyLock<Mutex<Generator>> = LazyLock::new(|| Mutex::new(Generator::new()));

/// Generate a new ULID string, monotonic within the millisecond for this process.
pub fn new_ulid() -> String {
    let mut generator = ULID_GENERATOR
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    // Overflow of the random component within one millisecond falls back to a fresh ULID.
    generator
        .generate()
        .unwrap_or_else(|_| Ulid::new())
        .to_string()
}

macro_rules! ulid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Allocate a fresh time-sortable identifier.
            pub fn generate() -> Self {
                Self(new_ulid())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

ulid_id!(
    /// Unique identifier for an account (local or remote).
    AccountId
);
ulid_id!(
    /// Unique identifier for a local user (the login attached to a local account).
    UserId
);
ulid_id!(
    /// Unique identifier for a status. ULID order is creation order.
    StatusId
);
ulid_id!(
    /// Groups every status of one reply chain.
    ThreadId
);
ulid_id!(
    /// Unique identifier for a conversation row.
    ConversationId
);
ulid_id!(
    /// Unique identifier for a follow relationship.
    FollowId
);
ulid_id!(
    /// Unique identifier for a moderation report.
    ReportId
);
ulid_id!(
    /// Unique identifier for a pipeline message.
    MessageId
);

/// The kind of object an event concerns.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    /// A status.
    Note,
    /// A local user's profile/login (signup, email change, approval).
    Profile,
    /// An account as a federated actor.
    Person,
    Follow,
    Like,
    Announce,
    Block,
    /// A moderation report.
    Flag,
}

/// What happened to the object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Create,
    Update,
    Delete,
    Accept,
    Reject,
    Undo,
}

/// Non-owning reference to the domain row a message concerns.
///
/// Primary storage owns the row; handlers look it up by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ref", rename_all = "snake_case")]
pub enum Payload {
    Account(AccountId),
    Status(StatusId),
    /// A user whose (unconfirmed) email address needs attention.
    User(UserId),
    /// A user whose password was just changed.
    PasswordChange(UserId),
    /// A rejected signup. The user row is gone, so the address travels with the message.
    DeniedUser {
        email: String,
        reason: Option<String>,
    },
    Follow(FollowId),
    Report(ReportId),
}

impl Payload {
    fn kind(&self) -> &'static str {
        match self {
            Payload::Account(_) => "account",
            Payload::Status(_) => "status",
            Payload::User(_) => "user",
            Payload::PasswordChange(_) => "password_change",
            Payload::DeniedUser { .. } => "denied_user",
            Payload::Follow(_) => "follow",
            Payload::Report(_) => "report",
        }
    }

    fn fits(&self, object_type: ObjectType) -> bool {
        matches!(
            (object_type, self),
            (ObjectType::Note, Payload::Status(_))
                | (
                    ObjectType::Profile,
                    Payload::User(_) | Payload::PasswordChange(_) | Payload::DeniedUser { .. }
                )
                | (ObjectType::Person, Payload::Account(_))
                | (ObjectType::Follow, Payload::Follow(_))
                | (ObjectType::Like | ObjectType::Announce, Payload::Status(_))
                | (ObjectType::Block, Payload::Account(_))
                | (ObjectType::Flag, Payload::Report(_))
        )
    }
}

/// An immutable envelope describing one thing that happened.
///
/// Fields are private: once built and pushed, nothing can change the envelope.
/// Compound actions push several messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    object_type: ObjectType,
    activity_type: ActivityType,
    payload: Payload,
    origin: AccountId,
    target: Option<AccountId>,
    target_uri: Option<String>,
    enqueued_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        object_type: ObjectType,
        activity_type: ActivityType,
        origin: AccountId,
        payload: Payload,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            object_type,
            activity_type,
            payload,
            origin,
            target: None,
            target_uri: None,
            enqueued_at: Utc::now(),
        }
    }

    /// Set the entity acted upon. May equal the origin.
    pub fn with_target(mut self, target: AccountId) -> Self {
        self.target = Some(target);
        self
    }

    /// Set the URI of the affected object, for rows that may already be gone.
    pub fn with_target_uri(mut self, uri: impl Into<String>) -> Self {
        self.target_uri = Some(uri.into());
        self
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn activity_type(&self) -> ActivityType {
        self.activity_type
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn origin(&self) -> &AccountId {
        &self.origin
    }

    pub fn target(&self) -> Option<&AccountId> {
        self.target.as_ref()
    }

    pub fn target_uri(&self) -> Option<&str> {
        self.target_uri.as_deref()
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    /// Entity identities whose messages must be processed in submission order.
    pub fn ordering_keys(&self) -> Vec<&AccountId> {
        let mut keys = vec![&self.origin];
        if let Some(target) = &self.target
            && target != &self.origin
        {
            keys.push(target);
        }
        keys
    }

    /// Check required envelope fields and the payload kind.
    pub fn validate(&self) -> Result<(), TuskError> {
        if self.origin.as_str().trim().is_empty() {
            return Err(TuskError::MalformedMessage(format!(
                "{}/{} message {} has no origin",
                self.object_type, self.activity_type, self.id
            )));
        }
        if !self.payload.fits(self.object_type) {
            return Err(TuskError::MalformedMessage(format!(
                "{} payload does not fit object type {}",
                self.payload.kind(),
                self.object_type
            )));
        }
        Ok(())
    }
}

/// Per-invocation context passed to every handler.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext {
    /// 1-based attempt number for this message.
    pub attempt: u32,
    /// The handler must finish before this instant or be treated as timed out.
    pub deadline: tokio::time::Instant,
}

impl HandlerContext {
    pub fn new(attempt: u32, timeout: std::time::Duration) -> Self {
        Self {
            attempt,
            deadline: tokio::time::Instant::now() + timeout,
        }
    }

    /// Time left before the deadline, zero if it has passed.
    pub fn remaining(&self) -> std::time::Duration {
        self.deadline
            .saturating_duration_since(tokio::time::Instant::now())
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Email,
    Signer,
    Cache,
    Observability,
}
