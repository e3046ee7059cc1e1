// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tusk side-effect pipeline.
//!
//! Every error carries enough information for the worker pool to route it:
//! transient errors are retried with backoff, permanent errors dead-letter the
//! message immediately, and programming errors are surfaced at the boundary
//! where they happen.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// How a single delivery attempt (or sequence of attempts) failed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Worth retrying: timeouts, connection errors, 5xx, 429.
    Transient,
    /// Not worth retrying: 4xx other than 429, unusable inbox URL.
    Permanent,
    /// Transient failures that used up the configured attempt budget.
    Exhausted,
}

/// Routing class of an error inside the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorClass {
    /// Retried with backoff, bounded attempt count.
    Transient,
    /// Dead-lettered immediately.
    Permanent,
    /// A caller broke a contract (push after shutdown, handler panic).
    Programming,
}

/// A per-recipient failure inside a fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientFailure {
    pub inbox: String,
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for RecipientFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.inbox, self.kind, self.message)
    }
}

/// The primary error type used across all Tusk adapter traits and handlers.
#[derive(Debug, Error)]
pub enum TuskError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, contention).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Outbound delivery to a single remote inbox failed.
    #[error("delivery to {inbox} failed ({kind}): {message}")]
    Delivery {
        inbox: String,
        kind: FailureKind,
        message: String,
    },

    /// One or more recipients of a fan-out failed. Delivered recipients are not listed.
    #[error("fan-out failed for {} of {total} recipients: {}", failures.len(), format_failures(failures))]
    FanOut {
        total: usize,
        failures: Vec<RecipientFailure>,
    },

    /// Email transport errors (SMTP connection, rejected envelope).
    #[error("email error: {message}")]
    Email {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A row referenced by a message does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The message envelope is missing fields or carries the wrong payload kind.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A producer pushed onto a queue that has already been shut down.
    #[error("queue is shut down; message rejected")]
    QueueClosed,

    /// A handler panicked while processing a message.
    #[error("handler `{handler}` panicked: {message}")]
    HandlerPanic { handler: String, message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

fn format_failures(failures: &[RecipientFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl TuskError {
    /// Classify this error for retry routing.
    pub fn class(&self) -> ErrorClass {
        match self {
            TuskError::Storage { .. } | TuskError::Email { .. } | TuskError::Timeout { .. } => {
                ErrorClass::Transient
            }
            TuskError::Delivery { kind, .. } => match kind {
                FailureKind::Transient => ErrorClass::Transient,
                FailureKind::Permanent | FailureKind::Exhausted => ErrorClass::Permanent,
            },
            // Settled recipients are skipped on retry, so one transient
            // recipient is enough to make another attempt worthwhile.
            TuskError::FanOut { failures, .. } => {
                if failures.iter().any(|f| f.kind == FailureKind::Transient) {
                    ErrorClass::Transient
                } else {
                    ErrorClass::Permanent
                }
            }
            TuskError::NotFound { .. }
            | TuskError::MalformedMessage(_)
            | TuskError::Config(_)
            | TuskError::Internal(_) => ErrorClass::Permanent,
            TuskError::QueueClosed | TuskError::HandlerPanic { .. } => ErrorClass::Programming,
        }
    }

    /// Recipients of a fan-out that failed for good, even when the error as a
    /// whole is still worth retrying.
    pub fn settled_recipients(&self) -> impl Iterator<Item = &RecipientFailure> {
        let failures = match self {
            TuskError::FanOut { failures, .. } => failures.as_slice(),
            _ => &[],
        };
        failures.iter().filter(|f| f.kind != FailureKind::Transient)
    }

    /// Returns true if retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// Shorthand for wrapping any error as a storage error.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TuskError::Storage {
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(kind: FailureKind) -> RecipientFailure {
        RecipientFailure {
            inbox: "https://remote.example/inbox".into(),
            kind,
            message: "boom".into(),
        }
    }

    #[test]
    fn storage_and_timeouts_are_transient() {
        assert!(TuskError::storage(std::io::Error::other("locked")).is_transient());
        assert!(
            TuskError::Timeout {
                duration: std::time::Duration::from_secs(1)
            }
            .is_transient()
        );
    }

    #[test]
    fn exhausted_delivery_is_permanent() {
        let err = TuskError::Delivery {
            inbox: "https://remote.example/inbox".into(),
            kind: FailureKind::Exhausted,
            message: "503 after 5 attempts".into(),
        };
        assert_eq!(err.class(), ErrorClass::Permanent);
    }

    #[test]
    fn fan_out_stays_retryable_while_any_recipient_is() {
        let all_transient = TuskError::FanOut {
            total: 3,
            failures: vec![failure(FailureKind::Transient)],
        };
        assert!(all_transient.is_transient());
        assert_eq!(all_transient.settled_recipients().count(), 0);

        let mixed = TuskError::FanOut {
            total: 3,
            failures: vec![
                failure(FailureKind::Transient),
                failure(FailureKind::Permanent),
            ],
        };
        assert!(mixed.is_transient());
        let settled: Vec<_> = mixed.settled_recipients().collect();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].kind, FailureKind::Permanent);

        let settled_only = TuskError::FanOut {
            total: 3,
            failures: vec![
                failure(FailureKind::Permanent),
                failure(FailureKind::Exhausted),
            ],
        };
        assert_eq!(settled_only.class(), ErrorClass::Permanent);
    }

    #[test]
    fn fan_out_message_lists_each_recipient() {
        let err = TuskError::FanOut {
            total: 2,
            failures: vec![failure(FailureKind::Permanent)],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("1 of 2"), "got: {rendered}");
        assert!(rendered.contains("remote.example"), "got: {rendered}");
    }

    #[test]
    fn queue_closed_and_panics_are_programming_errors() {
        assert_eq!(TuskError::QueueClosed.class(), ErrorClass::Programming);
        let panic = TuskError::HandlerPanic {
            handler: "email".into(),
            message: "index out of bounds".into(),
        };
        assert_eq!(panic.class(), ErrorClass::Programming);
    }
}
