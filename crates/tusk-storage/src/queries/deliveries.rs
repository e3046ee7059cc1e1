// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-inbox delivery outcomes, keyed by message id.
//!
//! A retried message consults this table so inboxes that already accepted it
//! are not sent to twice.

use rusqlite::{OptionalExtension, params};
use tusk_core::{FailureKind, MessageId, TuskError};

use crate::database::{Database, map_tr_err};
use crate::queries::now;

pub async fn is_delivered(db: &Database, message_id: &MessageId, inbox: &str) -> Result<bool, TuskError> {
    let message_id = message_id.0.clone();
    let inbox = inbox.to_string();
    db.connection()
        .call(move |conn| {
            let status: Option<String> = conn
                .query_row(
                    "SELECT status FROM deliveries WHERE message_id = ?1 AND inbox = ?2",
                    params![message_id, inbox],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(status.as_deref() == Some("delivered"))
        })
        .await
        .map_err(map_tr_err)
}

/// Delivered, or failed in a way another attempt will not fix.
pub async fn is_settled(db: &Database, message_id: &MessageId, inbox: &str) -> Result<bool, TuskError> {
    let message_id = message_id.0.clone();
    let inbox = inbox.to_string();
    db.connection()
        .call(move |conn| {
            let status: Option<String> = conn
                .query_row(
                    "SELECT status FROM deliveries WHERE message_id = ?1 AND inbox = ?2",
                    params![message_id, inbox],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(matches!(
                status.as_deref(),
                Some("delivered" | "permanent" | "exhausted")
            ))
        })
        .await
        .map_err(map_tr_err)
}

pub async fn mark_delivered(db: &Database, message_id: &MessageId, inbox: &str) -> Result<(), TuskError> {
    let message_id = message_id.0.clone();
    let inbox = inbox.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO deliveries (message_id, inbox, status, attempts, last_error, updated_at)
                 VALUES (?1, ?2, 'delivered', 1, NULL, ?3)
                 ON CONFLICT(message_id, inbox) DO UPDATE SET
                     status = 'delivered',
                     attempts = attempts + 1,
                     last_error = NULL,
                     updated_at = excluded.updated_at",
                params![message_id, inbox, now()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed attempt. A delivered row is never downgraded.
pub async fn record_failure(
    db: &Database,
    message_id: &MessageId,
    inbox: &str,
    kind: FailureKind,
    error: &str,
) -> Result<(), TuskError> {
    let message_id = message_id.0.clone();
    let inbox = inbox.to_string();
    let kind = kind.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO deliveries (message_id, inbox, status, attempts, last_error, updated_at)
                 VALUES (?1, ?2, ?3, 1, ?4, ?5)
                 ON CONFLICT(message_id, inbox) DO UPDATE SET
                     status = excluded.status,
                     attempts = attempts + 1,
                     last_error = excluded.last_error,
                     updated_at = excluded.updated_at
                 WHERE deliveries.status != 'delivered'",
                params![message_id, inbox, kind, error, now()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
