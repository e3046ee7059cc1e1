// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sent-email guard rows.

use rusqlite::params;
use tusk_core::{EmailKind, MessageId, TuskError};

use crate::database::{Database, map_tr_err};
use crate::queries::now;

pub async fn was_sent(db: &Database, message_id: &MessageId, kind: EmailKind) -> Result<bool, TuskError> {
    let message_id = message_id.0.clone();
    let kind = kind.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sent_emails WHERE message_id = ?1 AND kind = ?2",
                params![message_id, kind],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn was_sent_to(
    db: &Database,
    message_id: &MessageId,
    kind: EmailKind,
    address: &str,
) -> Result<bool, TuskError> {
    let message_id = message_id.0.clone();
    let kind = kind.to_string();
    let address = address.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sent_emails
                 WHERE message_id = ?1 AND kind = ?2 AND address = ?3",
                params![message_id, kind, address],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn record_sent(
    db: &Database,
    message_id: &MessageId,
    kind: EmailKind,
    address: &str,
) -> Result<(), TuskError> {
    let message_id = message_id.0.clone();
    let kind = kind.to_string();
    let address = address.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO sent_emails (message_id, kind, address, sent_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![message_id, kind, address, now()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
