// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dead-letter records. The full message is kept as JSON so it can be
//! inspected or replayed; the indexed columns are for filtering.

use rusqlite::{params, types::Type};
use tusk_core::{DeadLetter, Message, TuskError};

use crate::database::{Database, map_tr_err};
use crate::queries::{parse_ts, ts};

pub async fn insert(db: &Database, dead_letter: &DeadLetter) -> Result<(), TuskError> {
    let message_json = serde_json::to_string(&dead_letter.message)
        .map_err(|e| TuskError::Internal(format!("failed to serialize dead letter: {e}")))?;
    let dl = dead_letter.clone();
    db.connection()
        .call(move |conn| {
            let msg = &dl.message;
            conn.execute(
                "INSERT OR REPLACE INTO dead_letters
                     (id, message_id, object_type, activity_type, origin, target,
                      message, attempts, error, dead_lettered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    dl.id,
                    msg.id().0,
                    msg.object_type().to_string(),
                    msg.activity_type().to_string(),
                    msg.origin().0,
                    msg.target().map(|t| t.0.clone()),
                    message_json,
                    dl.attempts,
                    dl.error,
                    ts(dl.dead_lettered_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Newest first.
pub async fn list(db: &Database, limit: usize) -> Result<Vec<DeadLetter>, TuskError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, message, attempts, error, dead_lettered_at FROM dead_letters
                 ORDER BY dead_lettered_at DESC, id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], |row| {
                let raw: String = row.get(1)?;
                let message: Message = serde_json::from_str(&raw).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e))
                })?;
                Ok(DeadLetter {
                    id: row.get(0)?,
                    message,
                    attempts: row.get(2)?,
                    error: row.get(3)?,
                    dead_lettered_at: parse_ts(4, row.get(4)?)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
