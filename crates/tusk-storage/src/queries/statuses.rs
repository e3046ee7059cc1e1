// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Statuses and their mentions.

use rusqlite::{OptionalExtension, params};
use tusk_core::{AccountId, Status, StatusId, ThreadId, TuskError};

use crate::database::{Database, map_tr_err};
use crate::queries::{parse_enum, parse_ts, ts};

/// Insert or replace a status together with its mention list.
pub async fn put_status(db: &Database, status: &Status) -> Result<(), TuskError> {
    let s = status.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO statuses
                     (id, account_id, uri, thread_id, in_reply_to_id, visibility, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET visibility = excluded.visibility",
                params![
                    s.id.0,
                    s.account_id.0,
                    s.uri,
                    s.thread_id.0,
                    s.in_reply_to_id.as_ref().map(|id| id.0.clone()),
                    s.visibility.to_string(),
                    ts(s.created_at),
                ],
            )?;
            tx.execute(
                "DELETE FROM status_mentions WHERE status_id = ?1",
                params![s.id.0],
            )?;
            for mention in &s.mentions {
                tx.execute(
                    "INSERT OR IGNORE INTO status_mentions (status_id, account_id) VALUES (?1, ?2)",
                    params![s.id.0, mention.0],
                )?;
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_status(db: &Database, id: &StatusId) -> Result<Option<Status>, TuskError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            let status = conn
                .query_row(
                    "SELECT id, account_id, uri, thread_id, in_reply_to_id, visibility, created_at
                     FROM statuses WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(Status {
                            id: StatusId(row.get(0)?),
                            account_id: AccountId(row.get(1)?),
                            uri: row.get(2)?,
                            thread_id: ThreadId(row.get(3)?),
                            in_reply_to_id: row.get::<_, Option<String>>(4)?.map(StatusId),
                            visibility: parse_enum(5, row.get(5)?)?,
                            created_at: parse_ts(6, row.get(6)?)?,
                            mentions: Vec::new(),
                        })
                    },
                )
                .optional()?;

            let Some(mut status) = status else {
                return Ok(None);
            };
            let mut stmt = conn.prepare(
                "SELECT account_id FROM status_mentions WHERE status_id = ?1 ORDER BY account_id",
            )?;
            status.mentions = stmt
                .query_map(params![status.id.0], |row| Ok(AccountId(row.get(0)?)))?
                .collect::<rusqlite::Result<_>>()?;
            Ok(Some(status))
        })
        .await
        .map_err(map_tr_err)
}

/// Remove a status row. Derived state (timelines, conversations) is left for the pipeline.
pub async fn delete_status(db: &Database, id: &StatusId) -> Result<(), TuskError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM statuses WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
