// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-app notifications, unique per event.

use rusqlite::{Row, params};
use tusk_core::{AccountId, Notification, NotificationKind, StatusId, TuskError};

use crate::database::{Database, map_tr_err};
use crate::queries::{parse_enum, parse_ts, ts};

fn status_column(status_id: Option<&StatusId>) -> String {
    status_id.map(|id| id.0.clone()).unwrap_or_default()
}

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    let status: String = row.get(4)?;
    Ok(Notification {
        id: row.get(0)?,
        kind: parse_enum(1, row.get(1)?)?,
        target_account_id: AccountId(row.get(2)?),
        origin_account_id: AccountId(row.get(3)?),
        status_id: (!status.is_empty()).then_some(StatusId(status)),
        created_at: parse_ts(5, row.get(5)?)?,
    })
}

/// Returns false if the same event was already notified.
pub async fn insert(db: &Database, notification: &Notification) -> Result<bool, TuskError> {
    let n = notification.clone();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO notifications
                     (id, kind, target_account_id, origin_account_id, status_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    n.id,
                    n.kind.to_string(),
                    n.target_account_id.0,
                    n.origin_account_id.0,
                    status_column(n.status_id.as_ref()),
                    ts(n.created_at),
                ],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete(
    db: &Database,
    kind: NotificationKind,
    target: &AccountId,
    origin: &AccountId,
    status_id: Option<&StatusId>,
) -> Result<(), TuskError> {
    let kind = kind.to_string();
    let target = target.0.clone();
    let origin = origin.0.clone();
    let status = status_column(status_id);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM notifications
                 WHERE kind = ?1 AND target_account_id = ?2
                   AND origin_account_id = ?3 AND status_id = ?4",
                params![kind, target, origin, status],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Newest first.
pub async fn for_target(db: &Database, target: &AccountId) -> Result<Vec<Notification>, TuskError> {
    let target = target.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, kind, target_account_id, origin_account_id, status_id, created_at
                 FROM notifications WHERE target_account_id = ?1
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt.query_map(params![target], notification_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
