// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Home timeline fan-out targets.

use rusqlite::params;
use tusk_core::{AccountId, StatusId, TuskError};

use crate::database::{Database, map_tr_err};
use crate::queries::now;

pub async fn insert(db: &Database, owner: &AccountId, status_id: &StatusId) -> Result<(), TuskError> {
    let owner = owner.0.clone();
    let status_id = status_id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO home_timelines (account_id, status_id, inserted_at)
                 VALUES (?1, ?2, ?3)",
                params![owner, status_id, now()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn remove_status(db: &Database, status_id: &StatusId) -> Result<(), TuskError> {
    let status_id = status_id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM home_timelines WHERE status_id = ?1",
                params![status_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Newest first, by status id.
pub async fn home_timeline(db: &Database, owner: &AccountId) -> Result<Vec<StatusId>, TuskError> {
    let owner = owner.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT status_id FROM home_timelines WHERE account_id = ?1
                 ORDER BY status_id DESC",
            )?;
            let rows = stmt.query_map(params![owner], |row| Ok(StatusId(row.get(0)?)))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
