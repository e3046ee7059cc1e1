// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-account conversation rows and their status links.
//!
//! Each operation runs in one transaction on the writer thread, so concurrent
//! workers filing statuses into the same thread cannot create duplicate rows
//! or move `last_status_id` backwards.

use rusqlite::{Connection, OptionalExtension, Row, params};
use tusk_core::{AccountId, Conversation, ConversationId, StatusId, ThreadId, TuskError};

use crate::database::{Database, map_tr_err};
use crate::queries::{now, parse_ts};

const CONVERSATION_COLUMNS: &str = "id, account_id, thread_id, last_status_id, read, updated_at";

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: ConversationId(row.get(0)?),
        account_id: AccountId(row.get(1)?),
        thread_id: ThreadId(row.get(2)?),
        last_status_id: StatusId(row.get(3)?),
        read: row.get(4)?,
        updated_at: parse_ts(5, row.get(5)?)?,
    })
}

fn select_by_key(
    conn: &Connection,
    account_id: &str,
    thread_id: &str,
) -> rusqlite::Result<Option<Conversation>> {
    conn.query_row(
        &format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE account_id = ?1 AND thread_id = ?2"
        ),
        params![account_id, thread_id],
        conversation_from_row,
    )
    .optional()
}

pub async fn upsert(
    db: &Database,
    account_id: &AccountId,
    thread_id: &ThreadId,
    status_id: &StatusId,
) -> Result<Conversation, TuskError> {
    let account_id = account_id.0.clone();
    let thread_id = thread_id.0.clone();
    let status_id = status_id.0.clone();
    let fresh_id = ConversationId::generate().0;

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let updated_at = now();

            tx.execute(
                "INSERT INTO conversations
                     (id, account_id, thread_id, last_status_id, read, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)
                 ON CONFLICT(account_id, thread_id) DO NOTHING",
                params![fresh_id, account_id, thread_id, status_id, updated_at],
            )?;
            let conversation_id: String = tx.query_row(
                "SELECT id FROM conversations WHERE account_id = ?1 AND thread_id = ?2",
                params![account_id, thread_id],
                |row| row.get(0),
            )?;

            let linked = tx.execute(
                "INSERT OR IGNORE INTO conversation_statuses (conversation_id, status_id)
                 VALUES (?1, ?2)",
                params![conversation_id, status_id],
            )?;
            if linked > 0 {
                // ULIDs sort by creation, so text comparison keeps the newest status.
                tx.execute(
                    "UPDATE conversations SET
                         last_status_id = CASE WHEN ?2 > last_status_id
                                               THEN ?2 ELSE last_status_id END,
                         read = 0,
                         updated_at = ?3
                     WHERE id = ?1",
                    params![conversation_id, status_id, updated_at],
                )?;
            }

            let conversation = select_by_key(&tx, &account_id, &thread_id)?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;
            Ok(conversation)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(
    db: &Database,
    account_id: &AccountId,
    thread_id: &ThreadId,
) -> Result<Option<Conversation>, TuskError> {
    let account_id = account_id.0.clone();
    let thread_id = thread_id.0.clone();
    db.connection()
        .call(move |conn| select_by_key(conn, &account_id, &thread_id))
        .await
        .map_err(map_tr_err)
}

/// Most recently active first.
pub async fn list_for(db: &Database, account_id: &AccountId) -> Result<Vec<Conversation>, TuskError> {
    let account_id = account_id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE account_id = ?1 ORDER BY last_status_id DESC"
            ))?;
            let rows = stmt.query_map(params![account_id], conversation_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn mark_read(db: &Database, id: &ConversationId) -> Result<(), TuskError> {
    let conversation_id = id.0.clone();
    let updated = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET read = 1 WHERE id = ?1",
                params![conversation_id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if updated == 0 {
        return Err(TuskError::NotFound {
            entity: "conversation",
            id: id.0.clone(),
        });
    }
    Ok(())
}

/// Unlink `status_id` everywhere and repair or drop the affected rows.
pub async fn remove_status(db: &Database, status_id: &StatusId) -> Result<Vec<AccountId>, TuskError> {
    let status_id = status_id.0.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let affected: Vec<(String, String, String)> = {
                let mut stmt = tx.prepare(
                    "SELECT c.id, c.account_id, c.last_status_id
                     FROM conversation_statuses cs
                     JOIN conversations c ON c.id = cs.conversation_id
                     WHERE cs.status_id = ?1
                     ORDER BY c.account_id",
                )?;
                let rows = stmt.query_map(params![status_id], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?;
                rows.collect::<rusqlite::Result<_>>()?
            };

            tx.execute(
                "DELETE FROM conversation_statuses WHERE status_id = ?1",
                params![status_id],
            )?;

            let updated_at = now();
            let mut owners = Vec::with_capacity(affected.len());
            for (conversation_id, owner, last_status_id) in affected {
                if last_status_id == status_id {
                    let newest: Option<String> = tx.query_row(
                        "SELECT MAX(status_id) FROM conversation_statuses
                         WHERE conversation_id = ?1",
                        params![conversation_id],
                        |row| row.get(0),
                    )?;
                    match newest {
                        Some(newest) => {
                            tx.execute(
                                "UPDATE conversations SET last_status_id = ?2, updated_at = ?3
                                 WHERE id = ?1",
                                params![conversation_id, newest, updated_at],
                            )?;
                        }
                        None => {
                            tx.execute(
                                "DELETE FROM conversations WHERE id = ?1",
                                params![conversation_id],
                            )?;
                        }
                    }
                }
                owners.push(AccountId(owner));
            }

            tx.commit()?;
            Ok(owners)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_by_owner(db: &Database, account_id: &AccountId) -> Result<(), TuskError> {
    let account_id = account_id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM conversations WHERE account_id = ?1",
                params![account_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
