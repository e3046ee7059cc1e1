// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Accounts, users, follows, and reports.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tusk_core::{
    Account, AccountId, Follow, FollowId, Report, ReportId, TuskError, User, UserId,
};

use crate::database::{Database, map_tr_err};
use crate::queries::{parse_opt_ts, ts};

const ACCOUNT_COLUMNS: &str = "id, username, domain, uri, inbox_uri, shared_inbox_uri";

const USER_COLUMNS: &str = "id, account_id, email, unconfirmed_email, confirmation_token, \
     confirmation_sent_at, confirmed_at, approved, disabled, last_emailed_at, moderator";

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: AccountId(row.get(0)?),
        username: row.get(1)?,
        domain: row.get(2)?,
        uri: row.get(3)?,
        inbox_uri: row.get(4)?,
        shared_inbox_uri: row.get(5)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        account_id: AccountId(row.get(1)?),
        email: row.get(2)?,
        unconfirmed_email: row.get(3)?,
        confirmation_token: row.get(4)?,
        confirmation_sent_at: parse_opt_ts(5, row.get(5)?)?,
        confirmed_at: parse_opt_ts(6, row.get(6)?)?,
        approved: row.get(7)?,
        disabled: row.get(8)?,
        last_emailed_at: parse_opt_ts(9, row.get(9)?)?,
        moderator: row.get(10)?,
    })
}

pub async fn put_account(db: &Database, account: &Account) -> Result<(), TuskError> {
    let a = account.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO accounts (id, username, domain, uri, inbox_uri, shared_inbox_uri)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                     username = excluded.username,
                     domain = excluded.domain,
                     uri = excluded.uri,
                     inbox_uri = excluded.inbox_uri,
                     shared_inbox_uri = excluded.shared_inbox_uri",
                params![a.id.0, a.username, a.domain, a.uri, a.inbox_uri, a.shared_inbox_uri],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_account(db: &Database, id: &AccountId) -> Result<Option<Account>, TuskError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
                params![id],
                account_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn put_user(db: &Database, user: &User) -> Result<(), TuskError> {
    let u = user.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO users ({USER_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                     ON CONFLICT(id) DO UPDATE SET
                         email = excluded.email,
                         unconfirmed_email = excluded.unconfirmed_email,
                         confirmation_token = excluded.confirmation_token,
                         confirmation_sent_at = excluded.confirmation_sent_at,
                         confirmed_at = excluded.confirmed_at,
                         approved = excluded.approved,
                         disabled = excluded.disabled,
                         last_emailed_at = excluded.last_emailed_at,
                         moderator = excluded.moderator"
                ),
                params![
                    u.id.0,
                    u.account_id.0,
                    u.email,
                    u.unconfirmed_email,
                    u.confirmation_token,
                    u.confirmation_sent_at.map(ts),
                    u.confirmed_at.map(ts),
                    u.approved,
                    u.disabled,
                    u.last_emailed_at.map(ts),
                    u.moderator,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_user(db: &Database, id: &UserId) -> Result<Option<User>, TuskError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_user_by_account(
    db: &Database,
    account_id: &AccountId,
) -> Result<Option<User>, TuskError> {
    let account_id = account_id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE account_id = ?1"),
                params![account_id],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn moderators(db: &Database) -> Result<Vec<User>, TuskError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE moderator = 1 AND approved = 1 AND disabled = 0
                 ORDER BY id"
            ))?;
            let rows = stmt.query_map([], user_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Store the confirmation token that was just emailed.
pub async fn update_user_confirmation(
    db: &Database,
    id: &UserId,
    token: &str,
    sent_at: DateTime<Utc>,
) -> Result<(), TuskError> {
    let user_id = id.0.clone();
    let token = token.to_string();
    let sent_at = ts(sent_at);
    let updated = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET confirmation_token = ?2, confirmation_sent_at = ?3,
                     last_emailed_at = ?3
                 WHERE id = ?1",
                params![user_id, token, sent_at],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if updated == 0 {
        return Err(TuskError::NotFound {
            entity: "user",
            id: id.0.clone(),
        });
    }
    Ok(())
}

pub async fn put_follow(db: &Database, follow: &Follow) -> Result<(), TuskError> {
    let f = follow.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO follows (id, account_id, target_account_id, uri, pending)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET pending = excluded.pending",
                params![f.id.0, f.account_id.0, f.target_account_id.0, f.uri, f.pending],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_follow(db: &Database, id: &FollowId) -> Result<Option<Follow>, TuskError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, account_id, target_account_id, uri, pending FROM follows WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Follow {
                        id: FollowId(row.get(0)?),
                        account_id: AccountId(row.get(1)?),
                        target_account_id: AccountId(row.get(2)?),
                        uri: row.get(3)?,
                        pending: row.get(4)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn put_report(db: &Database, report: &Report) -> Result<(), TuskError> {
    let r = report.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO reports
                     (id, account_id, target_account_id, uri, action_taken, forwarded)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET action_taken = excluded.action_taken",
                params![
                    r.id.0,
                    r.account_id.0,
                    r.target_account_id.0,
                    r.uri,
                    r.action_taken,
                    r.forwarded,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_report(db: &Database, id: &ReportId) -> Result<Option<Report>, TuskError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, account_id, target_account_id, uri, action_taken, forwarded
                 FROM reports WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Report {
                        id: ReportId(row.get(0)?),
                        account_id: AccountId(row.get(1)?),
                        target_account_id: AccountId(row.get(2)?),
                        uri: row.get(3)?,
                        action_taken: row.get(4)?,
                        forwarded: row.get(5)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Local accounts following `account_id`.
pub async fn local_followers(
    db: &Database,
    account_id: &AccountId,
) -> Result<Vec<AccountId>, TuskError> {
    let account_id = account_id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id FROM follows f
                 JOIN accounts a ON a.id = f.account_id
                 WHERE f.target_account_id = ?1 AND a.domain IS NULL
                 ORDER BY a.id",
            )?;
            let rows = stmt.query_map(params![account_id], |row| Ok(AccountId(row.get(0)?)))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Distinct delivery inboxes of remote accounts following `account_id`.
pub async fn remote_follower_inboxes(
    db: &Database,
    account_id: &AccountId,
) -> Result<Vec<String>, TuskError> {
    let account_id = account_id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT COALESCE(a.shared_inbox_uri, a.inbox_uri) FROM follows f
                 JOIN accounts a ON a.id = f.account_id
                 WHERE f.target_account_id = ?1 AND a.domain IS NOT NULL
                 ORDER BY 1",
            )?;
            let rows = stmt.query_map(params![account_id], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
