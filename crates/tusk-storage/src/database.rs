// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and migrations.
//!
//! All reads and writes go through tokio-rusqlite's single background thread,
//! which serializes every closure passed to `call`. Do NOT open additional
//! connections for writes.

use tracing::debug;
use tusk_core::TuskError;

use crate::migrations;

/// Convert a tokio-rusqlite error into `TuskError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TuskError {
    TuskError::storage(e)
}

/// The single-writer SQLite handle.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path`, apply pending
    /// migrations, and configure the connection.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, TuskError> {
        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), TuskError> {
            let mut conn = rusqlite::Connection::open(&migrate_path).map_err(TuskError::storage)?;
            apply_pragmas(&conn, wal_mode).map_err(TuskError::storage)?;
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| TuskError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(TuskError::storage)?;
        conn.call(move |conn| apply_pragmas(conn, wal_mode))
            .await
            .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), TuskError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

fn apply_pragmas(conn: &rusqlite::Connection, wal_mode: bool) -> Result<(), rusqlite::Error> {
    if wal_mode {
        // journal_mode returns a row, so it cannot go through execute_batch.
        let _: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    }
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_runs_migrations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("open.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();

        let tables: i64 = db
            .connection()
            .call(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'conversations'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[tokio::test]
    async fn reopening_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reopen.db");
        let path = path.to_str().unwrap();
        Database::open(path, true).await.unwrap();
        let db = Database::open(path, true).await.unwrap();
        db.checkpoint().await.unwrap();
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fk.db");
        let db = Database::open(path.to_str().unwrap(), false).await.unwrap();

        let result = db
            .connection()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO users (id, account_id) VALUES ('u1', 'missing')",
                    [],
                )
            })
            .await;
        assert!(result.is_err(), "user without account should be rejected");
    }
}
