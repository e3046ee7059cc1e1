// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Tusk side-effect pipeline.
//!
//! WAL-mode SQLite with embedded migrations and a single-writer connection
//! via `tokio-rusqlite`. Holds the primary rows handlers read (accounts,
//! statuses, follows, reports) and the derived state they write: home
//! timelines, conversations, delivery and email bookkeeping, dead letters.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
