// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity cache for the Tusk side-effect pipeline.
//!
//! [`EntityCache`] is a read-through cache of accounts, statuses, and
//! per-account conversation lists. [`CacheInvalidationHandler`] evicts
//! entries when messages say the underlying rows changed.

pub mod cache;
pub mod handler;

pub use cache::EntityCache;
pub use handler::CacheInvalidationHandler;
