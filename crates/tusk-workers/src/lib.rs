// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue, dispatch table, and worker pool for the Tusk side-effect pipeline.
//!
//! Producers push [`Message`](tusk_core::Message)s onto the [`MessageQueue`]
//! and return immediately. The [`WorkerPool`] pulls them, resolves handlers
//! through the [`DispatchTable`], and applies the retry policy, keeping
//! messages about the same entity in submission order.

pub mod dispatch;
pub mod pool;
pub mod queue;
mod recording;

pub use dispatch::DispatchTable;
pub use pool::WorkerPool;
pub use queue::{MessageQueue, QueueEntry};
