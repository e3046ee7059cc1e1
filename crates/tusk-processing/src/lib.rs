// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pipeline wiring for Tusk.
//!
//! Holds the handlers for derived local state (home timelines, the
//! conversation index, in-app notifications, the account-deletion cascade),
//! the message catalogue that maps events to handlers, and the
//! [`Processor`] that owns the running pipeline.

pub mod account;
pub mod conversation;
pub mod notify;
pub mod processor;
pub mod routes;
pub mod timeline;

pub use account::AccountCascadeHandler;
pub use conversation::ConversationIndex;
pub use notify::NotifyHandler;
pub use processor::Processor;
pub use routes::{Handlers, build_dispatch_table};
pub use timeline::TimelineHandler;
