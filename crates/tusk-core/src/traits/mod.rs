// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Long-lived collaborators extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod email;
pub mod handler;
pub mod signer;
pub mod storage;

pub use adapter::PluginAdapter;
pub use email::{EmailContent, EmailSender};
pub use handler::Handler;
pub use signer::Signer;
pub use storage::StorageAdapter;
