// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transactional email for the Tusk side-effect pipeline.
//!
//! [`NotificationHandler`] decides who gets which email and guards against
//! resending on replay; [`SmtpSender`] and [`NoopSender`] carry it.

pub mod handler;
pub mod sender;
pub mod templates;

pub use handler::NotificationHandler;
pub use sender::{NoopSender, SmtpSender, sender_from_config};
pub use templates::Templates;
