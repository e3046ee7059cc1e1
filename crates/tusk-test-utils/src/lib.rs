// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tusk integration tests.
//!
//! Provides in-memory and recording adapters plus a harness so pipeline
//! tests run fast and deterministically without SMTP or remote servers.
//!
//! # Components
//!
//! - [`InMemoryStorage`] - `StorageAdapter` backed by plain collections
//! - [`RecordingEmailSender`] - captures outgoing email, can fail on demand
//! - [`StaticSigner`] - signs with a fixed header
//! - [`TestHarness`] - a full `Processor` over a temp SQLite database
//! - [`fixtures`] - account, user, status, and follow builders

pub mod fixtures;
pub mod harness;
pub mod memory_storage;
pub mod mock_email;
pub mod mock_signer;

pub use harness::TestHarness;
pub use memory_storage::InMemoryStorage;
pub use mock_email::RecordingEmailSender;
pub use mock_signer::StaticSigner;
