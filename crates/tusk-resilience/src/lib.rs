// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry primitives shared by the worker pool and the delivery client.

pub mod backoff;

pub use backoff::RetryPolicy;
