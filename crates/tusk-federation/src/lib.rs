// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound federation for the Tusk side-effect pipeline.
//!
//! [`DeliveryClient`] posts one activity to one inbox with bounded retry;
//! [`FederationHandler`] resolves an activity's audience and fans out.

pub mod activity;
pub mod client;
pub mod handler;
mod recording;
pub mod signer;

pub use client::DeliveryClient;
pub use handler::{DeliveryPlan, FederationHandler};
pub use signer::DigestSigner;
