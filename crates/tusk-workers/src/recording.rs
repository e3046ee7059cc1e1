// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric hooks. Compiled to no-ops without the `prometheus` feature.

use std::time::Duration;

use tusk_core::{ActivityType, ObjectType};

#[cfg(feature = "prometheus")]
pub(crate) use tusk_prometheus::Outcome;

#[cfg(not(feature = "prometheus"))]
#[derive(Debug, Clone, Copy)]
pub(crate) enum Outcome {
    Completed,
    Retried,
    DeadLettered,
}

#[cfg(feature = "prometheus")]
pub(crate) fn processed(outcome: Outcome) {
    tusk_prometheus::record_processed(outcome);
}

#[cfg(not(feature = "prometheus"))]
pub(crate) fn processed(outcome: Outcome) {
    let _ = outcome;
}

#[cfg(feature = "prometheus")]
pub(crate) fn pushed(object_type: ObjectType, activity_type: ActivityType) {
    tusk_prometheus::record_pushed(&object_type.to_string(), &activity_type.to_string());
}

#[cfg(not(feature = "prometheus"))]
pub(crate) fn pushed(_object_type: ObjectType, _activity_type: ActivityType) {}

#[cfg(feature = "prometheus")]
pub(crate) fn queue_depth(depth: usize) {
    tusk_prometheus::set_queue_depth(depth);
}

#[cfg(not(feature = "prometheus"))]
pub(crate) fn queue_depth(_depth: usize) {}

#[cfg(feature = "prometheus")]
pub(crate) fn handler_duration(handler: &'static str, elapsed: Duration) {
    tusk_prometheus::record_handler_duration(handler, elapsed);
}

#[cfg(not(feature = "prometheus"))]
pub(crate) fn handler_duration(_handler: &'static str, _elapsed: Duration) {}
