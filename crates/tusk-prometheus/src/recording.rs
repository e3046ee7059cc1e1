// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade, so the helpers are no-ops until a recorder
//! is installed.

use std::time::Duration;

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Final outcome of one message, used as the `outcome` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Retried,
    DeadLettered,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Retried => "retried",
            Outcome::DeadLettered => "dead_lettered",
        }
    }
}

/// Register all Tusk metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("tusk_messages_pushed_total", "Messages pushed onto the queue");
    describe_counter!(
        "tusk_messages_processed_total",
        "Messages processed, by outcome"
    );
    describe_gauge!("tusk_queue_depth", "Messages waiting in the queue");
    describe_histogram!(
        "tusk_handler_duration_seconds",
        "Handler execution time in seconds"
    );
    describe_counter!(
        "tusk_deliveries_total",
        "Federation deliveries per inbox, by outcome"
    );
}

pub fn record_pushed(object_type: &str, activity_type: &str) {
    metrics::counter!(
        "tusk_messages_pushed_total",
        "object_type" => object_type.to_string(),
        "activity_type" => activity_type.to_string()
    )
    .increment(1);
}

pub fn record_processed(outcome: Outcome) {
    metrics::counter!("tusk_messages_processed_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn set_queue_depth(depth: usize) {
    metrics::gauge!("tusk_queue_depth").set(depth as f64);
}

pub fn record_handler_duration(handler: &'static str, elapsed: Duration) {
    metrics::histogram!("tusk_handler_duration_seconds", "handler" => handler)
        .record(elapsed.as_secs_f64());
}

/// `outcome` is `delivered` or a failure kind (`transient`, `permanent`, `exhausted`).
pub fn record_delivery(outcome: &str) {
    metrics::counter!("tusk_deliveries_total", "outcome" => outcome.to_string()).increment(1);
}
