// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#[cfg(feature = "prometheus")]
pub(crate) fn delivery(outcome: &str) {
    tusk_prometheus::record_delivery(outcome);
}

#[cfg(not(feature = "prometheus"))]
pub(crate) fn delivery(_outcome: &str) {}
