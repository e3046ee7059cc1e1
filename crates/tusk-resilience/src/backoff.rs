// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded exponential backoff.
//!
//! Delays grow by `multiplier` after each failure and are capped at `max`,
//! so consecutive retries happen at strictly increasing intervals until the
//! cap is reached.

use std::time::Duration;

use tusk_config::model::BackoffConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base: Duration,
    max: Duration,
    multiplier: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base,
            max: max.max(base),
            multiplier: if multiplier > 1.0 { multiplier } else { 2.0 },
        }
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether another attempt is allowed after `attempts_made` attempts.
    pub fn allows_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Delay before the next attempt, after `failures` consecutive failures (1-based).
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(63) as i32;
        let scaled = self.base.as_secs_f64() * self.multiplier.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(scaled)
        }
    }

    /// Every delay this policy would wait, in order.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..self.max_attempts).map(|failures| self.delay_for(failures))
    }
}

impl From<&BackoffConfig> for RetryPolicy {
    fn from(config: &BackoffConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.base(),
            config.max(),
            config.multiplier,
        )
    }
}
