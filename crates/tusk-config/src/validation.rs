// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Collects every violation instead of stopping at the first one.

use crate::diagnostic::ConfigError;
use crate::model::{BackoffConfig, TuskConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &TuskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |key: &str, message: String| {
        errors.push(ConfigError::Validation {
            key: key.to_string(),
            message,
        });
    };

    let host = config.server.host.trim();
    if host.is_empty() {
        invalid("server.host", "must not be empty".into());
    } else if host.contains('/') || host.contains(char::is_whitespace) {
        invalid(
            "server.host",
            format!("`{host}` must be a bare domain, without scheme or path"),
        );
    }

    if !matches!(config.server.protocol.as_str(), "http" | "https") {
        invalid(
            "server.protocol",
            format!("expected `http` or `https`, got `{}`", config.server.protocol),
        );
    }

    if !LOG_LEVELS.contains(&config.server.log_level.as_str()) {
        invalid(
            "server.log_level",
            format!(
                "`{}` is not one of {}",
                config.server.log_level,
                LOG_LEVELS.join(", ")
            ),
        );
    }

    if config.storage.database_path.trim().is_empty() {
        invalid("storage.database_path", "must not be empty".into());
    }

    if config.workers.count == 0 {
        invalid("workers.count", "must be at least 1".into());
    }
    if config.workers.handler_timeout_secs == 0 {
        invalid("workers.handler_timeout_secs", "must be at least 1".into());
    }
    validate_backoff("workers.retry", &config.workers.retry, &mut invalid);

    if config.delivery.concurrency == 0 {
        invalid("delivery.concurrency", "must be at least 1".into());
    }
    if config.delivery.request_timeout_secs == 0 {
        invalid("delivery.request_timeout_secs", "must be at least 1".into());
    }
    validate_backoff("delivery.retry", &config.delivery.retry, &mut invalid);

    if config.email.enabled {
        if config.email.smtp_host.as_deref().is_none_or(str::is_empty) {
            invalid("email.smtp_host", "required when email is enabled".into());
        }
        if config.email.from.as_deref().is_none_or(str::is_empty) {
            invalid("email.from", "required when email is enabled".into());
        }
    }

    if config.cache.max_entries == 0 {
        invalid("cache.max_entries", "must be at least 1".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_backoff(section: &str, backoff: &BackoffConfig, invalid: &mut impl FnMut(&str, String)) {
    if backoff.max_attempts == 0 {
        invalid(&format!("{section}.max_attempts"), "must be at least 1".into());
    }
    if backoff.base_ms == 0 {
        invalid(&format!("{section}.base_ms"), "must be at least 1".into());
    }
    if backoff.base_ms > backoff.max_ms {
        invalid(
            &format!("{section}.max_ms"),
            format!(
                "must be at least base_ms ({}), got {}",
                backoff.base_ms, backoff.max_ms
            ),
        );
    }
    if backoff.multiplier.is_nan() || backoff.multiplier <= 1.0 {
        invalid(
            &format!("{section}.multiplier"),
            format!("must be greater than 1.0, got {}", backoff.multiplier),
        );
    }
}
