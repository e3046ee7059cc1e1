// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Tusk configuration system.

use tusk_config::diagnostic::ConfigError;
use tusk_config::{load_and_validate_str, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[server]
host = "social.example.org"
protocol = "https"
instance_name = "Example Social"
log_level = "debug"

[storage]
database_path = "/tmp/tusk-test.db"
wal_mode = false

[workers]
count = 3
handler_timeout_secs = 30
drain_timeout_secs = 10

[workers.retry]
max_attempts = 7
base_ms = 250
max_ms = 8000
multiplier = 3.0

[delivery]
concurrency = 2
request_timeout_secs = 5
user_agent = "tusk-test"

[delivery.retry]
max_attempts = 3
base_ms = 100
max_ms = 1000
multiplier = 2.0

[email]
enabled = true
smtp_host = "smtp.example.org"
smtp_port = 2525
from = "Example <noreply@example.org>"

[cache]
max_entries = 50
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should load");
    assert_eq!(config.server.base_url(), "https://social.example.org");
    assert_eq!(config.server.log_level, "debug");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.workers.count, 3);
    assert_eq!(config.workers.retry.max_attempts, 7);
    assert_eq!(config.workers.retry.multiplier, 3.0);
    assert_eq!(config.delivery.concurrency, 2);
    assert_eq!(config.delivery.retry.max_ms, 1000);
    assert_eq!(config.email.smtp_port, 2525);
    assert_eq!(config.cache.max_entries, 50);
}

#[test]
fn empty_toml_yields_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.server.host, "localhost");
    assert_eq!(config.workers.retry.max_attempts, 5);
    assert_eq!(config.delivery.retry.base_ms, 500);
    assert!(!config.email.enabled);
}

#[test]
fn unknown_key_gets_a_suggestion() {
    let toml = r#"
[workers]
handler_timout_secs = 5
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    let suggestion = errors.iter().find_map(|e| match e {
        ConfigError::UnknownKey { suggestion, .. } => suggestion.clone(),
        _ => None,
    });
    assert_eq!(suggestion.as_deref(), Some("handler_timeout_secs"));
}

#[test]
fn partial_backoff_table_merges_over_defaults() {
    let toml = r#"
[delivery.retry]
max_attempts = 2
"#;
    let config = load_and_validate_str(toml).expect("partial table should load");
    assert_eq!(config.delivery.retry.max_attempts, 2);
    assert_eq!(config.delivery.retry.base_ms, 500);
    assert_eq!(config.delivery.retry.multiplier, 2.0);
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[workers]
count = "many"
"#;
    let errors = load_and_validate_str(toml).expect_err("string count should fail");
    assert!(matches!(errors[0], ConfigError::InvalidType { .. }), "got: {errors:?}");
}

#[test]
fn semantic_violations_surface_as_validation_errors() {
    let toml = r#"
[server]
log_level = "loud"
"#;
    let errors = load_and_validate_str(toml).expect_err("bad log level should fail");
    assert!(matches!(
        &errors[0],
        ConfigError::Validation { key, .. } if key == "server.log_level"
    ));
}
