// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `/etc/tusk/tusk.toml` < `~/.config/tusk/tusk.toml` < `./tusk.toml`,
//! with `TUSK_` environment variables applied last.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TuskConfig;

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/tusk/tusk.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "tusk.toml";

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("tusk/tusk.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tusk/tusk.toml`
/// 3. `~/.config/tusk/tusk.toml`
/// 4. `./tusk.toml`
/// 5. `TUSK_*` environment variables
pub fn load_config() -> Result<TuskConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<TuskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TuskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TuskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TuskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used for hierarchical loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TuskConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `split("_")` because key names contain
/// underscores: `TUSK_WORKERS_HANDLER_TIMEOUT_SECS` must become
/// `workers.handler_timeout_secs`, and `TUSK_DELIVERY_RETRY_MAX_ATTEMPTS`
/// must become `delivery.retry.max_attempts`.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("TUSK_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 6] = ["server", "storage", "workers", "delivery", "email", "cache"];

    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            let rest = match rest.strip_prefix("retry_") {
                Some(field) if section == "workers" || section == "delivery" => {
                    format!("retry.{field}")
                }
                _ => rest.to_string(),
            };
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("server_host"), "server.host");
        assert_eq!(
            map_env_key("workers_handler_timeout_secs"),
            "workers.handler_timeout_secs"
        );
        assert_eq!(
            map_env_key("delivery_retry_max_attempts"),
            "delivery.retry.max_attempts"
        );
        assert_eq!(map_env_key("email_smtp_host"), "email.smtp_host");
    }

    #[test]
    fn retry_prefix_only_nests_for_backoff_sections() {
        assert_eq!(map_env_key("storage_retry_x"), "storage.retry_x");
    }

    #[test]
    fn env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("tusk.toml", "[server]\nhost = \"file.example\"\n")?;
            jail.set_env("TUSK_SERVER_HOST", "env.example");
            jail.set_env("TUSK_WORKERS_RETRY_MAX_ATTEMPTS", "9");
            let config = load_config_from_path(Path::new("tusk.toml"))?;
            assert_eq!(config.server.host, "env.example");
            assert_eq!(config.workers.retry.max_attempts, 9);
            Ok(())
        });
    }

    #[test]
    fn metrics_listener_is_off_unless_configured() {
        let config = load_config_from_str("").unwrap();
        assert!(config.server.metrics_listen.is_none());

        let config = load_config_from_str("[server]\nmetrics_listen = \"127.0.0.1:9464\"\n").unwrap();
        assert_eq!(
            config.server.metrics_listen,
            Some(SocketAddr::from(([127, 0, 0, 1], 9464)))
        );
        assert!(load_config_from_str("[server]\nmetrics_listen = \"nope\"\n").is_err());
    }
}
