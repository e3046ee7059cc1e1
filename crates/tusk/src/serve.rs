// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tusk serve` and the storage-backed inspection commands.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tusk_config::TuskConfig;
use tusk_core::{PluginAdapter, Signer, StorageAdapter, TuskError};
use tusk_email::sender_from_config;
use tusk_federation::DigestSigner;
use tusk_processing::Processor;
use tusk_storage::SqliteStorage;

/// Runs the pipeline until a shutdown signal arrives, then drains it.
pub async fn run_serve(config: TuskConfig) -> Result<(), TuskError> {
    init_tracing(&config.server.log_level);

    info!(host = %config.server.host, "starting tusk serve");

    #[cfg(feature = "prometheus")]
    let prometheus = match config.server.metrics_listen {
        Some(addr) => tusk_prometheus::PrometheusAdapter::with_listener(addr),
        None => tusk_prometheus::PrometheusAdapter::new(),
    };
    #[cfg(feature = "prometheus")]
    let prometheus = match prometheus {
        Ok(adapter) => Some(adapter),
        Err(e) => {
            warn!(error = %e, "prometheus initialization failed, continuing without metrics");
            None
        }
    };

    let sqlite = SqliteStorage::new(config.storage.clone());
    sqlite.initialize().await?;
    let storage: Arc<dyn StorageAdapter> = Arc::new(sqlite);

    let email = sender_from_config(&config.email)?;
    match email.health_check().await {
        Ok(status) => debug!(sender = email.name(), ?status, "email sender ready"),
        Err(e) => warn!(sender = email.name(), error = %e, "email sender health check failed"),
    }
    let signer: Arc<dyn Signer> = Arc::new(DigestSigner::new());

    let processor = Processor::init(&config, Arc::clone(&storage), email, signer)?;
    processor.start()?;
    info!(workers = config.workers.count, "pipeline running");

    let cancel = install_signal_handler();
    cancel.cancelled().await;

    info!("draining pipeline");
    processor.stop().await?;

    #[cfg(feature = "prometheus")]
    if let Some(adapter) = &prometheus {
        debug!(metrics = %adapter.render(), "final metrics");
    }

    storage.close().await?;
    info!("tusk stopped");
    Ok(())
}

/// Prints up to `limit` dead letters, newest first, one JSON object per line.
pub async fn print_dead_letters(config: TuskConfig, limit: usize) -> Result<(), TuskError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;

    for dead_letter in storage.dead_letters(limit).await? {
        let line = serde_json::to_string(&dead_letter)
            .map_err(|e| TuskError::Internal(format!("failed to encode dead letter: {e}")))?;
        println!("{line}");
    }

    storage.close().await
}

/// Returns a token cancelled on SIGINT or SIGTERM.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT, initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler, listening for SIGINT only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        trigger.cancel();
    });

    token
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tusk={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
