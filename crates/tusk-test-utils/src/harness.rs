// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline tests.
//!
//! `TestHarness` runs a real [`Processor`] over a temp SQLite database with
//! a recording email sender and a static signer. Retry delays default to a
//! few milliseconds so failure paths finish quickly.

use std::sync::Arc;
use std::time::Duration;

use tusk_config::TuskConfig;
use tusk_config::model::{BackoffConfig, StorageConfig};
use tusk_core::{Message, StorageAdapter, TuskError};
use tusk_processing::Processor;
use tusk_storage::SqliteStorage;

use crate::mock_email::RecordingEmailSender;
use crate::mock_signer::StaticSigner;

fn fast_backoff(max_attempts: u32) -> BackoffConfig {
    BackoffConfig {
        max_attempts,
        base_ms: 10,
        max_ms: 50,
        multiplier: 2.0,
    }
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    workers: usize,
    message_retry: BackoffConfig,
    delivery_retry: BackoffConfig,
    handler_timeout_secs: u64,
    drain_timeout_secs: u64,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            workers: 4,
            message_retry: fast_backoff(3),
            delivery_retry: fast_backoff(2),
            handler_timeout_secs: 10,
            drain_timeout_secs: 10,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_message_retry(mut self, retry: BackoffConfig) -> Self {
        self.message_retry = retry;
        self
    }

    pub fn with_delivery_retry(mut self, retry: BackoffConfig) -> Self {
        self.delivery_retry = retry;
        self
    }

    pub fn with_drain_timeout_secs(mut self, secs: u64) -> Self {
        self.drain_timeout_secs = secs;
        self
    }

    /// Build and start the pipeline.
    pub async fn build(self) -> Result<TestHarness, TuskError> {
        let temp_dir = tempfile::TempDir::new().map_err(TuskError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = TuskConfig::default();
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            wal_mode: true,
        };
        config.server.protocol = "http".to_string();
        config.workers.count = self.workers;
        config.workers.retry = self.message_retry;
        config.workers.handler_timeout_secs = self.handler_timeout_secs;
        config.workers.drain_timeout_secs = self.drain_timeout_secs;
        config.delivery.retry = self.delivery_retry;

        let sqlite = SqliteStorage::new(config.storage.clone());
        sqlite.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(sqlite);

        let emails = Arc::new(RecordingEmailSender::new());
        let processor = Processor::init(
            &config,
            Arc::clone(&storage),
            emails.clone(),
            Arc::new(StaticSigner::new()),
        )?;
        processor.start()?;

        Ok(TestHarness {
            storage,
            emails,
            processor,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A running pipeline over temp storage.
pub struct TestHarness {
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<dyn StorageAdapter>,
    /// Captures every email the pipeline sends.
    pub emails: Arc<RecordingEmailSender>,
    /// The running pipeline.
    pub processor: Processor,
    pub config: TuskConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn push(&self, msg: Message) -> Result<(), TuskError> {
        self.processor.push(msg)
    }

    /// Wait until nothing is queued, delayed, or running.
    ///
    /// Returns false if that did not happen within `timeout`.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let queue = self.processor.queue();
        tokio::time::timeout(timeout, async {
            while !queue.is_idle() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .is_ok()
    }

    pub async fn stop(&self) -> Result<(), TuskError> {
        self.processor.stop().await
    }
}
