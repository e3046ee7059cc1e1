// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle façade over the whole pipeline.
//!
//! The hosting process calls [`Processor::init`] once, [`Processor::start`]
//! once, pushes messages from request handlers, and calls
//! [`Processor::stop`] at shutdown.

use std::sync::Arc;

use tracing::info;

use tusk_cache::{CacheInvalidationHandler, EntityCache};
use tusk_config::TuskConfig;
use tusk_core::{EmailSender, Message, PluginAdapter, Signer, StorageAdapter, TuskError};
use tusk_email::{NotificationHandler, Templates};
use tusk_federation::{DeliveryClient, FederationHandler};
use tusk_workers::{DispatchTable, MessageQueue, WorkerPool};

use crate::account::AccountCascadeHandler;
use crate::conversation::ConversationIndex;
use crate::notify::NotifyHandler;
use crate::routes::{Handlers, build_dispatch_table};
use crate::timeline::TimelineHandler;

pub struct Processor {
    storage: Arc<dyn StorageAdapter>,
    cache: Arc<EntityCache>,
    conversations: ConversationIndex,
    queue: Arc<MessageQueue>,
    dispatch: Arc<DispatchTable>,
    pool: WorkerPool,
    worker_count: usize,
}

impl Processor {
    /// Wire handlers, dispatch table, queue, and pool. Nothing runs until `start`.
    ///
    /// `storage` must already be initialized.
    pub fn init(
        config: &TuskConfig,
        storage: Arc<dyn StorageAdapter>,
        email: Arc<dyn EmailSender>,
        signer: Arc<dyn Signer>,
    ) -> Result<Self, TuskError> {
        let cache = Arc::new(EntityCache::new(&config.cache));
        let conversations = ConversationIndex::new(Arc::clone(&storage));
        let client = DeliveryClient::new(&config.delivery, signer)?;

        let handlers = Handlers {
            federation: Arc::new(FederationHandler::new(
                Arc::clone(&storage),
                client,
                config.delivery.concurrency,
            )),
            email: Arc::new(NotificationHandler::new(
                Arc::clone(&storage),
                email,
                Templates::new(&config.server),
            )),
            timeline: Arc::new(TimelineHandler::new(
                Arc::clone(&storage),
                conversations.clone(),
                Arc::clone(&cache),
            )),
            cache: Arc::new(CacheInvalidationHandler::new(Arc::clone(&cache))),
            account_cascade: Arc::new(AccountCascadeHandler::new(
                conversations.clone(),
                Arc::clone(&cache),
            )),
            notify: Arc::new(NotifyHandler::new(Arc::clone(&storage))),
        };
        let dispatch = Arc::new(build_dispatch_table(&handlers));
        let queue = Arc::new(MessageQueue::new());
        let pool = WorkerPool::new(
            Arc::clone(&queue),
            Arc::clone(&dispatch),
            Arc::clone(&storage),
            &config.workers,
        );

        info!(routes = dispatch.len(), "pipeline initialized");
        Ok(Self {
            storage,
            cache,
            conversations,
            queue,
            dispatch,
            pool,
            worker_count: config.workers.count,
        })
    }

    /// Launch the configured number of workers.
    pub fn start(&self) -> Result<(), TuskError> {
        self.pool.start(self.worker_count)
    }

    /// Drain the queue, stop the workers, and drop the cache.
    pub async fn stop(&self) -> Result<(), TuskError> {
        self.pool.stop().await;
        self.cache.shutdown().await
    }

    /// Enqueue `msg` without waiting for it to be processed.
    pub fn push(&self, msg: Message) -> Result<(), TuskError> {
        self.queue.push(msg)
    }

    pub fn queue(&self) -> &Arc<MessageQueue> {
        &self.queue
    }

    pub fn dispatch(&self) -> &DispatchTable {
        &self.dispatch
    }

    pub fn cache(&self) -> &Arc<EntityCache> {
        &self.cache
    }

    pub fn conversations(&self) -> &ConversationIndex {
        &self.conversations
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }
}
