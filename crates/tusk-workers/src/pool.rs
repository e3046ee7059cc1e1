// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-size pool of executors pulling from the [`MessageQueue`].
//!
//! Each executor pops an entry, resolves its handlers, runs the handlers
//! that have not yet settled for it concurrently (each under the handler
//! deadline and a panic guard), then completes, retries, or dead-letters
//! the entry.
//!
//! Failures are judged per handler. A handler that fails permanently is
//! settled and its failure is kept on the entry; handlers that failed
//! transiently are retried on their own. Once nothing is left to retry the
//! entry is completed, or dead-lettered once with every kept failure.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use tusk_config::model::WorkersConfig;
use tusk_core::{
    DeadLetter, ErrorClass, FailureKind, Handler, HandlerContext, Message, StorageAdapter, TuskError, new_ulid,
};
use tusk_resilience::RetryPolicy;

use crate::dispatch::DispatchTable;
use crate::queue::{MessageQueue, QueueEntry};
use crate::recording;

struct PoolInner {
    queue: Arc<MessageQueue>,
    dispatch: Arc<DispatchTable>,
    storage: Arc<dyn StorageAdapter>,
    retry: RetryPolicy,
    handler_timeout: Duration,
}

pub struct WorkerPool {
    inner: Arc<PoolInner>,
    drain_timeout: Duration,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(
        queue: Arc<MessageQueue>,
        dispatch: Arc<DispatchTable>,
        storage: Arc<dyn StorageAdapter>,
        config: &WorkersConfig,
    ) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                queue,
                dispatch,
                storage,
                retry: RetryPolicy::from(&config.retry),
                handler_timeout: config.handler_timeout(),
            }),
            drain_timeout: config.drain_timeout(),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Launch `n` executors. Must be called from within a tokio runtime.
    pub fn start(&self, n: usize) -> Result<(), TuskError> {
        if n == 0 {
            return Err(TuskError::Config(
                "worker pool needs at least one executor".to_string(),
            ));
        }
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        if !workers.is_empty() {
            return Err(TuskError::Internal("worker pool already started".to_string()));
        }
        for worker_id in 0..n {
            let inner = Arc::clone(&self.inner);
            workers.push(tokio::spawn(run_worker(worker_id, inner)));
        }
        info!(workers = n, "worker pool started");
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Stop accepting pushes and wait for queued and in-flight messages.
    ///
    /// Messages still waiting when the drain timeout expires are
    /// dead-lettered; handlers already running are allowed to finish.
    pub async fn stop(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        self.inner.queue.shutdown();
        info!(
            queued = self.inner.queue.len(),
            in_flight = self.inner.queue.in_flight(),
            "draining worker pool"
        );

        let join = join_all(handles);
        tokio::pin!(join);
        let results = match tokio::time::timeout(self.drain_timeout, &mut join).await {
            Ok(results) => results,
            Err(_) => {
                let leftovers = self.inner.queue.close_hard();
                warn!(
                    timeout_secs = self.drain_timeout.as_secs(),
                    dead_lettered = leftovers.len(),
                    "drain timeout reached, dead-lettering queued messages"
                );
                for mut entry in leftovers {
                    entry
                        .failures
                        .push("worker pool stopped before the message ran".to_string());
                    self.inner.dead_letter(&entry).await;
                }
                join.await
            }
        };

        for result in results {
            if let Err(e) = result {
                error!(error = %e, "worker task ended abnormally");
            }
        }
        info!("worker pool stopped");
    }
}

async fn run_worker(worker_id: usize, inner: Arc<PoolInner>) {
    debug!(worker_id, "worker started");
    while let Some(entry) = inner.queue.pop().await {
        recording::queue_depth(inner.queue.len());
        inner.process(entry).await;
    }
    debug!(worker_id, "worker stopped");
}

impl PoolInner {
    async fn process(&self, mut entry: QueueEntry) {
        let msg = Arc::clone(&entry.message);
        entry.attempts += 1;
        let attempt = entry.attempts;

        if let Err(e) = msg.validate() {
            entry.failures.push(e.to_string());
            self.finish(entry).await;
            return;
        }

        let handlers = self.dispatch.resolve(msg.object_type(), msg.activity_type());
        if handlers.is_empty() {
            debug!(
                object_type = %msg.object_type(),
                activity_type = %msg.activity_type(),
                "no handlers registered, dropping message"
            );
            self.queue.complete(entry.seq());
            recording::processed(recording::Outcome::Completed);
            return;
        }

        let pending: Vec<Arc<dyn Handler>> = handlers
            .iter()
            .filter(|h| !entry.settled_handlers.contains(h.name()))
            .cloned()
            .collect();

        debug!(
            message_id = %msg.id(),
            object_type = %msg.object_type(),
            activity_type = %msg.activity_type(),
            origin = %msg.origin(),
            attempt,
            handlers = pending.len(),
            "processing message"
        );

        let ctx = HandlerContext::new(attempt, self.handler_timeout);
        let results = join_all(pending.iter().map(|h| self.run_handler(h.as_ref(), &ctx, &msg))).await;

        let mut retryable = Vec::new();
        for (handler, result) in pending.iter().zip(results) {
            let name = handler.name();
            match result {
                Ok(()) => {
                    entry.settled_handlers.insert(name);
                }
                Err(e) if e.class() == ErrorClass::Transient => {
                    for settled in e.settled_recipients() {
                        entry.failures.push(format!("{name}: {settled}"));
                    }
                    retryable.push((name, e));
                }
                Err(e) => {
                    warn!(
                        message_id = %msg.id(),
                        handler = name,
                        attempt,
                        error = %e,
                        "handler failed permanently"
                    );
                    entry.settled_handlers.insert(name);
                    entry.failures.push(format!("{name}: {e}"));
                }
            }
        }

        if retryable.is_empty() {
            self.finish(entry).await;
            return;
        }

        let summary = retryable
            .iter()
            .map(|(name, e)| describe_retryable(name, e))
            .collect::<Vec<_>>()
            .join("; ");

        if self.retry.allows_retry(attempt) {
            let delay = self.retry.delay_for(attempt);
            warn!(
                message_id = %msg.id(),
                object_type = %msg.object_type(),
                activity_type = %msg.activity_type(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %summary,
                "handler failed, retrying message"
            );
            match self.queue.retry(entry, delay) {
                Ok(()) => recording::processed(recording::Outcome::Retried),
                Err(mut entry) => {
                    entry.failures.push(format!("stopped before retry: {summary}"));
                    self.finish(entry).await;
                }
            }
        } else {
            entry.failures.push(summary);
            self.finish(entry).await;
        }
    }

    /// Release a message that has nothing left to retry, dead-lettering it
    /// if any handler or recipient failed for good along the way.
    async fn finish(&self, entry: QueueEntry) {
        if entry.failures.is_empty() {
            recording::processed(recording::Outcome::Completed);
        } else {
            self.dead_letter(&entry).await;
        }
        self.queue.complete(entry.seq());
    }

    async fn run_handler(
        &self,
        handler: &dyn Handler,
        ctx: &HandlerContext,
        msg: &Message,
    ) -> Result<(), TuskError> {
        let started = Instant::now();
        let guarded = AssertUnwindSafe(handler.handle(ctx, msg)).catch_unwind();
        let result = match tokio::time::timeout_at(ctx.deadline, guarded).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(TuskError::HandlerPanic {
                handler: handler.name().to_string(),
                message: panic_message(panic.as_ref()),
            }),
            Err(_) => Err(TuskError::Timeout {
                duration: self.handler_timeout,
            }),
        };
        recording::handler_duration(handler.name(), started.elapsed());
        if let Err(e) = &result {
            debug!(handler = handler.name(), error = %e, "handler failed");
        }
        result
    }

    async fn dead_letter(&self, entry: &QueueEntry) {
        let msg = &entry.message;
        let reason = entry.failures.join("; ");
        error!(
            message_id = %msg.id(),
            object_type = %msg.object_type(),
            activity_type = %msg.activity_type(),
            origin = %msg.origin(),
            target = ?msg.target(),
            attempts = entry.attempts,
            error = %reason,
            "message dead-lettered"
        );
        recording::processed(recording::Outcome::DeadLettered);

        let dead_letter = DeadLetter {
            id: new_ulid(),
            message: Message::clone(msg),
            attempts: entry.attempts,
            error: reason,
            dead_lettered_at: Utc::now(),
        };
        if let Err(e) = self.storage.record_dead_letter(&dead_letter).await {
            error!(message_id = %msg.id(), error = %e, "failed to persist dead letter");
        }
    }
}

/// Describe a transient failure without repeating recipients already kept
/// on the entry.
fn describe_retryable(handler: &str, e: &TuskError) -> String {
    match e {
        TuskError::FanOut { failures, .. } => failures
            .iter()
            .filter(|f| f.kind == FailureKind::Transient)
            .map(|f| format!("{handler}: {f}"))
            .collect::<Vec<_>>()
            .join("; "),
        _ => format!("{handler}: {e}"),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
