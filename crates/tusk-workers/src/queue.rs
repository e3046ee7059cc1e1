// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unbounded message queue with per-entity ordering lanes.
//!
//! Every entry joins one lane per ordering key (the message's origin and
//! target). An entry only becomes poppable once it is at the front of all of
//! its lanes, and it stays at the front while it runs and while it waits for
//! a retry. A later message about the same entity therefore cannot start
//! until the earlier one has completed or been dead-lettered. Entries about
//! unrelated entities share no lane and run in parallel.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, error};
use tusk_core::{Message, TuskError};

use crate::recording;

/// A message plus the queue-owned retry state that is not part of its identity.
#[derive(Debug)]
pub struct QueueEntry {
    seq: u64,
    pub message: Arc<Message>,
    /// Attempts made so far.
    pub attempts: u32,
    pub next_attempt_at: Option<Instant>,
    /// Handlers that need no further run: they succeeded, or failed for good.
    pub settled_handlers: HashSet<&'static str>,
    /// Failures that will not be retried, written to the dead letter once
    /// the rest of the message has finished.
    pub failures: Vec<String>,
}

impl QueueEntry {
    /// Queue-assigned submission sequence number.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    /// Waiting behind an earlier entry in one of its lanes.
    Blocked,
    Ready,
    /// Waiting for its retry instant.
    Delayed,
    Running,
}

#[derive(Debug)]
struct Slot {
    entry: Option<QueueEntry>,
    keys: Vec<String>,
    state: SlotState,
}

#[derive(Debug, Default)]
struct State {
    next_seq: u64,
    slots: HashMap<u64, Slot>,
    ready: BTreeSet<u64>,
    delayed: BinaryHeap<Reverse<(Instant, u64)>>,
    lanes: HashMap<String, VecDeque<u64>>,
    /// Slots currently holding their entry: queued, blocked, or delayed.
    pending: usize,
    in_flight: usize,
    closed: bool,
    hard_closed: bool,
}

enum Next {
    Entry(QueueEntry),
    Closed,
    WaitUntil(Option<Instant>),
}

impl State {
    fn at_front_of_all_lanes(&self, seq: u64, keys: &[String]) -> bool {
        keys.iter()
            .all(|key| self.lanes.get(key).and_then(|lane| lane.front()) == Some(&seq))
    }

    fn promote_due(&mut self, now: Instant) {
        while let Some(Reverse((at, seq))) = self.delayed.peek().copied() {
            if at > now {
                break;
            }
            self.delayed.pop();
            let Some(keys) = self.slots.get(&seq).map(|slot| slot.keys.clone()) else {
                continue;
            };
            let ready = self.at_front_of_all_lanes(seq, &keys);
            if let Some(slot) = self.slots.get_mut(&seq) {
                if ready {
                    slot.state = SlotState::Ready;
                    self.ready.insert(seq);
                } else {
                    slot.state = SlotState::Blocked;
                }
            }
        }
    }

    fn next(&mut self, now: Instant) -> Next {
        if self.hard_closed {
            return Next::Closed;
        }
        self.promote_due(now);

        while let Some(seq) = self.ready.pop_first() {
            if let Some(slot) = self.slots.get_mut(&seq)
                && let Some(entry) = slot.entry.take()
            {
                slot.state = SlotState::Running;
                self.pending -= 1;
                self.in_flight += 1;
                return Next::Entry(entry);
            }
        }

        if self.closed && self.slots.is_empty() {
            return Next::Closed;
        }
        Next::WaitUntil(self.delayed.peek().map(|Reverse((at, _))| *at))
    }

    /// Release `seq`'s lane tickets and wake whatever was queued behind it.
    fn release(&mut self, seq: u64) {
        let Some(slot) = self.slots.remove(&seq) else {
            return;
        };
        if slot.entry.is_some() {
            self.pending -= 1;
        }
        let mut candidates = Vec::new();
        for key in &slot.keys {
            if let Some(lane) = self.lanes.get_mut(key) {
                if let Some(pos) = lane.iter().position(|s| *s == seq) {
                    lane.remove(pos);
                }
                match lane.front() {
                    Some(front) => candidates.push(*front),
                    None => {
                        self.lanes.remove(key);
                    }
                }
            }
        }
        for candidate in candidates {
            let Some(keys) = self
                .slots
                .get(&candidate)
                .filter(|slot| slot.state == SlotState::Blocked)
                .map(|slot| slot.keys.clone())
            else {
                continue;
            };
            if self.at_front_of_all_lanes(candidate, &keys)
                && let Some(slot) = self.slots.get_mut(&candidate)
            {
                slot.state = SlotState::Ready;
                self.ready.insert(candidate);
            }
        }
    }

    fn pending(&self) -> usize {
        self.pending
    }
}

/// Shared, internally synchronized queue. Producers call [`push`](Self::push),
/// workers call [`pop`](Self::pop) and then exactly one of
/// [`complete`](Self::complete) or [`retry`](Self::retry) per popped entry.
#[derive(Debug, Default)]
pub struct MessageQueue {
    state: Mutex<State>,
    notify: Notify,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue without blocking. Fails with [`TuskError::QueueClosed`] after shutdown.
    pub fn push(&self, message: Message) -> Result<(), TuskError> {
        let mut state = self.lock();
        if state.closed {
            error!(
                message_id = %message.id(),
                object_type = %message.object_type(),
                activity_type = %message.activity_type(),
                origin = %message.origin(),
                "push after queue shutdown; producer outlived the worker pool"
            );
            return Err(TuskError::QueueClosed);
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        let keys: Vec<String> = message
            .ordering_keys()
            .into_iter()
            .map(|key| key.as_str().to_string())
            .collect();
        for key in &keys {
            state.lanes.entry(key.clone()).or_default().push_back(seq);
        }
        let ready = state.at_front_of_all_lanes(seq, &keys);
        if ready {
            state.ready.insert(seq);
        }
        debug!(seq, message_id = %message.id(), ready, "message queued");
        recording::pushed(message.object_type(), message.activity_type());
        state.slots.insert(
            seq,
            Slot {
                entry: Some(QueueEntry {
                    seq,
                    message: Arc::new(message),
                    attempts: 0,
                    next_attempt_at: None,
                    settled_handlers: HashSet::new(),
                    failures: Vec::new(),
                }),
                keys,
                state: if ready {
                    SlotState::Ready
                } else {
                    SlotState::Blocked
                },
            },
        );
        state.pending += 1;
        recording::queue_depth(state.pending);
        drop(state);

        self.notify.notify_waiters();
        Ok(())
    }

    /// Wait for the next runnable entry.
    ///
    /// Returns `None` once the queue is shut down and holds nothing more, or
    /// immediately after [`close_hard`](Self::close_hard).
    pub async fn pop(&self) -> Option<QueueEntry> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let wait_until = match self.lock().next(Instant::now()) {
                Next::Entry(entry) => return Some(entry),
                Next::Closed => return None,
                Next::WaitUntil(at) => at,
            };

            match wait_until {
                Some(at) => {
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = tokio::time::sleep_until(at) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Finish a popped entry, successfully or by dead-lettering it.
    pub fn complete(&self, seq: u64) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        state.release(seq);
        drop(state);
        self.notify.notify_waiters();
    }

    /// Put a popped entry back to run again after `delay`, keeping its place
    /// at the front of its lanes.
    ///
    /// After [`close_hard`](Self::close_hard) the entry is handed back so the
    /// caller can dead-letter it and call [`complete`](Self::complete).
    pub fn retry(&self, mut entry: QueueEntry, delay: Duration) -> Result<(), QueueEntry> {
        let mut state = self.lock();
        if state.hard_closed {
            return Err(entry);
        }
        let seq = entry.seq;
        let at = Instant::now() + delay;
        entry.next_attempt_at = Some(at);
        match state.slots.get_mut(&seq) {
            Some(slot) => {
                slot.entry = Some(entry);
                slot.state = SlotState::Delayed;
            }
            None => return Err(entry),
        }
        state.pending += 1;
        state.in_flight = state.in_flight.saturating_sub(1);
        state.delayed.push(Reverse((at, seq)));
        drop(state);
        self.notify.notify_waiters();
        Ok(())
    }

    /// Messages waiting to run, including those waiting for a retry.
    pub fn len(&self) -> usize {
        self.lock().pending()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries currently held by workers.
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Nothing queued, delayed, or running.
    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        state.in_flight == 0 && state.pending() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Stop accepting pushes. Workers keep draining until nothing is left.
    pub fn shutdown(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    /// Stop handing out work and return every entry not currently running.
    pub fn close_hard(&self) -> Vec<QueueEntry> {
        let mut state = self.lock();
        state.closed = true;
        state.hard_closed = true;

        let waiting: Vec<u64> = state
            .slots
            .iter()
            .filter(|(_, slot)| slot.state != SlotState::Running)
            .map(|(seq, _)| *seq)
            .collect();
        let mut leftovers = Vec::with_capacity(waiting.len());
        for seq in waiting {
            if let Some(entry) = state.slots.get_mut(&seq).and_then(|slot| slot.entry.take()) {
                state.pending -= 1;
                leftovers.push(entry);
            }
            state.release(seq);
        }
        state.ready.clear();
        state.delayed.clear();
        drop(state);

        leftovers.sort_by_key(|entry| entry.seq);
        self.notify.notify_waiters();
        leftovers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tusk_core::{AccountId, ActivityType, ObjectType, Payload, StatusId};

    fn note(origin: &str, target: Option<&str>) -> Message {
        let msg = Message::new(
            ObjectType::Note,
            ActivityType::Create,
            AccountId::from(origin),
            Payload::Status(StatusId::generate()),
        );
        match target {
            Some(t) => msg.with_target(AccountId::from(t)),
            None => msg,
        }
    }

    fn try_pop(queue: &MessageQueue) -> Option<QueueEntry> {
        match queue.lock().next(Instant::now()) {
            Next::Entry(entry) => Some(entry),
            _ => None,
        }
    }

    #[tokio::test]
    async fn same_entity_waits_for_completion() {
        let queue = MessageQueue::new();
        queue.push(note("alice", None)).unwrap();
        queue.push(note("alice", None)).unwrap();

        let first = queue.pop().await.unwrap();
        assert!(try_pop(&queue).is_none(), "second alice message must wait");

        queue.complete(first.seq());
        let second = try_pop(&queue).unwrap();
        assert_eq!(second.seq(), 1);
    }

    #[tokio::test]
    async fn unrelated_entities_run_in_parallel() {
        let queue = MessageQueue::new();
        queue.push(note("alice", None)).unwrap();
        queue.push(note("bob", None)).unwrap();

        let a = queue.pop().await.unwrap();
        let b = queue.pop().await.unwrap();
        assert_ne!(a.message.origin(), b.message.origin());
        assert_eq!(queue.in_flight(), 2);
    }

    #[tokio::test]
    async fn target_lane_orders_across_origins() {
        let queue = MessageQueue::new();
        // carol -> alice, then alice's own message: both touch alice.
        queue.push(note("carol", Some("alice"))).unwrap();
        queue.push(note("alice", None)).unwrap();

        let first = queue.pop().await.unwrap();
        assert_eq!(first.message.origin().as_str(), "carol");
        assert!(try_pop(&queue).is_none());
        queue.complete(first.seq());
        assert!(try_pop(&queue).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_keeps_lane_position() {
        let queue = MessageQueue::new();
        queue.push(note("alice", None)).unwrap();
        queue.push(note("alice", None)).unwrap();

        let mut first = queue.pop().await.unwrap();
        first.attempts = 1;
        queue.retry(first, Duration::from_secs(5)).unwrap();
        assert!(try_pop(&queue).is_none(), "later message must not overtake a retry");

        let again = queue.pop().await.unwrap();
        assert_eq!(again.seq(), 0);
        assert_eq!(again.attempts, 1);
    }

    #[tokio::test]
    async fn push_after_shutdown_fails() {
        let queue = MessageQueue::new();
        queue.shutdown();
        assert!(matches!(
            queue.push(note("alice", None)),
            Err(TuskError::QueueClosed)
        ));
    }

    #[tokio::test]
    async fn pop_drains_then_reports_closed() {
        let queue = MessageQueue::new();
        queue.push(note("alice", None)).unwrap();
        queue.shutdown();

        let entry = queue.pop().await.unwrap();
        queue.complete(entry.seq());
        assert!(queue.pop().await.is_none());
    }

    #[tokio::test]
    async fn pop_wakes_on_push() {
        let queue = Arc::new(MessageQueue::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await.map(|e| e.seq()) })
        };
        tokio::task::yield_now().await;
        queue.push(note("alice", None)).unwrap();
        assert_eq!(waiter.await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn close_hard_returns_waiting_entries() {
        let queue = MessageQueue::new();
        queue.push(note("alice", None)).unwrap();
        queue.push(note("alice", None)).unwrap();
        queue.push(note("bob", None)).unwrap();

        let running = queue.pop().await.unwrap();
        let leftovers = queue.close_hard();
        assert_eq!(leftovers.len(), 2);
        assert!(queue.pop().await.is_none());

        // The running entry cannot be requeued any more.
        let running = queue.retry(running, Duration::from_secs(1)).unwrap_err();
        queue.complete(running.seq());
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn depth_counts_waiting_and_delayed_entries() {
        let queue = MessageQueue::new();
        queue.push(note("alice", None)).unwrap();
        queue.push(note("alice", None)).unwrap();
        queue.push(note("bob", None)).unwrap();
        assert_eq!(queue.len(), 3);

        let first = queue.pop().await.unwrap();
        assert_eq!(queue.len(), 2);
        queue.retry(first, Duration::from_secs(5)).unwrap();
        assert_eq!(queue.len(), 3);

        let bob = queue.pop().await.unwrap();
        assert_eq!(bob.message.origin().as_str(), "bob");
        queue.complete(bob.seq());
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.close_hard().len(), 2);
        assert!(queue.is_empty());
    }
}
