// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process queue engine.
//!
//! One unbounded channel per named queue, with a shared state table so
//! callers (and tests) can observe a job's lifecycle: queued, active,
//! retrying, then completed or failed. Delivery is at-least-once within
//! the process; durability across restarts is the production engine's
//! concern, not this one's.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{Notify, mpsc};
use tracing::debug;

use async_trait::async_trait;
use relayr_core::error::RelayrError;
use relayr_core::traits::queue::{JobHandle, JobQueue, RetryPolicy};

/// Lifecycle of one enqueued job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Active,
    /// Waiting out the backoff before delivery attempt `next_attempt`.
    Retrying { next_attempt: u32 },
    Completed,
    Failed { error: String },
}

impl JobState {
    pub fn is_settled(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed { .. })
    }
}

/// One queued delivery, carried between the engine and the worker pool.
#[derive(Debug)]
pub(crate) struct QueuedJob {
    pub id: String,
    pub payload: Value,
    pub policy: RetryPolicy,
    pub attempts_made: u32,
}

struct QueueChannel {
    sender: mpsc::UnboundedSender<QueuedJob>,
}

/// In-process [`JobQueue`] engine.
pub struct MemoryQueue {
    channels: DashMap<String, QueueChannel>,
    receivers: DashMap<String, mpsc::UnboundedReceiver<QueuedJob>>,
    states: DashMap<String, JobState>,
    settled: Notify,
}

impl MemoryQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            channels: DashMap::new(),
            receivers: DashMap::new(),
            states: DashMap::new(),
            settled: Notify::new(),
        })
    }

    fn sender_for(&self, queue: &str) -> mpsc::UnboundedSender<QueuedJob> {
        if let Some(channel) = self.channels.get(queue) {
            return channel.sender.clone();
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels
            .insert(queue.to_string(), QueueChannel { sender: tx.clone() });
        self.receivers.insert(queue.to_string(), rx);
        tx
    }

    /// Takes the consumer end for a named queue. Each queue has exactly
    /// one consumer; a second take returns `None`.
    pub(crate) fn take_receiver(&self, queue: &str) -> Option<mpsc::UnboundedReceiver<QueuedJob>> {
        self.sender_for(queue);
        self.receivers.remove(queue).map(|(_, rx)| rx)
    }

    pub(crate) fn resubmit(&self, queue: &str, job: QueuedJob) {
        let id = job.id.clone();
        self.set_state(&id, JobState::Queued);
        // The consumer holds the receiver for the process lifetime, so a
        // send failure means shutdown is already underway.
        let _ = self.sender_for(queue).send(job);
    }

    pub(crate) fn set_state(&self, job_id: &str, state: JobState) {
        let settled = state.is_settled();
        self.states.insert(job_id.to_string(), state);
        if settled {
            self.settled.notify_waiters();
        }
    }

    /// Current lifecycle state of a job, if known.
    pub fn job_state(&self, job_id: &str) -> Option<JobState> {
        self.states.get(job_id).map(|s| s.clone())
    }

    /// Waits until the job reaches a settled state (completed or failed).
    pub async fn wait_settled(&self, job_id: &str, timeout: Duration) -> Option<JobState> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.job_state(job_id) {
                Some(state) if state.is_settled() => return Some(state),
                _ => {}
            }
            let notified = self.settled.notified();
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.job_state(job_id);
            }
        }
    }

    /// Waits until every job seen so far has settled.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.states.iter().all(|entry| entry.value().is_settled()) {
                return true;
            }
            let notified = self.settled.notified();
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return false;
            }
        }
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(
        &self,
        queue: &str,
        payload: Value,
        policy: RetryPolicy,
    ) -> Result<JobHandle, RelayrError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.set_state(&id, JobState::Queued);
        let job = QueuedJob {
            id: id.clone(),
            payload,
            policy,
            attempts_made: 0,
        };
        self.sender_for(queue)
            .send(job)
            .map_err(|_| RelayrError::Internal(format!("queue {queue} is shut down")))?;
        debug!(queue = %queue, job_id = %id, "job enqueued");
        Ok(JobHandle {
            id,
            queue: queue.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_records_queued_state() {
        let queue = MemoryQueue::new();
        let handle = queue
            .enqueue("webhooks", serde_json::json!({"n": 1}), RetryPolicy::default())
            .await
            .expect("enqueue");
        assert_eq!(queue.job_state(&handle.id), Some(JobState::Queued));
    }

    #[tokio::test]
    async fn receiver_can_be_taken_once() {
        let queue = MemoryQueue::new();
        queue
            .enqueue("calls", serde_json::json!({}), RetryPolicy::default())
            .await
            .expect("enqueue");
        assert!(queue.take_receiver("calls").is_some());
        assert!(queue.take_receiver("calls").is_none());
    }

    #[tokio::test]
    async fn jobs_are_delivered_in_order() {
        let queue = MemoryQueue::new();
        for n in 0..3 {
            queue
                .enqueue("calls", serde_json::json!({ "n": n }), RetryPolicy::default())
                .await
                .expect("enqueue");
        }
        let mut rx = queue.take_receiver("calls").expect("receiver");
        for n in 0..3 {
            let job = rx.recv().await.expect("job");
            assert_eq!(job.payload["n"], n);
        }
    }
}
