// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job queue collaborator contract.
//!
//! The core depends only on at-least-once delivery and configurable
//! backoff; the engine behind the trait (Redis-backed in production, the
//! in-process MemoryQueue in dev and tests) is interchangeable.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::RelayrError;

/// Bounded retry policy for one job: `attempts` total tries with
/// exponential backoff starting at `backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }

    /// Delay before retry number `attempt` (1-based), doubling each time
    /// and capped at 60 seconds.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.backoff.saturating_mul(1u32 << exp);
        delay.min(Duration::from_secs(60))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

/// Handle returned on enqueue, for logging and queue-state inspection.
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub id: String,
    pub queue: String,
}

/// One delivery of a queued job to a processor.
#[derive(Debug, Clone)]
pub struct Job<T> {
    pub id: String,
    pub payload: T,
    /// Number of completed attempts before this one (0 on first delivery).
    pub attempts_made: u32,
}

/// Enqueue side of the queue collaborator.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueues `payload` on the named queue under the given retry policy.
    async fn enqueue(
        &self,
        queue: &str,
        payload: Value,
        policy: RetryPolicy,
    ) -> Result<JobHandle, RelayrError>;
}

/// Serializes a typed payload and enqueues it.
pub async fn enqueue_job<T: Serialize + Sync>(
    queue: &dyn JobQueue,
    name: &str,
    payload: &T,
    policy: RetryPolicy,
) -> Result<JobHandle, RelayrError> {
    let value = serde_json::to_value(payload)
        .map_err(|e| RelayrError::Internal(format!("failed to serialize job payload: {e}")))?;
    queue.enqueue(name, value, policy).await
}

/// Consumer side: one processor registered per named queue.
///
/// A processor returning a retryable error re-queues the job under its
/// policy; a terminal error (or exhausted attempts) leaves the owning
/// entity in its last persisted state for reconciliation.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    /// The queue this processor consumes.
    fn queue(&self) -> &'static str;

    /// Processes one job delivery.
    async fn process(&self, job: Job<Value>) -> Result<(), RelayrError>;
}
