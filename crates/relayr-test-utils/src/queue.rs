// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capturing [`JobQueue`] for producer-side assertions.
//!
//! Records every enqueue without executing anything; tests that need real
//! consumption use the worker pool from relayr-queue instead.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use relayr_core::error::RelayrError;
use relayr_core::traits::queue::{JobHandle, JobQueue, RetryPolicy};

/// One captured enqueue.
#[derive(Debug, Clone)]
pub struct CapturedJob {
    pub queue: String,
    pub payload: Value,
    pub policy: RetryPolicy,
}

/// Queue that records jobs instead of running them.
#[derive(Default)]
pub struct CapturingQueue {
    jobs: Mutex<Vec<CapturedJob>>,
}

impl CapturingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn jobs(&self) -> Vec<CapturedJob> {
        self.jobs.lock().await.clone()
    }

    /// Payloads captured on one named queue, in enqueue order.
    pub async fn jobs_on(&self, queue: &str) -> Vec<Value> {
        self.jobs
            .lock()
            .await
            .iter()
            .filter(|j| j.queue == queue)
            .map(|j| j.payload.clone())
            .collect()
    }

    pub async fn clear(&self) {
        self.jobs.lock().await.clear();
    }
}

#[async_trait]
impl JobQueue for CapturingQueue {
    async fn enqueue(
        &self,
        queue: &str,
        payload: Value,
        policy: RetryPolicy,
    ) -> Result<JobHandle, RelayrError> {
        self.jobs.lock().await.push(CapturedJob {
            queue: queue.to_string(),
            payload,
            policy,
        });
        Ok(JobHandle {
            id: Uuid::new_v4().to_string(),
            queue: queue.to_string(),
        })
    }
}
