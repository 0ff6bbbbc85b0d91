// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker pool consuming the in-process queue.
//!
//! One consumer task per registered processor, with bounded per-queue
//! concurrency. Retryable failures re-enter the queue after the policy's
//! backoff; terminal failures and exhausted policies settle the job as
//! failed and leave the owning entity in its last persisted state.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use relayr_core::traits::queue::{Job, JobProcessor};

use crate::memory::{JobState, MemoryQueue, QueuedJob};

/// Running consumers for a set of queues.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns one consumer per processor. Each consumer claims its queue's
    /// receiver and dispatches up to `concurrency` jobs at a time.
    pub fn spawn(
        queue: Arc<MemoryQueue>,
        processors: Vec<Arc<dyn JobProcessor>>,
        concurrency: usize,
    ) -> Self {
        let mut handles = Vec::with_capacity(processors.len());
        for processor in processors {
            let queue = Arc::clone(&queue);
            handles.push(tokio::spawn(consume(queue, processor, concurrency.max(1))));
        }
        Self { handles }
    }

    /// Aborts all consumer tasks. In-flight jobs are dropped; the
    /// production engine would redeliver them, the in-process one does not.
    pub fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

async fn consume(queue: Arc<MemoryQueue>, processor: Arc<dyn JobProcessor>, concurrency: usize) {
    let queue_name = processor.queue();
    let Some(mut rx) = queue.take_receiver(queue_name) else {
        warn!(queue = %queue_name, "queue already has a consumer, skipping");
        return;
    };
    let semaphore = Arc::new(Semaphore::new(concurrency));
    debug!(queue = %queue_name, concurrency, "consumer started");

    while let Some(job) = rx.recv().await {
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            return;
        };
        let queue = Arc::clone(&queue);
        let processor = Arc::clone(&processor);
        tokio::spawn(async move {
            let _permit = permit;
            run_one(queue, processor, job).await;
        });
    }
    debug!(queue = %queue_name, "consumer stopped");
}

async fn run_one(queue: Arc<MemoryQueue>, processor: Arc<dyn JobProcessor>, job: QueuedJob) {
    let queue_name = processor.queue();
    queue.set_state(&job.id, JobState::Active);
    let delivery = Job {
        id: job.id.clone(),
        payload: job.payload.clone(),
        attempts_made: job.attempts_made,
    };

    match processor.process(delivery).await {
        Ok(()) => {
            debug!(queue = %queue_name, job_id = %job.id, "job completed");
            queue.set_state(&job.id, JobState::Completed);
        }
        Err(err) => {
            let attempt = job.attempts_made + 1;
            if err.is_retryable() && attempt < job.policy.attempts {
                let delay = job.policy.delay_for(attempt);
                warn!(
                    queue = %queue_name,
                    job_id = %job.id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "job failed, retrying"
                );
                queue.set_state(
                    &job.id,
                    JobState::Retrying {
                        next_attempt: attempt + 1,
                    },
                );
                // Park the delayed retry on a timer task so the worker slot
                // frees immediately; a backing-off job must not count against
                // the queue's concurrency.
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    queue.resubmit(
                        queue_name,
                        QueuedJob {
                            attempts_made: attempt,
                            ..job
                        },
                    );
                });
            } else {
                error!(
                    queue = %queue_name,
                    job_id = %job.id,
                    attempt,
                    error = %err,
                    "job failed terminally"
                );
                queue.set_state(
                    &job.id,
                    JobState::Failed {
                        error: err.to_string(),
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;

    use relayr_core::error::RelayrError;
    use relayr_core::traits::queue::{JobQueue, RetryPolicy};

    use super::*;

    struct FlakyProcessor {
        calls: AtomicU32,
        fail_first: u32,
        terminal: bool,
    }

    #[async_trait]
    impl JobProcessor for FlakyProcessor {
        fn queue(&self) -> &'static str {
            "flaky"
        }

        async fn process(&self, _job: Job<Value>) -> Result<(), RelayrError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                if self.terminal {
                    return Err(RelayrError::Payload("bad payload".into()));
                }
                return Err(RelayrError::Transport {
                    message: "upstream unavailable".into(),
                    source: None,
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn retryable_failure_is_retried_until_success() {
        let queue = MemoryQueue::new();
        let processor = Arc::new(FlakyProcessor {
            calls: AtomicU32::new(0),
            fail_first: 2,
            terminal: false,
        });
        let pool = WorkerPool::spawn(Arc::clone(&queue), vec![processor.clone()], 2);

        let policy = RetryPolicy::new(5, Duration::from_millis(5));
        let handle = queue
            .enqueue("flaky", serde_json::json!({}), policy)
            .await
            .expect("enqueue");

        let state = queue.wait_settled(&handle.id, Duration::from_secs(2)).await;
        assert_eq!(state, Some(JobState::Completed));
        assert_eq!(processor.calls.load(Ordering::SeqCst), 3);
        pool.shutdown();
    }

    #[tokio::test]
    async fn terminal_failure_is_not_retried() {
        let queue = MemoryQueue::new();
        let processor = Arc::new(FlakyProcessor {
            calls: AtomicU32::new(0),
            fail_first: u32::MAX,
            terminal: true,
        });
        let pool = WorkerPool::spawn(Arc::clone(&queue), vec![processor.clone()], 2);

        let handle = queue
            .enqueue("flaky", serde_json::json!({}), RetryPolicy::new(5, Duration::from_millis(5)))
            .await
            .expect("enqueue");

        let state = queue.wait_settled(&handle.id, Duration::from_secs(2)).await;
        assert!(matches!(state, Some(JobState::Failed { .. })));
        assert_eq!(processor.calls.load(Ordering::SeqCst), 1);
        pool.shutdown();
    }

    struct OrderRecorder {
        failed_once: AtomicU32,
        completed: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl JobProcessor for OrderRecorder {
        fn queue(&self) -> &'static str {
            "ordered"
        }

        async fn process(&self, job: Job<Value>) -> Result<(), RelayrError> {
            let name = job.payload["name"].as_str().unwrap_or_default().to_owned();
            if name == "slow" && self.failed_once.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(RelayrError::Transport {
                    message: "upstream unavailable".into(),
                    source: None,
                });
            }
            self.completed.lock().unwrap().push(name);
            Ok(())
        }
    }

    #[tokio::test]
    async fn later_jobs_may_complete_while_an_earlier_job_backs_off() {
        let queue = MemoryQueue::new();
        let processor = Arc::new(OrderRecorder {
            failed_once: AtomicU32::new(0),
            completed: std::sync::Mutex::new(Vec::new()),
        });
        let pool = WorkerPool::spawn(Arc::clone(&queue), vec![processor.clone()], 2);

        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let slow = queue
            .enqueue("ordered", serde_json::json!({"name": "slow"}), policy)
            .await
            .expect("enqueue");
        let fast = queue
            .enqueue("ordered", serde_json::json!({"name": "fast"}), policy)
            .await
            .expect("enqueue");

        assert_eq!(
            queue.wait_settled(&fast.id, Duration::from_secs(2)).await,
            Some(JobState::Completed)
        );
        assert_eq!(
            queue.wait_settled(&slow.id, Duration::from_secs(2)).await,
            Some(JobState::Completed)
        );
        let completed = processor.completed.lock().unwrap().clone();
        assert_eq!(completed, vec!["fast".to_owned(), "slow".to_owned()]);
        pool.shutdown();
    }

    #[tokio::test]
    async fn backoff_does_not_hold_the_only_worker_slot() {
        let queue = MemoryQueue::new();
        let processor = Arc::new(OrderRecorder {
            failed_once: AtomicU32::new(0),
            completed: std::sync::Mutex::new(Vec::new()),
        });
        let pool = WorkerPool::spawn(Arc::clone(&queue), vec![processor.clone()], 1);

        let policy = RetryPolicy::new(3, Duration::from_millis(400));
        let slow = queue
            .enqueue("ordered", serde_json::json!({"name": "slow"}), policy)
            .await
            .expect("enqueue");
        let fast = queue
            .enqueue("ordered", serde_json::json!({"name": "fast"}), policy)
            .await
            .expect("enqueue");

        // With a single slot, fast must still settle while slow is backing
        // off, well before the 400ms retry delay elapses.
        assert_eq!(
            queue
                .wait_settled(&fast.id, Duration::from_millis(200))
                .await,
            Some(JobState::Completed)
        );
        assert_eq!(
            queue.wait_settled(&slow.id, Duration::from_secs(2)).await,
            Some(JobState::Completed)
        );
        pool.shutdown();
    }

    #[tokio::test]
    async fn exhausted_policy_settles_failed() {
        let queue = MemoryQueue::new();
        let processor = Arc::new(FlakyProcessor {
            calls: AtomicU32::new(0),
            fail_first: u32::MAX,
            terminal: false,
        });
        let pool = WorkerPool::spawn(Arc::clone(&queue), vec![processor.clone()], 2);

        let handle = queue
            .enqueue("flaky", serde_json::json!({}), RetryPolicy::new(3, Duration::from_millis(5)))
            .await
            .expect("enqueue");

        let state = queue.wait_settled(&handle.id, Duration::from_secs(2)).await;
        assert!(matches!(state, Some(JobState::Failed { .. })));
        assert_eq!(processor.calls.load(Ordering::SeqCst), 3);
        pool.shutdown();
    }
}
