// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound send processor.
//!
//! Consumes the outbound-messages queue, pushes the message through the
//! channel adapter, and keeps the persisted message in step with what the
//! provider actually accepted. Transient provider failures surface as
//! retryable errors and leave the message pending; rejections and
//! exhausted attempts mark it failed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use relayr_conversations::resolve_integration;
use relayr_core::error::RelayrError;
use relayr_core::jobs::{OutboundMessageJob, queues};
use relayr_core::traits::queue::{Job, JobProcessor, RetryPolicy};
use relayr_core::traits::repository::Repository;
use relayr_core::types::MessageStatus;

use crate::registry::AdapterRegistry;

pub struct OutboundProcessor {
    repo: Arc<dyn Repository>,
    adapters: Arc<AdapterRegistry>,
    retry: RetryPolicy,
}

impl OutboundProcessor {
    pub fn new(repo: Arc<dyn Repository>, adapters: Arc<AdapterRegistry>, retry: RetryPolicy) -> Self {
        Self {
            repo,
            adapters,
            retry,
        }
    }
}

#[async_trait]
impl JobProcessor for OutboundProcessor {
    fn queue(&self) -> &'static str {
        queues::OUTBOUND_MESSAGES
    }

    async fn process(&self, job: Job<Value>) -> Result<(), RelayrError> {
        let payload: OutboundMessageJob = serde_json::from_value(job.payload)
            .map_err(|e| RelayrError::Payload(format!("malformed outbound job: {e}")))?;

        let Some(mut message) = self
            .repo
            .message(&payload.account_id, &payload.message_id)
            .await?
        else {
            warn!(message_id = %payload.message_id, "send job for unknown message");
            return Ok(());
        };
        // Anything past pending means a previous attempt reached the
        // provider (or the message was terminally failed); re-sending
        // would duplicate it on the recipient's side.
        if message.status != MessageStatus::Pending {
            debug!(
                message_id = %message.id,
                status = %message.status,
                "send job for already-handled message"
            );
            return Ok(());
        }

        let integration = resolve_integration(
            self.repo.as_ref(),
            &payload.account_id,
            payload.channel,
            payload.integration_id.as_deref(),
        )
        .await?;
        let adapter = self.adapters.get(payload.channel)?;

        let attempt = job.attempts_made + 1;
        match adapter
            .send(&integration, &payload.recipient, &payload.content)
            .await
        {
            Ok(receipt) => {
                message.attempts_made = attempt;
                message.error = None;
                message.external_id = Some(receipt.external_id.clone());
                message.status = MessageStatus::Sent;
                message.sent_at = Some(Utc::now());
                self.repo.update_message(&message).await?;
                info!(
                    message_id = %message.id,
                    external_id = %receipt.external_id,
                    channel = %payload.channel,
                    "outbound message sent"
                );
                Ok(())
            }
            Err(e) => {
                message.attempts_made = attempt;
                message.error = Some(e.to_string());
                let out_of_attempts = attempt >= self.retry.attempts;
                if !e.is_retryable() || out_of_attempts {
                    message.status = MessageStatus::Failed;
                }
                self.repo.update_message(&message).await?;

                if e.is_retryable() {
                    warn!(
                        message_id = %message.id,
                        attempt,
                        error = %e,
                        "outbound send failed, queue will retry"
                    );
                    Err(e)
                } else {
                    warn!(
                        message_id = %message.id,
                        error = %e,
                        "outbound send rejected by provider"
                    );
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use relayr_core::types::{ChannelKind, OutboundContent};
    use relayr_test_utils::fixtures::{pending_message, telegram_integration};
    use relayr_test_utils::{InMemoryRepository, MockChannel, ScriptedFailure};

    struct Harness {
        repo: Arc<InMemoryRepository>,
        channel: Arc<MockChannel>,
        processor: OutboundProcessor,
    }

    async fn harness() -> Harness {
        let repo = Arc::new(InMemoryRepository::new());
        repo.add_integration(telegram_integration("tg-1", "acct-1"))
            .await;
        let channel = Arc::new(MockChannel::new(ChannelKind::Telegram));
        let mut registry = AdapterRegistry::new();
        registry.register(channel.clone());
        let processor = OutboundProcessor::new(
            repo.clone(),
            Arc::new(registry),
            RetryPolicy::default(),
        );
        Harness {
            repo,
            channel,
            processor,
        }
    }

    async fn seed_message(h: &Harness) -> String {
        let message = pending_message("conv-1", "acct-1", "hello");
        h.repo.insert_message(&message).await.unwrap();
        message.id
    }

    fn job_for(message_id: &str, attempts_made: u32) -> Job<Value> {
        let payload = OutboundMessageJob {
            message_id: message_id.to_string(),
            conversation_id: "conv-1".into(),
            account_id: "acct-1".into(),
            channel: ChannelKind::Telegram,
            recipient: "555".into(),
            content: OutboundContent::text("hello"),
            integration_id: Some("tg-1".into()),
        };
        Job {
            id: uuid::Uuid::new_v4().to_string(),
            payload: serde_json::to_value(&payload).unwrap(),
            attempts_made,
        }
    }

    #[tokio::test]
    async fn successful_send_marks_the_message_sent() {
        let h = harness().await;
        let id = seed_message(&h).await;

        h.processor.process(job_for(&id, 0)).await.unwrap();

        let message = h.repo.message("acct-1", &id).await.unwrap().unwrap();
        assert_eq!(message.status, MessageStatus::Sent);
        assert_eq!(message.attempts_made, 1);
        assert!(message.external_id.is_some());
        assert!(message.sent_at.is_some());
        assert_eq!(h.channel.sent_count(), 1);
        assert_eq!(h.channel.sent()[0].recipient, "555");
    }

    #[tokio::test]
    async fn provider_rejection_fails_the_message_without_retry() {
        let h = harness().await;
        let id = seed_message(&h).await;
        h.channel.fail_next(ScriptedFailure::Rejection);

        // Terminal failures resolve the job; retrying a rejection would
        // just replay the same refusal.
        h.processor.process(job_for(&id, 0)).await.unwrap();

        let message = h.repo.message("acct-1", &id).await.unwrap().unwrap();
        assert_eq!(message.status, MessageStatus::Failed);
        assert!(message.error.is_some());
    }

    #[tokio::test]
    async fn transient_failure_keeps_the_message_pending_and_retries() {
        let h = harness().await;
        let id = seed_message(&h).await;
        h.channel.fail_next(ScriptedFailure::Transient);

        let err = h.processor.process(job_for(&id, 0)).await.unwrap_err();
        assert!(err.is_retryable());

        let message = h.repo.message("acct-1", &id).await.unwrap().unwrap();
        assert_eq!(message.status, MessageStatus::Pending);
        assert_eq!(message.attempts_made, 1);
        assert!(message.error.is_some());
    }

    #[tokio::test]
    async fn transient_failure_on_the_last_attempt_fails_the_message() {
        let h = harness().await;
        let id = seed_message(&h).await;
        h.channel.fail_next(ScriptedFailure::Transient);

        let err = h.processor.process(job_for(&id, 2)).await.unwrap_err();
        assert!(err.is_retryable());

        let message = h.repo.message("acct-1", &id).await.unwrap().unwrap();
        assert_eq!(message.status, MessageStatus::Failed);
        assert_eq!(message.attempts_made, 3);
    }

    #[tokio::test]
    async fn already_sent_message_is_not_sent_twice() {
        let h = harness().await;
        let mut message = pending_message("conv-1", "acct-1", "hello");
        message.status = MessageStatus::Sent;
        h.repo.insert_message(&message).await.unwrap();

        h.processor.process(job_for(&message.id, 1)).await.unwrap();
        assert_eq!(h.channel.sent_count(), 0);
    }

    #[tokio::test]
    async fn unknown_message_resolves_the_job() {
        let h = harness().await;
        h.processor.process(job_for("missing", 0)).await.unwrap();
        assert_eq!(h.channel.sent_count(), 0);
    }
}
