// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification fan-out processor.
//!
//! Notifications reach managers over Telegram: the account's integration
//! names a manager group, with a process-wide fallback chat for accounts
//! that never configured one. A notification that cannot be routed is a
//! logged no-op, never a job failure; losing a heads-up must not wedge
//! the queue.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use relayr_core::error::RelayrError;
use relayr_core::jobs::{NotificationJob, queues};
use relayr_core::traits::channel::ChannelAdapter;
use relayr_core::traits::queue::{Job, JobProcessor};
use relayr_core::traits::repository::Repository;
use relayr_core::types::{ChannelKind, OutboundContent};

/// Where a notification ended up, for logging and tests.
#[derive(Debug, Clone)]
pub struct NotificationOutcome {
    pub delivered: bool,
    pub recipients: Vec<String>,
    /// Why nothing was delivered, when `delivered` is false.
    pub reason: Option<String>,
}

impl NotificationOutcome {
    fn skipped(reason: impl Into<String>) -> Self {
        Self {
            delivered: false,
            recipients: Vec::new(),
            reason: Some(reason.into()),
        }
    }
}

pub struct NotificationProcessor {
    repo: Arc<dyn Repository>,
    telegram: Arc<dyn ChannelAdapter>,
    /// Config-level manager chat used when the integration has none.
    fallback_chat_id: Option<String>,
}

impl NotificationProcessor {
    pub fn new(
        repo: Arc<dyn Repository>,
        telegram: Arc<dyn ChannelAdapter>,
        fallback_chat_id: Option<String>,
    ) -> Self {
        Self {
            repo,
            telegram,
            fallback_chat_id,
        }
    }

    /// Routes and delivers one notification.
    ///
    /// Transient send failures bubble up so the queue retries; everything
    /// else resolves to an outcome.
    pub async fn deliver(&self, job: &NotificationJob) -> Result<NotificationOutcome, RelayrError> {
        let mut integrations = self
            .repo
            .active_integrations(&job.account_id, ChannelKind::Telegram)
            .await?;
        // Fan-out is best-effort, but the pick must still be deterministic:
        // lowest integration id wins when an account has several.
        integrations.sort_by(|a, b| a.id.cmp(&b.id));
        if integrations.len() > 1 {
            warn!(
                account_id = %job.account_id,
                count = integrations.len(),
                chosen = %integrations[0].id,
                "multiple active telegram integrations, using lowest id"
            );
        }
        let Some(integration) = integrations.into_iter().next() else {
            return Ok(NotificationOutcome::skipped(format!(
                "no active telegram integration for account {}",
                job.account_id
            )));
        };

        let recipients = if job.recipients.is_empty() {
            let manager_group = integration
                .telegram_settings()
                .ok()
                .and_then(|s| s.manager_group_id)
                .or_else(|| self.fallback_chat_id.clone());
            match manager_group {
                Some(chat_id) => vec![chat_id],
                None => {
                    return Ok(NotificationOutcome::skipped(format!(
                        "no manager chat configured for account {}",
                        job.account_id
                    )));
                }
            }
        } else {
            job.recipients.clone()
        };

        let content = OutboundContent::text(job.message.clone());
        let mut delivered_to = Vec::new();
        for recipient in &recipients {
            match self.telegram.send(&integration, recipient, &content).await {
                Ok(_) => delivered_to.push(recipient.clone()),
                Err(e) if e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!(recipient = %recipient, error = %e, "notification rejected");
                }
            }
        }

        Ok(NotificationOutcome {
            delivered: !delivered_to.is_empty(),
            recipients: delivered_to,
            reason: None,
        })
    }
}

#[async_trait]
impl JobProcessor for NotificationProcessor {
    fn queue(&self) -> &'static str {
        queues::NOTIFICATIONS
    }

    async fn process(&self, job: Job<Value>) -> Result<(), RelayrError> {
        let payload: NotificationJob = serde_json::from_value(job.payload)
            .map_err(|e| RelayrError::Payload(format!("malformed notification job: {e}")))?;

        let outcome = self.deliver(&payload).await?;
        if outcome.delivered {
            info!(
                account_id = %payload.account_id,
                kind = ?payload.kind,
                recipients = outcome.recipients.len(),
                "notification delivered"
            );
        } else {
            warn!(
                account_id = %payload.account_id,
                kind = ?payload.kind,
                reason = outcome.reason.as_deref().unwrap_or("unknown"),
                "notification dropped"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use relayr_core::jobs::NotificationKind;
    use relayr_test_utils::fixtures::telegram_integration;
    use relayr_test_utils::{InMemoryRepository, MockChannel, ScriptedFailure};

    fn notification(account_id: &str) -> NotificationJob {
        NotificationJob {
            kind: NotificationKind::NewMessage,
            account_id: account_id.into(),
            recipients: Vec::new(),
            message: "New message from 555: Hi".into(),
            metadata: Value::Null,
        }
    }

    fn harness() -> (
        Arc<InMemoryRepository>,
        Arc<MockChannel>,
        NotificationProcessor,
    ) {
        let repo = Arc::new(InMemoryRepository::new());
        let channel = Arc::new(MockChannel::new(ChannelKind::Telegram));
        let processor = NotificationProcessor::new(repo.clone(), channel.clone(), None);
        (repo, channel, processor)
    }

    #[tokio::test]
    async fn notification_goes_to_the_manager_group() {
        let (repo, channel, processor) = harness();
        repo.add_integration(telegram_integration("tg-1", "acct-1"))
            .await;

        let outcome = processor.deliver(&notification("acct-1")).await.unwrap();
        assert!(outcome.delivered);
        assert_eq!(outcome.recipients, vec!["-100200300".to_string()]);
        assert_eq!(channel.sent()[0].recipient, "-100200300");
    }

    #[tokio::test]
    async fn multiple_integrations_route_through_the_lowest_id() {
        let (repo, channel, processor) = harness();
        let mut second = telegram_integration("tg-b", "acct-1");
        second.settings = serde_json::json!({
            "bot_token": "123456:other-token",
            "manager_group_id": "-100400500",
        });
        repo.add_integration(second).await;
        repo.add_integration(telegram_integration("tg-a", "acct-1"))
            .await;

        let outcome = processor.deliver(&notification("acct-1")).await.unwrap();
        assert!(outcome.delivered);
        assert_eq!(outcome.recipients, vec!["-100200300".to_string()]);
        assert_eq!(channel.sent()[0].integration_id, "tg-a");
    }

    #[tokio::test]
    async fn fallback_chat_is_used_when_integration_has_no_group() {
        let repo = Arc::new(InMemoryRepository::new());
        let channel = Arc::new(MockChannel::new(ChannelKind::Telegram));
        let processor =
            NotificationProcessor::new(repo.clone(), channel.clone(), Some("-100999".into()));

        let mut integration = telegram_integration("tg-1", "acct-1");
        integration.settings = serde_json::json!({"bot_token": "123456:test-token"});
        repo.add_integration(integration).await;

        let outcome = processor.deliver(&notification("acct-1")).await.unwrap();
        assert!(outcome.delivered);
        assert_eq!(channel.sent()[0].recipient, "-100999");
    }

    #[tokio::test]
    async fn unroutable_notification_is_dropped_not_failed() {
        let (_repo, channel, processor) = harness();

        // No integration at all for the account.
        let outcome = processor.deliver(&notification("acct-1")).await.unwrap();
        assert!(!outcome.delivered);
        assert!(outcome.reason.is_some());
        assert_eq!(channel.sent_count(), 0);

        // The processor itself also resolves the job.
        let job = Job {
            id: "j1".into(),
            payload: serde_json::to_value(notification("acct-1")).unwrap(),
            attempts_made: 0,
        };
        processor.process(job).await.unwrap();
    }

    #[tokio::test]
    async fn explicit_recipients_win_over_the_manager_group() {
        let (repo, channel, processor) = harness();
        repo.add_integration(telegram_integration("tg-1", "acct-1"))
            .await;

        let mut job = notification("acct-1");
        job.recipients = vec!["111".into(), "222".into()];
        let outcome = processor.deliver(&job).await.unwrap();
        assert!(outcome.delivered);
        assert_eq!(channel.sent_count(), 2);
    }

    #[tokio::test]
    async fn transient_send_failure_is_retryable() {
        let (repo, channel, processor) = harness();
        repo.add_integration(telegram_integration("tg-1", "acct-1"))
            .await;
        channel.fail_next(ScriptedFailure::Transient);

        let err = processor.deliver(&notification("acct-1")).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
