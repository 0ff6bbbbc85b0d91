// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook processor: turns raw provider callbacks into conversation
//! state, call-machine transitions, and notification jobs.
//!
//! The ingestion server has already authenticated the payload and written
//! the audit row; this processor owns everything after the 200 went out.
//! Every delivery updates the audit row's attempt count and final status,
//! so a stuck webhook is visible from persistence alone.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use relayr_conversations::{ConversationService, resolve_integration};
use relayr_core::error::RelayrError;
use relayr_core::jobs::{NotificationJob, NotificationKind, WebhookJob, queues};
use relayr_core::traits::channel::ChannelAdapter;
use relayr_core::traits::object_store::ObjectStore;
use relayr_core::traits::queue::{Job, JobProcessor, RetryPolicy, enqueue_job};
use relayr_core::traits::repository::Repository;
use relayr_core::types::{ChannelKind, InboundEvent, Integration, NormalizedInbound, WebhookStatus};
use relayr_telegram::{BotRegistry, command_reply};
use relayr_telephony::CallService;
use relayr_whatsapp::WhatsappChannel;

use crate::registry::AdapterRegistry;

pub struct WebhookProcessor {
    repo: Arc<dyn Repository>,
    store: Arc<dyn ObjectStore>,
    queue: Arc<dyn relayr_core::traits::queue::JobQueue>,
    adapters: Arc<AdapterRegistry>,
    conversations: Arc<ConversationService>,
    calls: Arc<CallService>,
    /// Bot handles for Telegram media downloads; wirings without Telegram
    /// credentials skip media archival.
    telegram_bots: Option<Arc<BotRegistry>>,
    /// Typed WhatsApp client for media downloads, same deal.
    whatsapp: Option<Arc<WhatsappChannel>>,
    retry: RetryPolicy,
}

impl WebhookProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<dyn Repository>,
        store: Arc<dyn ObjectStore>,
        queue: Arc<dyn relayr_core::traits::queue::JobQueue>,
        adapters: Arc<AdapterRegistry>,
        conversations: Arc<ConversationService>,
        calls: Arc<CallService>,
        telegram_bots: Option<Arc<BotRegistry>>,
        whatsapp: Option<Arc<WhatsappChannel>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            repo,
            store,
            queue,
            adapters,
            conversations,
            calls,
            telegram_bots,
            whatsapp,
            retry,
        }
    }

    async fn handle(&self, job: &WebhookJob) -> Result<(), RelayrError> {
        match job.channel {
            ChannelKind::Telegram | ChannelKind::Whatsapp => self.handle_messaging(job).await,
            ChannelKind::Telephony => self.handle_telephony(job).await,
            ChannelKind::Website => self.handle_website(job).await,
            ChannelKind::Email => {
                debug!("email webhooks have no processing path yet");
                Ok(())
            }
        }
    }

    async fn handle_messaging(&self, job: &WebhookJob) -> Result<(), RelayrError> {
        let integration = self.resolve(job).await?;
        let adapter = self.adapters.get(job.channel)?;
        let events = adapter.parse_inbound(&job.payload)?;
        if events.is_empty() {
            debug!(channel = %job.channel, "webhook payload carried no events");
            return Ok(());
        }

        for event in events {
            match event {
                InboundEvent::Message(inbound) => {
                    self.handle_inbound_message(&integration, adapter.as_ref(), &inbound)
                        .await?;
                }
                InboundEvent::Status(update) => {
                    self.conversations
                        .apply_status_update(&integration.account_id, &update)
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn handle_inbound_message(
        &self,
        integration: &Integration,
        adapter: &dyn ChannelAdapter,
        inbound: &NormalizedInbound,
    ) -> Result<(), RelayrError> {
        // Bot commands get a canned reply and never enter a conversation.
        if integration.channel == ChannelKind::Telegram {
            if let Some(reply) = command_reply(&inbound.text) {
                adapter
                    .send(
                        integration,
                        &inbound.sender,
                        &relayr_core::types::OutboundContent::text(reply),
                    )
                    .await?;
                return Ok(());
            }
        }

        let record = self
            .conversations
            .record_inbound_message(integration, inbound)
            .await?;
        if record.duplicate {
            return Ok(());
        }

        if let Some(media_id) = inbound.media_id.as_deref() {
            self.archive_media(integration, &record.message.id, media_id)
                .await;
        }

        let sender = inbound.sender_name.as_deref().unwrap_or(&inbound.sender);
        let notification = NotificationJob {
            kind: NotificationKind::NewMessage,
            account_id: integration.account_id.clone(),
            recipients: Vec::new(),
            message: format!("New message from {sender}: {}", inbound.text),
            metadata: serde_json::json!({
                "conversation_id": record.conversation.id,
                "channel": integration.channel,
            }),
        };
        enqueue_job(
            self.queue.as_ref(),
            queues::NOTIFICATIONS,
            &notification,
            self.retry,
        )
        .await?;
        Ok(())
    }

    /// Downloads and stores provider media, linking it to the message.
    ///
    /// Best-effort: a failed download is logged, not retried. Redeliveries
    /// are absorbed as duplicates before this point, so a retry would
    /// never reach the archival step again anyway.
    async fn archive_media(&self, integration: &Integration, message_id: &str, media_id: &str) {
        let stored = match integration.channel {
            ChannelKind::Telegram => {
                let Some(bots) = self.telegram_bots.as_ref() else {
                    return;
                };
                match bots.bot_for(integration) {
                    Ok(bot) => {
                        relayr_telegram::media::ingest_media(
                            &bot,
                            self.repo.as_ref(),
                            self.store.as_ref(),
                            &integration.account_id,
                            media_id,
                        )
                        .await
                    }
                    Err(e) => Err(e),
                }
            }
            ChannelKind::Whatsapp => {
                let Some(whatsapp) = self.whatsapp.as_ref() else {
                    return;
                };
                match integration.whatsapp_settings() {
                    Ok(settings) => {
                        relayr_whatsapp::media::ingest_media(
                            whatsapp.client(),
                            self.repo.as_ref(),
                            self.store.as_ref(),
                            &integration.account_id,
                            &settings,
                            media_id,
                        )
                        .await
                    }
                    Err(e) => Err(e),
                }
            }
            _ => return,
        };

        match stored {
            Ok(media) => {
                if let Ok(Some(mut message)) =
                    self.repo.message(&integration.account_id, message_id).await
                {
                    message.media_file_id = Some(media.id.clone());
                    if let Err(e) = self.repo.update_message(&message).await {
                        warn!(message_id, error = %e, "failed to link media to message");
                    }
                }
                info!(message_id, media_file_id = %media.id, "inbound media archived");
            }
            Err(e) => {
                warn!(message_id, media_id, error = %e, "media archival failed");
            }
        }
    }

    async fn handle_telephony(&self, job: &WebhookJob) -> Result<(), RelayrError> {
        let account_id = self.account_for(job)?;
        match relayr_telephony::parse_event(&job.payload)? {
            Some(event) => self.calls.handle_event(&account_id, event).await,
            None => {
                debug!("telephony event with no state-machine mapping");
                Ok(())
            }
        }
    }

    async fn handle_website(&self, job: &WebhookJob) -> Result<(), RelayrError> {
        let account_id = self.account_for(job)?;
        let name = job
            .payload
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let phone = job
            .payload
            .get("phone")
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        let notification = NotificationJob {
            kind: NotificationKind::NewLead,
            account_id,
            recipients: Vec::new(),
            message: format!("New lead: {name}, phone {phone}"),
            metadata: job.payload.clone(),
        };
        enqueue_job(
            self.queue.as_ref(),
            queues::NOTIFICATIONS,
            &notification,
            self.retry,
        )
        .await?;
        Ok(())
    }

    /// The integration this webhook belongs to: the explicit one when the
    /// URL carried an id, otherwise the account's sole active integration.
    async fn resolve(&self, job: &WebhookJob) -> Result<Integration, RelayrError> {
        if let Some(id) = job.integration_id.as_deref() {
            return self
                .repo
                .integration(id)
                .await?
                .filter(|i| i.channel == job.channel)
                .ok_or_else(|| RelayrError::UnknownIntegration(id.to_string()));
        }
        let account_id = self.account_for(job)?;
        resolve_integration(self.repo.as_ref(), &account_id, job.channel, None).await
    }

    fn account_for(&self, job: &WebhookJob) -> Result<String, RelayrError> {
        job.account_id
            .clone()
            .ok_or_else(|| RelayrError::Payload("webhook without account context".into()))
    }
}

#[async_trait]
impl JobProcessor for WebhookProcessor {
    fn queue(&self) -> &'static str {
        queues::WEBHOOKS
    }

    async fn process(&self, job: Job<Value>) -> Result<(), RelayrError> {
        let payload: WebhookJob = serde_json::from_value(job.payload)
            .map_err(|e| RelayrError::Payload(format!("malformed webhook job: {e}")))?;

        let result = self.handle(&payload).await;

        // The audit row tracks every delivery, successful or not.
        match self.repo.webhook_event(&payload.webhook_event_id).await {
            Ok(Some(mut event)) => {
                event.attempts += 1;
                match &result {
                    Ok(()) => {
                        event.status = WebhookStatus::Processed;
                        event.last_error = None;
                    }
                    Err(e) => {
                        event.status = WebhookStatus::Failed;
                        event.last_error = Some(e.to_string());
                    }
                }
                if let Err(e) = self.repo.update_webhook_event(&event).await {
                    warn!(webhook_event_id = %event.id, error = %e, "failed to update audit row");
                }
            }
            Ok(None) => {
                debug!(webhook_event_id = %payload.webhook_event_id, "no audit row for webhook");
            }
            Err(e) => {
                warn!(error = %e, "audit row lookup failed");
            }
        }

        result
    }
}
