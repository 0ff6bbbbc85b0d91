// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation and message lifecycle service.
//!
//! One open conversation per (account, channel, external identity),
//! created through the repository's atomic upsert. Inbound recording
//! carries the first-contact auto-reply; outbound recording persists a
//! pending message and enqueues the send job. Status callbacks advance
//! messages monotonically and never regress them.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use relayr_core::error::RelayrError;
use relayr_core::jobs::{OutboundMessageJob, queues};
use relayr_core::traits::queue::{JobQueue, RetryPolicy, enqueue_job};
use relayr_core::traits::repository::Repository;
use relayr_core::types::{
    ChannelKind, Conversation, Integration, IntegrationStatus, Message, MessageDirection,
    MessageStatus, NormalizedInbound, OutboundContent, StatusUpdate,
};

/// Result of recording one inbound message.
#[derive(Debug, Clone)]
pub struct InboundRecord {
    pub conversation: Conversation,
    pub message: Message,
    /// The provider redelivered a message we already hold.
    pub duplicate: bool,
    /// An auto-reply was enqueued for this contact.
    pub auto_replied: bool,
}

/// Conversation/message orchestration over the repository and queue.
pub struct ConversationService {
    repo: Arc<dyn Repository>,
    queue: Arc<dyn JobQueue>,
    retry: RetryPolicy,
    /// Auto-reply text for first contact; `None` disables the feature.
    auto_reply: Option<String>,
}

impl ConversationService {
    pub fn new(
        repo: Arc<dyn Repository>,
        queue: Arc<dyn JobQueue>,
        retry: RetryPolicy,
        auto_reply: Option<String>,
    ) -> Self {
        Self {
            repo,
            queue,
            retry,
            auto_reply,
        }
    }

    /// Finds or creates the open conversation for an external identity.
    pub async fn find_or_create_conversation(
        &self,
        account_id: &str,
        channel: ChannelKind,
        external_id: &str,
        metadata: Value,
    ) -> Result<Conversation, RelayrError> {
        self.repo
            .upsert_conversation(account_id, channel, external_id, metadata)
            .await
    }

    /// Records one inbound message into its conversation.
    ///
    /// Redeliveries (same provider message id) are absorbed without side
    /// effects. The auto-reply fires only when the conversation has never
    /// seen a message: the `last_message_at == None` check runs before the
    /// message is recorded, matching the ingestion order the rest of the
    /// pipeline assumes.
    pub async fn record_inbound_message(
        &self,
        integration: &Integration,
        inbound: &NormalizedInbound,
    ) -> Result<InboundRecord, RelayrError> {
        let account_id = &integration.account_id;
        let metadata = serde_json::json!({
            "sender_name": inbound.sender_name,
            "integration_id": integration.id,
        });
        let conversation = self
            .repo
            .upsert_conversation(account_id, integration.channel, &inbound.sender, metadata)
            .await?;

        if let Some(existing) = self
            .repo
            .message_by_external_id(account_id, &inbound.external_id)
            .await?
        {
            debug!(
                external_id = %inbound.external_id,
                message_id = %existing.id,
                "duplicate inbound delivery absorbed"
            );
            return Ok(InboundRecord {
                conversation,
                message: existing,
                duplicate: true,
                auto_replied: false,
            });
        }

        let first_contact = conversation.last_message_at.is_none();
        let received_at = inbound.timestamp.unwrap_or_else(Utc::now);

        let message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            account_id: account_id.clone(),
            direction: MessageDirection::Inbound,
            content: inbound.text.clone(),
            external_id: Some(inbound.external_id.clone()),
            status: MessageStatus::Delivered,
            media_file_id: None,
            error: None,
            attempts_made: 0,
            created_at: received_at,
            sent_at: None,
            delivered_at: Some(received_at),
            read_at: None,
        };
        self.repo.insert_message(&message).await?;
        self.repo
            .touch_conversation(&conversation.id, received_at)
            .await?;

        let mut auto_replied = false;
        if first_contact {
            if let Some(text) = self.auto_reply.clone() {
                self.record_outbound_message(
                    &conversation,
                    OutboundContent::text(text),
                    Some(integration.id.clone()),
                )
                .await?;
                auto_replied = true;
                info!(conversation_id = %conversation.id, "first-contact auto-reply enqueued");
            }
        }

        Ok(InboundRecord {
            conversation,
            message,
            duplicate: false,
            auto_replied,
        })
    }

    /// Persists a pending outbound message and enqueues its send job.
    pub async fn record_outbound_message(
        &self,
        conversation: &Conversation,
        content: OutboundContent,
        integration_id: Option<String>,
    ) -> Result<Message, RelayrError> {
        let now = Utc::now();
        let message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            account_id: conversation.account_id.clone(),
            direction: MessageDirection::Outbound,
            content: content.summary(),
            external_id: None,
            status: MessageStatus::Pending,
            media_file_id: None,
            error: None,
            attempts_made: 0,
            created_at: now,
            sent_at: None,
            delivered_at: None,
            read_at: None,
        };
        self.repo.insert_message(&message).await?;
        self.repo.touch_conversation(&conversation.id, now).await?;

        let job = OutboundMessageJob {
            message_id: message.id.clone(),
            conversation_id: conversation.id.clone(),
            account_id: conversation.account_id.clone(),
            channel: conversation.channel,
            recipient: conversation.external_id.clone(),
            content,
            integration_id,
        };
        enqueue_job(
            self.queue.as_ref(),
            queues::OUTBOUND_MESSAGES,
            &job,
            self.retry,
        )
        .await?;
        Ok(message)
    }

    /// Applies a provider status callback to the matching message.
    ///
    /// Unknown external ids and stale (non-forward) transitions are
    /// logged no-ops. Returns whether the message advanced.
    pub async fn apply_status_update(
        &self,
        account_id: &str,
        update: &StatusUpdate,
    ) -> Result<bool, RelayrError> {
        let Some(mut message) = self
            .repo
            .message_by_external_id(account_id, &update.external_id)
            .await?
        else {
            debug!(
                external_id = %update.external_id,
                status = %update.status,
                "status update for unknown message"
            );
            return Ok(false);
        };

        if !message.status.can_advance_to(update.status) {
            debug!(
                message_id = %message.id,
                current = %message.status,
                incoming = %update.status,
                "stale status update ignored"
            );
            return Ok(false);
        }

        let at = update.timestamp.unwrap_or_else(Utc::now);
        message.status = update.status;
        match update.status {
            MessageStatus::Sent => message.sent_at = Some(at),
            MessageStatus::Delivered => message.delivered_at = Some(at),
            MessageStatus::Read => message.read_at = Some(at),
            MessageStatus::Pending | MessageStatus::Failed => {}
        }
        self.repo.update_message(&message).await?;
        Ok(true)
    }

    /// Public send API: resolves the integration, finds or creates the
    /// conversation for `to`, and records the outbound message.
    ///
    /// With several active integrations for (account, channel) the caller
    /// must name one; guessing between tenants' credentials is refused.
    pub async fn send_message(
        &self,
        account_id: &str,
        channel: ChannelKind,
        to: &str,
        content: OutboundContent,
        integration_id: Option<&str>,
    ) -> Result<Message, RelayrError> {
        let integration = self
            .resolve_integration(account_id, channel, integration_id)
            .await?;

        let conversation = self
            .repo
            .upsert_conversation(account_id, channel, to, Value::Null)
            .await?;
        self.record_outbound_message(&conversation, content, Some(integration.id))
            .await
    }

    async fn resolve_integration(
        &self,
        account_id: &str,
        channel: ChannelKind,
        integration_id: Option<&str>,
    ) -> Result<Integration, RelayrError> {
        resolve_integration(self.repo.as_ref(), account_id, channel, integration_id).await
    }
}

/// Resolves the integration an operation should use.
///
/// An explicit id must exist, belong to the account and channel, and be
/// active. Without one, the account's sole active integration is used;
/// zero is unknown and more than one is ambiguous.
pub async fn resolve_integration(
    repo: &dyn Repository,
    account_id: &str,
    channel: ChannelKind,
    integration_id: Option<&str>,
) -> Result<Integration, RelayrError> {
    if let Some(id) = integration_id {
        let integration = repo
            .integration(id)
            .await?
            .ok_or_else(|| RelayrError::UnknownIntegration(id.to_string()))?;
        if integration.account_id != account_id
            || integration.channel != channel
            || integration.status != IntegrationStatus::Active
        {
            return Err(RelayrError::UnknownIntegration(id.to_string()));
        }
        return Ok(integration);
    }

    let mut integrations = repo.active_integrations(account_id, channel).await?;
    match integrations.len() {
        0 => Err(RelayrError::UnknownIntegration(format!(
            "no active {channel} integration for account {account_id}"
        ))),
        1 => Ok(integrations.remove(0)),
        _ => Err(RelayrError::AmbiguousIntegration {
            account_id: account_id.to_string(),
            channel,
        }),
    }
}
