// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`Repository`] implementation.
//!
//! Backs the test suite and the dev-mode binary. All tables live behind
//! one mutex, which makes `upsert_conversation` trivially atomic: two
//! workers racing on the same new external identity serialize on the lock
//! and the loser finds the winner's row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use relayr_core::error::RelayrError;
use relayr_core::traits::repository::Repository;
use relayr_core::types::{
    Call, CallRecording, ChannelKind, Conversation, ConversationStatus, Integration,
    IntegrationStatus, MediaFile, Message, WebhookEvent,
};

#[derive(Default)]
struct Tables {
    integrations: Vec<Integration>,
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
    webhook_events: Vec<WebhookEvent>,
    calls: Vec<Call>,
    recordings: Vec<CallRecording>,
    media_files: Vec<MediaFile>,
}

/// Mutex-backed repository for tests and dev mode.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an integration.
    pub async fn add_integration(&self, integration: Integration) {
        self.tables.lock().await.integrations.push(integration);
    }

    /// Snapshot accessors for assertions.
    pub async fn conversations(&self) -> Vec<Conversation> {
        self.tables.lock().await.conversations.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.tables.lock().await.messages.clone()
    }

    pub async fn messages_for(&self, conversation_id: &str) -> Vec<Message> {
        self.tables
            .lock()
            .await
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect()
    }

    pub async fn webhook_events(&self) -> Vec<WebhookEvent> {
        self.tables.lock().await.webhook_events.clone()
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.tables.lock().await.calls.clone()
    }

    pub async fn media_files(&self) -> Vec<MediaFile> {
        self.tables.lock().await.media_files.clone()
    }

    pub async fn call_recordings(&self) -> Vec<CallRecording> {
        self.tables.lock().await.recordings.clone()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn integration(&self, id: &str) -> Result<Option<Integration>, RelayrError> {
        Ok(self
            .tables
            .lock()
            .await
            .integrations
            .iter()
            .find(|i| i.id == id)
            .cloned())
    }

    async fn active_integrations(
        &self,
        account_id: &str,
        channel: ChannelKind,
    ) -> Result<Vec<Integration>, RelayrError> {
        Ok(self
            .tables
            .lock()
            .await
            .integrations
            .iter()
            .filter(|i| {
                i.account_id == account_id
                    && i.channel == channel
                    && i.status == IntegrationStatus::Active
            })
            .cloned()
            .collect())
    }

    async fn active_integrations_for_channel(
        &self,
        channel: ChannelKind,
    ) -> Result<Vec<Integration>, RelayrError> {
        Ok(self
            .tables
            .lock()
            .await
            .integrations
            .iter()
            .filter(|i| i.channel == channel && i.status == IntegrationStatus::Active)
            .cloned()
            .collect())
    }

    async fn update_integration_settings(
        &self,
        id: &str,
        settings: Value,
    ) -> Result<(), RelayrError> {
        let mut tables = self.tables.lock().await;
        let integration = tables
            .integrations
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| RelayrError::NotFound(format!("integration {id}")))?;
        integration.settings = settings;
        Ok(())
    }

    async fn upsert_conversation(
        &self,
        account_id: &str,
        channel: ChannelKind,
        external_id: &str,
        metadata: Value,
    ) -> Result<Conversation, RelayrError> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables.conversations.iter().find(|c| {
            c.account_id == account_id
                && c.channel == channel
                && c.external_id == external_id
                && c.status == ConversationStatus::Open
        }) {
            return Ok(existing.clone());
        }

        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            channel,
            external_id: external_id.to_string(),
            status: ConversationStatus::Open,
            metadata,
            last_message_at: None,
            assigned_to_user_id: None,
            created_at: Utc::now(),
        };
        tables.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn conversation(
        &self,
        account_id: &str,
        id: &str,
    ) -> Result<Option<Conversation>, RelayrError> {
        Ok(self
            .tables
            .lock()
            .await
            .conversations
            .iter()
            .find(|c| c.account_id == account_id && c.id == id)
            .cloned())
    }

    async fn touch_conversation(&self, id: &str, at: DateTime<Utc>) -> Result<(), RelayrError> {
        let mut tables = self.tables.lock().await;
        let conversation = tables
            .conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| RelayrError::NotFound(format!("conversation {id}")))?;
        conversation.last_message_at = Some(at);
        Ok(())
    }

    async fn insert_message(&self, message: &Message) -> Result<(), RelayrError> {
        self.tables.lock().await.messages.push(message.clone());
        Ok(())
    }

    async fn message(&self, account_id: &str, id: &str) -> Result<Option<Message>, RelayrError> {
        Ok(self
            .tables
            .lock()
            .await
            .messages
            .iter()
            .find(|m| m.account_id == account_id && m.id == id)
            .cloned())
    }

    async fn message_by_external_id(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> Result<Option<Message>, RelayrError> {
        Ok(self
            .tables
            .lock()
            .await
            .messages
            .iter()
            .find(|m| m.account_id == account_id && m.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn update_message(&self, message: &Message) -> Result<(), RelayrError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .messages
            .iter_mut()
            .find(|m| m.id == message.id)
            .ok_or_else(|| RelayrError::NotFound(format!("message {}", message.id)))?;
        *stored = message.clone();
        Ok(())
    }

    async fn insert_webhook_event(&self, event: &WebhookEvent) -> Result<(), RelayrError> {
        self.tables.lock().await.webhook_events.push(event.clone());
        Ok(())
    }

    async fn webhook_event(&self, id: &str) -> Result<Option<WebhookEvent>, RelayrError> {
        Ok(self
            .tables
            .lock()
            .await
            .webhook_events
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn update_webhook_event(&self, event: &WebhookEvent) -> Result<(), RelayrError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .webhook_events
            .iter_mut()
            .find(|e| e.id == event.id)
            .ok_or_else(|| RelayrError::NotFound(format!("webhook event {}", event.id)))?;
        *stored = event.clone();
        Ok(())
    }

    async fn insert_call(&self, call: &Call) -> Result<(), RelayrError> {
        self.tables.lock().await.calls.push(call.clone());
        Ok(())
    }

    async fn call(&self, account_id: &str, id: &str) -> Result<Option<Call>, RelayrError> {
        Ok(self
            .tables
            .lock()
            .await
            .calls
            .iter()
            .find(|c| c.account_id == account_id && c.id == id)
            .cloned())
    }

    async fn call_by_external_id(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> Result<Option<Call>, RelayrError> {
        Ok(self
            .tables
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| {
                c.account_id == account_id
                    && c.metadata.external_id.as_deref() == Some(external_id)
            })
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn update_call(&self, call: &Call) -> Result<(), RelayrError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .calls
            .iter_mut()
            .find(|c| c.id == call.id)
            .ok_or_else(|| RelayrError::NotFound(format!("call {}", call.id)))?;
        *stored = call.clone();
        Ok(())
    }

    async fn calls_in_window(
        &self,
        account_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Call>, RelayrError> {
        Ok(self
            .tables
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.account_id == account_id && c.created_at >= start && c.created_at <= end)
            .cloned()
            .collect())
    }

    async fn insert_call_recording(&self, recording: &CallRecording) -> Result<(), RelayrError> {
        self.tables.lock().await.recordings.push(recording.clone());
        Ok(())
    }

    async fn recordings_for_call(
        &self,
        account_id: &str,
        call_id: &str,
    ) -> Result<Vec<CallRecording>, RelayrError> {
        let tables = self.tables.lock().await;
        let owned = tables
            .calls
            .iter()
            .any(|c| c.account_id == account_id && c.id == call_id);
        if !owned {
            return Ok(Vec::new());
        }
        Ok(tables
            .recordings
            .iter()
            .filter(|r| r.call_id == call_id)
            .cloned()
            .collect())
    }

    async fn insert_media_file(&self, media: &MediaFile) -> Result<(), RelayrError> {
        self.tables.lock().await.media_files.push(media.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn concurrent_upsert_yields_one_conversation() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.upsert_conversation("a1", ChannelKind::Telegram, "555", Value::Null)
                    .await
                    .expect("upsert")
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.expect("join").id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1, "all racers must get the same conversation");
        assert_eq!(repo.conversations().await.len(), 1);
    }

    #[tokio::test]
    async fn conversations_are_account_scoped() {
        let repo = InMemoryRepository::new();
        let conv = repo
            .upsert_conversation("a1", ChannelKind::Telegram, "555", Value::Null)
            .await
            .expect("upsert");
        assert!(repo.conversation("a2", &conv.id).await.expect("lookup").is_none());
        assert!(repo.conversation("a1", &conv.id).await.expect("lookup").is_some());
    }
}
