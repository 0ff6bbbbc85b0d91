// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence collaborator contract.
//!
//! Implemented externally (relational storage); the in-memory adapter in
//! relayr-test-utils backs the dev binary and the test suite. Every lookup
//! is account-scoped; tenant isolation is a correctness invariant here,
//! not an optimization.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::RelayrError;
use crate::types::{
    Call, CallRecording, ChannelKind, Conversation, Integration, MediaFile, Message, WebhookEvent,
};

/// CRUD and upsert operations the communication core needs from storage.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Integrations ---

    /// Looks up one integration by id.
    async fn integration(&self, id: &str) -> Result<Option<Integration>, RelayrError>;

    /// All active integrations for (account, channel).
    async fn active_integrations(
        &self,
        account_id: &str,
        channel: ChannelKind,
    ) -> Result<Vec<Integration>, RelayrError>;

    /// All active integrations for a channel across accounts (used for
    /// eager bot initialization at startup).
    async fn active_integrations_for_channel(
        &self,
        channel: ChannelKind,
    ) -> Result<Vec<Integration>, RelayrError>;

    /// Replaces an integration's channel-specific settings.
    async fn update_integration_settings(
        &self,
        id: &str,
        settings: Value,
    ) -> Result<(), RelayrError>;

    // --- Conversations ---

    /// Finds or creates the open conversation for (account, channel,
    /// external identity).
    ///
    /// Must be atomic: two workers racing on the same new identity get the
    /// same row. `metadata` is applied only on create.
    async fn upsert_conversation(
        &self,
        account_id: &str,
        channel: ChannelKind,
        external_id: &str,
        metadata: Value,
    ) -> Result<Conversation, RelayrError>;

    async fn conversation(
        &self,
        account_id: &str,
        id: &str,
    ) -> Result<Option<Conversation>, RelayrError>;

    /// Sets `last_message_at` on a conversation.
    async fn touch_conversation(&self, id: &str, at: DateTime<Utc>) -> Result<(), RelayrError>;

    // --- Messages ---

    async fn insert_message(&self, message: &Message) -> Result<(), RelayrError>;

    async fn message(&self, account_id: &str, id: &str) -> Result<Option<Message>, RelayrError>;

    /// Account-scoped lookup by provider message id.
    async fn message_by_external_id(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> Result<Option<Message>, RelayrError>;

    /// Persists the full current state of a message (status, correlation
    /// id, timestamps, error fields).
    async fn update_message(&self, message: &Message) -> Result<(), RelayrError>;

    // --- Webhook events ---

    async fn insert_webhook_event(&self, event: &WebhookEvent) -> Result<(), RelayrError>;

    async fn webhook_event(&self, id: &str) -> Result<Option<WebhookEvent>, RelayrError>;

    async fn update_webhook_event(&self, event: &WebhookEvent) -> Result<(), RelayrError>;

    // --- Calls ---

    async fn insert_call(&self, call: &Call) -> Result<(), RelayrError>;

    async fn call(&self, account_id: &str, id: &str) -> Result<Option<Call>, RelayrError>;

    /// Most recent call whose `metadata.external_id` matches.
    async fn call_by_external_id(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> Result<Option<Call>, RelayrError>;

    async fn update_call(&self, call: &Call) -> Result<(), RelayrError>;

    /// Calls created inside [start, end] for one account.
    async fn calls_in_window(
        &self,
        account_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Call>, RelayrError>;

    // --- Recordings and media ---

    async fn insert_call_recording(&self, recording: &CallRecording) -> Result<(), RelayrError>;

    async fn recordings_for_call(
        &self,
        account_id: &str,
        call_id: &str,
    ) -> Result<Vec<CallRecording>, RelayrError>;

    async fn insert_media_file(&self, media: &MediaFile) -> Result<(), RelayrError>;
}
