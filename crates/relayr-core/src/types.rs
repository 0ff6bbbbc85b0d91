// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Relayr workspace.
//!
//! All entities are account-scoped; repository lookups must carry the
//! `account_id` to preserve tenant isolation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::RelayrError;

/// A communication medium with its own wire protocol and adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Telegram,
    Whatsapp,
    Telephony,
    Website,
    Email,
}

/// Lifecycle status of an [`Integration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStatus {
    Active,
    Inactive,
}

/// Tenant-scoped credentials and configuration binding an account to a channel.
///
/// `settings` is channel-specific and opaque to the core; adapters parse it
/// through the typed views [`TelegramSettings`] and [`WhatsappSettings`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integration {
    pub id: String,
    pub account_id: String,
    pub channel: ChannelKind,
    pub status: IntegrationStatus,
    #[serde(default)]
    pub settings: Value,
}

impl Integration {
    pub fn is_active(&self) -> bool {
        self.status == IntegrationStatus::Active
    }

    /// Parses `settings` as Telegram bot configuration.
    pub fn telegram_settings(&self) -> Result<TelegramSettings, RelayrError> {
        serde_json::from_value(self.settings.clone()).map_err(|e| {
            RelayrError::Config(format!(
                "integration {} has invalid telegram settings: {e}",
                self.id
            ))
        })
    }

    /// Parses `settings` as WhatsApp Cloud API configuration.
    pub fn whatsapp_settings(&self) -> Result<WhatsappSettings, RelayrError> {
        serde_json::from_value(self.settings.clone()).map_err(|e| {
            RelayrError::Config(format!(
                "integration {} has invalid whatsapp settings: {e}",
                self.id
            ))
        })
    }
}

/// Typed view of Telegram integration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramSettings {
    pub bot_token: String,
    /// Chat id of the manager group notifications are routed to.
    #[serde(default)]
    pub manager_group_id: Option<String>,
    /// Set when Telegram business-connection authorization is granted.
    #[serde(default)]
    pub business_connection_id: Option<String>,
}

/// Typed view of WhatsApp Cloud API integration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsappSettings {
    pub access_token: String,
    pub phone_number_id: String,
    /// Token Meta echoes during GET webhook verification.
    pub webhook_verify_token: String,
    /// Shared secret for X-Hub-Signature-256 verification.
    pub app_secret: String,
}

/// Status of a [`Conversation`] thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Open,
    Archived,
}

/// A persistent thread with one external counterparty on one channel.
///
/// At most one open conversation exists per (account, channel, external
/// identity); the repository enforces this with an atomic upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub account_id: String,
    pub channel: ChannelKind,
    /// Channel-native address of the counterparty (chat id, phone number).
    pub external_id: String,
    pub status: ConversationStatus,
    #[serde(default)]
    pub metadata: Value,
    pub last_message_at: Option<DateTime<Utc>>,
    pub assigned_to_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Direction of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

/// Delivery status of a [`Message`].
///
/// Status moves monotonically forward through pending → sent → delivered →
/// read, or diverts to failed from any pre-terminal state. Provider status
/// callbacks arriving out of order must never regress a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Sent => 1,
            Self::Delivered => 2,
            Self::Read => 3,
            Self::Failed => 4,
        }
    }

    /// Read and failed are terminal; nothing moves a message out of them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Read | Self::Failed)
    }

    /// Whether a transition from `self` to `next` is a forward move.
    pub fn can_advance_to(self, next: MessageStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Self::Failed {
            return true;
        }
        next.rank() > self.rank()
    }
}

/// One inbound or outbound message belonging to exactly one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub account_id: String,
    pub direction: MessageDirection,
    pub content: String,
    /// Provider-assigned id, unique per channel. Used to correlate
    /// asynchronous status callbacks.
    pub external_id: Option<String>,
    pub status: MessageStatus,
    pub media_file_id: Option<String>,
    /// Last send error, populated by the outbound processor on failure.
    pub error: Option<String>,
    /// Attempt counter snapshot from the queue, for observability.
    pub attempts_made: u32,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
}

/// Processing status of a [`WebhookEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WebhookStatus {
    Received,
    Processed,
    Failed,
}

/// Audit and retry record of one inbound provider callback.
///
/// Persisted synchronously at ingestion time, before the job is enqueued,
/// so duplicate provider deliveries are observable even when queue
/// processing has not run yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    pub channel: ChannelKind,
    pub integration_id: Option<String>,
    pub account_id: Option<String>,
    pub payload: Value,
    pub status: WebhookStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Direction of a [`Call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    Inbound,
    Outbound,
}

/// Lifecycle status of a [`Call`], driven exclusively by provider events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Initiated,
    Ringing,
    Answered,
    Completed,
    Failed,
}

/// Correlation metadata for a call.
///
/// `external_id` is the provider's channel/session id; the state machine
/// locates calls by it and never by guessing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallMetadata {
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub integration_id: Option<String>,
    #[serde(default)]
    pub caller_number: Option<String>,
    #[serde(default)]
    pub callee_number: Option<String>,
}

/// One inbound or outbound telephone call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub id: String,
    pub account_id: String,
    pub phone_number: String,
    pub direction: CallDirection,
    pub status: CallStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<u64>,
    #[serde(default)]
    pub metadata: CallMetadata,
    pub created_at: DateTime<Utc>,
}

/// Stored recording of one completed call (0 or 1 per call).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecording {
    pub id: String,
    pub call_id: String,
    pub url: String,
    pub duration_secs: u64,
    pub media_file_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Reference to a blob in external object storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFile {
    pub id: String,
    pub account_id: String,
    pub name: String,
    pub mime_type: Option<String>,
    pub size_bytes: u64,
    pub storage_key: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregated call statistics over a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallStats {
    pub total: u64,
    pub inbound: u64,
    pub outbound: u64,
    pub completed: u64,
    pub failed: u64,
    pub avg_duration_secs: f64,
    pub total_duration_secs: u64,
}

// --- Channel adapter value types ---

/// Content of an outbound message, dispatched per channel capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundContent {
    Text {
        text: String,
    },
    Photo {
        url: String,
        #[serde(default)]
        caption: Option<String>,
    },
    Video {
        url: String,
        #[serde(default)]
        caption: Option<String>,
    },
    Document {
        url: String,
        #[serde(default)]
        caption: Option<String>,
    },
    Audio {
        url: String,
    },
    Template {
        name: String,
        language: String,
        #[serde(default)]
        components: Vec<Value>,
    },
}

impl OutboundContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Human-readable summary stored as the Message content.
    pub fn summary(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Photo { caption, .. } => caption.clone().unwrap_or_else(|| "[Photo]".into()),
            Self::Video { caption, .. } => caption.clone().unwrap_or_else(|| "[Video]".into()),
            Self::Document { caption, .. } => {
                caption.clone().unwrap_or_else(|| "[Document]".into())
            }
            Self::Audio { .. } => "[Audio]".into(),
            Self::Template { name, .. } => format!("[Template: {name}]"),
        }
    }
}

/// Provider acknowledgment of a successful send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendReceipt {
    pub external_id: String,
}

/// A new inbound message normalized out of a provider payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedInbound {
    /// Provider message id.
    pub external_id: String,
    /// Channel-native sender address (chat id, phone).
    pub sender: String,
    pub sender_name: Option<String>,
    /// Text or caption; placeholder like `[Photo]` for bare media.
    pub text: String,
    /// Provider-side media id (Telegram file_id, WhatsApp media id).
    pub media_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Value,
}

/// A delivery/read receipt for a previously sent message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub external_id: String,
    pub status: MessageStatus,
    pub timestamp: Option<DateTime<Utc>>,
}

/// One event normalized out of an inbound provider payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InboundEvent {
    Message(NormalizedInbound),
    Status(StatusUpdate),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn channel_kind_round_trips_through_strings() {
        for kind in [
            ChannelKind::Telegram,
            ChannelKind::Whatsapp,
            ChannelKind::Telephony,
            ChannelKind::Website,
            ChannelKind::Email,
        ] {
            let s = kind.to_string();
            assert_eq!(ChannelKind::from_str(&s).unwrap(), kind);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{s}\""));
        }
    }

    #[test]
    fn message_status_is_monotonic() {
        use MessageStatus::*;
        assert!(Pending.can_advance_to(Sent));
        assert!(Sent.can_advance_to(Delivered));
        assert!(Delivered.can_advance_to(Read));
        assert!(Pending.can_advance_to(Failed));
        assert!(Delivered.can_advance_to(Failed));

        // No regression.
        assert!(!Delivered.can_advance_to(Sent));
        assert!(!Read.can_advance_to(Delivered));
        // Terminal states stay terminal.
        assert!(!Read.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Sent));
        assert!(!Failed.can_advance_to(Failed));
    }

    #[test]
    fn integration_settings_views() {
        let integration = Integration {
            id: "i1".into(),
            account_id: "a1".into(),
            channel: ChannelKind::Telegram,
            status: IntegrationStatus::Active,
            settings: serde_json::json!({
                "bot_token": "123:abc",
                "manager_group_id": "-100200300",
            }),
        };
        let settings = integration.telegram_settings().unwrap();
        assert_eq!(settings.bot_token, "123:abc");
        assert_eq!(settings.manager_group_id.as_deref(), Some("-100200300"));

        assert!(integration.whatsapp_settings().is_err());
    }

    #[test]
    fn outbound_content_summary() {
        assert_eq!(OutboundContent::text("hi").summary(), "hi");
        assert_eq!(
            OutboundContent::Photo {
                url: "https://example.com/p.jpg".into(),
                caption: None,
            }
            .summary(),
            "[Photo]"
        );
        assert_eq!(
            OutboundContent::Template {
                name: "welcome".into(),
                language: "en".into(),
                components: vec![],
            }
            .summary(),
            "[Template: welcome]"
        );
    }

    #[test]
    fn outbound_content_serde_tagging() {
        let json = serde_json::to_value(OutboundContent::text("hello")).unwrap();
        assert_eq!(json["type"], "text");
        let back: OutboundContent = serde_json::from_value(json).unwrap();
        assert_eq!(back.summary(), "hello");
    }
}
