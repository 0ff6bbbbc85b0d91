// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixture builders shared across the test suite.

use chrono::Utc;
use uuid::Uuid;

use relayr_core::types::{
    ChannelKind, Integration, IntegrationStatus, Message, MessageDirection, MessageStatus,
    NormalizedInbound,
};

/// Active Telegram integration with a manager group configured.
pub fn telegram_integration(id: &str, account_id: &str) -> Integration {
    Integration {
        id: id.into(),
        account_id: account_id.into(),
        channel: ChannelKind::Telegram,
        status: IntegrationStatus::Active,
        settings: serde_json::json!({
            "bot_token": "123456:test-token",
            "manager_group_id": "-100200300",
        }),
    }
}

/// Active WhatsApp integration with verification and signing secrets.
pub fn whatsapp_integration(id: &str, account_id: &str) -> Integration {
    Integration {
        id: id.into(),
        account_id: account_id.into(),
        channel: ChannelKind::Whatsapp,
        status: IntegrationStatus::Active,
        settings: serde_json::json!({
            "access_token": "wa-access-token",
            "phone_number_id": "777000",
            "webhook_verify_token": "verify-me",
            "app_secret": "wa-app-secret",
        }),
    }
}

/// A normalized inbound text message.
pub fn inbound_text(external_id: &str, sender: &str, text: &str) -> NormalizedInbound {
    NormalizedInbound {
        external_id: external_id.into(),
        sender: sender.into(),
        sender_name: Some("Test Sender".into()),
        text: text.into(),
        media_id: None,
        timestamp: Some(Utc::now()),
        metadata: serde_json::Value::Null,
    }
}

/// A pending outbound message row.
pub fn pending_message(conversation_id: &str, account_id: &str, content: &str) -> Message {
    Message {
        id: Uuid::new_v4().to_string(),
        conversation_id: conversation_id.into(),
        account_id: account_id.into(),
        direction: MessageDirection::Outbound,
        content: content.into(),
        external_id: None,
        status: MessageStatus::Pending,
        media_file_id: None,
        error: None,
        attempts_made: 0,
        created_at: Utc::now(),
        sent_at: None,
        delivered_at: None,
        read_at: None,
    }
}
