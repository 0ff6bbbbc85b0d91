// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalization of WhatsApp Cloud API webhook payloads.
//!
//! One delivery batches `entry[].changes[].value` objects, each carrying
//! `messages[]` (new inbound messages) and `statuses[]` (delivery and read
//! receipts for previously sent messages). Both are flattened into one
//! event list preserving payload order.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use relayr_core::error::RelayrError;
use relayr_core::types::{InboundEvent, MessageStatus, NormalizedInbound, StatusUpdate};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
struct Change {
    #[serde(default)]
    value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
struct ChangeValue {
    #[serde(default)]
    contacts: Vec<Contact>,
    #[serde(default)]
    messages: Vec<InboundMessage>,
    #[serde(default)]
    statuses: Vec<InboundStatus>,
}

#[derive(Debug, Deserialize)]
struct Contact {
    #[serde(default)]
    wa_id: Option<String>,
    #[serde(default)]
    profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
struct Profile {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InboundMessage {
    id: String,
    from: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<TextBody>,
    #[serde(default)]
    image: Option<Media>,
    #[serde(default)]
    video: Option<Media>,
    #[serde(default)]
    document: Option<Media>,
    #[serde(default)]
    audio: Option<Media>,
}

#[derive(Debug, Deserialize)]
struct TextBody {
    #[serde(default)]
    body: String,
}

#[derive(Debug, Deserialize)]
struct Media {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    caption: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InboundStatus {
    id: String,
    status: String,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Parses one webhook delivery into normalized events.
pub fn parse_payload(payload: &Value) -> Result<Vec<InboundEvent>, RelayrError> {
    let envelope: Envelope = serde_json::from_value(payload.clone())
        .map_err(|e| RelayrError::Payload(format!("not a whatsapp webhook payload: {e}")))?;

    let mut events = Vec::new();
    for entry in envelope.entry {
        for change in entry.changes {
            let value = change.value;
            for msg in &value.messages {
                events.push(InboundEvent::Message(normalize_message(msg, &value.contacts)));
            }
            for status in &value.statuses {
                if let Some(event) = normalize_status(status) {
                    events.push(InboundEvent::Status(event));
                }
            }
        }
    }
    Ok(events)
}

fn normalize_message(msg: &InboundMessage, contacts: &[Contact]) -> NormalizedInbound {
    let (text, media_id) = extract_content(msg);
    let sender_name = contacts
        .iter()
        .find(|c| c.wa_id.as_deref() == Some(msg.from.as_str()))
        .or_else(|| contacts.first())
        .and_then(|c| c.profile.as_ref())
        .and_then(|p| p.name.clone());

    NormalizedInbound {
        external_id: msg.id.clone(),
        sender: msg.from.clone(),
        sender_name,
        text,
        media_id,
        timestamp: parse_timestamp(msg.timestamp.as_deref()),
        metadata: serde_json::json!({
            "wa_id": msg.from,
            "message_type": msg.kind,
        }),
    }
}

fn extract_content(msg: &InboundMessage) -> (String, Option<String>) {
    if let Some(text) = &msg.text {
        return (text.body.clone(), None);
    }
    for (media, placeholder) in [
        (&msg.image, "[Photo]"),
        (&msg.video, "[Video]"),
        (&msg.document, "[Document]"),
        (&msg.audio, "[Audio]"),
    ] {
        if let Some(media) = media {
            let text = media
                .caption
                .clone()
                .unwrap_or_else(|| placeholder.to_string());
            return (text, media.id.clone());
        }
    }
    let kind = msg.kind.as_deref().unwrap_or("unknown");
    (format!("[{kind}]"), None)
}

fn normalize_status(status: &InboundStatus) -> Option<StatusUpdate> {
    let mapped = match status.status.as_str() {
        "sent" => MessageStatus::Sent,
        "delivered" => MessageStatus::Delivered,
        "read" => MessageStatus::Read,
        "failed" => MessageStatus::Failed,
        other => {
            debug!(status = %other, external_id = %status.id, "ignoring unknown whatsapp status");
            return None;
        }
    };
    Some(StatusUpdate {
        external_id: status.id.clone(),
        status: mapped,
        timestamp: parse_timestamp(status.timestamp.as_deref()),
    })
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let secs = raw?.parse::<i64>().ok()?;
    DateTime::<Utc>::from_timestamp(secs, 0)
}
