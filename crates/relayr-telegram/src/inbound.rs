// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalization of raw Telegram webhook updates.
//!
//! All supported message kinds funnel into one inbound shape: text or
//! caption plus an optional provider file id. Telegram does not deliver
//! read/delivery receipts over webhooks, so this adapter never yields
//! status events.

use serde_json::Value;
use teloxide::types::{Message, Update, UpdateKind};
use tracing::debug;

use relayr_core::error::RelayrError;
use relayr_core::types::{InboundEvent, NormalizedInbound};

/// Parses one Telegram `Update` payload into normalized events.
///
/// Non-message updates (callbacks, polls, member changes) are ignored and
/// yield an empty vec; a payload that is not an Update at all is a
/// [`RelayrError::Payload`].
pub fn parse_update(payload: &Value) -> Result<Vec<InboundEvent>, RelayrError> {
    // teloxide's custom `Update` deserializer misparses when driven from a
    // `serde_json::Value`, so round-trip through a string.
    let update: Update = serde_json::from_str(&payload.to_string())
        .map_err(|e| RelayrError::Payload(format!("not a telegram update: {e}")))?;

    match update.kind {
        UpdateKind::Message(msg) => Ok(normalize_message(&msg).into_iter().collect()),
        other => {
            debug!(kind = ?update_kind_name(&other), "ignoring non-message telegram update");
            Ok(Vec::new())
        }
    }
}

fn update_kind_name(kind: &UpdateKind) -> &'static str {
    match kind {
        UpdateKind::Message(_) => "message",
        UpdateKind::EditedMessage(_) => "edited_message",
        UpdateKind::CallbackQuery(_) => "callback_query",
        _ => "other",
    }
}

/// Converts a Telegram message to the channel-agnostic inbound shape.
///
/// Returns `None` for message kinds the CRM does not ingest (stickers,
/// locations, service messages).
pub fn normalize_message(msg: &Message) -> Option<InboundEvent> {
    let (text, media_id) = extract_content(msg)?;

    let sender = msg.chat.id.0.to_string();
    let sender_name = msg.from.as_ref().map(|u| u.full_name());
    let username = msg.from.as_ref().and_then(|u| u.username.clone());

    Some(InboundEvent::Message(NormalizedInbound {
        external_id: msg.id.0.to_string(),
        sender,
        sender_name,
        text,
        media_id,
        timestamp: Some(msg.date),
        metadata: serde_json::json!({
            "chat_id": msg.chat.id.0.to_string(),
            "username": username,
        }),
    }))
}

/// Extracts (text-or-caption, provider file id) from a message.
///
/// For photos the largest size variant (last in the array) is taken.
fn extract_content(msg: &Message) -> Option<(String, Option<String>)> {
    if let Some(text) = msg.text() {
        return Some((text.to_string(), None));
    }

    let caption = msg.caption().map(|c| c.to_string());

    if let Some(photos) = msg.photo() {
        let largest = photos.last()?;
        return Some((
            caption.unwrap_or_else(|| "[Photo]".into()),
            Some(largest.file.id.to_string()),
        ));
    }
    if let Some(video) = msg.video() {
        return Some((
            caption.unwrap_or_else(|| "[Video]".into()),
            Some(video.file.id.to_string()),
        ));
    }
    if let Some(doc) = msg.document() {
        return Some((
            caption.unwrap_or_else(|| "[Document]".into()),
            Some(doc.file.id.to_string()),
        ));
    }
    if let Some(voice) = msg.voice() {
        return Some(("[Voice]".into(), Some(voice.file.id.to_string())));
    }
    if let Some(audio) = msg.audio() {
        return Some((
            caption.unwrap_or_else(|| "[Audio]".into()),
            Some(audio.file.id.to_string()),
        ));
    }

    debug!(msg_id = msg.id.0, "ignoring unsupported telegram message kind");
    None
}

/// Canned replies for bot commands.
///
/// Commands are answered directly by the webhook processor instead of the
/// manager-notification path. Handles the `/cmd@BotName` group form.
pub fn command_reply(text: &str) -> Option<&'static str> {
    let first = text.split_whitespace().next()?;
    let command = first.split('@').next().unwrap_or(first);
    match command {
        "/start" => Some("Hello! Send us a message and a manager will reply to you here."),
        "/help" => Some(
            "Just type your question and our team will get back to you. \
             Use /status to check whether we are online.",
        ),
        "/status" => Some("We are online. A manager will reply as soon as possible."),
        _ => None,
    }
}
