// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`ChannelAdapter`] implementation for the Telegram Bot API.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use teloxide::prelude::Requester;
use teloxide::types::{ChatId, InputFile, Recipient};
use teloxide::{RequestError, payloads::setters::*};
use tracing::debug;

use relayr_core::ChannelAdapter;
use relayr_core::error::RelayrError;
use relayr_core::types::{
    ChannelKind, InboundEvent, Integration, OutboundContent, SendReceipt,
};

use crate::inbound;
use crate::registry::BotRegistry;

/// Telegram channel adapter backed by the per-integration [`BotRegistry`].
pub struct TelegramChannel {
    registry: Arc<BotRegistry>,
}

impl TelegramChannel {
    pub fn new(registry: Arc<BotRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<BotRegistry> {
        &self.registry
    }

    /// Sends `text` to the integration's manager group, if one is
    /// configured. Returns `None` when the integration has no group.
    pub async fn notify_managers(
        &self,
        integration: &Integration,
        text: &str,
    ) -> Result<Option<SendReceipt>, RelayrError> {
        let settings = integration.telegram_settings()?;
        let Some(group_id) = settings.manager_group_id else {
            return Ok(None);
        };
        let receipt = self
            .send(integration, &group_id, &OutboundContent::text(text))
            .await?;
        Ok(Some(receipt))
    }
}

#[async_trait]
impl relayr_core::traits::channel::ChannelAdapter for TelegramChannel {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    async fn send(
        &self,
        integration: &Integration,
        recipient: &str,
        content: &OutboundContent,
    ) -> Result<SendReceipt, RelayrError> {
        let bot = self.registry.bot_for(integration)?;
        let chat = parse_chat_id(recipient)?;

        let sent = match content {
            OutboundContent::Text { text } => bot
                .send_message(Recipient::Id(chat), text)
                .await
                .map_err(classify_send_error)?,
            OutboundContent::Photo { url, caption } => {
                let mut req = bot.send_photo(Recipient::Id(chat), input_file(url)?);
                if let Some(caption) = caption {
                    req = req.caption(caption.clone());
                }
                req.await.map_err(classify_send_error)?
            }
            OutboundContent::Video { url, caption } => {
                let mut req = bot.send_video(Recipient::Id(chat), input_file(url)?);
                if let Some(caption) = caption {
                    req = req.caption(caption.clone());
                }
                req.await.map_err(classify_send_error)?
            }
            OutboundContent::Document { url, caption } => {
                let mut req = bot.send_document(Recipient::Id(chat), input_file(url)?);
                if let Some(caption) = caption {
                    req = req.caption(caption.clone());
                }
                req.await.map_err(classify_send_error)?
            }
            OutboundContent::Audio { url } => bot
                .send_audio(Recipient::Id(chat), input_file(url)?)
                .await
                .map_err(classify_send_error)?,
            OutboundContent::Template { name, .. } => {
                return Err(RelayrError::Rejected {
                    message: format!("telegram does not support message templates ({name})"),
                });
            }
        };

        debug!(
            integration_id = %integration.id,
            chat_id = chat.0,
            message_id = sent.id.0,
            "telegram message sent"
        );
        Ok(SendReceipt {
            external_id: sent.id.0.to_string(),
        })
    }

    fn parse_inbound(&self, payload: &Value) -> Result<Vec<InboundEvent>, RelayrError> {
        inbound::parse_update(payload)
    }
}

fn parse_chat_id(recipient: &str) -> Result<ChatId, RelayrError> {
    recipient
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| RelayrError::Rejected {
            message: format!("invalid telegram chat id: {recipient}"),
        })
}

fn input_file(raw_url: &str) -> Result<InputFile, RelayrError> {
    let url = url::Url::parse(raw_url).map_err(|e| RelayrError::Rejected {
        message: format!("invalid media url {raw_url}: {e}"),
    })?;
    Ok(InputFile::url(url))
}

/// Maps a teloxide failure into the retryable/terminal taxonomy.
///
/// Network trouble and rate limiting are worth retrying; an API-level
/// rejection (bad chat, revoked token) never resolves on redelivery.
fn classify_send_error(err: RequestError) -> RelayrError {
    let retryable = matches!(
        err,
        RequestError::Network(_) | RequestError::Io(_) | RequestError::RetryAfter(_)
    );
    if retryable {
        RelayrError::transport(format!("telegram api unavailable: {err}"), err)
    } else {
        RelayrError::Rejected {
            message: format!("telegram rejected request: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use relayr_core::traits::channel::ChannelAdapter;
    use relayr_core::types::IntegrationStatus;

    use super::*;

    fn adapter() -> TelegramChannel {
        TelegramChannel::new(Arc::new(BotRegistry::new()))
    }

    #[test]
    fn reports_its_channel() {
        assert_eq!(adapter().channel(), ChannelKind::Telegram);
    }

    #[test]
    fn invalid_chat_id_is_terminal() {
        let err = parse_chat_id("not-a-number").unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn invalid_media_url_is_terminal() {
        let err = input_file("nope").unwrap_err();
        assert!(matches!(err, RelayrError::Rejected { .. }));
    }

    #[tokio::test]
    async fn template_content_is_rejected() {
        let integration = Integration {
            id: "i1".into(),
            account_id: "a1".into(),
            channel: ChannelKind::Telegram,
            status: IntegrationStatus::Active,
            settings: serde_json::json!({ "bot_token": "123:abc" }),
        };
        let err = adapter()
            .send(
                &integration,
                "555",
                &OutboundContent::Template {
                    name: "welcome".into(),
                    language: "en".into(),
                    components: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RelayrError::Rejected { .. }));
    }
}
