// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`ChannelAdapter`] implementation for the WhatsApp Cloud API.

use async_trait::async_trait;
use serde_json::{Value, json};

use relayr_core::error::RelayrError;
use relayr_core::traits::channel::ChannelAdapter;
use relayr_core::types::{
    ChannelKind, InboundEvent, Integration, OutboundContent, SendReceipt,
};

use crate::client::WhatsappClient;
use crate::inbound;

/// WhatsApp channel adapter. Stateless: tenant credentials come from the
/// integration on every call.
pub struct WhatsappChannel {
    client: WhatsappClient,
}

impl WhatsappChannel {
    pub fn new(client: WhatsappClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &WhatsappClient {
        &self.client
    }
}

#[async_trait]
impl ChannelAdapter for WhatsappChannel {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Whatsapp
    }

    async fn send(
        &self,
        integration: &Integration,
        recipient: &str,
        content: &OutboundContent,
    ) -> Result<SendReceipt, RelayrError> {
        let settings = integration.whatsapp_settings()?;
        let body = build_body(recipient, content);
        let wamid = self.client.send_message(&settings, body).await?;
        Ok(SendReceipt { external_id: wamid })
    }

    fn parse_inbound(&self, payload: &Value) -> Result<Vec<InboundEvent>, RelayrError> {
        inbound::parse_payload(payload)
    }
}

/// Builds the Cloud API message body for one outbound content kind.
fn build_body(to: &str, content: &OutboundContent) -> Value {
    let mut body = json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
    });
    let extra = match content {
        OutboundContent::Text { text } => json!({
            "type": "text",
            "text": { "body": text },
        }),
        OutboundContent::Photo { url, caption } => json!({
            "type": "image",
            "image": media_link(url, caption.as_deref()),
        }),
        OutboundContent::Video { url, caption } => json!({
            "type": "video",
            "video": media_link(url, caption.as_deref()),
        }),
        OutboundContent::Document { url, caption } => json!({
            "type": "document",
            "document": media_link(url, caption.as_deref()),
        }),
        OutboundContent::Audio { url } => json!({
            "type": "audio",
            "audio": { "link": url },
        }),
        OutboundContent::Template {
            name,
            language,
            components,
        } => json!({
            "type": "template",
            "template": {
                "name": name,
                "language": { "code": language },
                "components": components,
            },
        }),
    };
    merge(&mut body, extra);
    body
}

fn media_link(url: &str, caption: Option<&str>) -> Value {
    match caption {
        Some(caption) => json!({ "link": url, "caption": caption }),
        None => json!({ "link": url }),
    }
}

fn merge(base: &mut Value, extra: Value) {
    if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
}
