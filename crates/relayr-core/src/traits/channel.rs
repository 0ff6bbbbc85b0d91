// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for messaging platform integrations.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RelayrError;
use crate::types::{ChannelKind, InboundEvent, Integration, OutboundContent, SendReceipt};

/// Protocol-specific translation between a provider's wire format and the
/// core's internal message/event model.
///
/// One implementation exists per channel; the outbound processor selects
/// the adapter through a lookup table keyed by [`ChannelKind`].
///
/// Send failures must be typed: transient provider failures (timeouts, 5xx)
/// surface as [`RelayrError::Transport`] or [`RelayrError::Timeout`] so the
/// queue retries the job, while provider rejections (4xx) surface as
/// [`RelayrError::Rejected`] and mark the message permanently failed.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// The channel this adapter speaks.
    fn channel(&self) -> ChannelKind;

    /// Sends one message to `recipient` using the integration's credentials.
    async fn send(
        &self,
        integration: &Integration,
        recipient: &str,
        content: &OutboundContent,
    ) -> Result<SendReceipt, RelayrError>;

    /// Normalizes a raw inbound provider payload into core events.
    ///
    /// One payload may carry several events (WhatsApp batches messages and
    /// statuses). An unrecognized but well-formed payload yields an empty
    /// vec; a payload the adapter cannot interpret at all is a
    /// [`RelayrError::Payload`].
    fn parse_inbound(&self, payload: &Value) -> Result<Vec<InboundEvent>, RelayrError>;
}
