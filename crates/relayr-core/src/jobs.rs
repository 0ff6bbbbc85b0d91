// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue names and job payload types passed between producers and
//! processors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{ChannelKind, OutboundContent};

/// Named queues, one logical worker pool each.
pub mod queues {
    pub const WEBHOOKS: &str = "webhooks";
    pub const OUTBOUND_MESSAGES: &str = "outbound-messages";
    pub const CALLS: &str = "calls";
    pub const NOTIFICATIONS: &str = "notifications";

    pub const ALL: [&str; 4] = [WEBHOOKS, OUTBOUND_MESSAGES, CALLS, NOTIFICATIONS];
}

/// Payload of one webhook-processing job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookJob {
    pub webhook_event_id: String,
    pub channel: ChannelKind,
    pub account_id: Option<String>,
    pub integration_id: Option<String>,
    pub payload: Value,
}

/// Payload of one outbound send job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessageJob {
    pub message_id: String,
    pub conversation_id: String,
    pub account_id: String,
    pub channel: ChannelKind,
    /// Channel-native recipient address.
    pub recipient: String,
    pub content: OutboundContent,
    /// Explicit integration, else the account's sole active one is used.
    #[serde(default)]
    pub integration_id: Option<String>,
}

/// Payloads on the calls queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CallJob {
    /// Originate an outbound call through the signalling server.
    InitiateCall {
        call_id: String,
        from: String,
        to: String,
        #[serde(default)]
        variables: BTreeMap<String, String>,
    },
    /// Download, archive, and clean up a finished call's recording.
    ProcessRecording {
        account_id: String,
        call_id: String,
        recording_name: String,
    },
}

/// Category of a notification, used for manager routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewMessage,
    NewLead,
    IncomingCall,
    /// Free-form notification to explicit recipients.
    Direct,
}

/// Payload of one notification fan-out job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationJob {
    pub kind: NotificationKind,
    pub account_id: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    pub message: String,
    #[serde(default)]
    pub metadata: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_job_serde_tagging() {
        let job = CallJob::InitiateCall {
            call_id: "c1".into(),
            from: "+1000".into(),
            to: "+2000".into(),
            variables: BTreeMap::new(),
        };
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["kind"], "initiate-call");

        let job = CallJob::ProcessRecording {
            account_id: "a1".into(),
            call_id: "c1".into(),
            recording_name: "call-c1".into(),
        };
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["kind"], "process-recording");
    }

    #[test]
    fn webhook_job_round_trips() {
        let job = WebhookJob {
            webhook_event_id: "we1".into(),
            channel: ChannelKind::Whatsapp,
            account_id: Some("a1".into()),
            integration_id: Some("i1".into()),
            payload: serde_json::json!({"entry": []}),
        };
        let value = serde_json::to_value(&job).unwrap();
        let back: WebhookJob = serde_json::from_value(value).unwrap();
        assert_eq!(back.webhook_event_id, "we1");
        assert_eq!(back.channel, ChannelKind::Whatsapp);
    }
}
