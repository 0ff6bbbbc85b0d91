// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! Captures outbound sends and supports scripted failures so tests can
//! drive the retry paths without a provider.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use relayr_core::error::RelayrError;
use relayr_core::traits::channel::ChannelAdapter;
use relayr_core::types::{
    ChannelKind, InboundEvent, Integration, OutboundContent, SendReceipt,
};

/// One captured outbound send.
#[derive(Debug, Clone)]
pub struct SentRecord {
    pub integration_id: String,
    pub recipient: String,
    pub content: OutboundContent,
}

/// A scripted outcome for the next `send` call.
#[derive(Debug, Clone, Copy)]
pub enum ScriptedFailure {
    /// Transient transport failure (retryable).
    Transient,
    /// Provider rejection (terminal).
    Rejection,
}

/// Mock [`ChannelAdapter`] with send capture and scripted failures.
pub struct MockChannel {
    kind: ChannelKind,
    sent: Mutex<Vec<SentRecord>>,
    script: Mutex<VecDeque<ScriptedFailure>>,
    inbound: Mutex<Vec<InboundEvent>>,
    counter: AtomicU64,
}

impl MockChannel {
    pub fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            sent: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            inbound: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
        }
    }

    fn lock<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queues a failure for the next `send` call; later calls succeed
    /// unless more failures are queued.
    pub fn fail_next(&self, failure: ScriptedFailure) {
        Self::lock(&self.script).push_back(failure);
    }

    /// Sets the events `parse_inbound` yields for any payload.
    pub fn set_inbound_events(&self, events: Vec<InboundEvent>) {
        *Self::lock(&self.inbound) = events;
    }

    pub fn sent(&self) -> Vec<SentRecord> {
        Self::lock(&self.sent).clone()
    }

    pub fn sent_count(&self) -> usize {
        Self::lock(&self.sent).len()
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    fn channel(&self) -> ChannelKind {
        self.kind
    }

    async fn send(
        &self,
        integration: &Integration,
        recipient: &str,
        content: &OutboundContent,
    ) -> Result<SendReceipt, RelayrError> {
        if let Some(failure) = Self::lock(&self.script).pop_front() {
            return Err(match failure {
                ScriptedFailure::Transient => RelayrError::Transport {
                    message: "scripted transient failure".into(),
                    source: None,
                },
                ScriptedFailure::Rejection => RelayrError::Rejected {
                    message: "scripted rejection".into(),
                },
            });
        }

        Self::lock(&self.sent).push(SentRecord {
            integration_id: integration.id.clone(),
            recipient: recipient.to_string(),
            content: content.clone(),
        });
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(SendReceipt {
            external_id: format!("mock-{n}"),
        })
    }

    fn parse_inbound(&self, _payload: &Value) -> Result<Vec<InboundEvent>, RelayrError> {
        Ok(Self::lock(&self.inbound).clone())
    }
}
