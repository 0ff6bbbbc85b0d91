// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call queue processor: dispatches origination and recording jobs to the
//! call service.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use relayr_core::error::RelayrError;
use relayr_core::jobs::{CallJob, queues};
use relayr_core::traits::queue::{Job, JobProcessor};
use relayr_telephony::CallService;

pub struct CallProcessor {
    calls: Arc<CallService>,
}

impl CallProcessor {
    pub fn new(calls: Arc<CallService>) -> Self {
        Self { calls }
    }
}

#[async_trait]
impl JobProcessor for CallProcessor {
    fn queue(&self) -> &'static str {
        queues::CALLS
    }

    async fn process(&self, job: Job<Value>) -> Result<(), RelayrError> {
        let payload: CallJob = serde_json::from_value(job.payload)
            .map_err(|e| RelayrError::Payload(format!("malformed call job: {e}")))?;

        match payload {
            CallJob::InitiateCall {
                call_id,
                from,
                to,
                variables,
            } => {
                self.calls
                    .process_initiate(&call_id, &from, &to, &variables)
                    .await
            }
            CallJob::ProcessRecording {
                account_id,
                call_id,
                recording_name,
            } => {
                self.calls
                    .process_recording(&account_id, &call_id, &recording_name)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use relayr_core::traits::queue::RetryPolicy;
    use relayr_telephony::AriClient;
    use relayr_test_utils::{CapturingQueue, InMemoryObjectStore, InMemoryRepository};

    fn processor() -> CallProcessor {
        let service = CallService::new(
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(CapturingQueue::new()),
            AriClient::new(
                "http://127.0.0.1:1",
                "asterisk",
                "asterisk",
                "relayr",
                Duration::from_secs(1),
            )
            .unwrap(),
            RetryPolicy::default(),
        );
        CallProcessor::new(Arc::new(service))
    }

    #[tokio::test]
    async fn malformed_payload_is_a_terminal_error() {
        let job = Job {
            id: "j1".into(),
            payload: serde_json::json!({"kind": "unknown-kind"}),
            attempts_made: 0,
        };
        let err = processor().process(job).await.unwrap_err();
        assert!(matches!(err, RelayrError::Payload(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn recording_job_for_unknown_call_resolves() {
        let job = Job {
            id: "j2".into(),
            payload: serde_json::json!({
                "kind": "process-recording",
                "account_id": "acct-1",
                "call_id": "missing",
                "recording_name": "call-missing",
            }),
            attempts_made: 0,
        };
        processor().process(job).await.unwrap();
    }
}
