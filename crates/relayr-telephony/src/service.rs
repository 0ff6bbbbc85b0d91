// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call lifecycle state machine and recording pipeline.
//!
//! Call status is driven exclusively by provider events; nothing here
//! guesses transitions. Sessions are correlated through
//! `Call.metadata.external_id` (the provider channel id), set either at
//! origination time or when an inbound session first appears.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use relayr_core::error::RelayrError;
use relayr_core::jobs::{CallJob, NotificationJob, NotificationKind, queues};
use relayr_core::traits::object_store::ObjectStore;
use relayr_core::traits::queue::{JobQueue, RetryPolicy, enqueue_job};
use relayr_core::traits::repository::Repository;
use relayr_core::types::{
    Call, CallDirection, CallMetadata, CallRecording, CallStats, CallStatus, MediaFile,
};

use crate::ari::AriClient;
use crate::events::TelephonyEvent;

/// Storage name of a call's recording on the signalling server.
pub fn recording_name(call_id: &str) -> String {
    format!("call-{call_id}")
}

/// Orchestrates call state, origination, and recording archival.
pub struct CallService {
    repo: Arc<dyn Repository>,
    store: Arc<dyn ObjectStore>,
    queue: Arc<dyn JobQueue>,
    ari: AriClient,
    retry: RetryPolicy,
}

impl CallService {
    pub fn new(
        repo: Arc<dyn Repository>,
        store: Arc<dyn ObjectStore>,
        queue: Arc<dyn JobQueue>,
        ari: AriClient,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            repo,
            store,
            queue,
            ari,
            retry,
        }
    }

    /// Applies one normalized provider event to the call state machine.
    pub async fn handle_event(
        &self,
        account_id: &str,
        event: TelephonyEvent,
    ) -> Result<(), RelayrError> {
        match event {
            TelephonyEvent::SessionStarted {
                external_id,
                caller,
                callee,
            } => {
                self.on_session_started(account_id, &external_id, caller, callee)
                    .await
            }
            TelephonyEvent::SessionEnded { external_id } => {
                self.on_session_ended(account_id, &external_id).await
            }
            TelephonyEvent::StatusChanged {
                external_id,
                status,
            } => self.on_status_changed(account_id, &external_id, status).await,
            TelephonyEvent::Dtmf { external_id, digit } => {
                info!(external_id = %external_id, digit = %digit, "dtmf received");
                Ok(())
            }
        }
    }

    /// Session entered the application: answer, start recording, mark
    /// answered. An unknown session becomes a new inbound call; a known
    /// one is the leg we originated earlier.
    async fn on_session_started(
        &self,
        account_id: &str,
        external_id: &str,
        caller: Option<String>,
        callee: Option<String>,
    ) -> Result<(), RelayrError> {
        let existing = self.repo.call_by_external_id(account_id, external_id).await?;
        let mut call = match existing {
            Some(call) => call,
            None => {
                let call = Call {
                    id: Uuid::new_v4().to_string(),
                    account_id: account_id.to_string(),
                    phone_number: caller.clone().unwrap_or_else(|| "unknown".into()),
                    direction: CallDirection::Inbound,
                    status: CallStatus::Ringing,
                    started_at: Utc::now(),
                    ended_at: None,
                    duration_secs: None,
                    metadata: CallMetadata {
                        external_id: Some(external_id.to_string()),
                        integration_id: None,
                        caller_number: caller.clone(),
                        callee_number: callee,
                    },
                    created_at: Utc::now(),
                };
                self.repo.insert_call(&call).await?;
                info!(call_id = %call.id, external_id = %external_id, "inbound call created");

                let notification = NotificationJob {
                    kind: NotificationKind::IncomingCall,
                    account_id: account_id.to_string(),
                    recipients: Vec::new(),
                    message: format!(
                        "Incoming call from {}",
                        caller.as_deref().unwrap_or("unknown number")
                    ),
                    metadata: serde_json::json!({ "call_id": call.id }),
                };
                enqueue_job(
                    self.queue.as_ref(),
                    queues::NOTIFICATIONS,
                    &notification,
                    self.retry,
                )
                .await?;
                call
            }
        };

        self.ari.answer(external_id).await?;
        self.ari
            .record(external_id, &recording_name(&call.id))
            .await?;

        call.status = CallStatus::Answered;
        self.repo.update_call(&call).await?;
        Ok(())
    }

    /// Session left the application: close the call and queue recording
    /// archival. An unknown session is a logged no-op.
    async fn on_session_ended(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> Result<(), RelayrError> {
        let Some(mut call) = self.repo.call_by_external_id(account_id, external_id).await? else {
            warn!(external_id = %external_id, "session end for unknown call");
            return Ok(());
        };

        let now = Utc::now();
        call.duration_secs = Some((now - call.started_at).num_seconds().max(0) as u64);
        call.ended_at = Some(now);
        call.status = CallStatus::Completed;
        self.repo.update_call(&call).await?;
        info!(
            call_id = %call.id,
            duration_secs = call.duration_secs.unwrap_or(0),
            "call completed"
        );

        let job = CallJob::ProcessRecording {
            account_id: account_id.to_string(),
            call_id: call.id.clone(),
            recording_name: recording_name(&call.id),
        };
        enqueue_job(self.queue.as_ref(), queues::CALLS, &job, self.retry).await?;
        Ok(())
    }

    async fn on_status_changed(
        &self,
        account_id: &str,
        external_id: &str,
        status: CallStatus,
    ) -> Result<(), RelayrError> {
        let Some(mut call) = self.repo.call_by_external_id(account_id, external_id).await? else {
            warn!(external_id = %external_id, status = %status, "status for unknown call");
            return Ok(());
        };

        call.status = status;
        if matches!(status, CallStatus::Completed | CallStatus::Failed) && call.ended_at.is_none()
        {
            let now = Utc::now();
            call.ended_at = Some(now);
            if call.duration_secs.is_none() {
                call.duration_secs = Some((now - call.started_at).num_seconds().max(0) as u64);
            }
        }
        self.repo.update_call(&call).await?;
        Ok(())
    }

    /// Creates an outbound call and queues the origination job.
    ///
    /// The tenant id always rides along as the `ACCOUNT_ID` channel
    /// variable so downstream dialplan logic (and the origination
    /// processor) can recover it.
    pub async fn initiate_call(
        &self,
        account_id: &str,
        from: &str,
        to: &str,
        mut variables: BTreeMap<String, String>,
    ) -> Result<Call, RelayrError> {
        let call = Call {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            phone_number: to.to_string(),
            direction: CallDirection::Outbound,
            status: CallStatus::Initiated,
            started_at: Utc::now(),
            ended_at: None,
            duration_secs: None,
            metadata: CallMetadata {
                external_id: None,
                integration_id: None,
                caller_number: Some(from.to_string()),
                callee_number: Some(to.to_string()),
            },
            created_at: Utc::now(),
        };
        self.repo.insert_call(&call).await?;

        variables.insert("ACCOUNT_ID".to_string(), account_id.to_string());
        let job = CallJob::InitiateCall {
            call_id: call.id.clone(),
            from: from.to_string(),
            to: to.to_string(),
            variables,
        };
        enqueue_job(self.queue.as_ref(), queues::CALLS, &job, self.retry).await?;
        info!(call_id = %call.id, from = %from, to = %to, "outbound call queued");
        Ok(call)
    }

    /// Origination job body: dial out and bind the channel id.
    pub async fn process_initiate(
        &self,
        call_id: &str,
        from: &str,
        to: &str,
        variables: &BTreeMap<String, String>,
    ) -> Result<(), RelayrError> {
        let account_id = variables
            .get("ACCOUNT_ID")
            .ok_or_else(|| RelayrError::Payload("initiate job is missing ACCOUNT_ID".into()))?;
        let Some(mut call) = self.repo.call(account_id, call_id).await? else {
            warn!(call_id = %call_id, "initiate job for unknown call");
            return Ok(());
        };

        let endpoint = format!("PJSIP/{to}");
        match self.ari.originate(&endpoint, from, variables).await {
            Ok(channel_id) => {
                call.metadata.external_id = Some(channel_id);
                call.status = CallStatus::Ringing;
                self.repo.update_call(&call).await?;
                Ok(())
            }
            Err(err) => {
                call.status = CallStatus::Failed;
                call.ended_at = Some(Utc::now());
                if let Err(update_err) = self.repo.update_call(&call).await {
                    error!(call_id = %call.id, error = %update_err, "failed to mark call failed");
                }
                Err(err)
            }
        }
    }

    /// Recording job body: download, archive to object storage, persist
    /// rows, then delete the provider copy.
    ///
    /// Fetch failures are terminal: stored recordings expire server-side,
    /// so redelivery would hit the same missing file. Cleanup failure is
    /// logged and swallowed; the archive already succeeded.
    pub async fn process_recording(
        &self,
        account_id: &str,
        call_id: &str,
        name: &str,
    ) -> Result<(), RelayrError> {
        let Some(call) = self.repo.call(account_id, call_id).await? else {
            warn!(call_id = %call_id, "recording job for unknown call");
            return Ok(());
        };

        let bytes = match self.fetch_recording(name).await {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(call_id = %call_id, recording = %name, error = %err, "recording unavailable");
                return Err(RelayrError::Rejected {
                    message: format!("recording {name} unavailable: {err}"),
                });
            }
        };
        let size_bytes = bytes.len() as u64;

        let filename = format!("{name}.wav");
        let key = self.store.generate_key(account_id, "recordings", &filename);
        let stored = self.store.upload(&key, bytes, Some("audio/wav")).await?;

        let media = MediaFile {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            name: filename,
            mime_type: Some("audio/wav".into()),
            size_bytes,
            storage_key: key,
            url: stored.url.clone(),
            created_at: Utc::now(),
        };
        self.repo.insert_media_file(&media).await?;

        let recording = CallRecording {
            id: Uuid::new_v4().to_string(),
            call_id: call.id.clone(),
            url: stored.url,
            duration_secs: call.duration_secs.unwrap_or(0),
            media_file_id: Some(media.id),
            created_at: Utc::now(),
        };
        self.repo.insert_call_recording(&recording).await?;
        info!(call_id = %call.id, recording_id = %recording.id, "recording archived");

        if let Err(err) = self.ari.delete_recording(name).await {
            warn!(recording = %name, error = %err, "failed to delete provider recording copy");
        }
        Ok(())
    }

    async fn fetch_recording(&self, name: &str) -> Result<Vec<u8>, RelayrError> {
        self.ari.stored_recording(name).await?;
        self.ari.download_recording(name).await
    }

    pub async fn get_call(&self, account_id: &str, call_id: &str) -> Result<Call, RelayrError> {
        self.repo
            .call(account_id, call_id)
            .await?
            .ok_or_else(|| RelayrError::NotFound(format!("call {call_id}")))
    }

    pub async fn get_recordings(
        &self,
        account_id: &str,
        call_id: &str,
    ) -> Result<Vec<CallRecording>, RelayrError> {
        self.repo.recordings_for_call(account_id, call_id).await
    }

    /// Aggregates call statistics over a window. The average is over all
    /// calls carrying a duration, guarded against an empty window.
    pub async fn get_call_stats(
        &self,
        account_id: &str,
        start: chrono::DateTime<Utc>,
        end: chrono::DateTime<Utc>,
    ) -> Result<CallStats, RelayrError> {
        let calls = self.repo.calls_in_window(account_id, start, end).await?;

        let total = calls.len() as u64;
        let inbound = calls
            .iter()
            .filter(|c| c.direction == CallDirection::Inbound)
            .count() as u64;
        let outbound = total - inbound;
        let completed = calls
            .iter()
            .filter(|c| c.status == CallStatus::Completed)
            .count() as u64;
        let failed = calls
            .iter()
            .filter(|c| c.status == CallStatus::Failed)
            .count() as u64;

        let durations: Vec<u64> = calls.iter().filter_map(|c| c.duration_secs).collect();
        let total_duration_secs: u64 = durations.iter().sum();
        let avg_duration_secs = if durations.is_empty() {
            0.0
        } else {
            total_duration_secs as f64 / durations.len() as f64
        };

        Ok(CallStats {
            total,
            inbound,
            outbound,
            completed,
            failed,
            avg_duration_secs,
            total_duration_secs,
        })
    }
}
