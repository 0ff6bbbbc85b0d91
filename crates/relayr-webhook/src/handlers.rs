// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for webhook intake.
//!
//! Ingestion does the minimum inline: authenticate the caller, persist an
//! audit row, and enqueue a processing job. Everything channel-specific
//! happens in the worker pools so providers get their acknowledgment fast.
//! The one exception is the Telegram business-connection handshake, which
//! must update integration settings before the next update arrives and is
//! therefore applied inline.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use relayr_core::jobs::{WebhookJob, queues};
use relayr_core::traits::queue::enqueue_job;
use relayr_core::types::{ChannelKind, Integration, WebhookEvent, WebhookStatus};
use relayr_whatsapp::verify_signature;

use crate::server::WebhookState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Acknowledgment body for accepted webhooks.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub status: &'static str,
    pub event_id: String,
}

/// Health response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Query parameters of the Meta webhook subscription handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: error.into() })).into_response()
}

/// GET /health
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /webhook/whatsapp/{integration_id}
///
/// Meta's subscription handshake: echo `hub.challenge` back when
/// `hub.verify_token` matches the integration's configured token.
pub async fn verify_whatsapp(
    State(state): State<WebhookState>,
    Path(integration_id): Path<String>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let integration = match state.repo.integration(&integration_id).await {
        Ok(Some(integration)) if integration.channel == ChannelKind::Whatsapp => integration,
        Ok(_) => {
            return error_response(StatusCode::NOT_FOUND, "unknown integration");
        }
        Err(e) => {
            warn!(error = %e, "integration lookup failed during verification");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "lookup failed");
        }
    };

    let settings = match integration.whatsapp_settings() {
        Ok(settings) => settings,
        Err(e) => {
            warn!(integration_id = %integration.id, error = %e, "invalid whatsapp settings");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "invalid settings");
        }
    };

    let subscribe = params.mode.as_deref() == Some("subscribe");
    let token_matches = params.verify_token.as_deref() == Some(settings.webhook_verify_token.as_str());
    match (subscribe && token_matches, params.challenge) {
        (true, Some(challenge)) => {
            info!(integration_id = %integration.id, "whatsapp webhook verified");
            (StatusCode::OK, challenge).into_response()
        }
        _ => error_response(StatusCode::FORBIDDEN, "verification failed"),
    }
}

/// POST /webhook/{channel}
pub async fn ingest(
    State(state): State<WebhookState>,
    Path(channel): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_ingest(state, &channel, None, &headers, &body).await
}

/// POST /webhook/whatsapp/{integration_id}
///
/// The whatsapp path is routed separately because its GET handshake route
/// shadows the generic `{channel}` pattern for this prefix.
pub async fn ingest_whatsapp(
    State(state): State<WebhookState>,
    Path(integration_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_ingest(state, "whatsapp", Some(integration_id), &headers, &body).await
}

/// POST /webhook/{channel}/{integration_id}
pub async fn ingest_with_integration(
    State(state): State<WebhookState>,
    Path((channel, integration_id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_ingest(state, &channel, Some(integration_id), &headers, &body).await
}

/// Shared intake path: authenticate, persist the audit row, enqueue.
///
/// Rejections (bad signature, malformed payload, unknown integration)
/// happen before any write, so a hostile caller leaves no trace beyond a
/// log line.
async fn handle_ingest(
    state: WebhookState,
    channel: &str,
    integration_id: Option<String>,
    headers: &HeaderMap,
    body: &Bytes,
) -> Response {
    let Ok(channel) = channel.parse::<ChannelKind>() else {
        return error_response(StatusCode::NOT_FOUND, format!("unknown channel: {channel}"));
    };

    let integration = match integration_id {
        Some(id) => match state.repo.integration(&id).await {
            Ok(Some(integration)) if integration.channel == channel => Some(integration),
            Ok(_) => {
                debug!(integration_id = %id, %channel, "webhook for unknown integration");
                return error_response(StatusCode::NOT_FOUND, "unknown integration");
            }
            Err(e) => {
                warn!(error = %e, "integration lookup failed during ingestion");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, "lookup failed");
            }
        },
        None => None,
    };

    // WhatsApp payloads are authenticated with an HMAC over the raw body.
    // Without a resolvable integration there is no secret to verify
    // against, so anonymous WhatsApp posts are refused outright.
    if channel == ChannelKind::Whatsapp {
        let Some(integration) = integration.as_ref() else {
            return error_response(StatusCode::NOT_FOUND, "integration id required");
        };
        if let Err(response) = check_whatsapp_signature(integration, headers, body) {
            return response;
        }
    }

    let payload: Value = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => {
            debug!(%channel, error = %e, "malformed webhook payload");
            return error_response(StatusCode::BAD_REQUEST, "malformed JSON payload");
        }
    };

    // Telegram business-connection authorization is applied inline: the
    // settings must carry the connection id before the next update.
    if channel == ChannelKind::Telegram {
        if let Some(connection) = payload.get("business_connection") {
            return match integration.as_ref() {
                Some(integration) => {
                    apply_business_connection(&state, integration, connection, &payload).await
                }
                None => error_response(StatusCode::NOT_FOUND, "integration id required"),
            };
        }
    }

    let account_id = integration
        .as_ref()
        .map(|i| i.account_id.clone())
        .or_else(|| state.default_account_id.clone());

    let event = WebhookEvent {
        id: uuid::Uuid::new_v4().to_string(),
        channel,
        integration_id: integration.as_ref().map(|i| i.id.clone()),
        account_id: account_id.clone(),
        payload: payload.clone(),
        status: WebhookStatus::Received,
        attempts: 0,
        last_error: None,
        created_at: Utc::now(),
    };
    if let Err(e) = state.repo.insert_webhook_event(&event).await {
        warn!(error = %e, "failed to persist webhook event");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "persistence failed");
    }

    let job = WebhookJob {
        webhook_event_id: event.id.clone(),
        channel,
        account_id,
        integration_id: event.integration_id.clone(),
        payload,
    };
    if let Err(e) = enqueue_job(state.queue.as_ref(), queues::WEBHOOKS, &job, state.retry).await {
        warn!(error = %e, webhook_event_id = %event.id, "failed to enqueue webhook job");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "enqueue failed");
    }

    info!(%channel, webhook_event_id = %event.id, "webhook accepted");
    (
        StatusCode::OK,
        Json(AckResponse {
            status: "ok",
            event_id: event.id,
        }),
    )
        .into_response()
}

fn check_whatsapp_signature(
    integration: &Integration,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<(), Response> {
    let settings = integration.whatsapp_settings().map_err(|e| {
        warn!(integration_id = %integration.id, error = %e, "invalid whatsapp settings");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "invalid settings")
    })?;

    let header = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            debug!(integration_id = %integration.id, "missing signature header");
            error_response(StatusCode::UNAUTHORIZED, "missing signature")
        })?;

    verify_signature(&settings.app_secret, body, header).map_err(|e| {
        debug!(integration_id = %integration.id, error = %e, "signature rejected");
        error_response(StatusCode::UNAUTHORIZED, "invalid signature")
    })
}

/// Updates the integration's stored business-connection id, without going
/// through the queue. A disabled connection clears the id.
async fn apply_business_connection(
    state: &WebhookState,
    integration: &Integration,
    connection: &Value,
    payload: &Value,
) -> Response {
    let Some(connection_id) = connection.get("id").and_then(Value::as_str) else {
        return error_response(StatusCode::BAD_REQUEST, "business connection without id");
    };
    let enabled = connection
        .get("is_enabled")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    let mut settings = match integration.telegram_settings() {
        Ok(settings) => settings,
        Err(e) => {
            warn!(integration_id = %integration.id, error = %e, "invalid telegram settings");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "invalid settings");
        }
    };
    settings.business_connection_id = enabled.then(|| connection_id.to_string());

    let settings_value = match serde_json::to_value(&settings) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "failed to serialize telegram settings");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "invalid settings");
        }
    };
    if let Err(e) = state
        .repo
        .update_integration_settings(&integration.id, settings_value)
        .await
    {
        warn!(error = %e, "failed to update integration settings");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "persistence failed");
    }

    // Keep the audit trail: the handshake is recorded as already handled.
    let event = WebhookEvent {
        id: uuid::Uuid::new_v4().to_string(),
        channel: ChannelKind::Telegram,
        integration_id: Some(integration.id.clone()),
        account_id: Some(integration.account_id.clone()),
        payload: payload.clone(),
        status: WebhookStatus::Processed,
        attempts: 0,
        last_error: None,
        created_at: Utc::now(),
    };
    if let Err(e) = state.repo.insert_webhook_event(&event).await {
        warn!(error = %e, "failed to persist business connection event");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "persistence failed");
    }

    info!(
        integration_id = %integration.id,
        connection_id,
        enabled,
        "telegram business connection applied"
    );
    (
        StatusCode::OK,
        Json(AckResponse {
            status: "ok",
            event_id: event.id,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use relayr_core::traits::queue::RetryPolicy;
    use relayr_core::traits::repository::Repository;
    use relayr_test_utils::fixtures::{telegram_integration, whatsapp_integration};
    use relayr_test_utils::{CapturingQueue, InMemoryRepository};
    use relayr_whatsapp::sign;

    use crate::server::{WebhookState, router};

    struct Harness {
        repo: Arc<InMemoryRepository>,
        queue: Arc<CapturingQueue>,
        app: Router,
    }

    fn harness(default_account_id: Option<&str>) -> Harness {
        let repo = Arc::new(InMemoryRepository::new());
        let queue = Arc::new(CapturingQueue::new());
        let app = router(WebhookState {
            repo: repo.clone(),
            queue: queue.clone(),
            retry: RetryPolicy::default(),
            default_account_id: default_account_id.map(str::to_string),
        });
        Harness { repo, queue, app }
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn whatsapp_post_with_valid_signature_is_accepted() {
        let h = harness(None);
        h.repo
            .add_integration(whatsapp_integration("wa-1", "acct-1"))
            .await;

        let body = br#"{"entry":[{"changes":[]}]}"#;
        let signature = sign("wa-app-secret", body);
        let response = h
            .app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook/whatsapp/wa-1")
                    .header("x-hub-signature-256", signature)
                    .body(Body::from(&body[..]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let events = h.repo.webhook_events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, WebhookStatus::Received);
        assert_eq!(events[0].account_id.as_deref(), Some("acct-1"));

        let jobs = h.queue.jobs_on(queues::WEBHOOKS).await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0]["webhook_event_id"], events[0].id.as_str());
    }

    #[tokio::test]
    async fn whatsapp_post_with_bad_signature_leaves_no_trace() {
        let h = harness(None);
        h.repo
            .add_integration(whatsapp_integration("wa-1", "acct-1"))
            .await;

        let response = h
            .app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook/whatsapp/wa-1")
                    .header("x-hub-signature-256", "sha256=deadbeef")
                    .body(Body::from(r#"{"entry":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(h.repo.webhook_events().await.is_empty());
        assert!(h.queue.jobs().await.is_empty());
    }

    #[tokio::test]
    async fn whatsapp_post_without_signature_header_is_refused() {
        let h = harness(None);
        h.repo
            .add_integration(whatsapp_integration("wa-1", "acct-1"))
            .await;

        let response = h
            .app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook/whatsapp/wa-1")
                    .body(Body::from(r#"{"entry":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(h.repo.webhook_events().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_rejected_without_side_effects() {
        let h = harness(Some("acct-1"));

        let response = h
            .app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook/telegram")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(h.repo.webhook_events().await.is_empty());
        assert!(h.queue.jobs().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_channel_is_not_found() {
        let h = harness(None);
        let response = h
            .app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook/pigeon")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn telegram_update_without_integration_uses_default_account() {
        let h = harness(Some("acct-default"));

        let response = h
            .app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook/telegram")
                    .body(Body::from(
                        r#"{"update_id":1,"message":{"message_id":5,"chat":{"id":555,"type":"private"},"date":0,"text":"Hi"}}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let events = h.repo.webhook_events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].account_id.as_deref(), Some("acct-default"));
        assert!(events[0].integration_id.is_none());
    }

    #[tokio::test]
    async fn whatsapp_verification_echoes_the_challenge() {
        let h = harness(None);
        h.repo
            .add_integration(whatsapp_integration("wa-1", "acct-1"))
            .await;

        let response = h
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/webhook/whatsapp/wa-1?hub.mode=subscribe&hub.verify_token=verify-me&hub.challenge=12345")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "12345");

        let response = h
            .app
            .oneshot(
                Request::builder()
                    .uri("/webhook/whatsapp/wa-1?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=12345")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn business_connection_updates_settings_inline() {
        let h = harness(None);
        h.repo
            .add_integration(telegram_integration("tg-1", "acct-1"))
            .await;

        let response = h
            .app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook/telegram/tg-1")
                    .body(Body::from(
                        r#"{"update_id":2,"business_connection":{"id":"bc-77","is_enabled":true}}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Settings were updated without a trip through the queue.
        assert!(h.queue.jobs().await.is_empty());
        let integration = h.repo.integration("tg-1").await.unwrap().unwrap();
        let settings = integration.telegram_settings().unwrap();
        assert_eq!(settings.business_connection_id.as_deref(), Some("bc-77"));

        let events = h.repo.webhook_events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, WebhookStatus::Processed);
    }
}
