// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for webhook intake.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use relayr_config::ServerConfig;
use relayr_core::error::RelayrError;
use relayr_core::traits::queue::{JobQueue, RetryPolicy};
use relayr_core::traits::repository::Repository;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct WebhookState {
    /// Persistence for integrations and webhook audit rows.
    pub repo: Arc<dyn Repository>,
    /// Queue the ingested payloads are handed to.
    pub queue: Arc<dyn JobQueue>,
    /// Retry policy attached to enqueued webhook jobs.
    pub retry: RetryPolicy,
    /// Account used for callbacks that arrive without an integration id.
    pub default_account_id: Option<String>,
}

/// Builds the ingestion router over shared state.
///
/// Routes:
/// - GET  /health
/// - GET  /webhook/whatsapp/{integration_id} (Meta subscription handshake)
/// - POST /webhook/{channel}
/// - POST /webhook/{channel}/{integration_id}
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route(
            "/webhook/whatsapp/{integration_id}",
            get(handlers::verify_whatsapp).post(handlers::ingest_whatsapp),
        )
        .route("/webhook/{channel}", post(handlers::ingest))
        .route(
            "/webhook/{channel}/{integration_id}",
            post(handlers::ingest_with_integration),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds the configured address and serves the ingestion router until the
/// process stops.
pub async fn start_server(config: &ServerConfig, state: WebhookState) -> Result<(), RelayrError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayrError::Transport {
            message: format!("failed to bind webhook server to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!(%addr, "webhook server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| RelayrError::Transport {
            message: format!("webhook server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
