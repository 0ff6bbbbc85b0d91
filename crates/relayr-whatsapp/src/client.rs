// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the WhatsApp Cloud API (Meta Graph).
//!
//! Stateless per request: every call carries the tenant integration's
//! access token, so one client instance serves all integrations. The base
//! URL is configurable for tests.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use relayr_core::error::RelayrError;
use relayr_core::types::WhatsappSettings;

/// Resolved media metadata from the first step of a media fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaInfo {
    pub url: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

/// Graph API client shared by all WhatsApp integrations.
#[derive(Debug, Clone)]
pub struct WhatsappClient {
    http: reqwest::Client,
    api_base: String,
    timeout: Duration,
}

impl WhatsappClient {
    /// Creates a client against `api_base` (e.g.
    /// `https://graph.facebook.com/v19.0`).
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self, RelayrError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayrError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Posts one message payload to `/{phone_number_id}/messages` and
    /// returns the provider message id (wamid).
    pub async fn send_message(
        &self,
        settings: &WhatsappSettings,
        body: Value,
    ) -> Result<String, RelayrError> {
        let url = format!("{}/{}/messages", self.api_base, settings.phone_number_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&settings.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, self.timeout))?;

        let response = check_status(response).await?;
        let parsed: SendResponse = response
            .json()
            .await
            .map_err(|e| RelayrError::transport(format!("invalid send response: {e}"), e))?;

        let wamid = parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| RelayrError::Rejected {
                message: "whatsapp send response carried no message id".into(),
            })?;
        debug!(phone_number_id = %settings.phone_number_id, wamid = %wamid, "whatsapp message sent");
        Ok(wamid)
    }

    /// Step one of a media fetch: resolve the short-lived download URL.
    pub async fn media_info(
        &self,
        settings: &WhatsappSettings,
        media_id: &str,
    ) -> Result<MediaInfo, RelayrError> {
        let url = format!("{}/{media_id}", self.api_base);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&settings.access_token)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, self.timeout))?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| RelayrError::transport(format!("invalid media info response: {e}"), e))
    }

    /// Step two: download the media bytes from the resolved URL. The URL
    /// still requires the integration's bearer token.
    pub async fn download_media(
        &self,
        settings: &WhatsappSettings,
        url: &str,
    ) -> Result<Vec<u8>, RelayrError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&settings.access_token)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, self.timeout))?;
        let response = check_status(response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RelayrError::transport(format!("media download interrupted: {e}"), e))?;
        Ok(bytes.to_vec())
    }
}

/// Maps a transport-level reqwest failure into the retry taxonomy.
fn classify_reqwest_error(err: reqwest::Error, timeout: Duration) -> RelayrError {
    if err.is_timeout() {
        return RelayrError::Timeout { duration: timeout };
    }
    RelayrError::transport(format!("whatsapp api unreachable: {err}"), err)
}

/// Maps a non-success HTTP status into the retry taxonomy: 5xx and 429
/// retry, any other 4xx is a provider rejection.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RelayrError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(RelayrError::Transport {
            message: format!("whatsapp api returned {status}: {body}"),
            source: None,
        });
    }
    Err(RelayrError::Rejected {
        message: format!("whatsapp api rejected request ({status}): {body}"),
    })
}
