// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST client for the Asterisk REST Interface (ARI).
//!
//! Covers the handful of operations the call pipeline needs: answering,
//! recording, originating, and stored-recording retrieval/cleanup. Basic
//! auth on every request; the base URL is configurable for tests.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use relayr_core::error::RelayrError;

/// Metadata of a stored recording.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredRecording {
    pub name: String,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OriginatedChannel {
    id: String,
}

/// ARI REST client.
#[derive(Debug, Clone)]
pub struct AriClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    app: String,
    timeout: Duration,
}

impl AriClient {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        app: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RelayrError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayrError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            app: app.into(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/ari{path}", self.base_url)
    }

    /// Answers a ringing channel.
    pub async fn answer(&self, channel_id: &str) -> Result<(), RelayrError> {
        let response = self
            .http
            .post(self.url(&format!("/channels/{channel_id}/answer")))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| classify(e, self.timeout))?;
        check_status(response).await?;
        debug!(channel_id = %channel_id, "channel answered");
        Ok(())
    }

    /// Starts recording a channel under `name` (wav, overwrite on clash).
    pub async fn record(&self, channel_id: &str, name: &str) -> Result<(), RelayrError> {
        let response = self
            .http
            .post(self.url(&format!("/channels/{channel_id}/record")))
            .basic_auth(&self.username, Some(&self.password))
            .query(&[
                ("name", name),
                ("format", "wav"),
                ("ifExists", "overwrite"),
            ])
            .send()
            .await
            .map_err(|e| classify(e, self.timeout))?;
        check_status(response).await?;
        debug!(channel_id = %channel_id, name = %name, "recording started");
        Ok(())
    }

    /// Originates an outbound call and returns the new channel id.
    ///
    /// The channel is placed into this client's Stasis app; `variables`
    /// become channel variables on the new channel.
    pub async fn originate(
        &self,
        endpoint: &str,
        caller_id: &str,
        variables: &BTreeMap<String, String>,
    ) -> Result<String, RelayrError> {
        let response = self
            .http
            .post(self.url("/channels"))
            .basic_auth(&self.username, Some(&self.password))
            .query(&[
                ("endpoint", endpoint),
                ("app", self.app.as_str()),
                ("callerId", caller_id),
            ])
            .json(&serde_json::json!({ "variables": variables }))
            .send()
            .await
            .map_err(|e| classify(e, self.timeout))?;
        let response = check_status(response).await?;
        let channel: OriginatedChannel = response
            .json()
            .await
            .map_err(|e| RelayrError::transport(format!("invalid originate response: {e}"), e))?;
        debug!(channel_id = %channel.id, endpoint = %endpoint, "call originated");
        Ok(channel.id)
    }

    /// Fetches stored-recording metadata.
    pub async fn stored_recording(&self, name: &str) -> Result<StoredRecording, RelayrError> {
        let response = self
            .http
            .get(self.url(&format!("/recordings/stored/{name}")))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| classify(e, self.timeout))?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| RelayrError::transport(format!("invalid recording response: {e}"), e))
    }

    /// Downloads the audio of a stored recording.
    pub async fn download_recording(&self, name: &str) -> Result<Vec<u8>, RelayrError> {
        let response = self
            .http
            .get(self.url(&format!("/recordings/stored/{name}/file")))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| classify(e, self.timeout))?;
        let response = check_status(response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RelayrError::transport(format!("recording download interrupted: {e}"), e))?;
        Ok(bytes.to_vec())
    }

    /// Deletes the provider-side copy of a stored recording.
    pub async fn delete_recording(&self, name: &str) -> Result<(), RelayrError> {
        let response = self
            .http
            .delete(self.url(&format!("/recordings/stored/{name}")))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| classify(e, self.timeout))?;
        check_status(response).await?;
        Ok(())
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> RelayrError {
    if err.is_timeout() {
        return RelayrError::Timeout { duration: timeout };
    }
    RelayrError::transport(format!("ari unreachable: {err}"), err)
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RelayrError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(RelayrError::Transport {
            message: format!("ari returned {status}: {body}"),
            source: None,
        });
    }
    Err(RelayrError::Rejected {
        message: format!("ari rejected request ({status}): {body}"),
    })
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{basic_auth, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn client(server: &MockServer) -> AriClient {
        AriClient::new(
            server.uri(),
            "asterisk",
            "asterisk",
            "relayr",
            Duration::from_secs(5),
        )
        .expect("client")
    }

    #[tokio::test]
    async fn originate_returns_channel_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ari/channels"))
            .and(basic_auth("asterisk", "asterisk"))
            .and(query_param("endpoint", "PJSIP/+2000"))
            .and(query_param("app", "relayr"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "ch-42" })),
            )
            .mount(&server)
            .await;

        let channel_id = client(&server)
            .await
            .originate("PJSIP/+2000", "+1000", &BTreeMap::new())
            .await
            .expect("originate");
        assert_eq!(channel_id, "ch-42");
    }

    #[tokio::test]
    async fn record_passes_overwrite_params() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ari/channels/ch-1/record"))
            .and(query_param("name", "call-c1"))
            .and(query_param("format", "wav"))
            .and(query_param("ifExists", "overwrite"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        client(&server)
            .await
            .record("ch-1", "call-c1")
            .await
            .expect("record");
    }

    #[tokio::test]
    async fn missing_recording_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .stored_recording("gone")
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server).await.answer("ch-1").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
