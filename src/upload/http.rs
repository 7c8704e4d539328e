use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::audio::AudioEncoding;
use crate::error::SessionError;
use crate::upload::sink::{ChunkSink, SinkError};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_FINALIZE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Chunk sink speaking the session service's HTTP surface.
///
/// Error bodies carry `{error, kind}`; the kind is mapped back into
/// [`SessionError`] so remote rejections look exactly like local ones to the
/// sequencer.
///
/// Timeouts are per request, not per client: finalize blocks while the server
/// transcribes every part sequentially, so its duration scales with part
/// count and gets a much larger budget than the single-part calls. A finalize
/// that times out client-side still purges the session server-side, and the
/// transcript would be gone.
pub struct HttpSink {
    client: reqwest::Client,
    base_url: String,
    owner: String,
    request_timeout: Duration,
    finalize_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    kind: String,
}

#[derive(Debug, Deserialize)]
struct StartSessionWire {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct AppendWire {
    accepted_index: u32,
}

#[derive(Debug, Deserialize)]
struct PartialWire {
    preview_text: String,
}

#[derive(Debug, Deserialize)]
struct FinalizeWire {
    transcript: String,
}

impl HttpSink {
    pub fn new(base_url: impl Into<String>, owner: impl Into<String>) -> Result<Self> {
        Self::with_timeouts(
            base_url,
            owner,
            DEFAULT_REQUEST_TIMEOUT,
            DEFAULT_FINALIZE_TIMEOUT,
        )
    }

    pub fn with_timeouts(
        base_url: impl Into<String>,
        owner: impl Into<String>,
        request_timeout: Duration,
        finalize_timeout: Duration,
    ) -> Result<Self> {
        // No client-wide timeout; every request carries its own.
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP sink client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            owner: owner.into(),
            request_timeout,
            finalize_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn transport(e: reqwest::Error) -> SinkError {
        if e.is_timeout() {
            SinkError::Timeout
        } else {
            SinkError::Transport(e.to_string())
        }
    }

    async fn error_from(response: reqwest::Response) -> SinkError {
        let status = response.status();
        match response.json::<WireError>().await {
            Ok(body) => match SessionError::from_kind(&body.kind, &body.error) {
                Some(err) => SinkError::Rejected(err),
                None => SinkError::Transport(format!("{status}: {}", body.error)),
            },
            Err(_) => SinkError::Transport(format!("unexpected status {status}")),
        }
    }
}

#[async_trait]
impl ChunkSink for HttpSink {
    async fn start_session(&self, requested_id: Option<&str>) -> Result<String, SinkError> {
        let response = self
            .client
            .post(self.url("/sessions"))
            .timeout(self.request_timeout)
            .header("x-owner-id", &self.owner)
            .json(&serde_json::json!({ "session_id": requested_id }))
            .send()
            .await
            .map_err(Self::transport)?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        let wire: StartSessionWire = response.json().await.map_err(Self::transport)?;
        Ok(wire.session_id)
    }

    async fn append(
        &self,
        session_id: &str,
        bytes: Vec<u8>,
        encoding: AudioEncoding,
    ) -> Result<u32, SinkError> {
        let response = self
            .client
            .post(self.url(&format!("/sessions/{session_id}/parts")))
            .timeout(self.request_timeout)
            .header("x-owner-id", &self.owner)
            .header(reqwest::header::CONTENT_TYPE, encoding.mime_type())
            .body(bytes)
            .send()
            .await
            .map_err(Self::transport)?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        let wire: AppendWire = response.json().await.map_err(Self::transport)?;
        Ok(wire.accepted_index)
    }

    async fn partial(&self, session_id: &str, n: u32) -> Result<String, SinkError> {
        let response = self
            .client
            .get(self.url(&format!("/sessions/{session_id}/partial")))
            .timeout(self.request_timeout)
            .query(&[("n", n)])
            .header("x-owner-id", &self.owner)
            .send()
            .await
            .map_err(Self::transport)?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        let wire: PartialWire = response.json().await.map_err(Self::transport)?;
        Ok(wire.preview_text)
    }

    async fn finalize(&self, session_id: &str) -> Result<String, SinkError> {
        let response = self
            .client
            .post(self.url(&format!("/sessions/{session_id}/finalize")))
            .timeout(self.finalize_timeout)
            .header("x-owner-id", &self.owner)
            .send()
            .await
            .map_err(Self::transport)?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        let wire: FinalizeWire = response.json().await.map_err(Self::transport)?;
        Ok(wire.transcript)
    }

    async fn cancel(&self, session_id: &str) -> Result<(), SinkError> {
        let response = self
            .client
            .post(self.url(&format!("/sessions/{session_id}/cancel")))
            .timeout(self.request_timeout)
            .header("x-owner-id", &self.owner)
            .send()
            .await
            .map_err(Self::transport)?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(())
    }
}
