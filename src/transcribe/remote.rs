use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::audio::AudioEncoding;
use crate::config::TranscriptionConfig;
use crate::transcribe::{SpeechToText, TranscribeError};

/// OpenAI-compatible transcription API client (Whisper, Voxtral,
/// open-asr-server, etc.).
///
/// POSTs multipart `file` + `model` to the configured endpoint, which must
/// be the full URL, e.g. `http://localhost:8000/v1/audio/transcriptions`.
pub struct RemoteStt {
    client: reqwest::Client,
    config: TranscriptionConfig,
}

impl RemoteStt {
    pub fn new(config: TranscriptionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build transcription HTTP client")?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl SpeechToText for RemoteStt {
    async fn is_available(&self) -> bool {
        !self.config.endpoint.trim().is_empty()
    }

    async fn transcribe(
        &self,
        audio: &[u8],
        encoding: AudioEncoding,
        language: Option<&str>,
    ) -> Result<String, TranscribeError> {
        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name(format!("part.{}", encoding.extension()))
            .mime_str(encoding.mime_type())
            .map_err(|e| TranscribeError::InvalidAudio(e.to_string()))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.config.model.clone());
        if let Some(language) = language {
            form = form.text("language", language.to_string());
        }

        let mut request = self
            .client
            .post(self.config.endpoint.trim())
            .multipart(form);
        if let Some(key) = self.config.api_key.as_deref() {
            if !key.trim().is_empty() {
                request = request.bearer_auth(key.trim());
            }
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TranscribeError::Timeout
            } else {
                TranscribeError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TranscribeError::RateLimited);
        }
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::InvalidAudio(format!("{status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::Unavailable(format!("{status}: {body}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TranscribeError::InvalidAudio(e.to_string()))?;

        Ok(json
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string())
    }
}
