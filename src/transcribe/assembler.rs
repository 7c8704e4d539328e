use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::error::SessionError;
use crate::session::PartRecord;
use crate::transcribe::{SpeechToText, TranscribeError};

/// Turns ordered parts into one transcript.
///
/// Parts are transcribed strictly sequentially in index order, which makes
/// ordering a structural property and keeps per-session load on the STT
/// service at one outstanding call. The semaphore bounds outstanding calls
/// across all sessions.
pub struct Assembler {
    stt: Arc<dyn SpeechToText>,
    limiter: Arc<Semaphore>,
    language: Option<String>,
}

impl Assembler {
    pub fn new(stt: Arc<dyn SpeechToText>, max_concurrent: usize, language: Option<String>) -> Self {
        Self {
            stt,
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            language,
        }
    }

    /// Assemble the final transcript for a session.
    ///
    /// Non-empty per-part results are joined with a single space. When every
    /// part yields nothing, the result is a single-space placeholder: the
    /// session was processed, there was just nothing intelligible in it.
    pub async fn assemble(&self, parts: &[PartRecord]) -> Result<String, SessionError> {
        self.check_available().await?;

        let pieces = self.transcribe_in_order(parts).await?;
        let transcript = join_pieces(&pieces);

        if transcript.is_empty() {
            info!(parts = parts.len(), "assembly produced no text, returning placeholder");
            Ok(" ".to_string())
        } else {
            info!(parts = parts.len(), chars = transcript.len(), "transcript assembled");
            Ok(transcript)
        }
    }

    /// Best-effort preview join, without the placeholder rule.
    pub async fn preview(&self, parts: &[PartRecord]) -> Result<String, SessionError> {
        if parts.is_empty() {
            return Ok(String::new());
        }
        self.check_available().await?;

        let pieces = self.transcribe_in_order(parts).await?;
        Ok(join_pieces(&pieces))
    }

    async fn check_available(&self) -> Result<(), SessionError> {
        if self.stt.is_available().await {
            Ok(())
        } else {
            Err(SessionError::TranscriptionUnavailable(
                "speech-to-text backend is not configured".to_string(),
            ))
        }
    }

    async fn transcribe_in_order(
        &self,
        parts: &[PartRecord],
    ) -> Result<Vec<String>, SessionError> {
        let mut pieces = Vec::with_capacity(parts.len());

        for part in parts {
            let bytes = match tokio::fs::read(&part.path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(index = part.index, "failed to read part, skipping: {}", e);
                    pieces.push(String::new());
                    continue;
                }
            };

            let _permit = self.limiter.acquire().await.map_err(|_| {
                SessionError::TranscriptionUnavailable("transcription limiter closed".to_string())
            })?;

            match self
                .stt
                .transcribe(&bytes, part.encoding, self.language.as_deref())
                .await
            {
                Ok(text) => pieces.push(text.trim().to_string()),
                Err(TranscribeError::Unavailable(msg)) => {
                    return Err(SessionError::TranscriptionUnavailable(msg));
                }
                Err(e) => {
                    warn!(index = part.index, "part transcription failed, skipping: {}", e);
                    pieces.push(String::new());
                }
            }
        }

        Ok(pieces)
    }
}

fn join_pieces(pieces: &[String]) -> String {
    pieces
        .iter()
        .filter(|piece| !piece.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
}
