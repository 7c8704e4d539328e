//! Speech-to-text boundary and transcript assembly
//!
//! The STT engine itself is a black box behind the [`SpeechToText`] trait.
//! Per-part failures (`RateLimited`, `Timeout`, `InvalidAudio`) contribute
//! empty strings to the assembled transcript; `Unavailable` fails the whole
//! finalize attempt.

mod assembler;
mod remote;

pub use assembler::Assembler;
pub use remote::RemoteStt;

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::AudioEncoding;

/// Failures of a single transcription call.
#[derive(Error, Debug)]
pub enum TranscribeError {
    /// The service throttled this call; the part is skipped.
    #[error("transcription rate limited")]
    RateLimited,

    /// The call did not complete within the request timeout.
    #[error("transcription request timed out")]
    Timeout,

    /// The service rejected the audio payload.
    #[error("audio rejected by transcription service: {0}")]
    InvalidAudio(String),

    /// The capability is categorically unreachable; fatal for the whole
    /// finalize attempt, not just this part.
    #[error("transcription capability unavailable: {0}")]
    Unavailable(String),
}

/// Speech-to-text capability (external collaborator).
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Whether the capability is configured and worth calling at all.
    /// A `false` answer short-circuits finalize before any per-part call.
    async fn is_available(&self) -> bool;

    /// Transcribe one audio part.
    async fn transcribe(
        &self,
        audio: &[u8],
        encoding: AudioEncoding,
        language: Option<&str>,
    ) -> Result<String, TranscribeError>;
}
