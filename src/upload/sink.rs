use async_trait::async_trait;
use thiserror::Error;

use crate::audio::AudioEncoding;
use crate::error::SessionError;

/// Client-side delivery failure for one sink call.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The server rejected the request with a typed session error.
    #[error("server rejected the request: {0}")]
    Rejected(#[from] SessionError),

    /// The request never produced a server answer.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The delivery did not settle within its timeout.
    #[error("delivery timed out")]
    Timeout,
}

/// Transport seam between the capture client and the session service.
///
/// The upload sequencer only ever talks to this trait, so the capture
/// pipeline runs unchanged against the in-process store ([`LocalSink`]) or a
/// remote service ([`HttpSink`]).
///
/// [`LocalSink`]: crate::upload::LocalSink
/// [`HttpSink`]: crate::upload::HttpSink
#[async_trait]
pub trait ChunkSink: Send + Sync {
    /// Start a session and return its id.
    async fn start_session(&self, requested_id: Option<&str>) -> Result<String, SinkError>;

    /// Append one chunk; returns the server-assigned part index.
    async fn append(
        &self,
        session_id: &str,
        bytes: Vec<u8>,
        encoding: AudioEncoding,
    ) -> Result<u32, SinkError>;

    /// Best-effort preview of the last `n` parts.
    async fn partial(&self, session_id: &str, n: u32) -> Result<String, SinkError>;

    /// Assemble and return the transcript, purging the session.
    async fn finalize(&self, session_id: &str) -> Result<String, SinkError>;

    /// Discard the session without transcribing.
    async fn cancel(&self, session_id: &str) -> Result<(), SinkError>;
}
