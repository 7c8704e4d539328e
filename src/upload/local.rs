use async_trait::async_trait;

use crate::audio::AudioEncoding;
use crate::session::{OwnerId, SessionStore};
use crate::upload::sink::{ChunkSink, SinkError};

/// In-process chunk sink over a [`SessionStore`] handle.
///
/// Used by tests, the offline demo, and any deployment that embeds capture
/// and store in one process.
pub struct LocalSink {
    store: SessionStore,
    owner: OwnerId,
}

impl LocalSink {
    pub fn new(store: SessionStore, owner: OwnerId) -> Self {
        Self { store, owner }
    }
}

#[async_trait]
impl ChunkSink for LocalSink {
    async fn start_session(&self, requested_id: Option<&str>) -> Result<String, SinkError> {
        self.store
            .start_session(&self.owner, requested_id.map(str::to_string))
            .await
            .map_err(SinkError::Rejected)
    }

    async fn append(
        &self,
        session_id: &str,
        bytes: Vec<u8>,
        encoding: AudioEncoding,
    ) -> Result<u32, SinkError> {
        self.store
            .append(&self.owner, session_id, bytes, encoding)
            .await
            .map_err(SinkError::Rejected)
    }

    async fn partial(&self, session_id: &str, n: u32) -> Result<String, SinkError> {
        self.store
            .partial(&self.owner, session_id, n)
            .await
            .map_err(SinkError::Rejected)
    }

    async fn finalize(&self, session_id: &str) -> Result<String, SinkError> {
        self.store
            .finalize(&self.owner, session_id)
            .await
            .map_err(SinkError::Rejected)
    }

    async fn cancel(&self, session_id: &str) -> Result<(), SinkError> {
        self.store
            .cancel(&self.owner, session_id)
            .await
            .map_err(SinkError::Rejected)
    }
}
