use std::io;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::audio::AudioEncoding;
use crate::session::store::OwnerId;

/// Ephemeral on-disk storage for session parts.
///
/// Parts live under `<root>/<owner>/<session>/part-NNNNN.<ext>` and exist
/// only between the first append and finalize/cancel. Nothing here survives
/// a process restart by contract.
#[derive(Debug, Clone)]
pub struct PartSpool {
    root: PathBuf,
}

impl PartSpool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn session_dir(&self, owner: &OwnerId, session_id: &str) -> PathBuf {
        self.root.join(owner.as_str()).join(session_id)
    }

    /// Write one part's bytes. The caller holds the per-session lock, so
    /// index assignment and the write are a single serialized step.
    pub async fn write_part(
        &self,
        owner: &OwnerId,
        session_id: &str,
        index: u32,
        encoding: AudioEncoding,
        bytes: &[u8],
    ) -> io::Result<PathBuf> {
        let dir = self.session_dir(owner, session_id);
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(format!("part-{:05}.{}", index, encoding.extension()));
        tokio::fs::write(&path, bytes).await?;

        debug!(
            owner = %owner,
            session = session_id,
            index,
            len = bytes.len(),
            "part spooled"
        );

        Ok(path)
    }

    /// Delete all parts for a session. Deletion failures are logged and
    /// swallowed: the logical finalize/cancel has already succeeded and the
    /// caller must not see cleanup errors.
    pub async fn purge(&self, owner: &OwnerId, session_id: &str) {
        let dir = self.session_dir(owner, session_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => debug!(owner = %owner, session = session_id, "spool purged"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                owner = %owner,
                session = session_id,
                "failed to purge spool directory {}: {}",
                dir.display(),
                e
            ),
        }
    }
}
