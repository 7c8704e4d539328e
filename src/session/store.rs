use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::audio::AudioEncoding;
use crate::entitlement::Entitlement;
use crate::error::SessionError;
use crate::session::spool::PartSpool;
use crate::transcribe::Assembler;

/// Validated owner identifier.
///
/// Owner ids name spool directories, so path separators and traversal
/// sequences are rejected at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SessionError::Validation("owner id is empty".to_string()));
        }
        if raw.len() > 128 {
            return Err(SessionError::Validation(
                "owner id exceeds 128 characters".to_string(),
            ));
        }
        if raw.contains(['/', '\\']) || raw.contains("..") {
            return Err(SessionError::Validation(format!(
                "owner id {raw:?} contains path characters"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Recording,
    Finalizing,
    Completed,
    Aborted,
}

/// One stored audio part. The index is server-assigned under the per-session
/// lock and never taken from the client.
#[derive(Debug, Clone)]
pub struct PartRecord {
    pub index: u32,
    pub path: PathBuf,
    pub encoding: AudioEncoding,
    pub len: u64,
    pub stored_at: DateTime<Utc>,
}

/// Capacity bounds enforced at append time.
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub max_parts: u32,
    pub max_part_bytes: u64,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            // 360 ten-second parts cover the 60 minute session ceiling
            max_parts: 360,
            max_part_bytes: 4 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SessionKey {
    owner: OwnerId,
    session_id: String,
}

struct SessionState {
    status: SessionStatus,
    created_at: DateTime<Utc>,
    parts: Vec<PartRecord>,
    next_index: u32,
}

/// One registered session. All mutable state sits behind the entry mutex,
/// which is the per-session serialization point for index assignment.
struct SessionEntry {
    state: Mutex<SessionState>,
}

struct StoreInner {
    sessions: RwLock<HashMap<SessionKey, Arc<SessionEntry>>>,
    spool: PartSpool,
    limits: SessionLimits,
    entitlement: Arc<dyn Entitlement>,
    assembler: Assembler,
}

/// Registry of active dictation sessions, keyed by `(owner, session id)`.
///
/// Sessions are independent: concurrent operations on different sessions
/// share only the brief registry read/write locks. Within one session,
/// appends serialize on the entry mutex so retried or out-of-order delivery
/// cannot produce duplicate or gapped indices.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    pub fn new(
        spool: PartSpool,
        limits: SessionLimits,
        entitlement: Arc<dyn Entitlement>,
        assembler: Assembler,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                sessions: RwLock::new(HashMap::new()),
                spool,
                limits,
                entitlement,
                assembler,
            }),
        }
    }

    /// Register a new session for `owner`, after the entitlement gate.
    ///
    /// A denied owner gets `EntitlementDenied` before any state is
    /// allocated. A caller-supplied id must be unique per owner.
    pub async fn start_session(
        &self,
        owner: &OwnerId,
        requested_id: Option<String>,
    ) -> Result<String, SessionError> {
        if !self.inner.entitlement.can_use(owner).await {
            return Err(SessionError::EntitlementDenied);
        }

        let session_id = match requested_id {
            Some(raw) => validate_session_id(&raw)?,
            None => format!("sess-{}", uuid::Uuid::new_v4()),
        };

        let key = SessionKey {
            owner: owner.clone(),
            session_id: session_id.clone(),
        };

        let mut sessions = self.inner.sessions.write().await;
        if sessions.contains_key(&key) {
            return Err(SessionError::Conflict(format!(
                "session {session_id} already exists"
            )));
        }
        sessions.insert(
            key,
            Arc::new(SessionEntry {
                state: Mutex::new(SessionState {
                    status: SessionStatus::Recording,
                    created_at: Utc::now(),
                    parts: Vec::new(),
                    next_index: 0,
                }),
            }),
        );
        drop(sessions);

        info!(owner = %owner, session = %session_id, "session started");
        Ok(session_id)
    }

    /// Append one part. The next index is assigned and the bytes spooled
    /// under the entry lock; a failed spool write leaves no gap because the
    /// index is only consumed after the write succeeds.
    pub async fn append(
        &self,
        owner: &OwnerId,
        session_id: &str,
        bytes: Vec<u8>,
        encoding: AudioEncoding,
    ) -> Result<u32, SessionError> {
        if bytes.is_empty() {
            return Err(SessionError::Validation("empty part payload".to_string()));
        }
        if bytes.len() as u64 > self.inner.limits.max_part_bytes {
            return Err(SessionError::Validation(format!(
                "part of {} bytes exceeds the {} byte limit",
                bytes.len(),
                self.inner.limits.max_part_bytes
            )));
        }

        let entry = self.entry(owner, session_id).await?;
        let mut state = entry.state.lock().await;

        if state.status != SessionStatus::Recording {
            return Err(SessionError::NotFound);
        }
        if state.parts.len() as u32 >= self.inner.limits.max_parts {
            return Err(SessionError::CapacityExceeded(format!(
                "session already holds {} parts",
                self.inner.limits.max_parts
            )));
        }

        let index = state.next_index;
        let len = bytes.len() as u64;
        let path = self
            .inner
            .spool
            .write_part(owner, session_id, index, encoding, &bytes)
            .await
            .map_err(SessionError::Storage)?;

        state.next_index += 1;
        state.parts.push(PartRecord {
            index,
            path,
            encoding,
            len,
            stored_at: Utc::now(),
        });

        debug!(owner = %owner, session = session_id, index, len, "part accepted");
        Ok(index)
    }

    /// Best-effort preview of the most recent parts. `n` is clamped to
    /// 1..=3; session state is not altered. Returns an empty string when no
    /// parts exist yet.
    pub async fn partial(
        &self,
        owner: &OwnerId,
        session_id: &str,
        n: u32,
    ) -> Result<String, SessionError> {
        let entry = self.entry(owner, session_id).await?;

        let snapshot = {
            let state = entry.state.lock().await;
            if state.status != SessionStatus::Recording {
                return Err(SessionError::NotFound);
            }
            if state.parts.is_empty() {
                return Ok(String::new());
            }
            let n = n.clamp(1, 3) as usize;
            let start = state.parts.len().saturating_sub(n);
            state.parts[start..].to_vec()
        };

        // Transcription happens outside the lock so appends keep flowing.
        self.inner.assembler.preview(&snapshot).await
    }

    /// Transcribe all parts in index order, concatenate, purge the session,
    /// and return the transcript.
    ///
    /// The session is purged whether assembly succeeds or fails, so a second
    /// finalize on the same id is `NotFound` and no duplicate transcript can
    /// ever be produced. Assembly runs on a spawned task so a disconnecting
    /// caller cannot cancel cleanup mid-flight.
    pub async fn finalize(
        &self,
        owner: &OwnerId,
        session_id: &str,
    ) -> Result<String, SessionError> {
        let entry = self.entry(owner, session_id).await?;

        let (parts, created_at) = {
            let mut state = entry.state.lock().await;
            if state.status != SessionStatus::Recording {
                return Err(SessionError::NotFound);
            }
            state.status = SessionStatus::Finalizing;
            (state.parts.clone(), state.created_at)
        };

        info!(
            owner = %owner,
            session = session_id,
            parts = parts.len(),
            elapsed_secs = (Utc::now() - created_at).num_seconds(),
            "finalizing session"
        );

        let store = self.clone();
        let owner = owner.clone();
        let session_id = session_id.to_string();
        let task = tokio::spawn(async move {
            let result = store.inner.assembler.assemble(&parts).await;
            let final_status = match result {
                Ok(_) => SessionStatus::Completed,
                Err(_) => SessionStatus::Aborted,
            };
            store.remove_and_purge(&owner, &session_id, final_status).await;
            result
        });

        match task.await {
            Ok(result) => result,
            Err(e) => Err(SessionError::Storage(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("assembly task failed: {e}"),
            ))),
        }
    }

    /// Discard the session and all its parts without transcribing anything.
    pub async fn cancel(&self, owner: &OwnerId, session_id: &str) -> Result<(), SessionError> {
        let key = SessionKey {
            owner: owner.clone(),
            session_id: session_id.to_string(),
        };
        let removed = self.inner.sessions.write().await.remove(&key);
        let Some(entry) = removed else {
            return Err(SessionError::NotFound);
        };

        {
            let mut state = entry.state.lock().await;
            state.status = SessionStatus::Aborted;
            state.parts.clear();
        }
        self.inner.spool.purge(owner, session_id).await;

        info!(owner = %owner, session = session_id, "session cancelled");
        Ok(())
    }

    async fn entry(
        &self,
        owner: &OwnerId,
        session_id: &str,
    ) -> Result<Arc<SessionEntry>, SessionError> {
        let key = SessionKey {
            owner: owner.clone(),
            session_id: session_id.to_string(),
        };
        let sessions = self.inner.sessions.read().await;
        sessions.get(&key).cloned().ok_or(SessionError::NotFound)
    }

    async fn remove_and_purge(
        &self,
        owner: &OwnerId,
        session_id: &str,
        final_status: SessionStatus,
    ) {
        let key = SessionKey {
            owner: owner.clone(),
            session_id: session_id.to_string(),
        };
        let removed = self.inner.sessions.write().await.remove(&key);
        match removed {
            Some(entry) => {
                let mut state = entry.state.lock().await;
                state.status = final_status;
                state.parts.clear();
            }
            // A concurrent cancel already took the entry; its purge ran too.
            None => warn!(
                owner = %owner,
                session = session_id,
                "session entry removed while finalizing"
            ),
        }
        self.inner.spool.purge(owner, session_id).await;
    }
}

fn validate_session_id(raw: &str) -> Result<String, SessionError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(SessionError::Validation("session id is empty".to_string()));
    }
    if raw.len() > 128 {
        return Err(SessionError::Validation(
            "session id exceeds 128 characters".to_string(),
        ));
    }
    if raw.contains(['/', '\\']) || raw.contains("..") {
        return Err(SessionError::Validation(format!(
            "session id {raw:?} contains path characters"
        )));
    }
    Ok(raw.to_string())
}
