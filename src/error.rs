use thiserror::Error;

/// Server-side error taxonomy for dictation session operations.
///
/// Every variant maps to a distinct, actionable failure the caller can react
/// to: validation problems end a single append, capacity ends the recording,
/// storage failures are retryable, and transcription unavailability fails the
/// whole finalize without fabricating a transcript.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Unsupported content type, oversized or empty part, malformed identifier.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The session already holds the maximum number of parts.
    #[error("part capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// The owner is not entitled to start dictation sessions.
    #[error("owner is not entitled to dictation")]
    EntitlementDenied,

    /// The transcription capability is unreachable or misconfigured.
    #[error("transcription unavailable: {0}")]
    TranscriptionUnavailable(String),

    /// Transient spool write failure; the append may be retried.
    #[error("storage failure: {0}")]
    Storage(#[source] std::io::Error),

    /// Unknown, finalized, or cancelled session, or a session owned by
    /// someone else.
    #[error("session not found")]
    NotFound,

    /// A session with the requested id already exists for this owner.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl SessionError {
    /// Whether the caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Storage(_))
    }

    /// Stable wire identifier for the error kind, carried in HTTP error
    /// bodies so remote callers can recover the typed variant.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Validation(_) => "validation",
            SessionError::CapacityExceeded(_) => "capacity_exceeded",
            SessionError::EntitlementDenied => "entitlement_denied",
            SessionError::TranscriptionUnavailable(_) => "transcription_unavailable",
            SessionError::Storage(_) => "storage",
            SessionError::NotFound => "not_found",
            SessionError::Conflict(_) => "conflict",
        }
    }

    /// Rebuild an error from its wire kind and message. Used by the HTTP
    /// chunk sink to map `{error, kind}` bodies back into the taxonomy.
    pub fn from_kind(kind: &str, message: &str) -> Option<Self> {
        match kind {
            "validation" => Some(SessionError::Validation(message.to_string())),
            "capacity_exceeded" => Some(SessionError::CapacityExceeded(message.to_string())),
            "entitlement_denied" => Some(SessionError::EntitlementDenied),
            "transcription_unavailable" => {
                Some(SessionError::TranscriptionUnavailable(message.to_string()))
            }
            "storage" => Some(SessionError::Storage(std::io::Error::new(
                std::io::ErrorKind::Other,
                message.to_string(),
            ))),
            "not_found" => Some(SessionError::NotFound),
            "conflict" => Some(SessionError::Conflict(message.to_string())),
            _ => None,
        }
    }
}
