use super::state::AppState;
use crate::audio::AudioEncoding;
use crate::error::SessionError;
use crate::session::OwnerId;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Optional session ID (if not provided, the server generates one)
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct AppendPartResponse {
    pub accepted_index: u32,
}

#[derive(Debug, Deserialize)]
pub struct PartialParams {
    /// How many trailing parts to preview (clamped to 1..=3)
    pub n: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PartialResponse {
    pub preview_text: String,
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub transcript: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// Every handler shares one error mapping because the taxonomy already
/// carries the actionable distinction; the `kind` field lets remote callers
/// recover the typed variant.
impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match &self {
            SessionError::Validation(_) => StatusCode::BAD_REQUEST,
            SessionError::EntitlementDenied => StatusCode::FORBIDDEN,
            SessionError::NotFound => StatusCode::NOT_FOUND,
            SessionError::CapacityExceeded(_) | SessionError::Conflict(_) => StatusCode::CONFLICT,
            SessionError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            SessionError::TranscriptionUnavailable(_) => StatusCode::BAD_GATEWAY,
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                kind: self.kind().to_string(),
            }),
        )
            .into_response()
    }
}

/// Owner identity arrives as a trusted header injected by the upstream
/// auth proxy; this service only validates its shape.
fn owner_from_headers(headers: &HeaderMap) -> Result<OwnerId, SessionError> {
    let raw = headers
        .get("x-owner-id")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| SessionError::Validation("missing x-owner-id header".to_string()))?;
    OwnerId::parse(raw)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions
/// Start a new dictation session
pub async fn start_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Option<Json<StartSessionRequest>>,
) -> Result<(StatusCode, Json<StartSessionResponse>), SessionError> {
    let owner = owner_from_headers(&headers)?;
    let requested_id = request.and_then(|Json(request)| request.session_id);

    let session_id = state.store.start_session(&owner, requested_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(StartSessionResponse {
            session_id,
            status: "recording".to_string(),
        }),
    ))
}

/// POST /sessions/:session_id/parts
/// Append one audio part (raw body, encoding from Content-Type)
pub async fn append_part(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AppendPartResponse>, SessionError> {
    let owner = owner_from_headers(&headers)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    let encoding = AudioEncoding::from_mime(content_type).ok_or_else(|| {
        SessionError::Validation(format!("unsupported content type {content_type:?}"))
    })?;

    let accepted_index = state
        .store
        .append(&owner, &session_id, body.to_vec(), encoding)
        .await?;

    Ok(Json(AppendPartResponse { accepted_index }))
}

/// GET /sessions/:session_id/partial?n=
/// Best-effort preview of the last n parts
pub async fn partial_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(params): Query<PartialParams>,
    headers: HeaderMap,
) -> Result<Json<PartialResponse>, SessionError> {
    let owner = owner_from_headers(&headers)?;

    let preview_text = state
        .store
        .partial(&owner, &session_id, params.n.unwrap_or(1))
        .await?;

    Ok(Json(PartialResponse { preview_text }))
}

/// POST /sessions/:session_id/finalize
/// Assemble the transcript and purge the session
pub async fn finalize_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<FinalizeResponse>, SessionError> {
    let owner = owner_from_headers(&headers)?;

    let transcript = state.store.finalize(&owner, &session_id).await?;
    info!(owner = %owner, session = %session_id, "finalize served");

    Ok(Json(FinalizeResponse { transcript }))
}

/// POST /sessions/:session_id/cancel
/// Discard the session and all stored parts
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<CancelResponse>, SessionError> {
    let owner = owner_from_headers(&headers)?;

    state.store.cancel(&owner, &session_id).await?;

    Ok(Json(CancelResponse { ok: true }))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
