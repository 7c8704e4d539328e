//! HTTP API server for dictation clients
//!
//! This module provides the REST surface for the session pipeline:
//! - POST /sessions - start a new session
//! - POST /sessions/:session_id/parts - append one audio part
//! - GET /sessions/:session_id/partial - preview the last few parts
//! - POST /sessions/:session_id/finalize - assemble transcript and purge
//! - POST /sessions/:session_id/cancel - discard the session
//! - GET /health - health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
