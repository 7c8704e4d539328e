//! Server-side session registry and part storage
//!
//! This module provides the ordered session store at the heart of the
//! service: server-assigned gap-free part indices, per-session
//! serialization, capacity bounds, and ephemeral spooling that is purged
//! the moment a session reaches a terminal state.

pub mod spool;
pub mod store;

pub use spool::PartSpool;
pub use store::{OwnerId, PartRecord, SessionLimits, SessionStatus, SessionStore};
