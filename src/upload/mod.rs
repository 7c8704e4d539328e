//! Chunk delivery transports
//!
//! The [`ChunkSink`] trait is the seam between the client-side capture
//! pipeline and the session service; `LocalSink` runs in-process, `HttpSink`
//! speaks the service's REST surface.

mod http;
mod local;
mod sink;

pub use http::HttpSink;
pub use local::LocalSink;
pub use sink::{ChunkSink, SinkError};
