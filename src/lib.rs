pub mod audio;
pub mod capture;
pub mod config;
pub mod entitlement;
pub mod error;
pub mod http;
pub mod session;
pub mod transcribe;
pub mod upload;

pub use audio::{
    AudioEncoding, AudioFrame, AudioInput, AudioInputFactory, ChunkBuffer, EncodedChunk,
    InputConfig, InputSource, SyntheticInput,
};
pub use capture::{
    CaptureConfig, CaptureController, CaptureError, CaptureState, CaptureStatus, SequencerConfig,
    UploadSequencer,
};
pub use config::Config;
pub use entitlement::{AllowAll, Entitlement};
pub use error::SessionError;
pub use http::{create_router, AppState};
pub use session::{OwnerId, PartRecord, PartSpool, SessionLimits, SessionStatus, SessionStore};
pub use transcribe::{Assembler, RemoteStt, SpeechToText, TranscribeError};
pub use upload::{ChunkSink, HttpSink, LocalSink, SinkError};
