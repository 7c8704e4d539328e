// Shared doubles and builders for the integration tests.
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use scribe_dictation::{
    AllowAll, Assembler, AudioEncoding, EncodedChunk, OwnerId, PartSpool, SessionLimits,
    SessionStore, SpeechToText, TranscribeError,
};
use std::sync::Arc;
use tempfile::TempDir;

/// Speech-to-text double that echoes each part's bytes back as UTF-8 text.
/// Lets tests append marker payloads and read them out of the transcript.
pub struct EchoStt;

#[async_trait]
impl SpeechToText for EchoStt {
    async fn is_available(&self) -> bool {
        true
    }

    async fn transcribe(
        &self,
        audio: &[u8],
        _encoding: AudioEncoding,
        _language: Option<&str>,
    ) -> Result<String, TranscribeError> {
        Ok(String::from_utf8_lossy(audio).trim().to_string())
    }
}

/// Returns the same fixed word for every part.
pub struct FixedStt(pub &'static str);

#[async_trait]
impl SpeechToText for FixedStt {
    async fn is_available(&self) -> bool {
        true
    }

    async fn transcribe(
        &self,
        _audio: &[u8],
        _encoding: AudioEncoding,
        _language: Option<&str>,
    ) -> Result<String, TranscribeError> {
        Ok(self.0.to_string())
    }
}

/// Build a store over a fresh temp spool. The `TempDir` must be kept alive
/// for the duration of the test.
pub fn store_with(
    stt: Arc<dyn SpeechToText>,
    limits: SessionLimits,
) -> Result<(SessionStore, TempDir)> {
    let dir = TempDir::new()?;
    let store = SessionStore::new(
        PartSpool::new(dir.path()),
        limits,
        Arc::new(AllowAll),
        Assembler::new(stt, 2, None),
    );
    Ok((store, dir))
}

pub fn owner(name: &str) -> OwnerId {
    OwnerId::parse(name).expect("valid owner id")
}

/// A chunk whose payload is just the given text, so EchoStt round-trips it.
pub fn text_chunk(text: &str) -> EncodedChunk {
    EncodedChunk {
        bytes: text.as_bytes().to_vec(),
        encoding: AudioEncoding::Wav,
        duration_ms: 0,
        samples: 0,
    }
}
