// Integration tests for transcript assembly: per-part failure tolerance,
// the placeholder rule, double-finalize semantics, and preview behavior.

mod common;

use anyhow::Result;
use async_trait::async_trait;
use common::{owner, store_with, EchoStt};
use scribe_dictation::{
    AudioEncoding, SessionError, SessionLimits, SpeechToText, TranscribeError,
};
use std::sync::Arc;

/// Echoes payloads, except for marker payloads that fail with a specific
/// per-part error.
struct SelectiveStt;

#[async_trait]
impl SpeechToText for SelectiveStt {
    async fn is_available(&self) -> bool {
        true
    }

    async fn transcribe(
        &self,
        audio: &[u8],
        _encoding: AudioEncoding,
        _language: Option<&str>,
    ) -> Result<String, TranscribeError> {
        match audio {
            b"TIMEOUT" => Err(TranscribeError::Timeout),
            b"RATE" => Err(TranscribeError::RateLimited),
            b"GARBLED" => Err(TranscribeError::InvalidAudio("unintelligible".to_string())),
            _ => Ok(String::from_utf8_lossy(audio).trim().to_string()),
        }
    }
}

/// Reports itself unconfigured.
struct UnconfiguredStt;

#[async_trait]
impl SpeechToText for UnconfiguredStt {
    async fn is_available(&self) -> bool {
        false
    }

    async fn transcribe(
        &self,
        _audio: &[u8],
        _encoding: AudioEncoding,
        _language: Option<&str>,
    ) -> Result<String, TranscribeError> {
        panic!("transcribe must not be called when unavailable");
    }
}

/// Available on probe, but every call finds the service down.
struct DownStt;

#[async_trait]
impl SpeechToText for DownStt {
    async fn is_available(&self) -> bool {
        true
    }

    async fn transcribe(
        &self,
        _audio: &[u8],
        _encoding: AudioEncoding,
        _language: Option<&str>,
    ) -> Result<String, TranscribeError> {
        Err(TranscribeError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_zero_part_finalize_returns_placeholder() -> Result<()> {
    let (store, _spool) = store_with(Arc::new(EchoStt), SessionLimits::default())?;
    let owner = owner("alice");
    let session_id = store.start_session(&owner, None).await?;

    // Processed-but-empty is a single space, never an empty string.
    let transcript = store.finalize(&owner, &session_id).await?;
    assert_eq!(transcript, " ");

    Ok(())
}

#[tokio::test]
async fn test_failed_part_contributes_empty_string() -> Result<()> {
    let (store, _spool) = store_with(Arc::new(SelectiveStt), SessionLimits::default())?;
    let owner = owner("alice");
    let session_id = store.start_session(&owner, None).await?;

    for payload in [&b"A"[..], b"TIMEOUT", b"C"] {
        store
            .append(&owner, &session_id, payload.to_vec(), AudioEncoding::Wav)
            .await?;
    }

    // One space between surviving parts, no double-space gap artifact.
    let transcript = store.finalize(&owner, &session_id).await?;
    assert_eq!(transcript, "A C");

    Ok(())
}

#[tokio::test]
async fn test_rate_limited_and_garbled_parts_are_skipped() -> Result<()> {
    let (store, _spool) = store_with(Arc::new(SelectiveStt), SessionLimits::default())?;
    let owner = owner("alice");
    let session_id = store.start_session(&owner, None).await?;

    for payload in [&b"start"[..], b"RATE", b"GARBLED", b"end"] {
        store
            .append(&owner, &session_id, payload.to_vec(), AudioEncoding::Wav)
            .await?;
    }

    let transcript = store.finalize(&owner, &session_id).await?;
    assert_eq!(transcript, "start end");

    Ok(())
}

#[tokio::test]
async fn test_all_parts_failing_returns_placeholder() -> Result<()> {
    let (store, _spool) = store_with(Arc::new(SelectiveStt), SessionLimits::default())?;
    let owner = owner("alice");
    let session_id = store.start_session(&owner, None).await?;

    for payload in [&b"TIMEOUT"[..], b"GARBLED"] {
        store
            .append(&owner, &session_id, payload.to_vec(), AudioEncoding::Wav)
            .await?;
    }

    let transcript = store.finalize(&owner, &session_id).await?;
    assert_eq!(transcript, " ");

    Ok(())
}

#[tokio::test]
async fn test_double_finalize_is_not_found() -> Result<()> {
    let (store, _spool) = store_with(Arc::new(EchoStt), SessionLimits::default())?;
    let owner = owner("alice");
    let session_id = store.start_session(&owner, None).await?;

    store
        .append(&owner, &session_id, b"hello".to_vec(), AudioEncoding::Wav)
        .await?;

    let transcript = store.finalize(&owner, &session_id).await?;
    assert_eq!(transcript, "hello");

    // No duplicate work, no duplicate transcript.
    assert!(matches!(
        store.finalize(&owner, &session_id).await,
        Err(SessionError::NotFound)
    ));

    Ok(())
}

#[tokio::test]
async fn test_unconfigured_capability_fails_finalize_entirely() -> Result<()> {
    let (store, spool) = store_with(Arc::new(UnconfiguredStt), SessionLimits::default())?;
    let owner = owner("alice");
    let session_id = store.start_session(&owner, None).await?;

    store
        .append(&owner, &session_id, b"hello".to_vec(), AudioEncoding::Wav)
        .await?;

    let err = store.finalize(&owner, &session_id).await.unwrap_err();
    assert!(matches!(err, SessionError::TranscriptionUnavailable(_)));

    // The session was still purged: no lingering half-dead state.
    assert!(matches!(
        store.finalize(&owner, &session_id).await,
        Err(SessionError::NotFound)
    ));
    assert!(!spool.path().join("alice").join(&session_id).exists());

    Ok(())
}

#[tokio::test]
async fn test_mid_assembly_unavailability_fails_finalize() -> Result<()> {
    let (store, _spool) = store_with(Arc::new(DownStt), SessionLimits::default())?;
    let owner = owner("alice");
    let session_id = store.start_session(&owner, None).await?;

    store
        .append(&owner, &session_id, b"hello".to_vec(), AudioEncoding::Wav)
        .await?;

    let err = store.finalize(&owner, &session_id).await.unwrap_err();
    assert!(matches!(err, SessionError::TranscriptionUnavailable(_)));

    Ok(())
}

#[tokio::test]
async fn test_partial_previews_most_recent_parts() -> Result<()> {
    let (store, _spool) = store_with(Arc::new(EchoStt), SessionLimits::default())?;
    let owner = owner("alice");
    let session_id = store.start_session(&owner, None).await?;

    // No parts yet: empty preview, not an error.
    assert_eq!(store.partial(&owner, &session_id, 2).await?, "");

    for text in ["one", "two", "three", "four"] {
        store
            .append(&owner, &session_id, text.as_bytes().to_vec(), AudioEncoding::Wav)
            .await?;
    }

    assert_eq!(store.partial(&owner, &session_id, 2).await?, "three four");
    // n is clamped to 1..=3.
    assert_eq!(store.partial(&owner, &session_id, 0).await?, "four");
    assert_eq!(store.partial(&owner, &session_id, 99).await?, "two three four");

    // Preview does not alter session state.
    let transcript = store.finalize(&owner, &session_id).await?;
    assert_eq!(transcript, "one two three four");

    Ok(())
}
