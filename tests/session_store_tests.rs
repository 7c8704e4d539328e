// Integration tests for the session store: server-assigned ordering,
// validation at the boundary, capacity bounds, ownership scoping, and
// cleanup on cancel.

mod common;

use anyhow::Result;
use common::{owner, store_with, EchoStt};
use futures::future::join_all;
use scribe_dictation::{AudioEncoding, OwnerId, SessionError, SessionLimits};
use std::sync::Arc;

#[tokio::test]
async fn test_appends_assign_sequential_indices() -> Result<()> {
    let (store, _spool) = store_with(Arc::new(EchoStt), SessionLimits::default())?;
    let owner = owner("alice");
    let session_id = store.start_session(&owner, None).await?;

    for expected in 0..5u32 {
        let index = store
            .append(
                &owner,
                &session_id,
                format!("p{expected}").into_bytes(),
                AudioEncoding::Wav,
            )
            .await?;
        assert_eq!(index, expected);
    }

    let transcript = store.finalize(&owner, &session_id).await?;
    assert_eq!(transcript, "p0 p1 p2 p3 p4");

    Ok(())
}

#[tokio::test]
async fn test_oversized_part_rejected() -> Result<()> {
    let limits = SessionLimits {
        max_part_bytes: 8,
        ..SessionLimits::default()
    };
    let (store, _spool) = store_with(Arc::new(EchoStt), limits)?;
    let owner = owner("alice");
    let session_id = store.start_session(&owner, None).await?;

    let err = store
        .append(&owner, &session_id, vec![0u8; 16], AudioEncoding::Wav)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Validation(_)));
    assert!(!err.is_retryable());

    // The session is unaffected and still accepts valid parts.
    let index = store
        .append(&owner, &session_id, b"ok".to_vec(), AudioEncoding::Wav)
        .await?;
    assert_eq!(index, 0);

    Ok(())
}

#[tokio::test]
async fn test_empty_part_rejected() -> Result<()> {
    let (store, _spool) = store_with(Arc::new(EchoStt), SessionLimits::default())?;
    let owner = owner("alice");
    let session_id = store.start_session(&owner, None).await?;

    let err = store
        .append(&owner, &session_id, Vec::new(), AudioEncoding::Wav)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Validation(_)));

    Ok(())
}

#[tokio::test]
async fn test_capacity_bound_preserves_existing_parts() -> Result<()> {
    let limits = SessionLimits {
        max_parts: 3,
        ..SessionLimits::default()
    };
    let (store, _spool) = store_with(Arc::new(EchoStt), limits)?;
    let owner = owner("alice");
    let session_id = store.start_session(&owner, None).await?;

    for text in ["one", "two", "three"] {
        store
            .append(&owner, &session_id, text.as_bytes().to_vec(), AudioEncoding::Wav)
            .await?;
    }

    let err = store
        .append(&owner, &session_id, b"four".to_vec(), AudioEncoding::Wav)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::CapacityExceeded(_)));

    // Previously accepted parts are intact and in order.
    let transcript = store.finalize(&owner, &session_id).await?;
    assert_eq!(transcript, "one two three");

    Ok(())
}

#[tokio::test]
async fn test_cancel_removes_all_state() -> Result<()> {
    let (store, spool) = store_with(Arc::new(EchoStt), SessionLimits::default())?;
    let owner = owner("alice");
    let session_id = store.start_session(&owner, None).await?;

    store
        .append(&owner, &session_id, b"one".to_vec(), AudioEncoding::Wav)
        .await?;
    store
        .append(&owner, &session_id, b"two".to_vec(), AudioEncoding::Wav)
        .await?;

    store.cancel(&owner, &session_id).await?;

    // Spooled bytes are gone.
    let session_dir = spool.path().join("alice").join(&session_id);
    assert!(!session_dir.exists());

    // Every subsequent operation fails with NotFound.
    assert!(matches!(
        store
            .append(&owner, &session_id, b"x".to_vec(), AudioEncoding::Wav)
            .await,
        Err(SessionError::NotFound)
    ));
    assert!(matches!(
        store.partial(&owner, &session_id, 1).await,
        Err(SessionError::NotFound)
    ));
    assert!(matches!(
        store.finalize(&owner, &session_id).await,
        Err(SessionError::NotFound)
    ));
    assert!(matches!(
        store.cancel(&owner, &session_id).await,
        Err(SessionError::NotFound)
    ));

    Ok(())
}

// Concurrent appends for the same session are a contract violation by a
// well-behaved client, but retries make them possible; the per-session lock
// must keep indices unique and gap-free regardless.
#[tokio::test]
async fn test_concurrent_appends_stay_gap_free() -> Result<()> {
    let (store, _spool) = store_with(Arc::new(EchoStt), SessionLimits::default())?;
    let owner = owner("racer");
    let session_id = store.start_session(&owner, None).await?;

    let appends = (0..10).map(|i| {
        let store = store.clone();
        let owner = owner.clone();
        let session_id = session_id.clone();
        async move {
            store
                .append(
                    &owner,
                    &session_id,
                    format!("part-{i}").into_bytes(),
                    AudioEncoding::Wav,
                )
                .await
        }
    });

    let mut indices = join_all(appends)
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;
    indices.sort_unstable();

    assert_eq!(indices, (0..10).collect::<Vec<u32>>());

    Ok(())
}

#[tokio::test]
async fn test_entitlement_denied_allocates_nothing() -> Result<()> {
    struct DenyAll;

    #[async_trait::async_trait]
    impl scribe_dictation::Entitlement for DenyAll {
        async fn can_use(&self, _owner: &OwnerId) -> bool {
            false
        }
    }

    let spool_dir = tempfile::TempDir::new()?;
    let store = scribe_dictation::SessionStore::new(
        scribe_dictation::PartSpool::new(spool_dir.path()),
        SessionLimits::default(),
        Arc::new(DenyAll),
        scribe_dictation::Assembler::new(Arc::new(EchoStt), 2, None),
    );

    let owner = owner("freeloader");
    let err = store.start_session(&owner, None).await.unwrap_err();
    assert!(matches!(err, SessionError::EntitlementDenied));

    // No session state, no spool directory.
    assert_eq!(std::fs::read_dir(spool_dir.path())?.count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_session_id_conflicts() -> Result<()> {
    let (store, _spool) = store_with(Arc::new(EchoStt), SessionLimits::default())?;
    let owner = owner("alice");

    store
        .start_session(&owner, Some("visit-42".to_string()))
        .await?;
    let err = store
        .start_session(&owner, Some("visit-42".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Conflict(_)));

    Ok(())
}

#[tokio::test]
async fn test_sessions_are_owner_scoped() -> Result<()> {
    let (store, _spool) = store_with(Arc::new(EchoStt), SessionLimits::default())?;
    let alice = owner("alice");
    let mallory = owner("mallory");

    let session_id = store.start_session(&alice, None).await?;

    // Another owner cannot see or touch the session.
    assert!(matches!(
        store
            .append(&mallory, &session_id, b"x".to_vec(), AudioEncoding::Wav)
            .await,
        Err(SessionError::NotFound)
    ));
    assert!(matches!(
        store.finalize(&mallory, &session_id).await,
        Err(SessionError::NotFound)
    ));

    Ok(())
}

#[tokio::test]
async fn test_unknown_session_is_not_found() -> Result<()> {
    let (store, _spool) = store_with(Arc::new(EchoStt), SessionLimits::default())?;
    let owner = owner("alice");

    assert!(matches!(
        store
            .append(&owner, "no-such-session", b"x".to_vec(), AudioEncoding::Wav)
            .await,
        Err(SessionError::NotFound)
    ));
    assert!(matches!(
        store.finalize(&owner, "no-such-session").await,
        Err(SessionError::NotFound)
    ));

    Ok(())
}

#[test]
fn test_owner_id_validation() {
    assert!(OwnerId::parse("alice").is_ok());
    assert!(OwnerId::parse("user-123@clinic").is_ok());

    assert!(OwnerId::parse("").is_err());
    assert!(OwnerId::parse("   ").is_err());
    assert!(OwnerId::parse("a/b").is_err());
    assert!(OwnerId::parse("a\\b").is_err());
    assert!(OwnerId::parse("..").is_err());
    assert!(OwnerId::parse(&"x".repeat(200)).is_err());
}

#[test]
fn test_content_type_parsing() {
    assert_eq!(AudioEncoding::from_mime("audio/wav"), Some(AudioEncoding::Wav));
    assert_eq!(AudioEncoding::from_mime("audio/x-wav"), Some(AudioEncoding::Wav));
    assert_eq!(
        AudioEncoding::from_mime("audio/webm;codecs=opus"),
        Some(AudioEncoding::Webm)
    );
    assert_eq!(
        AudioEncoding::from_mime(" AUDIO/OGG "),
        Some(AudioEncoding::Ogg)
    );
    assert_eq!(AudioEncoding::from_mime("audio/m4a"), Some(AudioEncoding::Mp4));

    assert_eq!(AudioEncoding::from_mime("text/plain"), None);
    assert_eq!(AudioEncoding::from_mime("video/mp4"), None);
    assert_eq!(AudioEncoding::from_mime(""), None);
}
