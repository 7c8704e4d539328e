//! Offline end-to-end dictation demo
//!
//! Drives a synthetic tone input through the capture controller and upload
//! sequencer into an in-process session store, with a scripted
//! speech-to-text double standing in for the real service. Prints the
//! assembled transcript.
//!
//! Run with: cargo run --example dictate

use anyhow::Result;
use async_trait::async_trait;
use scribe_dictation::{
    AllowAll, Assembler, AudioEncoding, AudioInputFactory, CaptureConfig, CaptureController,
    InputConfig, InputSource, LocalSink, OwnerId, PartSpool, SequencerConfig, SessionLimits,
    SessionStore, SpeechToText, TranscribeError,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Returns one scripted phrase per transcribed part.
struct ScriptedStt {
    phrases: Mutex<VecDeque<&'static str>>,
}

#[async_trait]
impl SpeechToText for ScriptedStt {
    async fn is_available(&self) -> bool {
        true
    }

    async fn transcribe(
        &self,
        _audio: &[u8],
        _encoding: AudioEncoding,
        _language: Option<&str>,
    ) -> Result<String, TranscribeError> {
        Ok(self
            .phrases
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or("and so on")
            .to_string())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let spool_dir = tempfile::TempDir::new()?;
    let stt = Arc::new(ScriptedStt {
        phrases: Mutex::new(VecDeque::from([
            "patient presents with",
            "intermittent chest pain",
            "radiating to the left arm",
        ])),
    });

    let store = SessionStore::new(
        PartSpool::new(spool_dir.path()),
        SessionLimits::default(),
        Arc::new(AllowAll),
        Assembler::new(stt, 2, None),
    );

    let owner = OwnerId::parse("demo-user")?;
    let sink = Arc::new(LocalSink::new(store.clone(), owner));

    let input = AudioInputFactory::create(
        InputSource::Synthetic { freq_hz: 440.0 },
        InputConfig {
            sample_rate: 16000,
            channels: 1,
            frame_duration_ms: 20,
        },
    )?;

    let controller = CaptureController::new(
        CaptureConfig {
            chunk_interval: Duration::from_millis(400),
            max_duration: Duration::from_secs(60),
            sequencer: SequencerConfig::default(),
        },
        input,
        sink,
    );

    let session_id = controller.start().await?;
    println!("recording session {session_id}...");

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let status = controller.status().await;
    println!(
        "captured {} chunks in {:.1}s, stopping",
        status.chunks_emitted, status.elapsed_secs
    );

    let transcript = controller.stop().await?;
    println!("transcript: {transcript}");

    Ok(())
}
