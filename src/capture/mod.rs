//! Client-side capture pipeline
//!
//! This module provides the recording state machine and the ordered upload
//! path:
//! - `CaptureController` drives the lifecycle
//!   (`Idle → Recording ⇄ Paused → Stopping → Completed|Aborted`) and emits
//!   one encoded chunk per fixed interval
//! - `UploadSequencer` guarantees chunks reach the server in capture order,
//!   skipping (not retrying) individual failed deliveries

mod controller;
mod sequencer;

pub use controller::{CaptureConfig, CaptureController, CaptureError, CaptureState, CaptureStatus};
pub use sequencer::{SequencerConfig, UploadSequencer};
