use anyhow::{Context, Result};
use std::io::Cursor;

use super::backend::AudioFrame;
use super::encoding::AudioEncoding;

/// One encoded audio chunk ready for upload
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    /// Encoded bytes (WAV container)
    pub bytes: Vec<u8>,
    /// Payload encoding, declared on upload as the Content-Type
    pub encoding: AudioEncoding,
    /// Audio duration covered by this chunk
    pub duration_ms: u64,
    /// Number of PCM samples encoded
    pub samples: usize,
}

/// Accumulates PCM frames and encodes them into fixed-interval WAV chunks.
///
/// The sample format is taken from the first frame pushed; the capture
/// controller drains the buffer once per chunk interval and once more on
/// stop to flush trailing audio.
pub struct ChunkBuffer {
    samples: Vec<i16>,
    format: Option<(u32, u16)>,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            format: None,
        }
    }

    pub fn push_frame(&mut self, frame: &AudioFrame) {
        if self.format.is_none() {
            self.format = Some((frame.sample_rate, frame.channels));
        }
        self.samples.extend_from_slice(&frame.samples);
    }

    /// Encode everything buffered so far as one in-memory WAV chunk and
    /// reset the buffer. Returns `None` when nothing is buffered.
    pub fn take_chunk(&mut self) -> Result<Option<EncodedChunk>> {
        let Some((sample_rate, channels)) = self.format else {
            return Ok(None);
        };
        if self.samples.is_empty() {
            return Ok(None);
        }

        let samples = std::mem::take(&mut self.samples);

        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut bytes = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec)
                .context("Failed to create in-memory WAV writer")?;
            for &sample in &samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV chunk")?;
            }
            writer
                .finalize()
                .context("Failed to finalize WAV chunk")?;
        }

        let frames = samples.len() / channels.max(1) as usize;
        let duration_ms = frames as u64 * 1000 / sample_rate.max(1) as u64;

        Ok(Some(EncodedChunk {
            bytes,
            encoding: AudioEncoding::Wav,
            duration_ms,
            samples: samples.len(),
        }))
    }
}

impl Default for ChunkBuffer {
    fn default() -> Self {
        Self::new()
    }
}
