use serde::{Deserialize, Serialize};

/// Closed set of audio encodings a session accepts.
///
/// Parsed once from the Content-Type header at the service boundary; codec
/// parameters such as `;codecs=opus` are ignored. Anything outside this set
/// is rejected before any bytes are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEncoding {
    Wav,
    Webm,
    Ogg,
    Mp4,
}

impl AudioEncoding {
    /// Parse a Content-Type header value into an accepted encoding.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" => Some(AudioEncoding::Wav),
            "audio/webm" => Some(AudioEncoding::Webm),
            "audio/ogg" => Some(AudioEncoding::Ogg),
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" => Some(AudioEncoding::Mp4),
            _ => None,
        }
    }

    /// Canonical MIME type for outbound requests.
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioEncoding::Wav => "audio/wav",
            AudioEncoding::Webm => "audio/webm",
            AudioEncoding::Ogg => "audio/ogg",
            AudioEncoding::Mp4 => "audio/mp4",
        }
    }

    /// File extension used for spooled part files.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioEncoding::Wav => "wav",
            AudioEncoding::Webm => "webm",
            AudioEncoding::Ogg => "ogg",
            AudioEncoding::Mp4 => "m4a",
        }
    }
}
