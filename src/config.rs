use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

use crate::session::SessionLimits;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Root directory for the ephemeral part spool
    #[serde(default = "default_spool_dir")]
    pub spool_dir: PathBuf,
    #[serde(default = "default_max_parts")]
    pub max_parts: u32,
    #[serde(default = "default_max_part_bytes")]
    pub max_part_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionConfig {
    /// Full transcription endpoint URL, e.g.
    /// `http://localhost:8000/v1/audio/transcriptions`. Empty means not
    /// configured: sessions record fine but finalize fails.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Optional language hint passed through to the STT service
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Bound on outstanding STT calls across all sessions
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Config {
    /// Load configuration from an optional TOML file, falling back to
    /// defaults for anything unset.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl SessionSettings {
    pub fn limits(&self) -> SessionLimits {
        SessionLimits {
            max_parts: self.max_parts,
            max_part_bytes: self.max_part_bytes,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            spool_dir: default_spool_dir(),
            max_parts: default_max_parts(),
            max_part_bytes: default_max_part_bytes(),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            model: default_model(),
            api_key: None,
            language: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_service_name() -> String {
    "scribe-dictation".to_string()
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8745
}

fn default_spool_dir() -> PathBuf {
    PathBuf::from("spool")
}

fn default_max_parts() -> u32 {
    360
}

fn default_max_part_bytes() -> u64 {
    4 * 1024 * 1024
}

fn default_model() -> String {
    "whisper-1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    2
}
