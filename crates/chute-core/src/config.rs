//! Configuration for chute services.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $CHUTE_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/chute/config.toml
//!   3. ~/.config/chute/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChuteConfig {
    pub stream: StreamSettings,
    pub compression: CompressionSettings,
    pub object_store: ObjectStoreSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Maximum bytes per outgoing chunk. 0 = unbounded (one chunk per write).
    pub max_write_chunk_size: usize,
    /// Relay buffer size for copy loops when chunking is unbounded.
    pub relay_buffer_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionSettings {
    /// Codec advertised for outgoing streams: "none" or "zlib".
    pub codec: String,
    /// Compression level, 0-9.
    pub level: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStoreSettings {
    /// Maximum source objects per compose call. Backend-enforced ceiling.
    pub compose_source_limit: usize,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ChuteConfig {
    fn default() -> Self {
        Self {
            stream: StreamSettings::default(),
            compression: CompressionSettings::default(),
            object_store: ObjectStoreSettings::default(),
        }
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            max_write_chunk_size: 32 * 1024,
            relay_buffer_bytes: 64 * 1024,
        }
    }
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            codec: "none".into(),
            level: 6,
        }
    }
}

impl Default for ObjectStoreSettings {
    fn default() -> Self {
        Self {
            compose_source_limit: 1000,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_or_tmp().join(".config"))
        .join("chute")
}

fn home_or_tmp() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl ChuteConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            ChuteConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("CHUTE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&ChuteConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply CHUTE_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CHUTE_STREAM__MAX_WRITE_CHUNK_SIZE") {
            if let Ok(n) = v.parse() {
                self.stream.max_write_chunk_size = n;
            }
        }
        if let Ok(v) = std::env::var("CHUTE_STREAM__RELAY_BUFFER_BYTES") {
            if let Ok(n) = v.parse() {
                self.stream.relay_buffer_bytes = n;
            }
        }
        if let Ok(v) = std::env::var("CHUTE_COMPRESSION__CODEC") {
            self.compression.codec = v;
        }
        if let Ok(v) = std::env::var("CHUTE_COMPRESSION__LEVEL") {
            if let Ok(n) = v.parse() {
                self.compression.level = n;
            }
        }
        if let Ok(v) = std::env::var("CHUTE_OBJECT_STORE__COMPOSE_SOURCE_LIMIT") {
            if let Ok(n) = v.parse() {
                self.object_store.compose_source_limit = n;
            }
        }
    }
}
