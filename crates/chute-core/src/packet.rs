//! Packet — the envelope around a chunk.
//!
//! A packet carries exactly one chunk plus two optional side channels
//! that are meaningful only on the first packet of a stream (the packet
//! whose chunk sits at offset 0): stream-level presentation options and
//! payload metadata. Senders attach them once; receivers capture them
//! whenever present.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::chunk::Chunk;

// ── Stream options ────────────────────────────────────────────────────────────

/// Codec negotiated for the logical byte stream.
///
/// Absence of stream options, or `Codec::None`, means the payload is
/// transmitted uncompressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Codec {
    #[default]
    None,
    Zlib,
}

impl Codec {
    /// Protocol-level name, stable across releases.
    pub fn name(&self) -> &'static str {
        match self {
            Codec::None => "none",
            Codec::Zlib => "zlib",
        }
    }

    /// Parse a protocol-level name, e.g. from configuration.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(Codec::None),
            "zlib" => Some(Codec::Zlib),
            _ => None,
        }
    }
}

/// Stream-level presentation options, advertised on the first packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOptions {
    pub codec: Codec,
}

impl StreamOptions {
    pub fn with_codec(codec: Codec) -> Self {
        Self { codec }
    }
}

// ── Payload metadata ──────────────────────────────────────────────────────────

/// Descriptive metadata about the payload, carried on the first packet.
///
/// The filename is the one field the engine itself understands; everything
/// else rides in `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadMetadata {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl PayloadMetadata {
    pub fn with_filename(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Self::default()
        }
    }

    /// True when no field carries information — an empty metadata block
    /// is never attached to an outgoing packet.
    pub fn is_empty(&self) -> bool {
        self.filename.is_none() && self.content_type.is_none() && self.extra.is_empty()
    }
}

// ── Packet ────────────────────────────────────────────────────────────────────

/// Envelope exchanged on every transport: one chunk, plus side channels
/// that are populated only on the first packet of a stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Packet {
    pub chunk: Chunk,
    pub stream_options: Option<StreamOptions>,
    pub metadata: Option<PayloadMetadata>,
}

impl Packet {
    pub fn new(chunk: Chunk) -> Self {
        Self {
            chunk,
            stream_options: None,
            metadata: None,
        }
    }

    /// Serialize for transports that carry whole packets as message
    /// values (the broker adapter).
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
