//! Chunk — the atomic unit of payload transmission.
//!
//! A chunk carries a run of payload bytes plus positional and terminal
//! metadata. Every optional field distinguishes "absent" from "zero":
//! the engine cares whether an offset was ever set, not just its value.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

// ── Digest ────────────────────────────────────────────────────────────────────

/// BLAKE3 digest of a chunk's payload bytes.
///
/// Attached by the sender, verified by the receiver when present.
/// A mismatch fails the read — a corrupted chunk is never delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Compute the digest of a byte slice.
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Short hex form for log fields.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

// ── Chunk ─────────────────────────────────────────────────────────────────────

/// One framed unit of a chunked stream.
///
/// Immutable once sent; owned exclusively by the file that produced or
/// received it. `last == Some(true)` marks the terminal chunk — no
/// further chunks may follow on that stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chunk {
    data: Bytes,
    offset: Option<u64>,
    length: Option<u64>,
    total: Option<u64>,
    last: Option<bool>,
    digest: Option<Digest>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn set_data(&mut self, data: Bytes) {
        self.length = Some(data.len() as u64);
        self.data = data;
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn set_offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    pub fn length(&self) -> Option<u64> {
        self.length
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn set_total(&mut self, total: u64) {
        self.total = Some(total);
    }

    /// Whether this chunk terminates its stream.
    pub fn is_last(&self) -> bool {
        self.last == Some(true)
    }

    pub fn last(&self) -> Option<bool> {
        self.last
    }

    pub fn set_last(&mut self, last: bool) {
        self.last = Some(last);
    }

    pub fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }

    pub fn set_digest(&mut self, digest: Digest) {
        self.digest = Some(digest);
    }

    /// Attach payload bytes along with their digest in one step.
    pub fn fill(&mut self, data: Bytes) {
        self.digest = Some(Digest::of(&data));
        self.set_data(data);
    }

    /// Verify the payload against the attached digest, if any.
    /// A chunk without a digest always verifies.
    pub fn verify_digest(&self) -> bool {
        match &self.digest {
            Some(d) => *d == Digest::of(&self.data),
            None => true,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
