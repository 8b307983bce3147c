//! Object-store transport — upload by staged compose.
//!
//! This transport only composes uploads; there is no symmetrical
//! receive path, and `recv` fails by design. Every write-side chunk
//! becomes one freshly named temporary object in the destination
//! bucket. The terminal chunk triggers a server-side compose of all
//! temporaries, in write order, into the final object, after which the
//! temporaries are deleted best-effort — the destination already
//! exists by then, so deletion failures are logged and swallowed.
//!
//! Backends cap the number of source objects per compose call (1000 on
//! the observed backend). The cap is configurable here and crossing it
//! fails the write immediately; no intermediate compaction is
//! performed. Bucket creation is the connection owner's problem, not
//! this transport's.

use rand::RngCore;

use chute_core::config::ObjectStoreSettings;
use chute_core::{Packet, StreamError};
use chute_stream::Transport;

/// Default compose-source ceiling, matching the observed backend limit.
pub const DEFAULT_COMPOSE_LIMIT: usize = 1000;

// ── Backend seam ──────────────────────────────────────────────────────────────

/// Minimal object-store client surface this transport needs.
pub trait ObjectStore {
    fn put(&mut self, bucket: &str, object: &str, data: &[u8]) -> Result<(), StreamError>;

    /// Server-side concatenation of `sources`, in order, into `target`.
    fn compose(&mut self, bucket: &str, sources: &[String], target: &str)
        -> Result<(), StreamError>;

    fn delete(&mut self, bucket: &str, object: &str) -> Result<(), StreamError>;
}

// ── Transport ─────────────────────────────────────────────────────────────────

/// Upload transport bound to one (bucket, object) destination.
pub struct ObjectStoreTransport<S: ObjectStore> {
    store: S,
    bucket: String,
    object: String,
    staged: Vec<String>,
    chunk_index: u64,
    compose_limit: usize,
}

impl<S: ObjectStore> ObjectStoreTransport<S> {
    pub fn new(store: S, bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            object: object.into(),
            staged: Vec::new(),
            chunk_index: 0,
            compose_limit: DEFAULT_COMPOSE_LIMIT,
        }
    }

    /// Override the compose-source ceiling (backend-dependent).
    pub fn with_compose_limit(mut self, limit: usize) -> Self {
        self.compose_limit = limit;
        self
    }

    pub fn from_settings(
        store: S,
        bucket: impl Into<String>,
        object: impl Into<String>,
        settings: &ObjectStoreSettings,
    ) -> Self {
        Self::new(store, bucket, object).with_compose_limit(settings.compose_source_limit)
    }

    /// Temporary objects staged so far, awaiting compose.
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    fn temp_name(&mut self) -> String {
        let mut suffix = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut suffix);
        let name = format!(
            "{}_{}_{}",
            self.object,
            self.chunk_index,
            hex::encode(suffix)
        );
        self.chunk_index += 1;
        name
    }

    fn compose_and_cleanup(&mut self) -> Result<(), StreamError> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let sources = std::mem::take(&mut self.staged);
        self.store.compose(&self.bucket, &sources, &self.object)?;
        tracing::debug!(
            bucket = %self.bucket,
            object = %self.object,
            sources = sources.len(),
            "composed final object"
        );

        // Best-effort: the final object exists, so a leftover temporary
        // is waste, not data loss.
        for name in &sources {
            if let Err(err) = self.store.delete(&self.bucket, name) {
                tracing::warn!(
                    bucket = %self.bucket,
                    temp = %name,
                    error = %err,
                    "temporary object deletion failed"
                );
            }
        }
        Ok(())
    }
}

impl<S: ObjectStore> Transport for ObjectStoreTransport<S> {
    fn send(&mut self, packet: Packet) -> Result<(), StreamError> {
        let chunk = &packet.chunk;
        if chunk.is_last() {
            return self.compose_and_cleanup();
        }
        if chunk.data().is_empty() {
            return Ok(());
        }
        if self.staged.len() >= self.compose_limit {
            return Err(StreamError::ComposeLimit {
                staged: self.staged.len() + 1,
                limit: self.compose_limit,
            });
        }

        let name = self.temp_name();
        self.store.put(&self.bucket, &name, chunk.data())?;
        self.staged.push(name);
        Ok(())
    }

    fn recv(&mut self) -> Result<Option<Packet>, StreamError> {
        Err(StreamError::ReceiveUnsupported)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
