//! PacketFile — the envelope specialization of [`ChunkFile`].
//!
//! Stream options and payload metadata travel on exactly one packet:
//! the one whose chunk sits at offset 0. The sender attaches them
//! there and nowhere else; the receiver captures them whenever a packet
//! carries them, last writer wins. In practice the first packet
//! establishes them and nothing later touches them.

use std::io;

use chute_core::{Packet, PayloadMetadata, StreamError, StreamOptions};

use crate::chunk_file::ChunkFile;
use crate::copy::pump;
use crate::transport::Transport;

pub struct PacketFile<T: Transport> {
    file: ChunkFile<T>,

    // Outgoing side channels, attached to the offset-0 packet.
    send_options: Option<StreamOptions>,
    send_metadata: Option<PayloadMetadata>,

    // Incoming side channels, captured from received packets.
    recv_options: Option<StreamOptions>,
    recv_metadata: Option<PayloadMetadata>,
}

impl<T: Transport> PacketFile<T> {
    pub fn new(transport: T) -> Self {
        Self::over(ChunkFile::new(transport))
    }

    pub fn with_max_chunk_size(transport: T, max: usize) -> Self {
        Self::over(ChunkFile::with_max_chunk_size(transport, max))
    }

    pub fn from_settings(transport: T, settings: &chute_core::config::StreamSettings) -> Self {
        Self::over(ChunkFile::from_settings(transport, settings))
    }

    /// Wrap an already-configured engine.
    pub fn over(file: ChunkFile<T>) -> Self {
        Self {
            file,
            send_options: None,
            send_metadata: None,
            recv_options: None,
            recv_metadata: None,
        }
    }

    // ── Envelope accessors ───────────────────────────────────────────────────

    /// Options to advertise on the first outgoing packet. Must be set
    /// before the first write to have any effect.
    pub fn set_stream_options(&mut self, options: StreamOptions) {
        self.send_options = Some(options);
    }

    /// Metadata to attach to the first outgoing packet.
    pub fn set_metadata(&mut self, metadata: PayloadMetadata) {
        self.send_metadata = Some(metadata);
    }

    /// Options captured from the peer, if any packet carried them yet.
    pub fn received_stream_options(&self) -> Option<&StreamOptions> {
        self.recv_options.as_ref()
    }

    /// Metadata captured from the peer, if any packet carried it yet.
    pub fn received_metadata(&self) -> Option<&PayloadMetadata> {
        self.recv_metadata.as_ref()
    }

    /// Logical filename: outgoing value if set, else the received one.
    pub fn filename(&self) -> Option<&str> {
        self.send_metadata
            .as_ref()
            .and_then(|m| m.filename.as_deref())
            .or_else(|| {
                self.recv_metadata
                    .as_ref()
                    .and_then(|m| m.filename.as_deref())
            })
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.send_metadata
            .get_or_insert_with(PayloadMetadata::default)
            .filename = Some(filename.into());
    }

    /// Make sure incoming stream options have had a chance to arrive:
    /// if none were captured yet, perform one receive cycle. Used by the
    /// compression layer before it commits to a decoder.
    pub fn ensure_stream_options(&mut self) -> Result<Option<&StreamOptions>, StreamError> {
        if self.recv_options.is_none() && !self.file.is_terminated() {
            let recv_options = &mut self.recv_options;
            let recv_metadata = &mut self.recv_metadata;
            self.file.fill_once(&mut |packet: &Packet| {
                capture(packet, recv_options, recv_metadata);
            })?;
        }
        Ok(self.recv_options.as_ref())
    }

    // ── Byte-stream contract ─────────────────────────────────────────────────

    pub fn write(&mut self, buf: &[u8]) -> Result<usize, StreamError> {
        let options = self.send_options;
        let metadata = self.send_metadata.clone();
        self.file.write_with(buf, |packet| {
            if packet.chunk.offset() == Some(0) {
                packet.stream_options = options;
                packet.metadata = metadata.clone().filter(|m| !m.is_empty());
            }
        })
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        let recv_options = &mut self.recv_options;
        let recv_metadata = &mut self.recv_metadata;
        self.file.read_with(buf, |packet| {
            capture(packet, recv_options, recv_metadata);
        })
    }

    pub fn close(&mut self) -> Result<(), StreamError> {
        self.file.close()
    }

    pub fn copy_to<W: io::Write>(&mut self, dst: &mut W) -> Result<u64, StreamError> {
        let len = self.relay_len();
        pump(self, dst, len).map_err(StreamError::from)
    }

    pub fn copy_from<R: io::Read>(&mut self, src: &mut R) -> Result<u64, StreamError> {
        let len = self.relay_len();
        pump(src, self, len).map_err(StreamError::from)
    }

    fn relay_len(&self) -> usize {
        self.file.relay_len()
    }

    // ── Plumbing ─────────────────────────────────────────────────────────────

    pub fn offset(&self) -> u64 {
        self.file.offset()
    }

    pub fn is_terminated(&self) -> bool {
        self.file.is_terminated()
    }

    pub fn set_global_initial_offset(&mut self, offset: u64) {
        self.file.set_global_initial_offset(offset);
    }

    pub fn global_offset(&self) -> Option<u64> {
        self.file.global_offset()
    }

    pub fn transport(&self) -> &T {
        self.file.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.file.transport_mut()
    }

    pub fn into_transport(self) -> T {
        self.file.into_transport()
    }
}

/// Capture side channels off an incoming packet. Last writer wins.
fn capture(
    packet: &Packet,
    options: &mut Option<StreamOptions>,
    metadata: &mut Option<PayloadMetadata>,
) {
    if let Some(o) = &packet.stream_options {
        *options = Some(*o);
    }
    if let Some(m) = &packet.metadata {
        if !m.is_empty() {
            *metadata = Some(m.clone());
        }
    }
}

// ── std::io adapters ──────────────────────────────────────────────────────────

impl<T: Transport> io::Read for PacketFile<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = PacketFile::read(self, buf).map_err(io::Error::from)?;
            if n > 0 || buf.is_empty() || self.is_terminated() {
                return Ok(n);
            }
        }
    }
}

impl<T: Transport> io::Write for PacketFile<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        PacketFile::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
