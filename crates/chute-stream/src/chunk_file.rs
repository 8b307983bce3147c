//! ChunkFile — byte-stream semantics over a chunk transport.
//!
//! Writes are sliced into chunks bounded by a configurable maximum and
//! handed to the transport one at a time. Reads block on the transport
//! for the next chunk, buffer its payload, and drain the buffer into
//! the caller's slice. A chunk flagged `last`, or the transport's own
//! end-of-stream signal, flips the file into a sticky terminal state.
//!
//! One file instance expects exactly one logical reader and one logical
//! writer. Send-side state (offset) and receive-side state (buffer,
//! terminal flag) are disjoint, so full-duplex use from two threads is
//! sound; two concurrent readers or two concurrent writers are not.

use bytes::{Bytes, BytesMut};
use std::io;
use std::time::{Duration, Instant};

use chute_core::config::StreamSettings;
use chute_core::{Chunk, Packet, StreamError};

use crate::copy::pump;
use crate::transport::Transport;

/// Relay buffer size for copy loops when chunking is unbounded.
pub const DEFAULT_RELAY_BYTES: usize = 64 * 1024;

/// Receipt events are logged at debug level at most this often,
/// apart from the first and the terminal chunk. Everything is always
/// visible at trace level.
const RECEIPT_LOG_INTERVAL: Duration = Duration::from_secs(30);

// ── Terminal state ────────────────────────────────────────────────────────────

/// Receive-side state machine. Once `Ended` or `Failed`, the file never
/// produces payload bytes again.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Terminal {
    Open,
    Ended,
    Failed(String),
}

// ── ChunkFile ─────────────────────────────────────────────────────────────────

/// The transport-agnostic streaming engine.
pub struct ChunkFile<T: Transport> {
    transport: T,

    // Send side.
    offset: u64,
    max_write_chunk_size: usize,
    relay_bytes: usize,
    wrote_any: bool,

    // Receive side.
    recv_buf: BytesMut,
    terminal: Terminal,
    chunks_received: u64,
    last_receipt_log: Option<Instant>,

    // Informational positioning within a larger external sequence.
    global_initial_offset: Option<u64>,
    global_offset: Option<u64>,
}

impl<T: Transport> ChunkFile<T> {
    /// Open a file with unbounded chunking: each write becomes one chunk.
    pub fn new(transport: T) -> Self {
        Self::with_max_chunk_size(transport, 0)
    }

    /// Open a file that slices writes into chunks of at most `max` bytes.
    /// `max == 0` means unbounded. The bound is fixed for the lifetime
    /// of the file.
    pub fn with_max_chunk_size(transport: T, max: usize) -> Self {
        Self {
            transport,
            offset: 0,
            max_write_chunk_size: max,
            relay_bytes: DEFAULT_RELAY_BYTES,
            wrote_any: false,
            recv_buf: BytesMut::new(),
            terminal: Terminal::Open,
            chunks_received: 0,
            last_receipt_log: None,
            global_initial_offset: None,
            global_offset: None,
        }
    }

    /// Open a file sized from the `[stream]` configuration block.
    pub fn from_settings(transport: T, settings: &StreamSettings) -> Self {
        let mut file = Self::with_max_chunk_size(transport, settings.max_write_chunk_size);
        file.relay_bytes = settings.relay_buffer_bytes.max(1);
        file
    }

    /// Bytes produced or consumed by this logical stream instance.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn max_write_chunk_size(&self) -> usize {
        self.max_write_chunk_size
    }

    /// Position this stream within a larger external sequence.
    /// Purely informational; the engine only advances the counter.
    pub fn set_global_initial_offset(&mut self, offset: u64) {
        self.global_initial_offset = Some(offset);
        self.global_offset = Some(offset);
    }

    pub fn global_offset(&self) -> Option<u64> {
        self.global_offset
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give the transport back, e.g. to finish an RPC call after close.
    pub fn into_transport(self) -> T {
        self.transport
    }

    // ── Writing ──────────────────────────────────────────────────────────────

    /// Write `buf`, slicing it into transport chunks. An empty buffer is
    /// a no-op. On transport failure the error propagates undecorated;
    /// chunks already sent stay sent and the stream must be restarted.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, StreamError> {
        self.write_with(buf, |_| {})
    }

    /// Write with a per-packet decoration hook. The envelope layer uses
    /// this to attach side channels to the packet at offset 0.
    pub(crate) fn write_with(
        &mut self,
        buf: &[u8],
        mut decorate: impl FnMut(&mut Packet),
    ) -> Result<usize, StreamError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut written = 0;
        while written < buf.len() {
            let take = match self.max_write_chunk_size {
                0 => buf.len() - written,
                max => max.min(buf.len() - written),
            };
            if let Err(err) = self.send_slice(&buf[written..written + take], &mut decorate) {
                tracing::debug!(written, error = %err, "write aborted mid-stream");
                return Err(err);
            }
            written += take;
        }
        Ok(written)
    }

    fn send_slice(
        &mut self,
        data: &[u8],
        decorate: &mut impl FnMut(&mut Packet),
    ) -> Result<(), StreamError> {
        if self.max_write_chunk_size != 0 && data.len() > self.max_write_chunk_size {
            return Err(StreamError::ChunkTooLarge {
                got: data.len(),
                max: self.max_write_chunk_size,
            });
        }

        let mut chunk = self.transport.new_chunk();
        chunk.set_offset(self.offset);
        chunk.fill(Bytes::copy_from_slice(data));

        let mut packet = Packet::new(chunk);
        decorate(&mut packet);
        self.transport.send(packet)?;

        self.offset += data.len() as u64;
        if let Some(global) = self.global_offset.as_mut() {
            *global += data.len() as u64;
        }
        self.wrote_any = true;
        Ok(())
    }

    // ── Reading ──────────────────────────────────────────────────────────────

    /// Read up to `buf.len()` bytes. Blocks on the transport when the
    /// internal buffer is empty. Returns `Ok(0)` once the stream has
    /// terminated; a zero count while the stream is open means "more may
    /// come" (an empty non-terminal chunk arrived).
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        self.read_with(buf, |_| {})
    }

    /// Read with a per-packet observation hook. The envelope layer uses
    /// this to capture incoming side channels.
    pub(crate) fn read_with(
        &mut self,
        buf: &mut [u8],
        mut observe: impl FnMut(&Packet),
    ) -> Result<usize, StreamError> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.recv_buf.is_empty() {
            match &self.terminal {
                Terminal::Ended => return Ok(0),
                Terminal::Failed(msg) => return Err(StreamError::Broken(msg.clone())),
                Terminal::Open => self.fill_once(&mut observe)?,
            }
        }

        let n = buf.len().min(self.recv_buf.len());
        let front = self.recv_buf.split_to(n);
        buf[..n].copy_from_slice(&front);
        Ok(n)
    }

    /// One receive cycle: pull the next packet from the transport and
    /// absorb it. Sets the terminal state on a `last` chunk, transport
    /// end-of-stream, or failure.
    pub(crate) fn fill_once(
        &mut self,
        observe: &mut impl FnMut(&Packet),
    ) -> Result<(), StreamError> {
        match self.transport.recv() {
            Ok(Some(packet)) => {
                observe(&packet);
                let chunk = &packet.chunk;
                if !chunk.verify_digest() {
                    let offset = chunk.offset().unwrap_or(0);
                    self.terminal = Terminal::Failed(format!("digest mismatch at {offset}"));
                    return Err(StreamError::DigestMismatch { offset });
                }
                self.log_receipt(chunk);
                if chunk.is_last() {
                    self.terminal = Terminal::Ended;
                }
                self.recv_buf.extend_from_slice(chunk.data());
                if let Some(global) = self.global_offset.as_mut() {
                    *global += chunk.data().len() as u64;
                }
                Ok(())
            }
            Ok(None) => {
                self.terminal = Terminal::Ended;
                Ok(())
            }
            Err(err) => {
                self.terminal = Terminal::Failed(err.to_string());
                Err(err)
            }
        }
    }

    /// Whether the receive side has reached its terminal state.
    pub fn is_terminated(&self) -> bool {
        self.terminal != Terminal::Open
    }

    fn log_receipt(&mut self, chunk: &Chunk) {
        self.chunks_received += 1;
        let first = self.chunks_received == 1;
        let last = chunk.is_last();
        let due = self
            .last_receipt_log
            .map_or(true, |at| at.elapsed() >= RECEIPT_LOG_INTERVAL);

        if first || last || due {
            tracing::debug!(
                seq = self.chunks_received,
                offset = chunk.offset().unwrap_or(0),
                len = chunk.data().len(),
                last,
                "chunk received"
            );
            self.last_receipt_log = Some(Instant::now());
        } else {
            tracing::trace!(
                seq = self.chunks_received,
                offset = chunk.offset().unwrap_or(0),
                len = chunk.data().len(),
                "chunk received"
            );
        }
    }

    // ── Copying ──────────────────────────────────────────────────────────────

    pub(crate) fn relay_len(&self) -> usize {
        match self.max_write_chunk_size {
            0 => self.relay_bytes,
            max => max,
        }
    }

    /// Stream everything this file produces into `dst`.
    pub fn copy_to<W: io::Write>(&mut self, dst: &mut W) -> Result<u64, StreamError> {
        let len = self.relay_len();
        pump(self, dst, len).map_err(StreamError::from)
    }

    /// Stream everything `src` produces through this file.
    pub fn copy_from<R: io::Read>(&mut self, src: &mut R) -> Result<u64, StreamError> {
        let len = self.relay_len();
        pump(src, self, len).map_err(StreamError::from)
    }

    // ── Closing ──────────────────────────────────────────────────────────────

    /// Finalize the stream. If any data was written, one empty chunk
    /// flagged `last` tells the receiver the stream is complete. State
    /// is reset even when the terminal send fails, so a file never
    /// leaks offsets into a subsequent stream.
    pub fn close(&mut self) -> Result<(), StreamError> {
        if !self.wrote_any {
            self.reset();
            return Ok(());
        }

        let mut chunk = self.transport.new_chunk();
        chunk.set_offset(self.offset);
        chunk.set_total(self.offset);
        chunk.set_last(true);
        chunk.set_data(Bytes::new());

        let result = self.transport.send(Packet::new(chunk));
        if let Err(err) = &result {
            tracing::warn!(error = %err, "terminal chunk send failed");
        }
        self.reset();
        result
    }

    fn reset(&mut self) {
        self.offset = 0;
        self.wrote_any = false;
        self.recv_buf.clear();
        self.terminal = Terminal::Open;
        self.chunks_received = 0;
        self.last_receipt_log = None;
        self.global_offset = self.global_initial_offset;
    }
}

// ── std::io adapters ──────────────────────────────────────────────────────────

impl<T: Transport> io::Read for ChunkFile<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = ChunkFile::read(self, buf).map_err(io::Error::from)?;
            if n > 0 || buf.is_empty() || self.is_terminated() {
                return Ok(n);
            }
            // An empty non-terminal chunk arrived; keep pulling so that
            // Ok(0) retains its end-of-stream meaning for io callers.
        }
    }
}

impl<T: Transport> io::Write for ChunkFile<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ChunkFile::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        // Chunks are handed to the transport as they are produced;
        // there is nothing buffered on the send side.
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
