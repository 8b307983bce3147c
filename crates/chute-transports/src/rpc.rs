//! RPC-stream transport — packets over an established duplex stream.
//!
//! `send`/`recv` map 1:1 onto the stream handle's native primitives.
//! Three call shapes are supported:
//!
//! - **Duplex**: both sides send and receive freely.
//! - **Upload**: the client streams packets and collects one terminal
//!   status message via [`RpcStreamTransport::finish`].
//! - **Download**: the server streams in response to one request; the
//!   client side never sends.
//!
//! Before discarding a stream, end the client half and drain one
//! residual receive ([`finish`](RpcStreamTransport::finish)) —
//! otherwise frames buffered in the underlying connection are lost
//! when the call context goes away.

use std::sync::mpsc::{channel, Receiver, Sender};

use chute_core::{Packet, StreamError};
use chute_stream::Transport;

// ── Stream handle ─────────────────────────────────────────────────────────────

/// One end of an established bidirectional packet stream.
pub struct StreamHandle {
    tx: Option<Sender<Packet>>,
    rx: Receiver<Packet>,
}

/// Create a connected pair of stream ends, one per peer.
pub fn stream_pair() -> (StreamHandle, StreamHandle) {
    let (a_tx, b_rx) = channel();
    let (b_tx, a_rx) = channel();
    (
        StreamHandle {
            tx: Some(a_tx),
            rx: a_rx,
        },
        StreamHandle {
            tx: Some(b_tx),
            rx: b_rx,
        },
    )
}

impl StreamHandle {
    fn send(&mut self, packet: Packet) -> Result<(), StreamError> {
        match &self.tx {
            Some(tx) => tx.send(packet).map_err(|_| StreamError::Disconnected),
            None => Err(StreamError::Disconnected),
        }
    }

    /// Blocking receive. Peer disconnect is the stream's natural end,
    /// not a failure.
    fn recv(&mut self) -> Result<Option<Packet>, StreamError> {
        Ok(self.rx.recv().ok())
    }

    /// End this side's send half. The peer observes end-of-stream once
    /// it drains what was already sent.
    fn half_close(&mut self) {
        self.tx = None;
    }
}

// ── Call shapes ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallShape {
    Duplex,
    Upload,
    Download,
}

/// Transport over one RPC stream, restricted to its call shape.
pub struct RpcStreamTransport {
    stream: StreamHandle,
    shape: CallShape,
}

impl RpcStreamTransport {
    /// Both directions open.
    pub fn duplex(stream: StreamHandle) -> Self {
        Self {
            stream,
            shape: CallShape::Duplex,
        }
    }

    /// Client-streaming call: send only, one status on [`finish`](Self::finish).
    pub fn upload(stream: StreamHandle) -> Self {
        Self {
            stream,
            shape: CallShape::Upload,
        }
    }

    /// Server-streaming call: receive only.
    pub fn download(stream: StreamHandle) -> Self {
        Self {
            stream,
            shape: CallShape::Download,
        }
    }

    /// End the send half and drain one residual message — the terminal
    /// status of an upload call, or whatever the peer had buffered.
    /// Consumes the transport: the stream is done after this.
    pub fn finish(mut self) -> Result<Option<Packet>, StreamError> {
        self.stream.half_close();
        let residual = self.stream.recv()?;
        tracing::debug!(got_residual = residual.is_some(), "rpc stream finished");
        Ok(residual)
    }
}

impl Transport for RpcStreamTransport {
    fn send(&mut self, packet: Packet) -> Result<(), StreamError> {
        match self.shape {
            CallShape::Download => Err(StreamError::SendUnsupported),
            CallShape::Duplex | CallShape::Upload => self.stream.send(packet),
        }
    }

    fn recv(&mut self) -> Result<Option<Packet>, StreamError> {
        match self.shape {
            CallShape::Upload => Err(StreamError::ReceiveUnsupported),
            CallShape::Duplex | CallShape::Download => self.stream.recv(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
