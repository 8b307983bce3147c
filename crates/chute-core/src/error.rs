//! Error taxonomy for the streaming core.
//!
//! Three families: transport failures (propagated undecorated, never
//! retried), protocol violations (detected before any I/O), and the
//! sticky state left behind once a stream has failed. Termination is
//! not an error — the engine reports end-of-stream as a zero-byte read.

use std::io;

/// Errors surfaced by files and transports.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Underlying transport send/receive failed.
    #[error("transport: {0}")]
    Transport(#[from] io::Error),

    /// The peer end of an in-process stream went away mid-send.
    #[error("stream closed by peer")]
    Disconnected,

    /// A write slice exceeded the fixed maximum chunk size.
    /// Only reachable if the bound changes mid-stream, which is disallowed.
    #[error("write of {got} bytes exceeds maximum chunk size {max}")]
    ChunkTooLarge { got: usize, max: usize },

    /// Receive attempted on a transport that only supports upload.
    #[error("receive is not supported on this transport")]
    ReceiveUnsupported,

    /// Send attempted on a transport bound to a download call.
    #[error("send is not supported on this transport")]
    SendUnsupported,

    /// Decompression was requested but the peer advertised no usable codec.
    #[error("no codec negotiated on incoming stream")]
    CodecUnavailable,

    /// The codec itself failed while encoding or decoding.
    #[error("codec: {0}")]
    Codec(String),

    /// A received chunk's payload did not match its digest.
    #[error("chunk digest mismatch at offset {offset}")]
    DigestMismatch { offset: u64 },

    /// Staging one more object would exceed the backend's compose ceiling.
    #[error("{staged} staged objects would exceed compose limit {limit}")]
    ComposeLimit { staged: usize, limit: usize },

    /// Object-store lookup failed.
    #[error("object not found: {bucket}/{object}")]
    ObjectMissing { bucket: String, object: String },

    /// Broker publish or poll failed.
    #[error("broker: {0}")]
    Broker(String),

    /// Packet value could not be encoded or decoded.
    #[error("packet encoding: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The stream already failed on an earlier call; the original error
    /// message is preserved.
    #[error("stream previously failed: {0}")]
    Broken(String),
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Transport(inner) => inner,
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
