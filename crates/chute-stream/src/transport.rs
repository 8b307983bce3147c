//! The transport seam.
//!
//! One trait abstracts the three wire technologies (RPC stream, broker,
//! object store). Intentionally minimal: create a chunk, send a packet,
//! receive a packet. Everything else — framing, marshaling, retries,
//! flow control — belongs to the backend or the caller.

use chute_core::{Chunk, Packet, StreamError};

/// A backend bound to one destination for the lifetime of a file.
///
/// `send` and `recv` are synchronous, blocking calls; a chunk exchange
/// either completes or fails atomically. The engine never retries: a
/// broken transport must be torn down and a new file/transport pair
/// opened by the caller.
pub trait Transport {
    /// Produce a fresh chunk in whatever shape this backend frames.
    fn new_chunk(&self) -> Chunk {
        Chunk::new()
    }

    /// Transmit one packet. Blocks until the backend accepts it.
    fn send(&mut self, packet: Packet) -> Result<(), StreamError>;

    /// Block for the next packet. `Ok(None)` is the backend's own
    /// end-of-stream signal, distinct from a hard failure.
    fn recv(&mut self) -> Result<Option<Packet>, StreamError>;
}
