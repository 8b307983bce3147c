//! Core data model for chute: chunks, packets, errors, configuration.
//!
//! Everything that crosses a transport boundary is defined here so the
//! streaming engine and the transport adapters agree on one vocabulary.

pub mod chunk;
pub mod config;
pub mod error;
pub mod packet;

pub use chunk::{Chunk, Digest};
pub use error::StreamError;
pub use packet::{Codec, Packet, PayloadMetadata, StreamOptions};
