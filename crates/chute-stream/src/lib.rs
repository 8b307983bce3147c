//! Transport-agnostic chunked streaming.
//!
//! The engine turns a sequence of framed chunks into byte-stream
//! semantics: [`ChunkFile`] does the chunking, buffering, and
//! termination bookkeeping over any [`Transport`]; [`PacketFile`] adds
//! the first-packet envelope (stream options, payload metadata);
//! [`CompressingFile`] layers an optional transparent codec on top.
//!
//! Callers bind a transport to one destination, open a file over it,
//! and use it like any readable/writable/closable stream regardless of
//! which wire technology sits underneath.

pub mod chunk_file;
pub mod compress;
mod copy;
pub mod packet_file;
pub mod transport;

pub use chunk_file::ChunkFile;
pub use compress::CompressingFile;
pub use packet_file::PacketFile;
pub use transport::Transport;
