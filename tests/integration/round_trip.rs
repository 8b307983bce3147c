//! Byte-level round trips through the RPC loopback pair.

use crate::*;
use chute_stream::PacketFile;
use chute_transports::{stream_pair, RpcStreamTransport};

const K: usize = 16;

/// Write `payload` through one end, read it back through the other.
fn round_trip(payload: &[u8]) -> Vec<u8> {
    let (near, far) = stream_pair();
    let mut writer = PacketFile::with_max_chunk_size(RpcStreamTransport::duplex(near), K);
    let mut reader = PacketFile::new(RpcStreamTransport::duplex(far));

    writer.write(payload).unwrap();
    writer.close().unwrap();
    // Writer gone: the reader sees either the terminal chunk or, for an
    // empty stream, the transport's own end-of-stream.
    drop(writer);

    let mut out = Vec::new();
    reader.copy_to(&mut out).unwrap();
    out
}

#[test]
fn round_trip_boundary_sizes() {
    init_tracing();
    for n in [0, 1, K - 1, K, K + 1, 5 * K, 3 * K + 7] {
        let payload = patterned_payload(n);
        assert_eq!(round_trip(&payload), payload, "payload size {n}");
    }
}

#[test]
fn round_trip_large_payload() {
    init_tracing();
    let payload = patterned_payload(1 << 20);
    let (near, far) = stream_pair();
    let mut writer = PacketFile::with_max_chunk_size(RpcStreamTransport::duplex(near), 32 * 1024);
    let mut reader = PacketFile::new(RpcStreamTransport::duplex(far));

    let mut src = std::io::Cursor::new(payload.clone());
    writer.copy_from(&mut src).unwrap();
    writer.close().unwrap();

    let mut out = Vec::new();
    reader.copy_to(&mut out).unwrap();
    assert_eq!(out, payload);
}

#[test]
fn interleaved_writes_arrive_in_order() {
    init_tracing();
    let (near, far) = stream_pair();
    let mut writer = PacketFile::with_max_chunk_size(RpcStreamTransport::duplex(near), 4);
    let mut reader = PacketFile::new(RpcStreamTransport::duplex(far));

    writer.write(b"alpha ").unwrap();
    writer.write(b"beta ").unwrap();
    writer.write(b"gamma").unwrap();
    writer.close().unwrap();

    let mut out = Vec::new();
    reader.copy_to(&mut out).unwrap();
    assert_eq!(out, b"alpha beta gamma");
}
