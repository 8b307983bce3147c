//! Codec negotiation and transparency over a real transport pair.

use crate::*;
use chute_core::{Codec, StreamError};
use chute_stream::{CompressingFile, PacketFile};
use chute_transports::{stream_pair, RpcStreamTransport};

fn compressible_payload(len: usize) -> Vec<u8> {
    b"status=ok queue=default attempt=1 "
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}

#[test]
fn compressed_stream_is_transparent_end_to_end() {
    init_tracing();
    let (near, far) = stream_pair();
    let payload = compressible_payload(200_000);

    let writer_file = PacketFile::with_max_chunk_size(RpcStreamTransport::duplex(near), 8192);
    let mut writer = CompressingFile::new(writer_file, Codec::Zlib, false);
    writer.set_filename("report.txt");
    writer.write(&payload).unwrap();
    writer.close().unwrap();

    let mut reader = CompressingFile::new(
        PacketFile::new(RpcStreamTransport::duplex(far)),
        Codec::None,
        true,
    );
    let mut out = Vec::new();
    reader.copy_to(&mut out).unwrap();

    assert_eq!(out, payload);
    assert_eq!(reader.filename(), Some("report.txt"));
    assert_eq!(
        reader.received_stream_options().map(|o| o.codec),
        Some(Codec::Zlib)
    );
}

#[test]
fn incompressible_payload_still_round_trips() {
    init_tracing();
    let (near, far) = stream_pair();
    let payload = patterned_payload(64 * 1024);

    let writer_file = PacketFile::with_max_chunk_size(RpcStreamTransport::duplex(near), 4096);
    let mut writer = CompressingFile::new(writer_file, Codec::Zlib, false);
    let mut src = std::io::Cursor::new(payload.clone());
    writer.copy_from(&mut src).unwrap();
    writer.close().unwrap();

    let mut reader = CompressingFile::new(
        PacketFile::new(RpcStreamTransport::duplex(far)),
        Codec::None,
        true,
    );
    let mut out = Vec::new();
    reader.copy_to(&mut out).unwrap();
    assert_eq!(out, payload);
}

#[test]
fn expecting_compression_from_a_plain_peer_fails_fast() {
    init_tracing();
    let (near, far) = stream_pair();

    let mut writer = PacketFile::new(RpcStreamTransport::duplex(near));
    writer.write(b"uncompressed bytes").unwrap();
    writer.close().unwrap();

    let mut reader = CompressingFile::new(
        PacketFile::new(RpcStreamTransport::duplex(far)),
        Codec::None,
        true,
    );
    let mut buf = [0u8; 16];
    assert!(matches!(
        reader.read(&mut buf),
        Err(StreamError::CodecUnavailable)
    ));
}

#[test]
fn idle_compressed_close_leaves_the_wire_silent() {
    init_tracing();
    let (near, far) = stream_pair();

    let mut writer = CompressingFile::new(
        PacketFile::new(RpcStreamTransport::duplex(near)),
        Codec::Zlib,
        false,
    );
    writer.close().unwrap();
    drop(writer);

    // Nothing was sent, so the peer observes only the hang-up.
    let mut reader = PacketFile::new(RpcStreamTransport::duplex(far));
    let mut buf = [0u8; 8];
    assert_eq!(reader.read(&mut buf).unwrap(), 0);
    assert!(reader.is_terminated());
}
