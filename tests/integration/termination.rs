//! Stream termination semantics across transports.

use crate::*;
use chute_core::Packet;
use chute_stream::PacketFile;
use chute_transports::{BrokerReceiver, BrokerSender, Consumer, MemoryBroker, TopicPartition};

#[test]
fn terminal_chunk_follows_the_data() {
    init_tracing();
    let broker = MemoryBroker::default();
    let destination = TopicPartition::new("jobs", 0);

    let sender = BrokerSender::new(broker.producer(), destination.clone());
    let mut writer = PacketFile::with_max_chunk_size(sender, 8);
    writer.write(b"twenty-four byte payload").unwrap();
    writer.close().unwrap();

    // 3 data chunks + 1 terminal.
    assert_eq!(broker.message_count(&destination), 4);

    let mut consumer = broker.consumer(destination);
    let mut last_packet = None;
    while let Some(raw) = consumer.poll().unwrap() {
        last_packet = Some(Packet::from_bytes(&raw).unwrap());
    }
    let terminal = last_packet.unwrap().chunk;
    assert!(terminal.is_last());
    assert!(terminal.data().is_empty());
    assert_eq!(terminal.offset(), Some(24));
    assert_eq!(terminal.total(), Some(24));
}

#[test]
fn idle_close_publishes_nothing() {
    init_tracing();
    let broker = MemoryBroker::default();
    let destination = TopicPartition::new("jobs", 1);

    let sender = BrokerSender::new(broker.producer(), destination.clone());
    let mut writer = PacketFile::new(sender);
    writer.close().unwrap();
    writer.close().unwrap();

    assert_eq!(broker.message_count(&destination), 0);
}

#[test]
fn reader_sticks_after_terminal_chunk() {
    init_tracing();
    let broker = MemoryBroker::default();
    let destination = TopicPartition::new("jobs", 2);

    let sender = BrokerSender::new(broker.producer(), destination.clone());
    let mut writer = PacketFile::new(sender);
    writer.write(b"done").unwrap();
    writer.close().unwrap();

    let mut reader = PacketFile::new(BrokerReceiver::new(broker.consumer(destination)));
    let mut out = Vec::new();
    reader.copy_to(&mut out).unwrap();
    assert_eq!(out, b"done");
    assert!(reader.is_terminated());

    // Terminated is sticky; further reads stay at zero.
    let mut buf = [0u8; 4];
    assert_eq!(reader.read(&mut buf).unwrap(), 0);
    assert_eq!(reader.read(&mut buf).unwrap(), 0);
}

#[test]
fn close_reset_allows_a_second_stream_on_one_file() {
    init_tracing();
    let broker = MemoryBroker::default();
    let destination = TopicPartition::new("jobs", 3);

    let sender = BrokerSender::new(broker.producer(), destination.clone());
    let mut writer = PacketFile::with_max_chunk_size(sender, 4);
    writer.write(b"first").unwrap();
    writer.close().unwrap();
    writer.write(b"second").unwrap();
    writer.close().unwrap();

    // The first file terminates on stream one's terminal chunk; a fresh
    // file picks up stream two from the same partition.
    let mut reader = PacketFile::new(BrokerReceiver::new(broker.consumer(destination.clone())));
    let mut out = Vec::new();
    reader.copy_to(&mut out).unwrap();
    assert_eq!(out, b"first");

    let mut reader = PacketFile::new(BrokerReceiver::new(broker.consumer(destination)));
    let mut out = Vec::new();
    reader.copy_to(&mut out).unwrap();
    assert_eq!(out, b"second");
}

#[test]
fn offsets_restart_at_zero_per_stream() {
    init_tracing();
    let broker = MemoryBroker::default();
    let destination = TopicPartition::new("jobs", 4);

    let sender = BrokerSender::new(broker.producer(), destination.clone());
    let mut writer = PacketFile::new(sender);
    writer.write(b"aaaa").unwrap();
    writer.close().unwrap();
    writer.write(b"bb").unwrap();
    writer.close().unwrap();

    let mut consumer = broker.consumer(destination);
    let mut offsets = Vec::new();
    while let Some(raw) = consumer.poll().unwrap() {
        offsets.push(Packet::from_bytes(&raw).unwrap().chunk.offset());
    }
    assert_eq!(
        offsets,
        vec![Some(0), Some(4), Some(0), Some(2)] // data, terminal, data, terminal
    );
}
