//! Broker transport behavior beyond a single round trip.

use crate::*;
use chute_core::Packet;
use chute_stream::PacketFile;
use chute_transports::{BrokerReceiver, BrokerSender, Consumer, MemoryBroker, TopicPartition};

#[test]
fn one_broker_message_per_chunk_plus_terminal() {
    init_tracing();
    let broker = MemoryBroker::default();
    let destination = TopicPartition::new("uploads", 0);
    let payload = patterned_payload(100);

    let sender = BrokerSender::new(broker.producer(), destination.clone());
    let mut writer = PacketFile::with_max_chunk_size(sender, 16);
    writer.write(&payload).unwrap();
    writer.close().unwrap();

    // ceil(100 / 16) data messages + 1 terminal.
    assert_eq!(broker.message_count(&destination), 8);
}

#[test]
fn envelope_rides_only_the_first_message() {
    init_tracing();
    let broker = MemoryBroker::default();
    let destination = TopicPartition::new("uploads", 1);

    let sender = BrokerSender::new(broker.producer(), destination.clone());
    let mut writer = PacketFile::with_max_chunk_size(sender, 8);
    writer.set_filename("shard-03.dat");
    writer.write(&patterned_payload(40)).unwrap();
    writer.close().unwrap();

    let mut consumer = broker.consumer(destination);
    let mut seen = 0;
    while let Some(raw) = consumer.poll().unwrap() {
        let packet = Packet::from_bytes(&raw).unwrap();
        if seen == 0 {
            assert_eq!(
                packet.metadata.as_ref().and_then(|m| m.filename.as_deref()),
                Some("shard-03.dat")
            );
        } else {
            assert!(packet.metadata.is_none());
            assert!(packet.stream_options.is_none());
        }
        seen += 1;
    }
    assert_eq!(seen, 6);
}

#[test]
fn chunk_digests_survive_broker_serialization() {
    init_tracing();
    let broker = MemoryBroker::default();
    let destination = TopicPartition::new("uploads", 2);
    let payload = patterned_payload(1000);

    let sender = BrokerSender::new(broker.producer(), destination.clone());
    let mut writer = PacketFile::with_max_chunk_size(sender, 128);
    writer.write(&payload).unwrap();
    writer.close().unwrap();

    let receiver = BrokerReceiver::new(broker.consumer(destination));
    let mut reader = PacketFile::new(receiver);
    let mut out = Vec::new();
    reader.copy_to(&mut out).unwrap();
    assert_eq!(out, payload);
}

#[test]
fn interleaved_partitions_stay_isolated() {
    init_tracing();
    let broker = MemoryBroker::default();
    let even = TopicPartition::new("uploads", 4);
    let odd = TopicPartition::new("uploads", 5);

    let mut w_even = PacketFile::new(BrokerSender::new(broker.producer(), even.clone()));
    let mut w_odd = PacketFile::new(BrokerSender::new(broker.producer(), odd.clone()));
    for i in 0..10u8 {
        if i % 2 == 0 {
            w_even.write(&[i]).unwrap();
        } else {
            w_odd.write(&[i]).unwrap();
        }
    }
    w_even.close().unwrap();
    w_odd.close().unwrap();

    let mut out = Vec::new();
    PacketFile::new(BrokerReceiver::new(broker.consumer(even)))
        .copy_to(&mut out)
        .unwrap();
    assert_eq!(out, &[0, 2, 4, 6, 8]);

    let mut out = Vec::new();
    PacketFile::new(BrokerReceiver::new(broker.consumer(odd)))
        .copy_to(&mut out)
        .unwrap();
    assert_eq!(out, &[1, 3, 5, 7, 9]);
}
