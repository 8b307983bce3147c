//! Broker transport — one serialized packet per broker message.
//!
//! The broker layer never sub-chunks: the chunking decision was already
//! made by the file above it, so each outgoing packet becomes exactly
//! one message on the bound topic/partition. Message keys and headers
//! are unused. Ordering is whatever the broker guarantees per
//! partition; delivery is at-least-once from the caller's perspective
//! and no replay guard is applied here — consumer-group and offset
//! policy belong to the collaborator that owns the broker connection.

use chute_core::{Packet, StreamError};
use chute_stream::Transport;

// ── Addressing ────────────────────────────────────────────────────────────────

/// Destination of one broker-backed stream, fixed for the lifetime of
/// a file instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

impl std::fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.topic, self.partition)
    }
}

// ── Backend seams ─────────────────────────────────────────────────────────────

/// Synchronous publisher. Publish failures surface as send errors.
pub trait Producer {
    fn publish(&mut self, destination: &TopicPartition, payload: &[u8]) -> Result<(), StreamError>;
}

/// A consumer bound to one partition (or one consumer-group claim).
/// `Ok(None)` means the partition has no further messages — stream
/// termination, not an error.
pub trait Consumer {
    fn poll(&mut self) -> Result<Option<Vec<u8>>, StreamError>;
}

// ── Transports ────────────────────────────────────────────────────────────────

/// Send side: each packet published synchronously as one message.
pub struct BrokerSender<P: Producer> {
    producer: P,
    destination: TopicPartition,
}

impl<P: Producer> BrokerSender<P> {
    pub fn new(producer: P, destination: TopicPartition) -> Self {
        Self {
            producer,
            destination,
        }
    }

    pub fn destination(&self) -> &TopicPartition {
        &self.destination
    }
}

impl<P: Producer> Transport for BrokerSender<P> {
    fn send(&mut self, packet: Packet) -> Result<(), StreamError> {
        let payload = packet.to_bytes()?;
        self.producer.publish(&self.destination, &payload)?;
        tracing::trace!(
            destination = %self.destination,
            bytes = payload.len(),
            "packet published"
        );
        Ok(())
    }

    fn recv(&mut self) -> Result<Option<Packet>, StreamError> {
        Err(StreamError::ReceiveUnsupported)
    }
}

/// Receive side: packets deserialized off a bound partition consumer.
pub struct BrokerReceiver<C: Consumer> {
    consumer: C,
}

impl<C: Consumer> BrokerReceiver<C> {
    pub fn new(consumer: C) -> Self {
        Self { consumer }
    }
}

impl<C: Consumer> Transport for BrokerReceiver<C> {
    fn send(&mut self, _packet: Packet) -> Result<(), StreamError> {
        Err(StreamError::SendUnsupported)
    }

    fn recv(&mut self) -> Result<Option<Packet>, StreamError> {
        match self.consumer.poll()? {
            Some(payload) => Ok(Some(Packet::from_bytes(&payload)?)),
            None => Ok(None),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
