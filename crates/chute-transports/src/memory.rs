//! In-process backends: a partitioned broker and an object store.
//!
//! Used by local runs and the test suites. Handles are cheap clones
//! over shared state, so a test can keep one handle for assertions
//! while a transport owns another.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chute_core::StreamError;

use crate::broker::{Consumer, Producer, TopicPartition};
use crate::object_store::ObjectStore;

// ── Broker ────────────────────────────────────────────────────────────────────

/// Partitioned FIFO broker. Per-partition ordering matches what a real
/// broker guarantees; a drained partition reads as stream termination.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    partitions: Arc<Mutex<HashMap<TopicPartition, VecDeque<Vec<u8>>>>>,
}

impl MemoryBroker {
    pub fn producer(&self) -> MemoryProducer {
        MemoryProducer {
            broker: self.clone(),
        }
    }

    /// A consumer bound to one partition.
    pub fn consumer(&self, destination: TopicPartition) -> MemoryConsumer {
        MemoryConsumer {
            broker: self.clone(),
            destination,
        }
    }

    pub fn message_count(&self, destination: &TopicPartition) -> usize {
        self.partitions
            .lock()
            .expect("broker lock")
            .get(destination)
            .map_or(0, |q| q.len())
    }
}

pub struct MemoryProducer {
    broker: MemoryBroker,
}

impl Producer for MemoryProducer {
    fn publish(&mut self, destination: &TopicPartition, payload: &[u8]) -> Result<(), StreamError> {
        self.broker
            .partitions
            .lock()
            .map_err(|_| StreamError::Broker("broker state poisoned".into()))?
            .entry(destination.clone())
            .or_default()
            .push_back(payload.to_vec());
        Ok(())
    }
}

pub struct MemoryConsumer {
    broker: MemoryBroker,
    destination: TopicPartition,
}

impl Consumer for MemoryConsumer {
    fn poll(&mut self) -> Result<Option<Vec<u8>>, StreamError> {
        Ok(self
            .broker
            .partitions
            .lock()
            .map_err(|_| StreamError::Broker("broker state poisoned".into()))?
            .get_mut(&self.destination)
            .and_then(|q| q.pop_front()))
    }
}

// ── Object store ──────────────────────────────────────────────────────────────

/// Bucket/object map with server-side compose. `fail_deletes` simulates
/// a backend that refuses deletions, for exercising best-effort cleanup.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<Mutex<BTreeMap<(String, String), Vec<u8>>>>,
    deletes_fail: Arc<AtomicBool>,
}

impl MemoryObjectStore {
    pub fn get(&self, bucket: &str, object: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .expect("store lock")
            .get(&(bucket.to_string(), object.to_string()))
            .cloned()
    }

    /// Object names in `bucket`, sorted.
    pub fn list(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .expect("store lock")
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, o)| o.clone())
            .collect()
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.deletes_fail.store(fail, Ordering::Relaxed);
    }
}

fn poisoned() -> StreamError {
    StreamError::Transport(std::io::Error::new(
        std::io::ErrorKind::Other,
        "store state poisoned",
    ))
}

impl ObjectStore for MemoryObjectStore {
    fn put(&mut self, bucket: &str, object: &str, data: &[u8]) -> Result<(), StreamError> {
        self.objects
            .lock()
            .map_err(|_| poisoned())?
            .insert((bucket.to_string(), object.to_string()), data.to_vec());
        Ok(())
    }

    fn compose(
        &mut self,
        bucket: &str,
        sources: &[String],
        target: &str,
    ) -> Result<(), StreamError> {
        let mut objects = self.objects.lock().map_err(|_| poisoned())?;
        let mut composed = Vec::new();
        for source in sources {
            let data = objects
                .get(&(bucket.to_string(), source.clone()))
                .ok_or_else(|| StreamError::ObjectMissing {
                    bucket: bucket.to_string(),
                    object: source.clone(),
                })?;
            composed.extend_from_slice(data);
        }
        objects.insert((bucket.to_string(), target.to_string()), composed);
        Ok(())
    }

    fn delete(&mut self, bucket: &str, object: &str) -> Result<(), StreamError> {
        if self.deletes_fail.load(Ordering::Relaxed) {
            return Err(StreamError::Transport(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("delete refused: {bucket}/{object}"),
            )));
        }
        self.objects
            .lock()
            .map_err(|_| poisoned())?
            .remove(&(bucket.to_string(), object.to_string()));
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
