//! Concrete transport adapters for the chute streaming engine.
//!
//! Three wire technologies, one chunk-exchange state machine:
//! `idle → sending/receiving → terminal (done | error)`. Only the
//! primitives differ — an RPC stream's send/recv, a broker's
//! publish/poll, an object store's put/compose.
//!
//! The `memory` module provides in-process broker and object-store
//! backends for local runs and tests.

pub mod broker;
pub mod memory;
pub mod object_store;
pub mod rpc;

pub use broker::{BrokerReceiver, BrokerSender, Consumer, Producer, TopicPartition};
pub use memory::{MemoryBroker, MemoryObjectStore};
pub use object_store::{ObjectStore, ObjectStoreTransport};
pub use rpc::{stream_pair, RpcStreamTransport, StreamHandle};
