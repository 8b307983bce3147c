//! Object-store uploads: staging, compose, cleanup.

use crate::*;
use chute_stream::PacketFile;
use chute_transports::{MemoryObjectStore, ObjectStoreTransport};

#[test]
fn upload_composes_into_the_destination_object() {
    init_tracing();
    let store = MemoryObjectStore::default();
    let payload = patterned_payload(10_000);

    let transport = ObjectStoreTransport::new(store.clone(), "artifacts", "build-991.tar");
    let mut file = PacketFile::with_max_chunk_size(transport, 1024);
    let mut src = std::io::Cursor::new(payload.clone());
    file.copy_from(&mut src).unwrap();
    file.close().unwrap();

    assert_eq!(
        store.get("artifacts", "build-991.tar"),
        Some(payload)
    );
    // All temporaries composed and deleted.
    assert_eq!(store.list("artifacts"), vec!["build-991.tar".to_string()]);
}

#[test]
fn temporaries_exist_mid_stream_and_vanish_after_close() {
    init_tracing();
    let store = MemoryObjectStore::default();
    let transport = ObjectStoreTransport::new(store.clone(), "artifacts", "partial.bin");
    let mut file = PacketFile::with_max_chunk_size(transport, 4);

    file.write(b"01234567").unwrap(); // two chunks staged

    let staged = store.list("artifacts");
    assert_eq!(staged.len(), 2);
    assert!(staged.iter().all(|name| name.starts_with("partial.bin_")));
    assert!(store.get("artifacts", "partial.bin").is_none());

    file.close().unwrap();
    assert_eq!(store.list("artifacts"), vec!["partial.bin".to_string()]);
    assert_eq!(
        store.get("artifacts", "partial.bin").as_deref(),
        Some(b"01234567".as_ref())
    );
}

#[test]
fn idle_close_leaves_the_bucket_untouched() {
    init_tracing();
    let store = MemoryObjectStore::default();
    let transport = ObjectStoreTransport::new(store.clone(), "artifacts", "never.bin");
    let mut file = PacketFile::new(transport);
    file.close().unwrap();
    assert!(store.list("artifacts").is_empty());
}

#[test]
fn two_sequential_uploads_through_one_file() {
    init_tracing();
    let store = MemoryObjectStore::default();
    let transport = ObjectStoreTransport::new(store.clone(), "artifacts", "rolling.log");
    let mut file = PacketFile::with_max_chunk_size(transport, 4);

    file.write(b"first segment").unwrap();
    file.close().unwrap();
    file.write(b"second segment").unwrap();
    file.close().unwrap();

    // The second upload recomposes the same destination; last one wins.
    assert_eq!(
        store.get("artifacts", "rolling.log").as_deref(),
        Some(b"second segment".as_ref())
    );
    assert_eq!(store.list("artifacts"), vec!["rolling.log".to_string()]);
}

#[test]
fn failed_temp_cleanup_still_yields_the_final_object() {
    init_tracing();
    let store = MemoryObjectStore::default();
    store.fail_deletes(true);

    let transport = ObjectStoreTransport::new(store.clone(), "artifacts", "sticky.bin");
    let mut file = PacketFile::with_max_chunk_size(transport, 2);
    file.write(b"abcd").unwrap();
    file.close().unwrap();

    assert_eq!(
        store.get("artifacts", "sticky.bin").as_deref(),
        Some(b"abcd".as_ref())
    );
    // Two temporaries remain alongside the destination.
    assert_eq!(store.list("artifacts").len(), 3);
}
