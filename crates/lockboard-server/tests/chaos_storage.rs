//! Chaos property tests for Storage implementations
//!
//! These tests verify that storage implementations maintain invariants even
//! when wrapped in `ChaoticStorage`:
//! - A batch append succeeds or fails as a whole (no partial batches)
//! - Content sequences stay gap-free after failed appends
//! - Reads after successful writes are consistent

use lockboard_proto::{
    ActivityState, Channel, ENVELOPE_VERSION, EncryptedContent, StoredContent,
};
use lockboard_server::storage::{
    ChaoticStorage, MemoryStorage, RedbStorage, SeqRange, Storage, StorageError,
};
use proptest::prelude::*;
use tempfile::tempdir;

fn test_channel(id: &str, seq: u64) -> Channel {
    Channel {
        channel_id: id.to_string(),
        channel_url: format!("board://channels/{id}"),
        acl_url: format!("acl://channels/{id}"),
        acl_url_link: "acl://conversations/1".to_string(),
        kms_resource_url: "kms://resources/1".to_string(),
        default_encryption_key_url: "kms://keys/1".to_string(),
        kind: "whiteboard".to_string(),
        image: None,
        state: ActivityState::Inactive,
        created_at: seq,
    }
}

fn test_batch(channel_id: &str, first: u64, size: usize) -> Vec<StoredContent> {
    (0..size as u64)
        .map(|offset| StoredContent {
            content_id: format!("{channel_id}-{}", first + offset),
            channel_id: channel_id.to_string(),
            created_at: first + offset,
            content: EncryptedContent {
                version: ENVELOPE_VERSION,
                encryption_key_url: "kms://keys/2".to_string(),
                nonce: [offset as u8; 24],
                ciphertext: vec![offset as u8; 4],
            },
        })
        .collect()
}

/// Verify that the stored log is gap-free and matches the counter
fn verify_log(storage: &impl Storage, channel_id: &str) -> Result<u64, StorageError> {
    let next = storage.next_content_sequence(channel_id)?;
    let contents =
        storage.load_contents(channel_id, SeqRange { from: 0, until: u64::MAX, limit: usize::MAX })?;

    for (expected, content) in contents.iter().enumerate() {
        assert_eq!(content.created_at, expected as u64);
    }
    assert_eq!(contents.len() as u64, next);

    Ok(next)
}

/// Append batches through chaos; returns the number of records that landed
fn append_through_chaos<S: Storage>(
    storage: &ChaoticStorage<S>,
    batches: &[usize],
) -> u64 {
    let mut landed = 0u64;
    for &size in batches {
        let Ok(first) = storage.next_content_sequence("c0") else { continue };
        let batch = test_batch("c0", first, size);

        if storage.append_contents(&test_channel("c0", 0), first, &batch).is_ok() {
            landed += size as u64;
        }
    }
    landed
}

#[test]
fn prop_memory_chaos_atomic_batches() {
    proptest!(|(
        failure_rate in 0.0..0.8,
        seed in any::<u64>(),
        batches in prop::collection::vec(1usize..20, 1..30),
    )| {
        let memory = MemoryStorage::new();
        memory.create_channel(&test_channel("c0", 0)).unwrap();
        let storage = ChaoticStorage::new(memory, failure_rate, seed);

        let landed = append_through_chaos(&storage, &batches);

        let stored = verify_log(storage.inner(), "c0").unwrap();
        prop_assert_eq!(stored, landed);
    });
}

#[test]
fn prop_redb_chaos_atomic_batches() {
    proptest!(ProptestConfig::with_cases(16), |(
        failure_rate in 0.0..0.8,
        seed in any::<u64>(),
        batches in prop::collection::vec(1usize..20, 1..10),
    )| {
        let dir = tempdir().unwrap();
        let redb = RedbStorage::open(dir.path().join("chaos.redb")).unwrap();
        redb.create_channel(&test_channel("c0", 0)).unwrap();
        let storage = ChaoticStorage::new(redb, failure_rate, seed);

        let landed = append_through_chaos(&storage, &batches);

        let stored = verify_log(storage.inner(), "c0").unwrap();
        prop_assert_eq!(stored, landed);
    });
}

#[test]
fn misnumbered_batch_is_rejected_whole() {
    let storage = MemoryStorage::new();
    storage.create_channel(&test_channel("c0", 0)).unwrap();

    let mut batch = test_batch("c0", 0, 5);
    batch[3].created_at = 42;

    assert!(matches!(
        storage.append_contents(&test_channel("c0", 0), 0, &batch),
        Err(StorageError::Conflict { .. })
    ));
    assert_eq!(verify_log(&storage, "c0").unwrap(), 0);
}

#[test]
fn chaos_counts_operations() {
    let storage = ChaoticStorage::new(MemoryStorage::new(), 0.5, 1234);

    for n in 0..50 {
        let seq = storage.inner().next_channel_sequence().unwrap();
        let _ = storage.create_channel(&test_channel(&format!("c{n}"), seq));
    }

    assert_eq!(storage.operation_count(), 50);
    assert!(storage.injected_failures() > 0);
    assert!(storage.injected_failures() < 50);
    assert_eq!(storage.inner().channel_count(), 50 - storage.injected_failures());
}
