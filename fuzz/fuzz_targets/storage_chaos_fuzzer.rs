//! Fuzz target for the board service under storage failures
//!
//! Drives a single channel through batches, listings and lifecycle changes
//! while ChaoticStorage fails operations at a fuzzer-chosen rate, and checks
//! the surviving state against a model of acknowledged requests.
//!
//! # Strategy
//!
//! - Variable failure rates (0% to 90%)
//! - Mixed appends, listings, delete-all and lifecycle transitions
//! - Compare the healthy inner storage with acknowledged results
//!
//! # Invariants
//!
//! - The service NEVER panics on storage errors
//! - Storage failures surface as `Unavailable`
//! - A batch is stored whole when acknowledged and not at all otherwise
//! - No write is ever acknowledged on a locked channel

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lockboard_proto::{EncryptedContent, NewChannel, ServiceError, UserId, ENVELOPE_VERSION};
use lockboard_server::{BoardService, ChaoticStorage, MemoryStorage, OpenAccess, SystemEnv};

#[derive(Debug, Arbitrary)]
struct ChaosScenario {
    /// Seed for ChaoticStorage RNG (deterministic failures)
    chaos_seed: u64,
    /// Failure rate 0-9 maps to 0%-90%
    failure_rate_tenth: u8,
    /// Operations against the channel
    operations: Vec<ChaosOperation>,
}

#[derive(Debug, Arbitrary)]
enum ChaosOperation {
    /// Append a batch of 1-16 records
    Append { size: u8 },
    /// Read one page
    List { limit: u8 },
    /// Remove every record
    DeleteAll,
    /// Lock the channel for deletion
    Lock,
    /// Mark the channel active
    KeepActive,
}

fuzz_target!(|scenario: ChaosScenario| {
    let failure_rate = f64::from(scenario.failure_rate_tenth % 10) / 10.0;
    let storage = ChaoticStorage::new(MemoryStorage::new(), failure_rate, scenario.chaos_seed);
    let service = BoardService::new(SystemEnv::new(), storage, OpenAccess);
    let requester = UserId::new("fuzzer");

    let request = NewChannel {
        acl_url_link: "acl://conversations/1".to_string(),
        kms_resource_url: "kms://resources/1".to_string(),
        default_encryption_key_url: "kms://keys/1".to_string(),
        kind: "whiteboard".to_string(),
    };
    let Ok(channel) = service.create_channel(&requester, request) else { return };
    let channel_id = channel.channel_id;

    let mut stored = 0usize;
    let mut locked = false;

    for op in scenario.operations {
        match op {
            ChaosOperation::Append { size } => {
                let size = usize::from(size % 16) + 1;
                let batch = (0..size).map(|_| envelope()).collect();

                match service.add_contents(&requester, &channel_id, batch) {
                    Ok(records) => {
                        assert!(!locked, "write acknowledged on a locked channel");
                        assert_eq!(records.len(), size);
                        stored += size;
                    },
                    Err(ServiceError::Locked { .. }) => assert!(locked),
                    Err(err) => assert_unavailable(&err),
                }
            },

            ChaosOperation::List { limit } => {
                match service.list_contents(&requester, &channel_id, None, usize::from(limit)) {
                    Ok(page) => {
                        assert!(limit > 0);
                        assert!(page.items.len() <= stored);
                    },
                    Err(ServiceError::Invalid { .. }) => assert_eq!(limit, 0),
                    Err(err) => assert_unavailable(&err),
                }
            },

            ChaosOperation::DeleteAll => match service.delete_all_contents(&requester, &channel_id) {
                Ok(()) => {
                    assert!(!locked, "delete acknowledged on a locked channel");
                    stored = 0;
                },
                Err(ServiceError::Locked { .. }) => assert!(locked),
                Err(err) => assert_unavailable(&err),
            },

            ChaosOperation::Lock => match service.lock_for_deletion(&requester, &channel_id) {
                Ok(_) => locked = true,
                Err(err) => assert_unavailable(&err),
            },

            ChaosOperation::KeepActive => match service.keep_active(&requester, &channel_id) {
                Ok(_) => assert!(!locked, "locked channel reactivated"),
                Err(ServiceError::Locked { .. }) => assert!(locked),
                Err(err) => assert_unavailable(&err),
            },
        }

        assert_eq!(
            service.storage().inner().total_content_count(),
            stored,
            "storage diverged from acknowledged writes"
        );
    }
});

fn assert_unavailable(err: &ServiceError) {
    assert!(matches!(err, ServiceError::Unavailable { .. }), "unexpected rejection: {err:?}");
}

fn envelope() -> EncryptedContent {
    EncryptedContent {
        version: ENVELOPE_VERSION,
        encryption_key_url: "kms://keys/1".to_string(),
        nonce: [0; 24],
        ciphertext: vec![0x5A; 32],
    }
}
