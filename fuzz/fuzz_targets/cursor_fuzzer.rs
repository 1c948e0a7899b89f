//! Fuzz target for continuation cursors
//!
//! Cursors are opaque to clients but come back to the service as untrusted
//! bytes. A forged or replayed cursor must never widen what a page returns.
//!
//! # Strategy
//!
//! - Unstructured cursor bytes
//! - Genuine cursors with flipped bytes
//! - Genuine cursors replayed against a different channel
//! - Variable page limits, including zero and oversized
//!
//! # Invariants
//!
//! - The service NEVER panics on cursor input
//! - A rejected cursor is always `Invalid`
//! - An accepted cursor yields a page of at most `limit` records, all from
//!   the requested channel, in strictly increasing sequence order
//! - A cursor issued for one channel is never accepted for another

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lockboard_proto::{
    Cursor, EncryptedContent, NewChannel, RawPage, ServiceError, UserId, ENVELOPE_VERSION,
};
use lockboard_server::{BoardService, MemoryStorage, OpenAccess, SystemEnv};

#[derive(Debug, Arbitrary)]
struct CursorScenario {
    /// Records seeded into the first channel (0-63)
    record_count: u8,
    /// Page size for the seeding walk that produces genuine cursors
    walk_limit: u8,
    /// Attack to mount
    attack: CursorAttack,
}

#[derive(Debug, Arbitrary)]
enum CursorAttack {
    /// Arbitrary bytes presented as a cursor
    Forged { bytes: Vec<u8>, limit: u16 },
    /// A genuine cursor with bytes overwritten
    Mutated { flips: Vec<(u8, u8)>, limit: u16 },
    /// A genuine cursor presented for the other channel
    CrossChannel { limit: u16 },
}

type Service = BoardService<SystemEnv, MemoryStorage, OpenAccess>;

fuzz_target!(|scenario: CursorScenario| {
    let service = BoardService::new(SystemEnv::new(), MemoryStorage::new(), OpenAccess);
    let requester = UserId::new("fuzzer");

    let Some(first) = create_channel(&service, &requester, "1") else { return };
    let Some(second) = create_channel(&service, &requester, "2") else { return };

    let record_count = usize::from(scenario.record_count % 64);
    if record_count > 0 {
        let batch = (0..record_count).map(|_| envelope()).collect();
        if service.add_contents(&requester, &first, batch).is_err() {
            return;
        }
    }
    if service.add_contents(&requester, &second, vec![envelope()]).is_err() {
        return;
    }

    let walk_limit = usize::from(scenario.walk_limit % 16).max(1);
    let genuine = service
        .list_contents(&requester, &first, None, walk_limit)
        .ok()
        .and_then(|page| page.next);

    match scenario.attack {
        CursorAttack::Forged { bytes, limit } => {
            let cursor = Cursor::from_bytes(bytes);
            check_page(&service, &requester, &first, &cursor, usize::from(limit));
        },

        CursorAttack::Mutated { flips, limit } => {
            let Some(cursor) = genuine else { return };
            let mut bytes = cursor.as_bytes().to_vec();
            if bytes.is_empty() {
                return;
            }
            for (position, value) in flips {
                let index = usize::from(position) % bytes.len();
                bytes[index] = value;
            }
            check_page(&service, &requester, &first, &Cursor::from_bytes(bytes), usize::from(limit));
        },

        CursorAttack::CrossChannel { limit } => {
            let Some(cursor) = genuine else { return };
            let result = service.list_contents(&requester, &second, Some(&cursor), usize::from(limit));
            assert!(
                matches!(result, Err(ServiceError::Invalid { .. })),
                "cursor accepted for another channel: {result:?}"
            );
        },
    }
});

fn check_page(service: &Service, requester: &UserId, channel_id: &str, cursor: &Cursor, limit: usize) {
    match service.list_contents(requester, channel_id, Some(cursor), limit) {
        Ok(RawPage { items, .. }) => {
            assert!(limit > 0, "zero limit accepted");
            assert!(items.len() <= limit, "page exceeds its limit");
            assert!(items.iter().all(|item| item.channel_id == channel_id), "page leaked records");
            assert!(
                items.windows(2).all(|pair| pair[0].created_at < pair[1].created_at),
                "page out of order"
            );
        },
        Err(ServiceError::Invalid { .. }) => {},
        Err(other) => panic!("unexpected rejection: {other:?}"),
    }
}

fn create_channel(service: &Service, requester: &UserId, n: &str) -> Option<String> {
    let request = NewChannel {
        acl_url_link: format!("acl://conversations/{n}"),
        kms_resource_url: format!("kms://resources/{n}"),
        default_encryption_key_url: format!("kms://keys/{n}"),
        kind: "whiteboard".to_string(),
    };
    service.create_channel(requester, request).ok().map(|channel| channel.channel_id)
}

fn envelope() -> EncryptedContent {
    EncryptedContent {
        version: ENVELOPE_VERSION,
        encryption_key_url: "kms://keys/1".to_string(),
        nonce: [0; 24],
        ciphertext: vec![0xAA; 16],
    }
}

