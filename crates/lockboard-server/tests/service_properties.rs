//! Property-based tests for the board service
//!
//! These tests verify paging and lifecycle invariants that must hold for all
//! inputs.

use lockboard_proto::{
    ActivityState, ENVELOPE_VERSION, EncryptedContent, NewChannel, ServiceError, UserId,
};
use lockboard_server::{BoardService, MemoryStorage, OpenAccess, SystemEnv};
use proptest::prelude::*;

const ACL: &str = "acl://conversations/1";

fn service() -> BoardService<SystemEnv, MemoryStorage, OpenAccess> {
    BoardService::new(SystemEnv::new(), MemoryStorage::new(), OpenAccess)
}

fn user() -> UserId {
    UserId::new("alice")
}

fn new_channel(kind: &str) -> NewChannel {
    NewChannel {
        acl_url_link: ACL.to_string(),
        kms_resource_url: "kms://resources/1".to_string(),
        default_encryption_key_url: "kms://keys/1".to_string(),
        kind: kind.to_string(),
    }
}

fn envelope(byte: u8) -> EncryptedContent {
    EncryptedContent {
        version: ENVELOPE_VERSION,
        encryption_key_url: "kms://keys/2".to_string(),
        nonce: [byte; 24],
        ciphertext: vec![byte],
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Add,
    KeepActive,
    Lock,
    DeleteAll,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Add), Just(Op::KeepActive), Just(Op::Lock), Just(Op::DeleteAll)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: walking a content collection yields every record exactly
    /// once, in order, with only the last page short and no empty pages
    #[test]
    fn prop_content_walk_is_complete(
        total in 0usize..120,
        limit in 1usize..40,
    ) {
        let service = service();
        let channel = service.create_channel(&user(), new_channel("whiteboard")).unwrap();
        if total > 0 {
            let batch = (0..total).map(|i| envelope(i as u8)).collect();
            service.add_contents(&user(), &channel.channel_id, batch).unwrap();
        }

        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let page = service.list_contents(&user(), &channel.channel_id, cursor.as_ref(), limit).unwrap();
            prop_assert!(page.items.len() <= limit);
            if page.next.is_some() {
                prop_assert_eq!(page.items.len(), limit);
            }
            if total > 0 {
                prop_assert!(!page.items.is_empty());
            }
            seen.extend(page.items.iter().map(|c| c.created_at));

            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        let expected: Vec<u64> = (0..total as u64).collect();
        prop_assert_eq!(seen, expected);
    }

    /// Property: a kind filter returns exactly the matching channels, in
    /// creation order
    #[test]
    fn prop_channel_filter_is_exact(
        kinds in prop::collection::vec(prop_oneof![Just("whiteboard"), Just("annotated")], 0..30),
        limit in 1usize..10,
    ) {
        let service = service();
        let mut expected = Vec::new();
        for kind in &kinds {
            let channel = service.create_channel(&user(), new_channel(kind)).unwrap();
            if *kind == "annotated" {
                expected.push(channel.channel_id);
            }
        }

        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let page = service
                .list_channels(&user(), ACL, Some("annotated"), cursor.as_ref(), limit)
                .unwrap();
            prop_assert!(page.items.iter().all(|c| c.kind == "annotated"));
            seen.extend(page.items.into_iter().map(|c| c.channel_id));

            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        prop_assert_eq!(seen, expected);
    }

    /// Property: once locked, no operation sequence stores another record or
    /// leaves the locked state
    #[test]
    fn prop_lock_is_terminal_for_writes(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let service = service();
        let channel = service.create_channel(&user(), new_channel("whiteboard")).unwrap();
        let id = channel.channel_id;

        let mut locked = false;
        let mut stored = 0usize;
        for op in ops {
            let result = match op {
                Op::Add => service.add_contents(&user(), &id, vec![envelope(0)]).map(|_| stored += 1),
                Op::KeepActive => service.keep_active(&user(), &id).map(|_| ()),
                Op::Lock => service.lock_for_deletion(&user(), &id).map(|_| locked = true),
                Op::DeleteAll => service.delete_all_contents(&user(), &id).map(|()| stored = 0),
            };

            if locked && !matches!(op, Op::Lock) {
                prop_assert!(matches!(result, Err(ServiceError::Locked { .. })), "expected Locked error, got {:?}", result);
            } else {
                prop_assert!(result.is_ok());
            }
        }

        let page = service.list_contents(&user(), &id, None, 1000).unwrap();
        prop_assert_eq!(page.items.len(), stored);

        let state = service.get_channel(&user(), &id).unwrap().state;
        prop_assert_eq!(state == ActivityState::Locked, locked);
    }
}
