//! Property-based tests through the client facade.

use lockboard_core::{ChannelListOptions, ChannelOptions, ContentOptions};
use lockboard_harness::SimWorld;
use lockboard_proto::NewContent;
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().build().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property: following `next()` from the first page visits every record
    /// once, in insertion order, and every page but the last is full
    #[test]
    fn prop_content_pages_cover_collection(
        seed in any::<u64>(),
        batches in prop::collection::vec(1usize..12, 0..8),
        limit in 1usize..15,
    ) {
        runtime().block_on(async {
            let world = SimWorld::new(seed);
            let conversation = world.create_conversation(&["alice", "bob"]).unwrap();
            let alice = world.client("alice");
            let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();

            let mut expected = Vec::new();
            for (b, &size) in batches.iter().enumerate() {
                let records: Vec<_> =
                    (0..size).map(|i| NewContent::new("curve", format!("{b}:{i}"))).collect();
                expected.extend(records.iter().map(|r| r.payload.clone()));
                alice.add_content(&channel, records).await.unwrap();
            }

            let bob = world.client("bob");
            let mut page = bob.get_contents(&channel, ContentOptions { contents_limit: Some(limit) }).await.unwrap();
            let mut seen = Vec::new();
            loop {
                if page.has_next() {
                    prop_assert_eq!(page.len(), limit);
                } else {
                    prop_assert!(page.len() <= limit);
                }
                seen.extend(page.iter().map(|r| r.payload.clone()));

                if !page.has_next() {
                    break;
                }
                page = page.next().await.unwrap();
            }

            prop_assert_eq!(seen, expected);
            Ok(())
        })?;
    }

    /// Property: a page can be re-walked; `next()` on the same page returns
    /// the same items each time
    #[test]
    fn prop_pages_are_immutable(seed in any::<u64>(), count in 2usize..30) {
        runtime().block_on(async {
            let world = SimWorld::new(seed);
            let conversation = world.create_conversation(&["alice"]).unwrap();
            let alice = world.client("alice");
            for _ in 0..count {
                alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();
            }

            let options = ChannelListOptions { channels_limit: Some(1), ..ChannelListOptions::default() };
            let first = alice.get_channels(&conversation, options).await.unwrap();
            let a = first.next().await.unwrap();
            let b = first.next().await.unwrap();

            prop_assert_eq!(a.items(), b.items());
            prop_assert_eq!(first.len(), 1);
            Ok(())
        })?;
    }

    /// Property: one seed replays one world
    #[test]
    fn prop_seed_replays_identically(seed in any::<u64>()) {
        let ids = |seed| {
            runtime().block_on(async move {
                let world = SimWorld::new(seed);
                let conversation = world.create_conversation(&["alice"]).unwrap();
                let channel = world
                    .client("alice")
                    .create_channel(&conversation, ChannelOptions::default())
                    .await
                    .unwrap();
                (conversation.id, channel.channel_id, channel.default_encryption_key_url)
            })
        };

        prop_assert_eq!(ids(seed), ids(seed));
    }
}
