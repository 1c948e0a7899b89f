//! End-to-end board flows through `BoardClient` against a simulated world.

use lockboard_core::{
    BoardConfig, BoardError, ChannelListOptions, ChannelOptions, ContentOptions,
};
use lockboard_harness::SimWorld;
use lockboard_proto::{ActivityState, DEFAULT_CHANNEL_KIND, NewContent};

fn curve(i: usize) -> NewContent {
    NewContent::new("curve", format!("{{\"points\":[{i},{i}]}}"))
}

#[tokio::test]
async fn channel_gets_its_own_resource_and_acl() {
    let world = SimWorld::new(1);
    let conversation = world.create_conversation(&["alice", "bob"]).unwrap();
    let alice = world.client("alice");

    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();

    assert_eq!(channel.kind, DEFAULT_CHANNEL_KIND);
    assert_eq!(channel.state, ActivityState::Inactive);
    assert_eq!(channel.acl_url_link, conversation.acl_url);
    assert_ne!(channel.acl_url, conversation.acl_url);
    assert_ne!(channel.kms_resource_url, conversation.kms_resource_url);
    assert_ne!(channel.default_encryption_key_url, conversation.default_encryption_key_url);

    let fetched = world.client("bob").get_channel(&channel).await.unwrap();
    assert_eq!(fetched, channel);
}

#[tokio::test]
async fn outsiders_cannot_create_channels() {
    let world = SimWorld::new(2);
    let conversation = world.create_conversation(&["alice"]).unwrap();

    let err = world
        .client("mallory")
        .create_channel(&conversation, ChannelOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::Forbidden { .. }));
}

#[tokio::test]
async fn channels_page_in_creation_order() {
    let world = SimWorld::new(3);
    let conversation = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");

    let mut created = Vec::new();
    for _ in 0..12 {
        created.push(alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap());
    }

    let options = ChannelListOptions { channels_limit: Some(5), ..ChannelListOptions::default() };
    let first = alice.get_channels(&conversation, options).await.unwrap();
    let second = first.next().await.unwrap();
    let third = second.next().await.unwrap();

    assert_eq!((first.len(), second.len(), third.len()), (5, 5, 2));
    assert!(!third.has_next());
    assert!(matches!(third.next().await, Err(BoardError::NoMoreData)));

    let listed: Vec<_> = first.iter().chain(second.iter()).chain(third.iter()).cloned().collect();
    assert_eq!(listed, created);
}

#[tokio::test]
async fn channel_listing_filters_by_kind() {
    let world = SimWorld::new(4);
    let conversation = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");

    for kind in ["whiteboard", "annotated", "whiteboard", "annotated", "annotated"] {
        let options = ChannelOptions { kind: Some(kind.to_string()) };
        alice.create_channel(&conversation, options).await.unwrap();
    }

    let options = ChannelListOptions { kind: Some("annotated".to_string()), channels_limit: Some(2) };
    let annotated = alice.get_channels(&conversation, options).await.unwrap().collect_all().await.unwrap();
    assert_eq!(annotated.len(), 3);
    assert!(annotated.iter().all(|channel| channel.kind == "annotated"));

    let all = alice
        .get_channels(&conversation, ChannelListOptions::default())
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();
    assert_eq!(all.len(), 5);
}

#[tokio::test]
async fn listing_is_scoped_to_the_conversation() {
    let world = SimWorld::new(5);
    let ours = world.create_conversation(&["alice"]).unwrap();
    let theirs = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");

    alice.create_channel(&ours, ChannelOptions::default()).await.unwrap();
    alice.create_channel(&theirs, ChannelOptions::default()).await.unwrap();

    let page = alice.get_channels(&ours, ChannelListOptions::default()).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page.items()[0].acl_url_link, ours.acl_url);
}

#[tokio::test]
async fn contents_page_by_twenty_five() {
    let world = SimWorld::new(6);
    let conversation = world.create_conversation(&["alice", "bob"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();

    let added = alice.add_content(&channel, (0..30).map(curve).collect()).await.unwrap();
    assert_eq!(added.len(), 30);
    assert!(!added.has_next());

    let bob = world.client("bob");
    let options = ContentOptions { contents_limit: Some(25) };
    let first = bob.get_contents(&channel, options).await.unwrap();
    let second = first.next().await.unwrap();

    assert_eq!(first.len(), 25);
    assert_eq!(second.len(), 5);
    assert!(!second.has_next());

    let payloads: Vec<_> = first.iter().chain(second.iter()).map(|r| r.payload.clone()).collect();
    let expected: Vec<_> = (0..30).map(|i| curve(i).payload).collect();
    assert_eq!(payloads, expected);
}

#[tokio::test]
async fn client_default_page_size_comes_from_config() {
    let world = SimWorld::new(7);
    let conversation = world.create_conversation(&["alice"]).unwrap();
    let config = BoardConfig { contents_limit: 4, ..BoardConfig::default() };
    let alice = world.client_with_config("alice", config);
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();

    alice.add_content(&channel, (0..10).map(curve).collect()).await.unwrap();

    let first = alice.get_contents(&channel, ContentOptions::default()).await.unwrap();
    assert_eq!(first.len(), 4);
    assert_eq!(first.limit(), 4);
}

#[tokio::test]
async fn added_records_match_what_readers_see() {
    let world = SimWorld::new(8);
    let conversation = world.create_conversation(&["alice", "bob"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();

    let records = vec![
        NewContent::new("curve", "{}"),
        NewContent::new("text", "hello").with_metadata("color", "red"),
    ];
    let added = alice.add_content(&channel, records).await.unwrap().into_items();

    // Absent metadata reads back as an empty map
    assert!(added[0].metadata.is_empty());
    assert_eq!(added[1].metadata.get("color").map(String::as_str), Some("red"));

    let read = world
        .client("bob")
        .get_contents(&channel, ContentOptions::default())
        .await
        .unwrap()
        .into_items();
    assert_eq!(read, added);
    assert!(read[0].created_at < read[1].created_at);
}

#[tokio::test]
async fn first_write_activates_channel() {
    let world = SimWorld::new(9);
    let conversation = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();

    alice.add_content(&channel, vec![curve(0)]).await.unwrap();

    let channel = alice.get_channel(&channel).await.unwrap();
    assert_eq!(channel.state, ActivityState::Active);
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let world = SimWorld::new(10);
    let conversation = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();

    let err = alice.add_content(&channel, Vec::new()).await.unwrap_err();
    assert!(matches!(err, BoardError::InvalidRequest { .. }));
}

#[tokio::test]
async fn delete_all_content_empties_channel() {
    let world = SimWorld::new(11);
    let conversation = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();
    alice.add_content(&channel, (0..3).map(curve).collect()).await.unwrap();

    alice.delete_all_content(&channel).await.unwrap();

    let page = alice.get_contents(&channel, ContentOptions::default()).await.unwrap();
    assert!(page.is_empty());
    assert!(!page.has_next());
}

#[tokio::test]
async fn encrypt_and_decrypt_without_storing() {
    let world = SimWorld::new(12);
    let conversation = world.create_conversation(&["alice", "bob"]).unwrap();
    let alice = world.client("alice");

    let records = vec![curve(1), curve(2)];
    let envelopes = alice
        .encrypt_contents(&conversation.default_encryption_key_url, &records)
        .await
        .unwrap();
    assert!(envelopes.iter().all(|e| e.encryption_key_url == conversation.default_encryption_key_url));

    let bodies = world.client("bob").decrypt_contents(&envelopes).await.unwrap();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[1].payload, records[1].payload);
}

#[tokio::test]
async fn tampered_envelope_is_malformed() {
    let world = SimWorld::new(13);
    let conversation = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");

    let mut envelopes = alice
        .encrypt_contents(&conversation.default_encryption_key_url, &[curve(1)])
        .await
        .unwrap();
    envelopes[0].ciphertext[0] ^= 0xff;

    let err = alice.decrypt_contents(&envelopes).await.unwrap_err();
    assert!(err.is_data_corruption());
}

#[tokio::test]
async fn ping_reaches_the_service() {
    let world = SimWorld::new(14);
    world.client("anyone").ping().await.unwrap();
}
