//! Snapshot images and file records.

use lockboard_core::{
    BoardError, ChannelOptions, ContentOptions, DISPLAY_NAME_KEY, ImageFile, ImageOptions,
};
use lockboard_harness::SimWorld;
use lockboard_proto::{ActivityState, FILE_CONTENT_TYPE};

fn png(len: usize) -> ImageFile {
    ImageFile::new("image/png", (0..len).map(|i| (i % 251) as u8).collect())
}

#[tokio::test]
async fn snapshot_image_opens_for_every_participant() {
    let world = SimWorld::new(20);
    let conversation = world.create_conversation(&["alice", "bob"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();
    let file = png(4096);

    let image = alice.set_snapshot_image(&channel, &file).await.unwrap();
    assert_eq!(image.encryption_key_url, channel.default_encryption_key_url);
    assert_eq!(image.file_size, 4096);
    assert_eq!(image.mime_type, "image/png");

    let bob = world.client("bob");
    let stored = bob.get_channel(&channel).await.unwrap();
    assert_eq!(stored.image.as_ref(), Some(&image));
    // Setting an image is not write activity
    assert_eq!(stored.state, ActivityState::Inactive);

    let scr = bob.decrypt_scr(&image.encryption_key_url, &image.scr).await.unwrap();
    assert_eq!(bob.download(&scr).await.unwrap(), file.bytes);
}

#[tokio::test]
async fn blob_store_never_holds_plaintext() {
    let world = SimWorld::new(21);
    let conversation = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();
    let file = png(256);

    let scr = alice.upload_image(&channel, &file).await.unwrap();

    let stored = world.blobs().fetch(&scr.loc).unwrap();
    assert_ne!(stored, file.bytes);
    assert_eq!(alice.download(&scr).await.unwrap(), file.bytes);
}

#[tokio::test]
async fn image_record_carries_file_and_display_name() {
    let world = SimWorld::new(22);
    let conversation = world.create_conversation(&["alice", "bob"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();
    let file = png(1000);

    let options = ImageOptions { display_name: Some("sketch.png".to_string()) };
    let added = alice.add_image(&channel, &file, options).await.unwrap();
    assert_eq!(added.len(), 1);

    let records = world
        .client("bob")
        .get_contents(&channel, ContentOptions::default())
        .await
        .unwrap()
        .into_items();
    let record = &records[0];

    assert_eq!(record.kind, FILE_CONTENT_TYPE);
    assert_eq!(record.metadata.get(DISPLAY_NAME_KEY).map(String::as_str), Some("sketch.png"));

    let attachment = record.file.as_ref().unwrap();
    assert_eq!(attachment.mime_type, "image/png");
    assert_eq!(attachment.size, 1000);
    assert_eq!(world.client("bob").download(&attachment.scr).await.unwrap(), file.bytes);
}

#[tokio::test]
async fn image_record_without_display_name_has_empty_metadata() {
    let world = SimWorld::new(23);
    let conversation = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();

    let added = alice.add_image(&channel, &png(10), ImageOptions::default()).await.unwrap();
    assert!(added.items()[0].metadata.is_empty());
}

#[tokio::test]
async fn tampered_blob_fails_integrity_check() {
    let world = SimWorld::new(24);
    let conversation = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();

    let scr = alice.upload_image(&channel, &png(512)).await.unwrap();
    assert!(world.blobs().tamper(&scr.loc));

    let err = alice.download(&scr).await.unwrap_err();
    assert!(matches!(err, BoardError::IntegrityMismatch { .. }));
    assert!(err.is_data_corruption());
}

#[tokio::test]
async fn missing_blob_is_not_found() {
    let world = SimWorld::new(25);
    let conversation = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();

    let mut scr = alice.upload_image(&channel, &png(8)).await.unwrap();
    scr.loc = "blob://missing".to_string();

    assert!(matches!(alice.download(&scr).await, Err(BoardError::NotFound { .. })));
}

#[tokio::test]
async fn locked_channel_rejects_snapshot_image() {
    let world = SimWorld::new(26);
    let conversation = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();
    alice.lock_channel_for_deletion(&channel).await.unwrap();

    let err = alice.set_snapshot_image(&channel, &png(8)).await.unwrap_err();
    assert!(matches!(err, BoardError::ChannelLocked { .. }));
}
