//! Channel lifecycle through the client: activity, locking and deletion.

use lockboard_core::{
    BoardError, ChannelListOptions, ChannelOptions, ContentOptions, DeleteOptions,
};
use lockboard_harness::SimWorld;
use lockboard_proto::{ActivityState, NewContent};

fn record() -> NewContent {
    NewContent::new("curve", "{}")
}

const GUARDED: DeleteOptions = DeleteOptions { prevent_delete_active_channel: true };

#[tokio::test]
async fn locked_channel_rejects_writes_but_stays_readable() {
    let world = SimWorld::new(30);
    let conversation = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();
    alice.add_content(&channel, vec![record()]).await.unwrap();

    let locked = alice.lock_channel_for_deletion(&channel).await.unwrap();
    assert_eq!(locked.state, ActivityState::Locked);

    let err = alice.add_content(&channel, vec![record()]).await.unwrap_err();
    assert!(matches!(err, BoardError::ChannelLocked { .. }));
    assert!(err.is_policy_violation());

    let err = alice.keep_active(&channel).await.unwrap_err();
    assert!(matches!(err, BoardError::ChannelLocked { .. }));

    let err = alice.delete_all_content(&channel).await.unwrap_err();
    assert!(matches!(err, BoardError::ChannelLocked { .. }));

    let page = alice.get_contents(&channel, ContentOptions::default()).await.unwrap();
    assert_eq!(page.len(), 1);
}

#[tokio::test]
async fn locking_is_idempotent() {
    let world = SimWorld::new(31);
    let conversation = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();

    alice.lock_channel_for_deletion(&channel).await.unwrap();
    let again = alice.lock_channel_for_deletion(&channel).await.unwrap();
    assert_eq!(again.state, ActivityState::Locked);
}

#[tokio::test]
async fn guarded_delete_refuses_active_channel() {
    let world = SimWorld::new(32);
    let conversation = world.create_conversation(&["alice", "bob"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();

    let active = world.client("bob").keep_active(&channel).await.unwrap();
    assert_eq!(active.state, ActivityState::Active);

    let err = alice.delete_channel(&conversation, &channel, GUARDED).await.unwrap_err();
    assert!(matches!(err, BoardError::ChannelActive { .. }));
    assert!(alice.get_channel(&channel).await.is_ok());
}

#[tokio::test]
async fn guarded_delete_removes_inactive_channel() {
    let world = SimWorld::new(33);
    let conversation = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();

    alice.delete_channel(&conversation, &channel, GUARDED).await.unwrap();

    assert!(matches!(alice.get_channel(&channel).await, Err(BoardError::NotFound { .. })));
}

#[tokio::test]
async fn guarded_delete_accepts_locked_channel() {
    let world = SimWorld::new(34);
    let conversation = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();
    alice.add_content(&channel, vec![record()]).await.unwrap();
    alice.lock_channel_for_deletion(&channel).await.unwrap();

    alice.delete_channel(&conversation, &channel, GUARDED).await.unwrap();
}

#[tokio::test]
async fn deleted_channel_is_gone_everywhere() {
    let world = SimWorld::new(35);
    let conversation = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();
    alice.add_content(&channel, vec![record(), record()]).await.unwrap();

    alice.delete_channel(&conversation, &channel, DeleteOptions::default()).await.unwrap();

    assert!(matches!(alice.get_channel(&channel).await, Err(BoardError::NotFound { .. })));
    assert!(matches!(
        alice.get_contents(&channel, ContentOptions::default()).await,
        Err(BoardError::NotFound { .. })
    ));
    assert!(matches!(
        alice.add_content(&channel, vec![record()]).await,
        Err(BoardError::NotFound { .. })
    ));
    assert!(matches!(
        alice.delete_channel(&conversation, &channel, DeleteOptions::default()).await,
        Err(BoardError::NotFound { .. })
    ));

    let listed = alice.get_channels(&conversation, ChannelListOptions::default()).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn delete_through_another_conversation_is_not_found() {
    let world = SimWorld::new(36);
    let ours = world.create_conversation(&["alice"]).unwrap();
    let other = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&ours, ChannelOptions::default()).await.unwrap();

    let err = alice.delete_channel(&other, &channel, DeleteOptions::default()).await.unwrap_err();
    assert!(matches!(err, BoardError::NotFound { .. }));
    assert!(alice.get_channel(&channel).await.is_ok());
}

#[tokio::test]
async fn delete_all_content_keeps_activity_state() {
    let world = SimWorld::new(37);
    let conversation = world.create_conversation(&["alice"]).unwrap();
    let alice = world.client("alice");
    let channel = alice.create_channel(&conversation, ChannelOptions::default()).await.unwrap();
    alice.add_content(&channel, vec![record()]).await.unwrap();

    alice.delete_all_content(&channel).await.unwrap();

    let channel = alice.get_channel(&channel).await.unwrap();
    assert_eq!(channel.state, ActivityState::Active);
}
