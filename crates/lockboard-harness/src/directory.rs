//! In-memory conversation directory.
//!
//! Tracks which participants belong to which conversation ACL. The board
//! service and the KMS both consult it, so removing a participant here
//! revokes their access everywhere at once.

use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex},
};

use lockboard_core::ConversationService;
use lockboard_proto::{ServiceError, UserId};
use lockboard_server::AccessPolicy;

#[derive(Default)]
struct DirectoryState {
    /// Conversation id -> entry
    conversations: HashMap<String, ConversationEntry>,
    /// ACL URL -> conversation id
    acls: HashMap<String, String>,
}

struct ConversationEntry {
    acl_url: String,
    members: BTreeSet<UserId>,
}

/// Shared directory of conversations and their participants.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a conversation with its ACL and initial participants.
    ///
    /// # Errors
    ///
    /// `Invalid` if the id or ACL URL is already registered.
    pub fn register(
        &self,
        conversation_id: &str,
        acl_url: &str,
        members: impl IntoIterator<Item = UserId>,
    ) -> Result<(), ServiceError> {
        let mut state = self.lock();
        if state.conversations.contains_key(conversation_id) || state.acls.contains_key(acl_url) {
            return Err(ServiceError::invalid(format!("conversation {conversation_id} exists")));
        }

        state.conversations.insert(
            conversation_id.to_string(),
            ConversationEntry { acl_url: acl_url.to_string(), members: members.into_iter().collect() },
        );
        state.acls.insert(acl_url.to_string(), conversation_id.to_string());
        Ok(())
    }

    /// Add a participant. Returns false if they were already a member.
    ///
    /// # Errors
    ///
    /// `NotFound` if the conversation is unknown.
    pub fn add_participant(&self, conversation_id: &str, user: &UserId) -> Result<bool, ServiceError> {
        let mut state = self.lock();
        let entry = state
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| ServiceError::not_found(conversation_id))?;
        Ok(entry.members.insert(user.clone()))
    }

    /// Remove a participant. Returns false if they were not a member.
    ///
    /// # Errors
    ///
    /// `NotFound` if the conversation is unknown.
    pub fn remove_participant(&self, conversation_id: &str, user: &UserId) -> Result<bool, ServiceError> {
        let mut state = self.lock();
        let entry = state
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| ServiceError::not_found(conversation_id))?;

        let removed = entry.members.remove(user);
        if removed {
            tracing::debug!(conversation_id, user = %user, "participant removed");
        }
        Ok(removed)
    }

    /// Participants of a conversation, sorted.
    pub fn members(&self, conversation_id: &str) -> Vec<UserId> {
        self.lock()
            .conversations
            .get(conversation_id)
            .map(|entry| entry.members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns true if `user` belongs to the conversation owning `acl_url`.
    pub fn is_member(&self, user: &UserId, acl_url: &str) -> bool {
        let state = self.lock();
        state
            .acls
            .get(acl_url)
            .and_then(|id| state.conversations.get(id))
            .is_some_and(|entry| entry.members.contains(user))
    }

    /// ACL URL of a conversation the requester participates in.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the conversation is unknown
    /// - `Denied` if the requester is not a participant
    pub fn resolve_acl(&self, requester: &UserId, conversation_id: &str) -> Result<String, ServiceError> {
        let state = self.lock();
        let entry = state
            .conversations
            .get(conversation_id)
            .ok_or_else(|| ServiceError::not_found(conversation_id))?;

        if !entry.members.contains(requester) {
            return Err(ServiceError::denied(format!(
                "{requester} is not a participant of {conversation_id}"
            )));
        }
        Ok(entry.acl_url.clone())
    }

    /// Remove the requester from a conversation.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the conversation is unknown
    /// - `Denied` if the requester is not a participant
    pub fn leave(&self, requester: &UserId, conversation_id: &str) -> Result<(), ServiceError> {
        if self.remove_participant(conversation_id, requester)? {
            Ok(())
        } else {
            Err(ServiceError::denied(format!("{requester} is not a participant of {conversation_id}")))
        }
    }

    #[allow(clippy::expect_used)]
    fn lock(&self) -> std::sync::MutexGuard<'_, DirectoryState> {
        self.state.lock().expect("Mutex poisoned")
    }
}

impl AccessPolicy for MemoryDirectory {
    fn is_member(&self, requester: &UserId, acl_url: &str) -> bool {
        Self::is_member(self, requester, acl_url)
    }
}

impl ConversationService for MemoryDirectory {
    async fn resolve_acl(&self, requester: &UserId, conversation_id: &str) -> Result<String, ServiceError> {
        Self::resolve_acl(self, requester, conversation_id)
    }

    async fn leave(&self, requester: &UserId, conversation_id: &str) -> Result<(), ServiceError> {
        Self::leave(self, requester, conversation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> MemoryDirectory {
        let directory = MemoryDirectory::new();
        directory
            .register("c1", "acl://conversations/c1", [UserId::new("alice"), UserId::new("bob")])
            .unwrap();
        directory
    }

    #[test]
    fn membership_follows_acl() {
        let directory = directory();

        assert!(directory.is_member(&UserId::new("alice"), "acl://conversations/c1"));
        assert!(!directory.is_member(&UserId::new("carol"), "acl://conversations/c1"));
        assert!(!directory.is_member(&UserId::new("alice"), "acl://conversations/other"));
    }

    #[test]
    fn leave_revokes_membership() {
        let directory = directory();
        let bob = UserId::new("bob");

        directory.leave(&bob, "c1").unwrap();

        assert!(!directory.is_member(&bob, "acl://conversations/c1"));
        assert!(matches!(directory.resolve_acl(&bob, "c1"), Err(ServiceError::Denied { .. })));
        assert!(matches!(directory.leave(&bob, "c1"), Err(ServiceError::Denied { .. })));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let directory = directory();
        assert!(directory.register("c1", "acl://conversations/x", []).is_err());
        assert!(directory.register("c2", "acl://conversations/c1", []).is_err());
    }

    #[test]
    fn unknown_conversation_not_found() {
        let directory = directory();
        assert!(matches!(
            directory.resolve_acl(&UserId::new("alice"), "nope"),
            Err(ServiceError::NotFound { .. })
        ));
        assert!(directory.members("nope").is_empty());
    }
}
