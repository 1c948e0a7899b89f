//! Channel lifecycle state machine.
//!
//! Pure transition logic with no I/O. The board service owns one
//! [`ChannelLifecycle`] per channel and consults it before every read, write
//! and deletion.
//!
//! # State Machine
//!
//! ```text
//! Inactive ──write/keep_active──> Active
//!    │                              │
//!    └────────lock_for_deletion─────┴──> Locked
//!
//! Inactive | Active | Locked ──delete──> Deleted
//! ```
//!
//! A guarded deletion (`prevent_delete_active_channel`) refuses Active
//! channels. Locked channels reject every write but stay readable. Deleted
//! channels are gone: every operation reports them as not found.

use lockboard_proto::{ActivityState, ServiceError};
use thiserror::Error;

use crate::{error::BoardError, options::DeleteOptions};

/// Lifecycle rule violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Write attempted on a locked channel
    #[error("channel {channel_id} is locked for deletion")]
    Locked {
        /// Channel id
        channel_id: String,
    },

    /// Guarded deletion attempted on an active channel
    #[error("channel {channel_id} is active")]
    Active {
        /// Channel id
        channel_id: String,
    },

    /// Channel was deleted
    #[error("channel {channel_id} was deleted")]
    Deleted {
        /// Channel id
        channel_id: String,
    },
}

impl From<LifecycleError> for ServiceError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Locked { channel_id } => Self::Locked { channel_id },
            LifecycleError::Active { channel_id } => Self::Active { channel_id },
            LifecycleError::Deleted { channel_id } => Self::NotFound { what: channel_id },
        }
    }
}

impl From<LifecycleError> for BoardError {
    fn from(err: LifecycleError) -> Self {
        ServiceError::from(err).into()
    }
}

/// Lifecycle of a single channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLifecycle {
    channel_id: String,
    state: ActivityState,
}

impl ChannelLifecycle {
    /// A freshly created channel.
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self::from_state(channel_id, ActivityState::Inactive)
    }

    /// Rehydrate a lifecycle from persisted state.
    pub fn from_state(channel_id: impl Into<String>, state: ActivityState) -> Self {
        Self { channel_id: channel_id.into(), state }
    }

    /// Current state.
    pub fn state(&self) -> ActivityState {
        self.state
    }

    /// Channel id this lifecycle belongs to.
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Record write activity (content appended, keep-active signal).
    ///
    /// # Errors
    ///
    /// - `Locked` if the channel is locked for deletion
    /// - `Deleted` if the channel was deleted
    pub fn mark_active(&mut self) -> Result<ActivityState, LifecycleError> {
        self.ensure_writable()?;
        self.state = ActivityState::Active;
        Ok(self.state)
    }

    /// Lock the channel. Idempotent for already-locked channels.
    ///
    /// # Errors
    ///
    /// - `Deleted` if the channel was deleted
    pub fn lock_for_deletion(&mut self) -> Result<ActivityState, LifecycleError> {
        self.ensure_readable()?;
        self.state = ActivityState::Locked;
        Ok(self.state)
    }

    /// Delete the channel.
    ///
    /// On error the state is unchanged.
    ///
    /// # Errors
    ///
    /// - `Active` if `options.prevent_delete_active_channel` is set and the
    ///   channel is active
    /// - `Deleted` if the channel was already deleted
    pub fn request_deletion(
        &mut self,
        options: DeleteOptions,
    ) -> Result<ActivityState, LifecycleError> {
        match self.state {
            ActivityState::Deleted => Err(self.deleted()),
            ActivityState::Active if options.prevent_delete_active_channel => {
                Err(LifecycleError::Active { channel_id: self.channel_id.clone() })
            },
            ActivityState::Inactive | ActivityState::Active | ActivityState::Locked => {
                self.state = ActivityState::Deleted;
                Ok(self.state)
            },
        }
    }

    /// Check that content may be appended or removed.
    ///
    /// # Errors
    ///
    /// - `Locked` if the channel is locked for deletion
    /// - `Deleted` if the channel was deleted
    pub fn ensure_writable(&self) -> Result<(), LifecycleError> {
        match self.state {
            ActivityState::Inactive | ActivityState::Active => Ok(()),
            ActivityState::Locked => {
                Err(LifecycleError::Locked { channel_id: self.channel_id.clone() })
            },
            ActivityState::Deleted => Err(self.deleted()),
        }
    }

    /// Check that metadata and content may be read.
    ///
    /// # Errors
    ///
    /// - `Deleted` if the channel was deleted
    pub fn ensure_readable(&self) -> Result<(), LifecycleError> {
        match self.state {
            ActivityState::Deleted => Err(self.deleted()),
            ActivityState::Inactive | ActivityState::Active | ActivityState::Locked => Ok(()),
        }
    }

    fn deleted(&self) -> LifecycleError {
        LifecycleError::Deleted { channel_id: self.channel_id.clone() }
    }
}
