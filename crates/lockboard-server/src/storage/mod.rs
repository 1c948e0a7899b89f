//! Storage abstraction for the board service
//!
//! Trait-based abstraction for persisting channels and their content logs.
//! The trait is synchronous (no async); the service decides sequence numbers
//! and storage only checks them.

mod chaotic;
mod error;
mod memory;
mod redb;

pub use chaotic::ChaoticStorage;
pub use error::StorageError;
use lockboard_proto::{Channel, StoredContent};
pub use memory::MemoryStorage;

pub use self::redb::RedbStorage;

/// Half-open sequence range `[from, until)` with a result limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqRange {
    /// First sequence number to include
    pub from: u64,
    /// First sequence number to exclude
    pub until: u64,
    /// Maximum number of results
    pub limit: usize,
}

impl SeqRange {
    /// Returns true if `seq` falls inside the range.
    pub fn contains(&self, seq: u64) -> bool {
        self.from <= seq && seq < self.until
    }
}

/// Storage abstraction for channels and content logs
///
/// Must be Clone (shared by service handles), Send + Sync (thread-safe), and
/// synchronous. Implementations share internal state via Arc, so clones
/// access the same underlying storage.
///
/// Channels carry a global creation sequence (`Channel::created_at`); each
/// channel's content log has its own sequence. Neither sequence is ever
/// reused, even after contents or channels are deleted.
pub trait Storage: Clone + Send + Sync + 'static {
    /// Next free channel sequence number.
    fn next_channel_sequence(&self) -> Result<u64, StorageError>;

    /// Persist a new channel.
    ///
    /// # Invariants
    ///
    /// - Pre: `channel.created_at` equals `next_channel_sequence()`
    /// - Post: the channel sequence advances by one
    fn create_channel(&self, channel: &Channel) -> Result<(), StorageError>;

    /// Overwrite an existing channel's metadata.
    ///
    /// Fails with `NotFound` if the channel does not exist.
    fn update_channel(&self, channel: &Channel) -> Result<(), StorageError>;

    /// Load a channel. `None` if it doesn't exist.
    fn load_channel(&self, channel_id: &str) -> Result<Option<Channel>, StorageError>;

    /// Channels with `created_at` in `range` that match `filter`, in creation
    /// order, at most `range.limit`.
    fn scan_channels(
        &self,
        range: SeqRange,
        filter: &dyn Fn(&Channel) -> bool,
    ) -> Result<Vec<Channel>, StorageError>;

    /// Remove a channel and its whole content log.
    ///
    /// Fails with `NotFound` if the channel does not exist.
    fn delete_channel(&self, channel_id: &str) -> Result<(), StorageError>;

    /// Next free content sequence number of a channel.
    fn next_content_sequence(&self, channel_id: &str) -> Result<u64, StorageError>;

    /// Append a batch to a channel's log and overwrite the channel's metadata
    /// with `channel`, atomically.
    ///
    /// Fails with `NotFound` if the channel does not exist.
    ///
    /// # Invariants
    ///
    /// - Pre: `contents[i].created_at == first + i` and `first` equals
    ///   `next_content_sequence(&channel.channel_id)`
    /// - Post: either every record and the metadata are stored or nothing is
    fn append_contents(
        &self,
        channel: &Channel,
        first: u64,
        contents: &[StoredContent],
    ) -> Result<(), StorageError>;

    /// Contents with `created_at` in `range`, in log order, at most
    /// `range.limit`.
    fn load_contents(
        &self,
        channel_id: &str,
        range: SeqRange,
    ) -> Result<Vec<StoredContent>, StorageError>;

    /// Remove every record of a channel's log. Returns how many were removed.
    ///
    /// The content sequence is not reset.
    fn delete_contents(&self, channel_id: &str) -> Result<usize, StorageError>;
}
