use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};

use lockboard_proto::{Channel, StoredContent};

use super::{SeqRange, Storage, StorageError};

/// In-memory storage implementation for testing and simulation
///
/// Channels are indexed by id and by creation sequence; content logs are
/// `BTreeMap`s keyed by sequence so range reads are ordered. All state is
/// wrapped in Arc<Mutex<>> to allow Clone and concurrent access. Uses
/// `lock().expect()` which will panic if the mutex is poisoned, acceptable for
/// test code.
#[derive(Clone)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryStorageInner>>,
}

#[derive(Default)]
struct MemoryStorageInner {
    /// Channel metadata by id
    channels: HashMap<String, Channel>,

    /// Creation sequence -> channel id
    channel_order: BTreeMap<u64, String>,

    /// Next free channel sequence
    next_channel: u64,

    /// Content logs by channel id
    contents: HashMap<String, BTreeMap<u64, StoredContent>>,

    /// Next free content sequence per channel (survives deletions)
    next_content: HashMap<String, u64>,
}

impl MemoryStorage {
    /// Create a new empty `MemoryStorage`
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(MemoryStorageInner::default())) }
    }

    /// Number of live channels.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    pub fn channel_count(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").channels.len()
    }

    /// Total number of stored records across all channels.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    pub fn total_content_count(&self) -> usize {
        let inner = self.inner.lock().expect("Mutex poisoned");
        inner.contents.values().map(BTreeMap::len).sum()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    #[allow(clippy::expect_used)]
    fn next_channel_sequence(&self) -> Result<u64, StorageError> {
        Ok(self.inner.lock().expect("Mutex poisoned").next_channel)
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    fn create_channel(&self, channel: &Channel) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        if channel.created_at != inner.next_channel {
            return Err(StorageError::Conflict {
                expected: inner.next_channel,
                got: channel.created_at,
            });
        }
        if inner.channels.contains_key(&channel.channel_id) {
            return Err(StorageError::Duplicate { channel_id: channel.channel_id.clone() });
        }

        inner.next_channel += 1;
        inner.channel_order.insert(channel.created_at, channel.channel_id.clone());
        inner.channels.insert(channel.channel_id.clone(), channel.clone());

        debug_assert_eq!(inner.channels.len(), inner.channel_order.len());
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn update_channel(&self, channel: &Channel) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        let slot = inner
            .channels
            .get_mut(&channel.channel_id)
            .ok_or_else(|| StorageError::NotFound { channel_id: channel.channel_id.clone() })?;
        *slot = channel.clone();

        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn load_channel(&self, channel_id: &str) -> Result<Option<Channel>, StorageError> {
        Ok(self.inner.lock().expect("Mutex poisoned").channels.get(channel_id).cloned())
    }

    #[allow(clippy::expect_used)]
    fn scan_channels(
        &self,
        range: SeqRange,
        filter: &dyn Fn(&Channel) -> bool,
    ) -> Result<Vec<Channel>, StorageError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        if range.from >= range.until {
            return Ok(Vec::new());
        }

        Ok(inner
            .channel_order
            .range(range.from..range.until)
            .filter_map(|(_, id)| inner.channels.get(id))
            .filter(|channel| filter(channel))
            .take(range.limit)
            .cloned()
            .collect())
    }

    #[allow(clippy::expect_used)]
    fn delete_channel(&self, channel_id: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        let channel = inner
            .channels
            .remove(channel_id)
            .ok_or_else(|| StorageError::NotFound { channel_id: channel_id.to_string() })?;
        inner.channel_order.remove(&channel.created_at);
        inner.contents.remove(channel_id);
        inner.next_content.remove(channel_id);

        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn next_content_sequence(&self, channel_id: &str) -> Result<u64, StorageError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.next_content.get(channel_id).copied().unwrap_or(0))
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    fn append_contents(
        &self,
        channel: &Channel,
        first: u64,
        contents: &[StoredContent],
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        let channel_id = channel.channel_id.as_str();

        if !inner.channels.contains_key(channel_id) {
            return Err(StorageError::NotFound { channel_id: channel_id.to_string() });
        }

        let expected = inner.next_content.get(channel_id).copied().unwrap_or(0);
        if first != expected {
            return Err(StorageError::Conflict { expected, got: first });
        }
        // Validate the whole batch before touching the log
        for (offset, content) in contents.iter().enumerate() {
            let seq = first + offset as u64;
            if content.created_at != seq {
                return Err(StorageError::Conflict { expected: seq, got: content.created_at });
            }
        }

        let log = inner.contents.entry(channel_id.to_string()).or_default();
        for content in contents {
            log.insert(content.created_at, content.clone());
        }
        inner.next_content.insert(channel_id.to_string(), first + contents.len() as u64);
        inner.channels.insert(channel_id.to_string(), channel.clone());

        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn load_contents(
        &self,
        channel_id: &str,
        range: SeqRange,
    ) -> Result<Vec<StoredContent>, StorageError> {
        let inner = self.inner.lock().expect("Mutex poisoned");

        if !inner.channels.contains_key(channel_id) {
            return Err(StorageError::NotFound { channel_id: channel_id.to_string() });
        }
        let Some(log) = inner.contents.get(channel_id) else {
            return Ok(Vec::new());
        };
        if range.from >= range.until {
            return Ok(Vec::new());
        }

        Ok(log.range(range.from..range.until).take(range.limit).map(|(_, c)| c.clone()).collect())
    }

    #[allow(clippy::expect_used)]
    fn delete_contents(&self, channel_id: &str) -> Result<usize, StorageError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        if !inner.channels.contains_key(channel_id) {
            return Err(StorageError::NotFound { channel_id: channel_id.to_string() });
        }

        Ok(inner.contents.remove(channel_id).map_or(0, |log| log.len()))
    }
}
