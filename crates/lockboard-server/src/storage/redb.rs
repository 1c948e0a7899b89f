//! Redb-backed durable storage implementation.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. Every
//! trait method is one transaction, so a batch append is stored whole or not
//! at all. All state survives restarts.

use std::{fmt::Display, path::Path, sync::Arc};

use lockboard_proto::{Channel, StoredContent};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Serialize, de::DeserializeOwned};

use super::{SeqRange, Storage, StorageError};

/// Table: channels
/// Key: channel id (UTF-8)
/// Value: CBOR-encoded Channel
const CHANNELS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("channels");

/// Table: channel_order
/// Key: creation sequence
/// Value: channel id (UTF-8)
const CHANNEL_ORDER: TableDefinition<u64, &[u8]> = TableDefinition::new("channel_order");

/// Table: contents
/// Key: [id_len: 2 bytes BE][channel id][sequence: 8 bytes BE]
/// Value: CBOR-encoded StoredContent
const CONTENTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("contents");

/// Table: counters
/// Key: counter name
/// Value: next free sequence number
const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");

/// Counter holding the next channel sequence.
const CHANNEL_COUNTER: &str = "channels";

/// Durable storage backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        let txn = db.begin_write().map_err(io)?;
        {
            let _ = txn.open_table(CHANNELS).map_err(io)?;
            let _ = txn.open_table(CHANNEL_ORDER).map_err(io)?;
            let _ = txn.open_table(CONTENTS).map_err(io)?;
            let _ = txn.open_table(COUNTERS).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn channel_exists<T: ReadableTable<&'static [u8], &'static [u8]>>(
        table: &T,
        channel_id: &str,
    ) -> Result<bool, StorageError> {
        Ok(table.get(channel_id.as_bytes()).map_err(io)?.is_some())
    }

    /// Keys of every record in a channel's log.
    fn content_keys<T: ReadableTable<&'static [u8], &'static [u8]>>(
        table: &T,
        channel_id: &str,
    ) -> Result<Vec<Vec<u8>>, StorageError> {
        let start = encode_content_key(channel_id, 0);
        let end = encode_content_key(channel_id, u64::MAX);

        let mut keys = Vec::new();
        for result in table.range(start.as_slice()..=end.as_slice()).map_err(io)? {
            let (key, _) = result.map_err(io)?;
            keys.push(key.value().to_vec());
        }
        Ok(keys)
    }
}

impl Storage for RedbStorage {
    fn next_channel_sequence(&self) -> Result<u64, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let counters = txn.open_table(COUNTERS).map_err(io)?;

        read_counter(&counters, CHANNEL_COUNTER)
    }

    fn create_channel(&self, channel: &Channel) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(io)?;

        {
            let mut counters = txn.open_table(COUNTERS).map_err(io)?;
            let expected = read_counter(&counters, CHANNEL_COUNTER)?;
            if channel.created_at != expected {
                return Err(StorageError::Conflict { expected, got: channel.created_at });
            }

            let mut channels = txn.open_table(CHANNELS).map_err(io)?;
            if Self::channel_exists(&channels, &channel.channel_id)? {
                return Err(StorageError::Duplicate { channel_id: channel.channel_id.clone() });
            }

            let id = channel.channel_id.as_bytes();
            channels.insert(id, encode(channel)?.as_slice()).map_err(io)?;

            let mut order = txn.open_table(CHANNEL_ORDER).map_err(io)?;
            order.insert(channel.created_at, id).map_err(io)?;

            counters.insert(CHANNEL_COUNTER, expected + 1).map_err(io)?;
        }

        txn.commit().map_err(io)?;

        Ok(())
    }

    fn update_channel(&self, channel: &Channel) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(io)?;

        {
            let mut channels = txn.open_table(CHANNELS).map_err(io)?;
            if !Self::channel_exists(&channels, &channel.channel_id)? {
                return Err(StorageError::NotFound { channel_id: channel.channel_id.clone() });
            }

            channels.insert(channel.channel_id.as_bytes(), encode(channel)?.as_slice()).map_err(io)?;
        }

        txn.commit().map_err(io)?;

        Ok(())
    }

    fn load_channel(&self, channel_id: &str) -> Result<Option<Channel>, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let channels = txn.open_table(CHANNELS).map_err(io)?;

        match channels.get(channel_id.as_bytes()).map_err(io)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn scan_channels(
        &self,
        range: SeqRange,
        filter: &dyn Fn(&Channel) -> bool,
    ) -> Result<Vec<Channel>, StorageError> {
        if range.from >= range.until {
            return Ok(Vec::new());
        }

        let txn = self.db.begin_read().map_err(io)?;
        let order = txn.open_table(CHANNEL_ORDER).map_err(io)?;
        let channels = txn.open_table(CHANNELS).map_err(io)?;

        let mut found = Vec::new();
        for result in order.range(range.from..range.until).map_err(io)? {
            if found.len() >= range.limit {
                break;
            }

            let (_, id) = result.map_err(io)?;
            let Some(value) = channels.get(id.value()).map_err(io)? else {
                return Err(StorageError::Serialization(
                    "channel order references a missing channel".to_string(),
                ));
            };

            let channel: Channel = decode(value.value())?;
            if filter(&channel) {
                found.push(channel);
            }
        }

        Ok(found)
    }

    fn delete_channel(&self, channel_id: &str) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(io)?;

        {
            let mut channels = txn.open_table(CHANNELS).map_err(io)?;
            let channel: Channel = match channels.remove(channel_id.as_bytes()).map_err(io)? {
                Some(value) => decode(value.value())?,
                None => return Err(StorageError::NotFound { channel_id: channel_id.to_string() }),
            };

            let mut order = txn.open_table(CHANNEL_ORDER).map_err(io)?;
            order.remove(channel.created_at).map_err(io)?;

            let mut contents = txn.open_table(CONTENTS).map_err(io)?;
            for key in Self::content_keys(&contents, channel_id)? {
                contents.remove(key.as_slice()).map_err(io)?;
            }

            let mut counters = txn.open_table(COUNTERS).map_err(io)?;
            counters.remove(content_counter(channel_id).as_str()).map_err(io)?;
        }

        txn.commit().map_err(io)?;

        Ok(())
    }

    fn next_content_sequence(&self, channel_id: &str) -> Result<u64, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let counters = txn.open_table(COUNTERS).map_err(io)?;

        read_counter(&counters, &content_counter(channel_id))
    }

    fn append_contents(
        &self,
        channel: &Channel,
        first: u64,
        contents: &[StoredContent],
    ) -> Result<(), StorageError> {
        let channel_id = channel.channel_id.as_str();
        let txn = self.db.begin_write().map_err(io)?;

        {
            let mut channels = txn.open_table(CHANNELS).map_err(io)?;
            if !Self::channel_exists(&channels, channel_id)? {
                return Err(StorageError::NotFound { channel_id: channel_id.to_string() });
            }

            let counter = content_counter(channel_id);
            let mut counters = txn.open_table(COUNTERS).map_err(io)?;
            let expected = read_counter(&counters, &counter)?;
            if first != expected {
                return Err(StorageError::Conflict { expected, got: first });
            }

            let mut log = txn.open_table(CONTENTS).map_err(io)?;
            for (offset, content) in contents.iter().enumerate() {
                let seq = first + offset as u64;
                if content.created_at != seq {
                    // Dropping the transaction discards earlier inserts
                    return Err(StorageError::Conflict { expected: seq, got: content.created_at });
                }

                let key = encode_content_key(channel_id, seq);
                log.insert(key.as_slice(), encode(content)?.as_slice()).map_err(io)?;
            }

            counters.insert(counter.as_str(), first + contents.len() as u64).map_err(io)?;
            channels.insert(channel_id.as_bytes(), encode(channel)?.as_slice()).map_err(io)?;
        }

        txn.commit().map_err(io)?;

        Ok(())
    }

    fn load_contents(
        &self,
        channel_id: &str,
        range: SeqRange,
    ) -> Result<Vec<StoredContent>, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;

        let channels = txn.open_table(CHANNELS).map_err(io)?;
        if !Self::channel_exists(&channels, channel_id)? {
            return Err(StorageError::NotFound { channel_id: channel_id.to_string() });
        }
        if range.from >= range.until {
            return Ok(Vec::new());
        }

        let log = txn.open_table(CONTENTS).map_err(io)?;
        let start = encode_content_key(channel_id, range.from);
        let end = encode_content_key(channel_id, range.until);

        let mut contents = Vec::with_capacity(range.limit.min(1024));
        for result in log.range(start.as_slice()..end.as_slice()).map_err(io)? {
            if contents.len() >= range.limit {
                break;
            }

            let (_, value) = result.map_err(io)?;
            contents.push(decode(value.value())?);
        }

        Ok(contents)
    }

    fn delete_contents(&self, channel_id: &str) -> Result<usize, StorageError> {
        let txn = self.db.begin_write().map_err(io)?;

        let removed = {
            let channels = txn.open_table(CHANNELS).map_err(io)?;
            if !Self::channel_exists(&channels, channel_id)? {
                return Err(StorageError::NotFound { channel_id: channel_id.to_string() });
            }

            let mut log = txn.open_table(CONTENTS).map_err(io)?;
            let keys = Self::content_keys(&log, channel_id)?;
            for key in &keys {
                log.remove(key.as_slice()).map_err(io)?;
            }
            keys.len()
        };

        txn.commit().map_err(io)?;

        Ok(removed)
    }
}

fn io(err: impl Display) -> StorageError {
    StorageError::Io(err.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(bytes)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    ciborium::from_reader(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn read_counter<T: ReadableTable<&'static str, u64>>(
    table: &T,
    name: &str,
) -> Result<u64, StorageError> {
    Ok(table.get(name).map_err(io)?.map_or(0, |value| value.value()))
}

fn content_counter(channel_id: &str) -> String {
    format!("contents/{channel_id}")
}

/// Encode (channel_id, sequence) as a length-prefixed key.
///
/// Layout: [id_len: 2 bytes BE][channel id][sequence: 8 bytes BE]
/// The length prefix keeps one channel's keys contiguous, and big-endian
/// sequences make lexicographic order match numeric order.
fn encode_content_key(channel_id: &str, seq: u64) -> Vec<u8> {
    let id = channel_id.as_bytes();
    let mut key = Vec::with_capacity(2 + id.len() + 8);
    key.extend_from_slice(&(id.len() as u16).to_be_bytes());
    key.extend_from_slice(id);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}
