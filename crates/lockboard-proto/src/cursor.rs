//! Continuation cursors for paged collections.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque continuation token handed out by a paged collection.
///
/// Clients never parse a cursor; they only pass it back to the collection that
/// issued it. Only the issuing service knows the encoding.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor(Vec<u8>);

impl Cursor {
    /// Wrap service-encoded bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Encoded bytes, for the issuing service to decode.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor({} bytes)", self.0.len())
    }
}

/// One slice of a remote collection as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPage<T> {
    /// Items in collection order
    pub items: Vec<T>,
    /// Token for the next slice; `None` when the collection is exhausted
    pub next: Option<Cursor>,
}

impl<T> RawPage<T> {
    /// A final page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}
