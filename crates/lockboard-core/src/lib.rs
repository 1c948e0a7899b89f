//! Lockboard client core.
//!
//! End-to-end-encrypted board storage: channels attached to conversations,
//! each holding an ordered collection of encrypted content records and
//! encrypted blobs. The board service only ever sees ciphertext.
//!
//! # Architecture
//!
//! ```text
//! BoardClient ─┬─> ChannelLifecycle (enforced by the board service)
//!              ├─> ContentCodec ──> KeyBindingResolver / KeyCache ──> KMS
//!              └─> Page<Source> ──> BoardApi (paged collections)
//! ```
//!
//! Collaborators are traits in [`services`]; the harness crate provides
//! in-memory implementations for deterministic tests, the server crate the
//! reference board service.
//!
//! # Invariants
//!
//! - Content is sealed under a key resolved for the requester at write time
//! - A participant who lost access cannot resolve keys, cached or not
//! - Pages are immutable; `next()` performs exactly one remote fetch
//! - A batch of records is appended atomically and in submission order

#![forbid(unsafe_code)]

pub mod board;
pub mod codec;
pub mod config;
pub mod env;
pub mod error;
pub mod keys;
pub mod lifecycle;
pub mod options;
pub mod pagination;
pub mod services;

pub use board::{BoardClient, ChannelPage, ChannelSource, ContentPage, ContentSource, DISPLAY_NAME_KEY};
pub use codec::{ContentCodec, PendingBlob};
pub use config::BoardConfig;
pub use env::Environment;
pub use error::BoardError;
pub use keys::{KeyAccess, KeyBindingResolver, KeyCache, KeyScope};
pub use lifecycle::{ChannelLifecycle, LifecycleError};
pub use options::{
    ChannelListOptions, ChannelOptions, ContentOptions, DeleteOptions, ImageFile, ImageOptions,
};
pub use pagination::{Page, PageSource};
pub use services::{BlobStore, BoardApi, ConversationService, KeyManagement, Services};
