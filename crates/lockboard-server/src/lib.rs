//! Lockboard reference board service.
//!
//! The board service stores channels and their encrypted content logs. It
//! enforces the channel lifecycle, membership of the linked conversation and
//! batch atomicity, and issues opaque continuation cursors. It never holds key
//! material and never sees plaintext.
//!
//! # Components
//!
//! - [`BoardService`]: request handling over pluggable storage; implements
//!   [`lockboard_core::BoardApi`]
//! - [`Storage`]: persistence trait with in-memory, Redb and fault-injecting
//!   implementations
//! - [`SystemEnv`]: production environment (OS RNG)
//!
//! The `lockboard-admin` binary opens a Redb store for operator inspection and
//! channel lock/delete.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod api;
pub mod service;
pub mod storage;
mod system_env;

pub use service::{AccessPolicy, BoardService, OpenAccess, ServiceConfig};
pub use storage::{ChaoticStorage, MemoryStorage, RedbStorage, SeqRange, Storage, StorageError};
pub use system_env::SystemEnv;
