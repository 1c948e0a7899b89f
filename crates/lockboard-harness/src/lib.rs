//! Deterministic simulation harness for Lockboard.
//!
//! In-process implementations of every collaborator a
//! [`BoardClient`](lockboard_core::BoardClient) talks to: a conversation
//! directory, a KMS that checks membership on every request, an encrypted
//! blob store, and the reference board service from `lockboard-server`.
//! All randomness flows from one seed, so failing scenarios replay exactly.
//!
//! ```text
//! SimWorld ─┬─> MemoryDirectory (membership, AccessPolicy)
//!           ├─> MemoryKms ──────> MemoryDirectory
//!           ├─> MemoryBlobStore
//!           └─> BoardService<SimEnv, Storage, MemoryDirectory>
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod blobs;
pub mod directory;
pub mod kms;
pub mod sim_env;
pub mod world;

pub use blobs::MemoryBlobStore;
pub use directory::MemoryDirectory;
pub use kms::MemoryKms;
pub use sim_env::SimEnv;
pub use world::{SimClient, SimWorld};
