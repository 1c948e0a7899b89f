//! Lockboard wire types.
//!
//! Everything that crosses a collaborator boundary lives here: channels,
//! conversations, content records and their encrypted envelopes, secure content
//! references, continuation cursors and service errors.
//!
//! Types are plain serde structs encoded as CBOR. CBOR is self-describing,
//! compact, and needs no code generation; the board service never looks inside
//! sealed envelopes, only clients do.
//!
//! # Invariants
//!
//! - Round-trip encoding produces identical values
//! - Secret-bearing types (`KeyMaterial`, `Scr`) redact themselves in `Debug`
//!   and zeroize on drop

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod channel;
mod codec;
mod content;
mod conversation;
mod cursor;
mod error;

pub use channel::{ActivityState, Channel, ChannelImage, DEFAULT_CHANNEL_KIND, NewChannel};
pub use codec::{from_cbor, to_cbor};
pub use content::{
    ContentBody, ContentRecord, ENVELOPE_VERSION, EncryptedContent, FILE_CONTENT_TYPE, FileRef,
    NewContent, Scr, SealedScr, StoredContent,
};
pub use conversation::{Conversation, KeyMaterial, KmsResource, UserId};
pub use cursor::{Cursor, RawPage};
pub use error::{ProtocolError, ServiceError};
