//! Ghostline client
//!
//! Client-resident half of the ephemeral messaging session system: the
//! strictly in-memory message store with acknowledgment and destructive
//! erasure, the timestamp decorrelator applied on the presentation path,
//! and a thin typed wrapper over the server's session operations.
//!
//! Nothing in this crate writes to a persistent medium. That is a
//! load-bearing invariant, not an implementation detail: message records
//! are deliberately not serializable, so no adapter can accidentally
//! introduce durability.

pub mod api;
pub mod message_store;
pub mod timestamp;

pub use api::{CreatedSession, SessionApi, TrapVerdict, ValidationView};
pub use message_store::{
    EphemeralMessageStore, MessageId, MessageKind, PresentedMessage, QueuedMessage, SenderRole,
    DEFAULT_CAPACITY,
};
pub use timestamp::{JitterMode, TimestampConfig, TimestampDecorrelator};
