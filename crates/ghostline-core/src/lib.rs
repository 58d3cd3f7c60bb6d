//! Ghostline core vocabulary
//!
//! Shared types for the ephemeral messaging session system: the session
//! identifier grammar and honeytoken marker, the unified error taxonomy,
//! and the clock seam that lets server components be driven by a test
//! clock.
//!
//! Everything here is deliberately free of I/O. Server and client crates
//! build on these types without this crate knowing about either.

pub mod clock;
pub mod errors;
pub mod identifier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{GhostError, Result};
pub use identifier::{
    is_honeytoken, Fingerprint, HoneytokenGenerator, SessionId, HONEYTOKEN_PREFIX, SESSION_PREFIX,
};
