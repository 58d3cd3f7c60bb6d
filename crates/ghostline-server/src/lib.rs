//! Ghostline server
//!
//! Server-side half of the ephemeral messaging session system: a
//! TTL-backed session registry, a per-origin sliding-window rate limiter,
//! and a honeypot classifier that flags trap and dead-session probing,
//! all exposed through a small JSON-over-HTTP operation surface.
//!
//! State lives behind the `SessionStore` seam; handlers are stateless and
//! any instance may serve any request. All read-modify-write sequences go
//! through conditional atomic store operations, never read-then-write.

pub mod alert;
pub mod config;
pub mod honeypot;
pub mod http;
pub mod rate_limit;
pub mod registry;
pub mod store;

pub use alert::{AlertSink, ChannelAlertSink, NoopAlertSink, TrapAlert};
pub use config::ServerConfig;
pub use honeypot::{Classification, HoneypotClassifier, TrapType};
pub use http::{router, AppState};
pub use rate_limit::{RateLimitConfig, RateLimiter, ACTION_CREATE_SESSION};
pub use registry::{RegistryConfig, SessionRegistry, ValidationOutcome};
pub use store::{MemoryStore, RateDecision, SessionRecord, SessionStore};
