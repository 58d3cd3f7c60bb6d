//! Honeypot classifier
//!
//! Distinguishes legitimate session access from trap or dead-session
//! probing, in strict order:
//!
//! 1. the reserved honeytoken marker is checked with pure string matching
//!    and short-circuits before any store I/O;
//! 2. the raw session row is consulted (finer than `validate`, which
//!    collapses Expired into Absent) — an expired row is the signature of
//!    an attacker replaying a stale link;
//! 3. everything else is `None`: genuinely fresh identifiers and truly
//!    absent ones are deliberately indistinguishable, so the classifier
//!    cannot be used as an existence oracle.
//!
//! A dead-session hit additionally dispatches a fire-and-forget alert to
//! the session's creator; delivery failure is silent and non-fatal.

use crate::alert::{AlertSink, TrapAlert};
use crate::registry::SessionRegistry;
use ghostline_core::{is_honeytoken, Fingerprint, Result, SessionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Generic warning text delivered to the creator on a dead-session probe
const TRAP_WARNING: &str = "Someone attempted to access a destroyed session";

/// Trap classification of one access attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrapType {
    /// Identifier carries the reserved honeytoken marker
    ExplicitTrap,
    /// Identifier names a session whose expiry has passed
    DeadSession,
    /// No trap signature
    None,
}

impl fmt::Display for TrapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExplicitTrap => write!(f, "explicit_trap"),
            Self::DeadSession => write!(f, "dead_session"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Result of classifying one identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Whether the access is trap or probe activity
    pub is_trap: bool,
    /// Which trap signature matched
    pub trap_type: TrapType,
    /// Whether a session row (in any state) backs the identifier; drives
    /// the generic found/not-found response message
    pub session_found: bool,
}

/// Classifier over the registry's raw read path
pub struct HoneypotClassifier {
    registry: Arc<SessionRegistry>,
    alerts: Arc<dyn AlertSink>,
}

impl HoneypotClassifier {
    /// Create a classifier reading through the given registry and
    /// dispatching alerts to the given sink
    pub fn new(registry: Arc<SessionRegistry>, alerts: Arc<dyn AlertSink>) -> Self {
        Self { registry, alerts }
    }

    /// Classify an access attempt against the identifier.
    ///
    /// Honeytoken detection runs first and never touches the store. A
    /// malformed non-honeytoken identifier fails with `InvalidFormat`
    /// before any store access.
    pub async fn classify(
        &self,
        id_text: &str,
        accessor: Option<&Fingerprint>,
    ) -> Result<Classification> {
        if is_honeytoken(id_text) {
            return Ok(Classification {
                is_trap: true,
                trap_type: TrapType::ExplicitTrap,
                session_found: false,
            });
        }

        let id = SessionId::parse(id_text)?;
        let now = self.registry.now_ms();
        match self.registry.lookup(&id).await? {
            Some(record) if record.is_expired(now) => {
                self.dispatch_alert(TrapAlert {
                    creator: record.creator.clone(),
                    accessor: accessor.cloned(),
                    warning: TRAP_WARNING.to_string(),
                    at_ms: now,
                });
                Ok(Classification {
                    is_trap: true,
                    trap_type: TrapType::DeadSession,
                    session_found: true,
                })
            }
            Some(_) => Ok(Classification {
                is_trap: false,
                trap_type: TrapType::None,
                session_found: true,
            }),
            None => Ok(Classification {
                is_trap: false,
                trap_type: TrapType::None,
                session_found: false,
            }),
        }
    }

    /// Spawn the alert delivery without blocking the classification
    /// return path. At-most-once: a failed send is logged and dropped.
    fn dispatch_alert(&self, alert: TrapAlert) {
        let sink = self.alerts.clone();
        tokio::spawn(async move {
            if let Err(err) = sink.deliver(alert).await {
                debug!(%err, "trap alert delivery failed");
            }
        });
    }
}
