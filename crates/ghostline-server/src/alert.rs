//! Trap-alert delivery seam
//!
//! When the classifier flags a dead-session probe it notifies the
//! session's original creator. Delivery is best-effort, fire-and-forget:
//! at-most-once, no retry, and a failed send changes nothing about the
//! classification result. The host process wires the sink to whatever
//! live notification channel the session used.

use async_trait::async_trait;
use ghostline_core::{Fingerprint, GhostError, Result};
use tokio::sync::mpsc;

/// Warning carried to a session creator when their dead session is probed
///
/// Only a generic warning string, a timestamp, and the accessor's opaque
/// fingerprint (when supplied). Never the accessor's network identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrapAlert {
    /// Fingerprint of the session's creator, the addressee
    pub creator: Fingerprint,
    /// Opaque fingerprint of the probing accessor, if one was supplied
    pub accessor: Option<Fingerprint>,
    /// Generic warning text
    pub warning: String,
    /// When the probe was classified, epoch milliseconds
    pub at_ms: u64,
}

/// Outbound channel for trap alerts
///
/// Implementations must not retry: the delivery guarantee is
/// at-most-once by design.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Attempt one delivery of the alert
    async fn deliver(&self, alert: TrapAlert) -> Result<()>;
}

/// Sink that drops every alert; useful for deployments without a live
/// notification channel and for tests that only exercise classification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAlertSink;

#[async_trait]
impl AlertSink for NoopAlertSink {
    async fn deliver(&self, _alert: TrapAlert) -> Result<()> {
        Ok(())
    }
}

/// Sink forwarding alerts onto an in-process channel
///
/// The host owns the receiving half and bridges it to the session's live
/// transport. A full or closed channel is a failed delivery, nothing more.
#[derive(Debug, Clone)]
pub struct ChannelAlertSink {
    tx: mpsc::Sender<TrapAlert>,
}

impl ChannelAlertSink {
    /// Create a sink with the given buffer size, returning the receiver
    /// for the host to drain
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<TrapAlert>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl AlertSink for ChannelAlertSink {
    async fn deliver(&self, alert: TrapAlert) -> Result<()> {
        self.tx
            .try_send(alert)
            .map_err(|_| GhostError::unreachable("alert channel unavailable"))
    }
}
