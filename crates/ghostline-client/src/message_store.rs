//! Ephemeral message store
//!
//! Per-session bounded FIFO buffer holding one conversation's messages
//! for the lifetime of the session UI. The store is an explicitly
//! constructed, explicitly owned value — never a global — and its only
//! backing medium is process memory.
//!
//! Destruction is destructive: content and filename fields are zeroized
//! before a record is released, whether by FIFO eviction, per-session
//! destruction, or the terminal `nuclear_purge`. Destruction runs to
//! completion before returning; there is no "eventually scrubbed" state.

use crate::timestamp::TimestampDecorrelator;
use ghostline_core::SessionId;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;
use zeroize::Zeroize;

/// Default per-session message capacity
pub const DEFAULT_CAPACITY: usize = 500;

/// Unique message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Create a new random message ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of the conversation produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderRole {
    /// Authored on this device
    Local,
    /// Received from the peer
    Remote,
}

/// Logical message type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Plain text
    Text,
    /// File transfer
    File,
    /// System notice
    System,
    /// Voice message
    Voice,
    /// Video message
    Video,
}

/// One retained message
///
/// Deliberately implements neither `Serialize` nor `Deserialize`: a
/// message must never be representable outside process memory.
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    /// Unique identifier, the deduplication and acknowledgment key
    pub id: MessageId,
    /// Message payload; emptied on scrub
    pub content: String,
    /// Originating side
    pub sender: SenderRole,
    /// Logical type
    pub kind: MessageKind,
    /// When the sender dispatched it, epoch milliseconds
    pub sent_at_ms: u64,
    /// When this device received it, epoch milliseconds
    pub received_at_ms: u64,
    /// Whether delivery has been acknowledged
    pub acknowledged: bool,
    /// Original filename for file transfers; emptied on scrub
    pub filename: Option<String>,
}

impl QueuedMessage {
    /// Overwrite sensitive fields before the record is released
    fn scrub(&mut self) {
        self.content.zeroize();
        if let Some(name) = self.filename.as_mut() {
            name.zeroize();
        }
        self.filename = None;
    }
}

/// Message prepared for rendering, timestamped through the decorrelator
#[derive(Debug, Clone)]
pub struct PresentedMessage {
    /// Message identifier
    pub id: MessageId,
    /// Payload for display
    pub content: String,
    /// Originating side
    pub sender: SenderRole,
    /// Logical type
    pub kind: MessageKind,
    /// Decorrelated display time, epoch milliseconds
    pub display_at_ms: u64,
    /// Whether delivery has been acknowledged
    pub acknowledged: bool,
}

struct Waiter {
    session: Option<SessionId>,
    ticket: u64,
    tx: oneshot::Sender<bool>,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionId, VecDeque<QueuedMessage>>,
    waiters: HashMap<MessageId, Waiter>,
    next_ticket: u64,
    purged: bool,
}

/// Bounded, memory-only message buffer with acknowledgment waits
pub struct EphemeralMessageStore {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl Default for EphemeralMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EphemeralMessageStore {
    /// Create a store with the default per-session capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a store with an explicit per-session capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Append a message to a session's buffer.
    ///
    /// Duplicates (by message id) are no-ops. At capacity the single
    /// oldest entry is scrubbed and evicted first. Returns `false` when
    /// nothing was appended — duplicate or post-purge call.
    pub fn add(&self, session: &SessionId, message: QueuedMessage) -> bool {
        let mut inner = self.inner.lock();
        if inner.purged {
            return false;
        }
        let capacity = self.capacity;
        let buffer = inner.sessions.entry(session.clone()).or_default();
        if buffer.iter().any(|m| m.id == message.id) {
            return false;
        }
        if buffer.len() >= capacity {
            if let Some(mut evicted) = buffer.pop_front() {
                evicted.scrub();
            }
        }
        buffer.push_back(message);
        true
    }

    /// Mark a message delivered and resolve any outstanding wait for it.
    ///
    /// Returns `true` when the message was found and marked.
    pub fn acknowledge(&self, session: &SessionId, id: &MessageId) -> bool {
        let mut inner = self.inner.lock();
        let marked = inner
            .sessions
            .get_mut(session)
            .and_then(|buffer| buffer.iter_mut().find(|m| m.id == *id))
            .map(|message| {
                message.acknowledged = true;
            })
            .is_some();
        if let Some(waiter) = inner.waiters.remove(id) {
            let _ = waiter.tx.send(true);
        }
        marked
    }

    /// Wait until the message is acknowledged or the timeout elapses.
    ///
    /// Resolves `true` immediately when the message is already
    /// acknowledged. At most one waiter is tracked per message id; a
    /// second registration resolves the displaced waiter with `false`
    /// rather than dropping it silently.
    pub async fn wait_for_ack(&self, id: &MessageId, timeout: Duration) -> bool {
        let (rx, ticket) = {
            let mut inner = self.inner.lock();
            if inner.purged {
                return false;
            }
            let already_acked = inner
                .sessions
                .values()
                .flat_map(|buffer| buffer.iter())
                .any(|m| m.id == *id && m.acknowledged);
            if already_acked {
                return true;
            }
            let session = inner
                .sessions
                .iter()
                .find(|(_, buffer)| buffer.iter().any(|m| m.id == *id))
                .map(|(session, _)| session.clone());
            let ticket = inner.next_ticket;
            inner.next_ticket += 1;
            let (tx, rx) = oneshot::channel();
            if let Some(displaced) = inner.waiters.insert(
                *id,
                Waiter {
                    session,
                    ticket,
                    tx,
                },
            ) {
                let _ = displaced.tx.send(false);
            }
            (rx, ticket)
        };

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(acked)) => acked,
            // Sender dropped without resolving; treat as not acknowledged
            Ok(Err(_)) => false,
            Err(_) => {
                // Deregister only if the entry is still ours; a newer
                // waiter may have replaced it while we slept
                let mut inner = self.inner.lock();
                if inner.waiters.get(id).is_some_and(|w| w.ticket == ticket) {
                    inner.waiters.remove(id);
                }
                false
            }
        }
    }

    /// Synchronously scrub and remove everything retained for a session,
    /// then resolve its pending waiters with `false`.
    pub fn destroy_session(&self, session: &SessionId) {
        let mut inner = self.inner.lock();
        if let Some(mut buffer) = inner.sessions.remove(session) {
            for message in buffer.iter_mut() {
                message.scrub();
            }
        }
        let displaced: Vec<MessageId> = inner
            .waiters
            .iter()
            .filter(|(_, w)| w.session.as_ref() == Some(session))
            .map(|(id, _)| *id)
            .collect();
        for id in displaced {
            if let Some(waiter) = inner.waiters.remove(&id) {
                let _ = waiter.tx.send(false);
            }
        }
    }

    /// Scrub and clear every session, then render the store permanently
    /// unusable. Subsequent `add` calls are no-ops; a fresh store
    /// instance is required to hold data again.
    pub fn nuclear_purge(&self) {
        let mut inner = self.inner.lock();
        for buffer in inner.sessions.values_mut() {
            for message in buffer.iter_mut() {
                message.scrub();
            }
        }
        inner.sessions.clear();
        for (_, waiter) in inner.waiters.drain() {
            let _ = waiter.tx.send(false);
        }
        inner.purged = true;
    }

    /// Whether the store has been terminally purged
    pub fn is_purged(&self) -> bool {
        self.inner.lock().purged
    }

    /// Number of messages retained for a session
    pub fn message_count(&self, session: &SessionId) -> usize {
        self.inner
            .lock()
            .sessions
            .get(session)
            .map_or(0, VecDeque::len)
    }

    /// Snapshot a session's messages in retention (FIFO) order
    pub fn snapshot(&self, session: &SessionId) -> Vec<QueuedMessage> {
        self.inner
            .lock()
            .sessions
            .get(session)
            .map(|buffer| buffer.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Prepare a session's messages for display, decorrelating their
    /// timestamps. Display order never runs backward: the jittered times
    /// are re-sorted ascending and paired with the retention order.
    pub fn presentation(
        &self,
        session: &SessionId,
        decorrelator: &TimestampDecorrelator,
    ) -> Vec<PresentedMessage> {
        let messages = self.snapshot(session);
        let sent_times: Vec<u64> = messages.iter().map(|m| m.sent_at_ms).collect();
        let display_times = decorrelator.transform_all(&sent_times);
        messages
            .into_iter()
            .zip(display_times)
            .map(|(message, display_at_ms)| PresentedMessage {
                id: message.id,
                content: message.content,
                sender: message.sender,
                kind: message.kind,
                display_at_ms,
                acknowledged: message.acknowledged,
            })
            .collect()
    }
}
