//! Backing store seam for sessions and rate-limit buckets
//!
//! The session table and rate-limit table are an opaque row store reached
//! only through this trait. Every mutating operation is a conditional
//! atomic write, never read-then-write: no in-process lock spans requests,
//! so the store itself is where races are resolved.
//!
//! `MemoryStore` is the shipped engine. It keeps both tables behind a
//! single mutex, which makes each trait call atomic by construction.

use async_trait::async_trait;
use ghostline_core::{Fingerprint, Result, SessionId};
use parking_lot::Mutex;
use std::collections::HashMap;

/// One row of the session table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Validated session identifier
    pub id: SessionId,
    /// Opaque fingerprint of the creating host
    pub creator: Fingerprint,
    /// Creation time, epoch milliseconds
    pub created_at_ms: u64,
    /// Absolute expiry time, epoch milliseconds
    pub expires_at_ms: u64,
}

impl SessionRecord {
    /// A record is active while `now` is strictly before its expiry
    pub fn is_active(&self, now_ms: u64) -> bool {
        now_ms < self.expires_at_ms
    }

    /// A record is expired once its expiry has passed, even while the row
    /// is still physically present
    pub fn is_expired(&self, now_ms: u64) -> bool {
        !self.is_active(now_ms)
    }
}

/// Outcome of an atomic bucket upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether the action was admitted
    pub allowed: bool,
    /// Bucket count after the attempt (unchanged when rejected)
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    origin: String,
    action: String,
    window_start_ms: u64,
}

/// Opaque row store holding the session and rate-limit tables
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Conditionally insert a session row. Returns `false` without
    /// mutating anything when a row for the id already exists, in any
    /// state.
    async fn insert_session(&self, record: SessionRecord) -> Result<bool>;

    /// Fetch the raw session row, expired rows included
    async fn get_session(&self, id: &SessionId) -> Result<Option<SessionRecord>>;

    /// Conditionally move a session's expiry forward. Succeeds only when
    /// the row exists and is still active at `now_ms`.
    async fn update_expiry(&self, id: &SessionId, now_ms: u64, new_expiry_ms: u64) -> Result<bool>;

    /// Remove a session row. Idempotent: removing an absent row succeeds.
    async fn remove_session(&self, id: &SessionId) -> Result<()>;

    /// Delete every session row whose expiry is at or before `now_ms`,
    /// returning the number removed
    async fn sweep_sessions(&self, now_ms: u64) -> Result<u64>;

    /// Atomic conditional upsert of a rate-limit bucket: create the
    /// (origin, action, window) bucket at count 1, or increment it only
    /// while below `ceiling`. Concurrent racers each observe a single
    /// logical increment.
    async fn increment_bucket(
        &self,
        origin: &str,
        action: &str,
        window_start_ms: u64,
        ceiling: u32,
    ) -> Result<RateDecision>;

    /// Delete every bucket whose window started strictly before
    /// `cutoff_ms`, returning the number removed
    async fn sweep_buckets(&self, cutoff_ms: u64) -> Result<u64>;
}

#[derive(Debug, Default)]
struct Tables {
    sessions: HashMap<SessionId, SessionRecord>,
    buckets: HashMap<BucketKey, u32>,
}

/// In-memory store implementation
///
/// A single mutex guards both tables, so every trait operation is one
/// critical section and the conditional-write contracts hold trivially.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, record: SessionRecord) -> Result<bool> {
        let mut tables = self.tables.lock();
        if tables.sessions.contains_key(&record.id) {
            return Ok(false);
        }
        tables.sessions.insert(record.id.clone(), record);
        Ok(true)
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        Ok(self.tables.lock().sessions.get(id).cloned())
    }

    async fn update_expiry(&self, id: &SessionId, now_ms: u64, new_expiry_ms: u64) -> Result<bool> {
        let mut tables = self.tables.lock();
        match tables.sessions.get_mut(id) {
            Some(record) if record.is_active(now_ms) => {
                record.expires_at_ms = new_expiry_ms;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove_session(&self, id: &SessionId) -> Result<()> {
        self.tables.lock().sessions.remove(id);
        Ok(())
    }

    async fn sweep_sessions(&self, now_ms: u64) -> Result<u64> {
        let mut tables = self.tables.lock();
        let before = tables.sessions.len();
        tables.sessions.retain(|_, record| record.is_active(now_ms));
        Ok((before - tables.sessions.len()) as u64)
    }

    async fn increment_bucket(
        &self,
        origin: &str,
        action: &str,
        window_start_ms: u64,
        ceiling: u32,
    ) -> Result<RateDecision> {
        let key = BucketKey {
            origin: origin.to_string(),
            action: action.to_string(),
            window_start_ms,
        };
        let mut tables = self.tables.lock();
        let count = tables.buckets.entry(key).or_insert(0);
        if *count >= ceiling {
            return Ok(RateDecision {
                allowed: false,
                count: *count,
            });
        }
        *count += 1;
        Ok(RateDecision {
            allowed: true,
            count: *count,
        })
    }

    async fn sweep_buckets(&self, cutoff_ms: u64) -> Result<u64> {
        let mut tables = self.tables.lock();
        let before = tables.buckets.len();
        tables
            .buckets
            .retain(|key, _| key.window_start_ms >= cutoff_ms);
        Ok((before - tables.buckets.len()) as u64)
    }
}
