//! Session registry: the authoritative TTL-backed lifecycle state machine
//!
//! A session is Active while now is before its expiry, Expired while the
//! row still exists past expiry, and Absent once deleted (or never
//! created). Only `create`, `extend`, `delete`, and the scheduled sweep
//! mutate rows; reads never do.
//!
//! `validate` collapses Expired and Absent into one boolean and keeps the
//! two timing-indistinguishable structurally: a malformed identifier is
//! swapped for a fixed well-formed decoy and the lookup is performed
//! anyway, so every path through `validate` executes exactly one store
//! access instead of relying on an artificial sleep.

use crate::store::{SessionRecord, SessionStore};
use ghostline_core::{Clock, Fingerprint, GhostError, Result, SessionId};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::debug;

/// Well-formed identifier used to equalize the lookup count on the
/// malformed-input path. Never inserted; the grammar makes collisions
/// with real sessions possible but harmless (a hit simply validates).
static DECOY_SESSION_ID: Lazy<SessionId> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    let id = SessionId::parse("GHOST-ZZZZ-ZZZZ").expect("decoy id matches the session grammar");
    id
});

/// Registry tuning
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Session time-to-live; `extend` resets expiry to now + ttl
    pub ttl_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 30 * 60 * 1000, // 30 minutes
        }
    }
}

/// Single-boolean validation result
///
/// Expired and Absent produce the same value; the distinction never
/// leaves the registry through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// True only for an existing, unexpired session
    pub valid: bool,
    /// Expiry of the validated session, present only when valid
    pub expires_at_ms: Option<u64>,
}

impl ValidationOutcome {
    fn invalid() -> Self {
        Self {
            valid: false,
            expires_at_ms: None,
        }
    }
}

/// TTL-backed session lifecycle over the opaque row store
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: RegistryConfig,
}

impl SessionRegistry {
    /// Create a registry over the given store and clock
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, config: RegistryConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Insert a new Active session.
    ///
    /// Fails with `Conflict` when a row for the id exists in any state; a
    /// collision is reported, never silently overwritten.
    pub async fn create(&self, id: &SessionId, creator: &Fingerprint) -> Result<SessionRecord> {
        let now = self.clock.now_ms();
        let record = SessionRecord {
            id: id.clone(),
            creator: creator.clone(),
            created_at_ms: now,
            expires_at_ms: now + self.config.ttl_ms,
        };
        if self.store.insert_session(record.clone()).await? {
            debug!(session = %id, expires_at_ms = record.expires_at_ms, "session created");
            Ok(record)
        } else {
            Err(GhostError::conflict("session id already exists"))
        }
    }

    /// Validate an identifier as received from the wire.
    ///
    /// Malformed, absent, and expired all yield the same invalid outcome,
    /// and every path performs exactly one store lookup.
    pub async fn validate(&self, id_text: &str) -> Result<ValidationOutcome> {
        let (lookup_id, well_formed) = match SessionId::parse(id_text) {
            Ok(id) => (id, true),
            Err(_) => (DECOY_SESSION_ID.clone(), false),
        };
        let row = self.store.get_session(&lookup_id).await?;
        if !well_formed {
            return Ok(ValidationOutcome::invalid());
        }
        let now = self.clock.now_ms();
        match row {
            Some(record) if record.is_active(now) => Ok(ValidationOutcome {
                valid: true,
                expires_at_ms: Some(record.expires_at_ms),
            }),
            _ => Ok(ValidationOutcome::invalid()),
        }
    }

    /// Fetch the raw row for an identifier, expired rows included.
    ///
    /// This is the finer-grained read path the honeypot classifier needs;
    /// it shares the record type with `validate` so the two views cannot
    /// drift.
    pub async fn lookup(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        self.store.get_session(id).await
    }

    /// Flat-reset a session's expiry to now + ttl.
    ///
    /// Fails with `NotFound` unless the session is currently Active.
    pub async fn extend(&self, id: &SessionId) -> Result<u64> {
        let now = self.clock.now_ms();
        let new_expiry = now + self.config.ttl_ms;
        if self.store.update_expiry(id, now, new_expiry).await? {
            Ok(new_expiry)
        } else {
            Err(GhostError::not_found("no active session to extend"))
        }
    }

    /// Remove a session. Idempotent and always successful from the
    /// caller's perspective, including when racing the sweep.
    pub async fn delete(&self, id: &SessionId) -> Result<()> {
        self.store.remove_session(id).await
    }

    /// Batch-delete every expired session, returning the count removed.
    /// Scheduled work; never runs on the request path.
    pub async fn sweep(&self) -> Result<u64> {
        self.store.sweep_sessions(self.clock.now_ms()).await
    }

    /// Current time as seen by the registry's clock
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, RateDecision};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use ghostline_core::ManualClock;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Store wrapper counting accesses, to prove short-circuit and
    /// lookup-parity properties
    struct CountingStore {
        inner: MemoryStore,
        accesses: AtomicU64,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                accesses: AtomicU64::new(0),
            }
        }

        fn accesses(&self) -> u64 {
            self.accesses.load(Ordering::SeqCst)
        }

        fn tick(&self) {
            self.accesses.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl SessionStore for CountingStore {
        async fn insert_session(&self, record: SessionRecord) -> Result<bool> {
            self.tick();
            self.inner.insert_session(record).await
        }

        async fn get_session(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
            self.tick();
            self.inner.get_session(id).await
        }

        async fn update_expiry(
            &self,
            id: &SessionId,
            now_ms: u64,
            new_expiry_ms: u64,
        ) -> Result<bool> {
            self.tick();
            self.inner.update_expiry(id, now_ms, new_expiry_ms).await
        }

        async fn remove_session(&self, id: &SessionId) -> Result<()> {
            self.tick();
            self.inner.remove_session(id).await
        }

        async fn sweep_sessions(&self, now_ms: u64) -> Result<u64> {
            self.tick();
            self.inner.sweep_sessions(now_ms).await
        }

        async fn increment_bucket(
            &self,
            origin: &str,
            action: &str,
            window_start_ms: u64,
            ceiling: u32,
        ) -> Result<RateDecision> {
            self.tick();
            self.inner
                .increment_bucket(origin, action, window_start_ms, ceiling)
                .await
        }

        async fn sweep_buckets(&self, cutoff_ms: u64) -> Result<u64> {
            self.tick();
            self.inner.sweep_buckets(cutoff_ms).await
        }
    }

    fn fixture() -> (SessionRegistry, Arc<CountingStore>, Arc<ManualClock>) {
        let store = Arc::new(CountingStore::new());
        let clock = Arc::new(ManualClock::new(1_000_000));
        let registry = SessionRegistry::new(store.clone(), clock.clone(), RegistryConfig::default());
        (registry, store, clock)
    }

    fn sid(text: &str) -> SessionId {
        SessionId::parse(text).unwrap()
    }

    fn fp() -> Fingerprint {
        Fingerprint::parse("host-fingerprint-01").unwrap()
    }

    #[tokio::test]
    async fn duplicate_create_yields_exactly_one_conflict() {
        let (registry, store, _clock) = fixture();
        let id = sid("GHOST-ABCD-2345");

        registry.create(&id, &fp()).await.unwrap();
        let err = registry.create(&id, &fp()).await.unwrap_err();
        assert_matches!(err, GhostError::Conflict { .. });

        // Exactly one record survives, with the original expiry
        let record = registry.lookup(&id).await.unwrap().unwrap();
        assert_eq!(record.created_at_ms, 1_000_000);
        assert_eq!(store.accesses(), 3); // two inserts, one lookup
    }

    #[tokio::test]
    async fn create_conflicts_even_against_an_expired_row() {
        let (registry, _store, clock) = fixture();
        let id = sid("GHOST-ABCD-2345");
        registry.create(&id, &fp()).await.unwrap();

        clock.advance(RegistryConfig::default().ttl_ms + 1);
        let err = registry.create(&id, &fp()).await.unwrap_err();
        assert_matches!(err, GhostError::Conflict { .. });
    }

    #[tokio::test]
    async fn validate_accepts_only_active_sessions() {
        let (registry, _store, clock) = fixture();
        let id = sid("GHOST-ABCD-2345");
        let record = registry.create(&id, &fp()).await.unwrap();

        let outcome = registry.validate(id.as_str()).await.unwrap();
        assert!(outcome.valid);
        assert_eq!(outcome.expires_at_ms, Some(record.expires_at_ms));

        // One millisecond past expiry: same shape as never-created
        clock.set(record.expires_at_ms + 1);
        let expired = registry.validate(id.as_str()).await.unwrap();
        let absent = registry.validate("GHOST-WXYZ-2345").await.unwrap();
        assert_eq!(expired, absent);
        assert_eq!(expired, ValidationOutcome::invalid());
    }

    #[tokio::test]
    async fn validate_performs_one_lookup_on_every_path() {
        let (registry, store, _clock) = fixture();
        let id = sid("GHOST-ABCD-2345");
        registry.create(&id, &fp()).await.unwrap();
        let after_create = store.accesses();

        registry.validate(id.as_str()).await.unwrap();
        assert_eq!(store.accesses() - after_create, 1);

        registry.validate("GHOST-WXYZ-2345").await.unwrap();
        assert_eq!(store.accesses() - after_create, 2);

        // Malformed input still costs exactly one lookup (the decoy)
        registry.validate("not-a-session-id").await.unwrap();
        assert_eq!(store.accesses() - after_create, 3);
    }

    #[tokio::test]
    async fn extend_is_a_flat_reset_for_active_sessions_only() {
        let (registry, _store, clock) = fixture();
        let id = sid("GHOST-ABCD-2345");
        registry.create(&id, &fp()).await.unwrap();

        clock.advance(10 * 60 * 1000);
        let new_expiry = registry.extend(&id).await.unwrap();
        assert_eq!(new_expiry, clock.now_ms() + RegistryConfig::default().ttl_ms);

        clock.set(new_expiry + 1);
        let err = registry.extend(&id).await.unwrap_err();
        assert_matches!(err, GhostError::NotFound { .. });

        let missing = sid("GHOST-WXYZ-2345");
        let err = registry.extend(&missing).await.unwrap_err();
        assert_matches!(err, GhostError::NotFound { .. });
    }

    #[tokio::test]
    async fn delete_succeeds_with_or_without_a_row() {
        let (registry, _store, _clock) = fixture();
        let id = sid("GHOST-ABCD-2345");
        registry.delete(&id).await.unwrap();
        registry.create(&id, &fp()).await.unwrap();
        registry.delete(&id).await.unwrap();
        registry.delete(&id).await.unwrap();
        assert!(registry.lookup(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sweep_deletes_expired_rows_in_batch() {
        let (registry, _store, clock) = fixture();
        registry.create(&sid("GHOST-ABCD-2345"), &fp()).await.unwrap();
        registry.create(&sid("GHOST-WXYZ-2345"), &fp()).await.unwrap();

        clock.advance(RegistryConfig::default().ttl_ms + 1);
        registry.create(&sid("GHOST-FRE5-H234"), &fp()).await.unwrap();

        assert_eq!(registry.sweep().await.unwrap(), 2);
        assert!(registry
            .lookup(&sid("GHOST-FRE5-H234"))
            .await
            .unwrap()
            .is_some());
    }
}
