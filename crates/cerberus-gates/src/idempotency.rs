//! Idempotency deduplication gate.
//!
//! Each client-supplied key maps to at most one record that moves through
//! two states: `Processing` while the first request is in flight, then
//! `Completed` with a snapshot of the response. A second request with the
//! same key either gets the cached response replayed, or a conflict while
//! the first is still running.
//!
//! State transitions for a key happen under the key's map entry, so exactly
//! one of any number of concurrent `begin` calls for the same fresh key
//! wins the right to proceed.

use bytes::Bytes;
use cerberus_core::SharedClock;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use http::StatusCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Outcome of claiming an idempotency key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginOutcome {
    /// No live record existed; the caller now owns the key and must finish
    /// with `complete` or `release`.
    Proceed,
    /// A completed record exists; the stored response must be replayed
    /// verbatim.
    Replay {
        /// The recorded status code.
        status: StatusCode,
        /// The recorded body bytes.
        body: Bytes,
    },
    /// Another request with this key is still in flight.
    InProgress,
}

#[derive(Debug, Clone)]
enum RecordState {
    Processing,
    Completed { status: StatusCode, body: Bytes },
}

/// A single idempotency record with its expiry.
#[derive(Debug, Clone)]
struct IdempotencyRecord {
    state: RecordState,
    expires_at: Instant,
}

impl IdempotencyRecord {
    fn processing(expires_at: Instant) -> Self {
        Self {
            state: RecordState::Processing,
            expires_at,
        }
    }

    fn completed(status: StatusCode, body: Bytes, expires_at: Instant) -> Self {
        Self {
            state: RecordState::Completed { status, body },
            expires_at,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Concurrent store of idempotency records keyed by the client-supplied key.
///
/// Completed records live for the configured TTL; `Processing` records carry
/// a shorter safety TTL so a request that dies without completing cannot
/// wedge its key forever.
pub struct IdempotencyStore {
    records: DashMap<String, IdempotencyRecord>,
    completed_ttl: Duration,
    processing_ttl: Duration,
    clock: SharedClock,
}

impl IdempotencyStore {
    /// Creates a store with the given record lifetimes.
    #[must_use]
    pub fn new(completed_ttl: Duration, processing_ttl: Duration, clock: SharedClock) -> Self {
        Self {
            records: DashMap::new(),
            completed_ttl,
            processing_ttl,
            clock,
        }
    }

    /// Attempts to claim `key` for processing.
    ///
    /// Exactly one of any number of concurrent callers for the same fresh
    /// key observes [`BeginOutcome::Proceed`]; the check-and-insert runs
    /// under the key's map entry. An expired record of either state is
    /// treated as absent and reclaimed in place.
    pub fn begin(&self, key: &str) -> BeginOutcome {
        let now = self.clock.now();

        match self.records.entry(key.to_owned()) {
            Entry::Vacant(entry) => {
                entry.insert(IdempotencyRecord::processing(now + self.processing_ttl));
                debug!(key, "idempotency key claimed");
                BeginOutcome::Proceed
            }
            Entry::Occupied(mut entry) => {
                if entry.get().is_expired(now) {
                    entry.insert(IdempotencyRecord::processing(now + self.processing_ttl));
                    debug!(key, "expired idempotency record reclaimed");
                    return BeginOutcome::Proceed;
                }
                match &entry.get().state {
                    RecordState::Processing => {
                        info!(key, "idempotency key already in flight");
                        BeginOutcome::InProgress
                    }
                    RecordState::Completed { status, body } => {
                        info!(key, status = status.as_u16(), "replaying cached response");
                        BeginOutcome::Replay {
                            status: *status,
                            body: body.clone(),
                        }
                    }
                }
            }
        }
    }

    /// Records the final outcome for `key`.
    ///
    /// Definitive statuses (2xx through 4xx) are cached for replay;
    /// anything outside that range (server faults, informational responses)
    /// drops the record so the client may retry.
    pub fn complete(&self, key: &str, status: StatusCode, body: Bytes) {
        if (200..500).contains(&status.as_u16()) {
            let expires_at = self.clock.now() + self.completed_ttl;
            self.records.insert(
                key.to_owned(),
                IdempotencyRecord::completed(status, body, expires_at),
            );
            debug!(key, status = status.as_u16(), "response cached for replay");
        } else {
            self.records.remove(key);
            debug!(key, status = status.as_u16(), "record dropped for retry");
        }
    }

    /// Drops the record for `key` without caching anything.
    ///
    /// Used when the handler never produced a response (panic or abort).
    pub fn release(&self, key: &str) {
        self.records.remove(key);
        debug!(key, "idempotency key released");
    }

    /// Removes every expired record, returning how many were dropped.
    ///
    /// The count is taken inside the `retain` pass; comparing map lengths
    /// would race with concurrent `begin` inserts.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0usize;
        self.records.retain(|_, record| {
            let keep = !record.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            debug!(removed, "swept expired idempotency records");
        }
        removed
    }

    /// Returns the number of live and expired records currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl std::fmt::Debug for IdempotencyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdempotencyStore")
            .field("records", &self.records.len())
            .field("completed_ttl", &self.completed_ttl)
            .field("processing_ttl", &self.processing_ttl)
            .finish_non_exhaustive()
    }
}

/// The idempotency gate as seen by the pipeline.
///
/// Handles the no-key case: requests without a key bypass deduplication
/// entirely, so `begin` always proceeds and `complete` is a no-op.
#[derive(Debug, Clone)]
pub struct IdempotencyGuard {
    store: Arc<IdempotencyStore>,
}

impl IdempotencyGuard {
    /// Wraps a store.
    #[must_use]
    pub fn new(store: Arc<IdempotencyStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<IdempotencyStore> {
        &self.store
    }

    /// Claims the key if one was supplied; otherwise proceeds unconditionally.
    pub fn begin(&self, key: Option<&str>) -> BeginOutcome {
        match key {
            Some(key) => self.store.begin(key),
            None => BeginOutcome::Proceed,
        }
    }

    /// Records the outcome if a key was supplied.
    pub fn complete(&self, key: Option<&str>, status: StatusCode, body: Bytes) {
        if let Some(key) = key {
            self.store.complete(key, status, body);
        }
    }

    /// Drops the key's record if one was supplied.
    pub fn release(&self, key: Option<&str>) {
        if let Some(key) = key {
            self.store.release(key);
        }
    }
}
