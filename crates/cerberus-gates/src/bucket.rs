//! Per-identity token bucket storage.
//!
//! The store keeps one fixed-window bucket per client identity in a sharded
//! concurrent map. The refill-then-decrement sequence for a single identity
//! runs under that identity's map entry, so concurrent requests from the
//! same client serialize only for the duration of the check while distinct
//! clients land on independent shards.
//!
//! This is a coarse fixed-window limiter: the whole quota is restored at
//! every window boundary, so up to `2 * capacity` requests can land around a
//! boundary. That trade-off is accepted for simplicity; no smoothing between
//! windows is attempted.
//!
//! Buckets are created lazily and never evicted, so the map grows with the
//! number of distinct identities ever seen (see DESIGN.md).

use cerberus_core::{ClientId, SharedClock};
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Outcome of a single token consumption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consume {
    /// Whether a token was available and consumed.
    pub allowed: bool,
    /// Tokens left in the current window after this attempt.
    pub remaining: u32,
    /// Time until the current window resets.
    pub reset_in: Duration,
}

/// State for a single identity's fixed window.
#[derive(Debug)]
struct TokenBucket {
    /// Tokens left in the current window; `0 <= tokens <= capacity`.
    tokens: u32,
    /// When the current window started.
    window_start: Instant,
}

/// Concurrent map of token buckets, one per client identity.
pub struct TokenBucketStore {
    buckets: DashMap<ClientId, TokenBucket>,
    capacity: u32,
    window: Duration,
    clock: SharedClock,
}

impl TokenBucketStore {
    /// Creates a store granting `capacity` tokens per `window` per identity.
    #[must_use]
    pub fn new(capacity: u32, window: Duration, clock: SharedClock) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity,
            window,
            clock,
        }
    }

    /// Returns the per-window capacity.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns the window length.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Attempts to consume one token for the given identity.
    ///
    /// Creates the bucket on first sight. The refill check and the
    /// decrement happen under the identity's map entry, so the sequence is
    /// atomic with respect to concurrent callers for the same identity.
    pub fn try_consume(&self, client: &ClientId) -> Consume {
        let now = self.clock.now();
        let mut bucket = self
            .buckets
            .entry(client.clone())
            .or_insert_with(|| TokenBucket {
                tokens: self.capacity,
                window_start: now,
            });

        // Wholesale reset at the window boundary.
        if now.duration_since(bucket.window_start) >= self.window {
            bucket.tokens = self.capacity;
            bucket.window_start = now;
        }

        let allowed = if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        };

        let reset_in = self
            .window
            .saturating_sub(now.duration_since(bucket.window_start));

        Consume {
            allowed,
            remaining: bucket.tokens,
            reset_in,
        }
    }

    /// Returns the number of identities with a bucket.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns `true` if no identity has been seen yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl std::fmt::Debug for TokenBucketStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBucketStore")
            .field("identities", &self.buckets.len())
            .field("capacity", &self.capacity)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
