//! Fixed-window rate limiting gate.
//!
//! The limiter consults the per-identity [`TokenBucketStore`] and turns the
//! raw consumption result into an admission decision. Rejections become a
//! `429 Too Many Requests` response carrying the standard rate-limit
//! headers so well-behaved clients can back off.

use crate::bucket::TokenBucketStore;
use cerberus_core::{AdmissionError, ClientId, Response, SharedClock};
use http::StatusCode;
use std::time::Duration;
use tracing::warn;

/// Response headers attached to rate-limit rejections.
pub mod headers {
    /// The per-window request quota.
    pub const LIMIT: &str = "x-ratelimit-limit";
    /// Tokens left in the current window.
    pub const REMAINING: &str = "x-ratelimit-remaining";
    /// Seconds the client should wait before retrying.
    pub const RETRY_AFTER: &str = "retry-after";
}

/// Body message for rate-limit rejections.
const RATE_LIMIT_MESSAGE: &str = "Too many requests. Please try again later.";

/// Decision for a single admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The request is within quota and may proceed.
    Allowed {
        /// The per-window quota.
        limit: u32,
        /// Tokens left after this request.
        remaining: u32,
        /// Time until the window resets.
        reset_in: Duration,
    },
    /// The quota is exhausted; the request must be rejected.
    Limited {
        /// The per-window quota.
        limit: u32,
        /// Seconds the client should back off: the configured window
        /// length, regardless of how far into the window the rejection
        /// happened.
        retry_after: u64,
    },
}

impl RateDecision {
    /// Returns `true` if the request may proceed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// The rate limiting gate.
///
/// Thin wrapper over [`TokenBucketStore`] that owns the rejection shape.
#[derive(Debug)]
pub struct RateLimiter {
    store: TokenBucketStore,
}

impl RateLimiter {
    /// Creates a limiter granting `limit` requests per `window` per identity.
    #[must_use]
    pub fn new(limit: u32, window: Duration, clock: SharedClock) -> Self {
        Self {
            store: TokenBucketStore::new(limit, window, clock),
        }
    }

    /// Returns the per-window quota.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.store.capacity()
    }

    /// Checks whether a request from `client` is within quota, consuming a
    /// token if it is.
    pub fn check(&self, client: &ClientId) -> RateDecision {
        let consume = self.store.try_consume(client);

        if consume.allowed {
            RateDecision::Allowed {
                limit: self.store.capacity(),
                remaining: consume.remaining,
                reset_in: consume.reset_in,
            }
        } else {
            // Clients are told to wait a full window, not the remainder.
            let retry_after = self.store.window().as_secs();
            warn!(
                client = %client,
                limit = self.store.capacity(),
                retry_after_seconds = retry_after,
                "rate limit exceeded"
            );
            RateDecision::Limited {
                limit: self.store.capacity(),
                retry_after,
            }
        }
    }

    /// Builds the `429` rejection response for a [`RateDecision::Limited`].
    #[must_use]
    pub fn rejection(limit: u32, retry_after: u64) -> Response {
        let error = AdmissionError::rate_limited(RATE_LIMIT_MESSAGE, Some(retry_after));
        let mut response = error.to_response();
        debug_assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let headers = response.headers_mut();
        if let Ok(value) = http::HeaderValue::from_str(&limit.to_string()) {
            headers.insert(headers::LIMIT, value);
        }
        headers.insert(headers::REMAINING, http::HeaderValue::from_static("0"));
        if let Ok(value) = http::HeaderValue::from_str(&retry_after.to_string()) {
            headers.insert(headers::RETRY_AFTER, value);
        }

        response
    }

    /// Attaches the allowance headers to a pass-through response so clients
    /// can pace themselves before hitting the limit.
    pub fn attach_allowance(response: &mut Response, limit: u32, remaining: u32) {
        let headers = response.headers_mut();
        if let Ok(value) = http::HeaderValue::from_str(&limit.to_string()) {
            headers.insert(headers::LIMIT, value);
        }
        if let Ok(value) = http::HeaderValue::from_str(&remaining.to_string()) {
            headers.insert(headers::REMAINING, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cerberus_core::{into_body_bytes, ManualClock};
    use std::sync::Arc;

    fn limiter(limit: u32, window_secs: u64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::new(limit, Duration::from_secs(window_secs), clock.clone());
        (limiter, clock)
    }

    #[test]
    fn test_allows_within_quota() {
        let (limiter, _clock) = limiter(2, 60);
        let client = ClientId::from("192.0.2.1");

        assert!(limiter.check(&client).is_allowed());
        assert!(limiter.check(&client).is_allowed());
        assert!(!limiter.check(&client).is_allowed());
    }

    #[test]
    fn test_retry_after_is_the_window_length() {
        let (limiter, clock) = limiter(1, 60);
        let client = ClientId::from("192.0.2.1");

        limiter.check(&client);
        // Mid-window rejections still advertise the full window.
        clock.advance(Duration::from_secs(20));

        match limiter.check(&client) {
            RateDecision::Limited { limit, retry_after } => {
                assert_eq!(limit, 1);
                assert_eq!(retry_after, 60);
            }
            RateDecision::Allowed { .. } => panic!("expected rejection"),
        }
    }

    #[test]
    fn test_retry_after_near_window_boundary() {
        let (limiter, clock) = limiter(1, 60);
        let client = ClientId::from("192.0.2.1");

        limiter.check(&client);
        clock.advance(Duration::from_millis(59_500));

        match limiter.check(&client) {
            RateDecision::Limited { retry_after, .. } => assert_eq!(retry_after, 60),
            RateDecision::Allowed { .. } => panic!("expected rejection"),
        }
    }

    #[tokio::test]
    async fn test_rejection_response_shape() {
        let response = RateLimiter::rejection(10, 60);

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[headers::LIMIT], "10");
        assert_eq!(response.headers()[headers::REMAINING], "0");
        assert_eq!(response.headers()[headers::RETRY_AFTER], "60");

        let (_, bytes) = into_body_bytes(response).await;
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Too many requests. Please try again later.");
    }

    #[test]
    fn test_allowance_headers() {
        let mut response = http::Response::builder()
            .status(StatusCode::OK)
            .body(http_body_util::Full::new(bytes::Bytes::new()))
            .unwrap();
        RateLimiter::attach_allowance(&mut response, 10, 7);

        assert_eq!(response.headers()[headers::LIMIT], "10");
        assert_eq!(response.headers()[headers::REMAINING], "7");
    }

    #[test]
    fn test_window_reset_allows_again() {
        let (limiter, clock) = limiter(1, 60);
        let client = ClientId::from("192.0.2.1");

        assert!(limiter.check(&client).is_allowed());
        assert!(!limiter.check(&client).is_allowed());

        clock.advance(Duration::from_secs(60));
        assert!(limiter.check(&client).is_allowed());
    }
}
