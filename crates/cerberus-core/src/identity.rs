//! Client identity extraction.
//!
//! Rate limiting needs a stable per-caller key. Behind a proxy the peer
//! address is useless, so the identity is derived from forwarding headers:
//! the first `x-forwarded-for` entry, then `x-real-ip`, then a fallback
//! sentinel when neither is present.

use http::HeaderMap;
use serde::{Deserialize, Serialize};

/// Sentinel identity used when no client address header is present.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// A client identity used as a rate-limiting key.
///
/// This is an opaque string with no further structure; two requests with the
/// same `ClientId` share a token bucket.
///
/// # Example
///
/// ```
/// use cerberus_core::ClientId;
/// use http::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
/// assert_eq!(ClientId::from_headers(&headers).as_str(), "203.0.113.9");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Creates a client identity from a raw string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives the client identity from request headers.
    ///
    /// Precedence: first `x-forwarded-for` address, then `x-real-ip`, then
    /// [`UNKNOWN_CLIENT`].
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
            if let Some(first) = xff.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return Self(first.to_string());
                }
            }
        }

        if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
            if !real_ip.is_empty() {
                return Self(real_ip.to_string());
            }
        }

        Self(UNKNOWN_CLIENT.to_string())
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
