//! Per-request admission context.
//!
//! The [`AdmissionContext`] captures everything the gates need to know about
//! an inbound request before the downstream handler runs: a fresh request
//! ID, the throttling identity, and the idempotency key if one applies.

use crate::identity::ClientId;
use crate::types::{Request, IDEMPOTENCY_KEY_HEADER};
use http::Method;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for request tracking
/// and log correlation.
///
/// # Example
///
/// ```
/// use cerberus_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Per-request state observed by the admission gates.
///
/// The context is derived once from the inbound request and then read-only:
/// the rate limiter keys off [`client`](Self::client), the idempotency guard
/// off [`idempotency_key`](Self::idempotency_key), and the deadline guard
/// off [`request_id`](Self::request_id).
#[derive(Debug, Clone)]
pub struct AdmissionContext {
    /// Unique identifier for this request.
    request_id: RequestId,

    /// The throttling identity of the caller.
    client: ClientId,

    /// The client-supplied idempotency key, if the request carries one and
    /// the method is a mutation.
    idempotency_key: Option<String>,

    /// When the request entered the pipeline.
    started_at: Instant,
}

impl AdmissionContext {
    /// Derives a context from an inbound request.
    ///
    /// The idempotency key is only picked up for mutation methods; safe
    /// methods (GET, HEAD, OPTIONS) bypass the idempotency guard even when
    /// the header is present.
    #[must_use]
    pub fn from_request(request: &Request) -> Self {
        let client = ClientId::from_headers(request.headers());

        let idempotency_key = if is_mutation(request.method()) {
            request
                .headers()
                .get(&IDEMPOTENCY_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
        } else {
            None
        };

        Self {
            request_id: RequestId::new(),
            client,
            idempotency_key,
            started_at: Instant::now(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the throttling identity.
    #[must_use]
    pub const fn client(&self) -> &ClientId {
        &self.client
    }

    /// Returns the idempotency key, if one applies to this request.
    #[must_use]
    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }

    /// Returns the elapsed time since the request entered the pipeline.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

/// Whether the method can have side effects worth deduplicating.
fn is_mutation(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}
