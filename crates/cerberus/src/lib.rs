//! # Cerberus
//!
//! A request-admission layer that fronts a downstream handler with three
//! gates, applied in order:
//!
//! 1. **Rate limiting** - fixed-window token buckets keyed by client
//!    identity (forwarding headers), rejecting over-quota requests with
//!    `429` and standard rate-limit headers.
//! 2. **Idempotency** - client-keyed deduplication of mutations. A repeat
//!    of a completed request replays the recorded response; a repeat of an
//!    in-flight request gets `409`.
//! 3. **Deadline** - a per-request time budget. When it expires the client
//!    gets `504` while the handler finishes detached, and its real outcome
//!    is still recorded against the idempotency key.
//!
//! # Quick start
//!
//! ```
//! use cerberus::prelude::*;
//! use bytes::Bytes;
//! use http_body_util::Full;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = CerberusConfig::default();
//! let pipeline = AdmissionPipeline::from_config(&config);
//! pipeline.init();
//!
//! let request = http::Request::builder()
//!     .method(http::Method::POST)
//!     .uri("/api/books")
//!     .header("x-forwarded-for", "203.0.113.9")
//!     .header("idempotency-key", "create-book-1")
//!     .body(Full::new(Bytes::new()))
//!     .unwrap();
//!
//! let response = pipeline
//!     .admit(request, |_request| async {
//!         http::Response::builder()
//!             .status(http::StatusCode::CREATED)
//!             .body(Full::new(Bytes::from_static(b"{\"id\":1}")))
//!             .unwrap()
//!     })
//!     .await;
//!
//! assert_eq!(response.status(), http::StatusCode::CREATED);
//! pipeline.shutdown().await;
//! # }
//! ```
//!
//! # Crates
//!
//! - [`cerberus-core`](cerberus_core) - shared types: errors, identity,
//!   request context, clock.
//! - [`cerberus-gates`](cerberus_gates) - the gates and the pipeline.
//! - [`cerberus-config`](cerberus_config) - layered configuration.

#![doc(html_root_url = "https://docs.rs/cerberus/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod telemetry;

pub use cerberus_config as config;
pub use cerberus_core as core;
pub use cerberus_gates as gates;

pub use cerberus_config::{CerberusConfig, ConfigError};
pub use cerberus_core::{
    AdmissionContext, AdmissionError, AdmissionResult, ClientId, Clock, ErrorCategory,
    ErrorEnvelope, ManualClock, Request, RequestId, Response, ResponseExt, SharedClock,
    SystemClock,
};
pub use cerberus_gates::{
    AdmissionPipeline, AdmissionPipelineBuilder, BeginOutcome, DeadlineGuard, DeadlineVerdict,
    IdempotencyGuard, IdempotencyStore, RateDecision, RateLimiter,
};

/// Commonly used types, importable in one line.
pub mod prelude {
    pub use cerberus_config::CerberusConfig;
    pub use cerberus_core::{
        AdmissionContext, AdmissionError, ClientId, Request, RequestId, Response, ResponseExt,
    };
    pub use cerberus_gates::{AdmissionPipeline, BeginOutcome, RateDecision};
}
