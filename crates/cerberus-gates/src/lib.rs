//! # Cerberus Gates
//!
//! The admission gates and the pipeline that orchestrates them.
//!
//! A request passes three gates in order before reaching the downstream
//! handler:
//!
//! 1. **Rate limiting** ([`RateLimiter`]) - fixed-window token buckets
//!    keyed by client identity.
//! 2. **Idempotency** ([`IdempotencyGuard`]) - client-keyed deduplication
//!    with replay of cached responses.
//! 3. **Deadline** ([`DeadlineGuard`]) - a per-request budget after which
//!    the client gets a `504` while the handler finishes detached.
//!
//! [`AdmissionPipeline`] wires the gates together and owns the background
//! sweeper that expires old idempotency records.

#![doc(html_root_url = "https://docs.rs/cerberus-gates/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bucket;
mod deadline;
mod idempotency;
mod pipeline;
mod rate_limit;
mod sweeper;

pub use bucket::{Consume, TokenBucketStore};
pub use deadline::{DeadlineGuard, DeadlineTicket, DeadlineVerdict};
pub use idempotency::{BeginOutcome, IdempotencyGuard, IdempotencyStore};
pub use pipeline::{AdmissionPipeline, AdmissionPipelineBuilder};
pub use rate_limit::{headers, RateDecision, RateLimiter};
pub use sweeper::Sweeper;
