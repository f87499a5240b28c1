//! # Cerberus Core
//!
//! Core types and traits for the Cerberus request-admission layer.
//!
//! This crate provides the foundational types used throughout Cerberus:
//!
//! - [`RequestId`] - UUID v7 request identifier
//! - [`AdmissionContext`] - Per-request context derived from the inbound request
//! - [`ClientId`] - Throttling identity extracted from forwarding headers
//! - [`Clock`] - Injectable time source ([`SystemClock`], [`ManualClock`])
//! - [`AdmissionError`] - Standard error types and their JSON envelope
//! - [`Request`] / [`Response`] - HTTP message aliases used by the gates

#![doc(html_root_url = "https://docs.rs/cerberus-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod clock;
mod context;
mod error;
mod identity;
mod types;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use context::{AdmissionContext, RequestId};
pub use error::{AdmissionError, AdmissionResult, ErrorCategory, ErrorDetail, ErrorEnvelope};
pub use identity::{ClientId, UNKNOWN_CLIENT};
pub use types::{into_body_bytes, Request, Response, ResponseExt, IDEMPOTENCY_KEY_HEADER};
