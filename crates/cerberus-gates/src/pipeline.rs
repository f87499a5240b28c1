//! The admission pipeline orchestrator.
//!
//! Runs each request through the gates in a fixed order: rate limit, then
//! idempotency, then the deadline-wrapped downstream handler. The first
//! gate that rejects short-circuits the rest; a request that clears every
//! gate has its response snapshotted and recorded before it is returned.

use crate::deadline::{DeadlineGuard, DeadlineTicket, DeadlineVerdict};
use crate::idempotency::{BeginOutcome, IdempotencyGuard, IdempotencyStore};
use crate::rate_limit::{RateDecision, RateLimiter};
use crate::sweeper::Sweeper;
use cerberus_core::{
    into_body_bytes, AdmissionContext, AdmissionError, Request, Response, ResponseExt,
    SharedClock, SystemClock,
};
use cerberus_config::CerberusConfig;
use http_body_util::Full;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

const IN_PROGRESS_MESSAGE: &str =
    "A request with this idempotency key is already being processed";
const TIMEOUT_MESSAGE: &str = "Request timeout";
const INTERNAL_MESSAGE: &str = "Internal server error";

/// The request admission pipeline.
///
/// Owns the three gates and the background sweeper. Construct one per
/// process with [`AdmissionPipeline::from_config`], call
/// [`init`](Self::init) once at startup and [`shutdown`](Self::shutdown)
/// when draining.
#[derive(Debug)]
pub struct AdmissionPipeline {
    rate: RateLimiter,
    idempotency: IdempotencyGuard,
    deadline: DeadlineGuard,
    sweep_interval: Duration,
    sweeper: parking_lot::Mutex<Option<Sweeper>>,
}

impl AdmissionPipeline {
    /// Returns a builder for customizing construction.
    #[must_use]
    pub fn builder() -> AdmissionPipelineBuilder {
        AdmissionPipelineBuilder::default()
    }

    /// Builds a pipeline from configuration with the system clock.
    #[must_use]
    pub fn from_config(config: &CerberusConfig) -> Self {
        Self::builder().config(config.clone()).build()
    }

    /// Starts the background sweeper. Idempotent.
    pub fn init(&self) {
        let mut slot = self.sweeper.lock();
        if slot.is_none() {
            *slot = Some(Sweeper::spawn(
                self.idempotency.store().clone(),
                self.sweep_interval,
            ));
        }
    }

    /// Stops the background sweeper and waits for it to exit.
    pub async fn shutdown(&self) {
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
        }
    }

    /// Returns the idempotency gate.
    #[must_use]
    pub const fn idempotency(&self) -> &IdempotencyGuard {
        &self.idempotency
    }

    /// Returns the rate limiting gate.
    #[must_use]
    pub const fn rate_limiter(&self) -> &RateLimiter {
        &self.rate
    }

    /// Admits `request` through the gates, invoking `handler` only if every
    /// gate passes.
    ///
    /// Always produces a response: either a gate rejection, a cached
    /// replay, or the handler's own response. When the deadline fires the
    /// client gets a `504` while the handler keeps running detached; its
    /// eventual outcome is still recorded against the idempotency key, so a
    /// later retry with the same key replays what the handler really did.
    pub async fn admit<F, Fut>(&self, request: Request, handler: F) -> Response
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let ctx = AdmissionContext::from_request(&request);

        let allowance = match self.rate.check(ctx.client()) {
            RateDecision::Limited { limit, retry_after } => {
                info!(
                    request_id = %ctx.request_id(),
                    client = %ctx.client(),
                    "rejected: rate limited"
                );
                return RateLimiter::rejection(limit, retry_after);
            }
            RateDecision::Allowed {
                limit, remaining, ..
            } => {
                debug!(
                    request_id = %ctx.request_id(),
                    client = %ctx.client(),
                    remaining,
                    "within rate quota"
                );
                (limit, remaining)
            }
        };

        let key = ctx.idempotency_key().map(str::to_owned);
        match self.idempotency.begin(key.as_deref()) {
            BeginOutcome::Replay { status, body } => {
                info!(
                    request_id = %ctx.request_id(),
                    status = status.as_u16(),
                    "rejected: replaying cached response"
                );
                return Response::replay(status, body);
            }
            BeginOutcome::InProgress => {
                info!(request_id = %ctx.request_id(), "rejected: key in flight");
                return AdmissionError::in_progress(IN_PROGRESS_MESSAGE).to_response();
            }
            BeginOutcome::Proceed => {}
        }

        match self.deadline.run(ctx.request_id(), handler(request)).await {
            DeadlineVerdict::Completed(response) => {
                let (parts, bytes) = into_body_bytes(response).await;
                self.idempotency
                    .complete(key.as_deref(), parts.status, bytes.clone());
                debug!(
                    request_id = %ctx.request_id(),
                    status = parts.status.as_u16(),
                    elapsed_ms = ctx.elapsed().as_millis() as u64,
                    "admitted"
                );
                let mut response = http::Response::from_parts(parts, Full::new(bytes));
                RateLimiter::attach_allowance(&mut response, allowance.0, allowance.1);
                response
            }
            DeadlineVerdict::Failed(err) => {
                error!(
                    request_id = %ctx.request_id(),
                    error = %err,
                    "handler failed before producing a response"
                );
                self.idempotency.release(key.as_deref());
                AdmissionError::internal(INTERNAL_MESSAGE).to_response()
            }
            DeadlineVerdict::TimedOut { remainder, ticket } => {
                if let Some(key) = key {
                    self.record_late_outcome(ticket, key, remainder);
                }
                AdmissionError::timeout(TIMEOUT_MESSAGE).to_response()
            }
        }
    }

    /// Follows a detached handler to its end and records the real outcome
    /// against the idempotency key the client never saw answered.
    fn record_late_outcome(
        &self,
        ticket: DeadlineTicket,
        key: String,
        remainder: tokio::task::JoinHandle<Response>,
    ) {
        let guard = self.idempotency.clone();
        tokio::spawn(async move {
            match remainder.await {
                Ok(response) => {
                    let (parts, bytes) = into_body_bytes(response).await;
                    debug!(
                        request_id = %ticket.request_id(),
                        status = parts.status.as_u16(),
                        "detached handler finished, outcome recorded"
                    );
                    guard.complete(Some(&key), parts.status, bytes);
                }
                Err(err) => {
                    error!(
                        request_id = %ticket.request_id(),
                        error = %err,
                        "detached handler failed, key released"
                    );
                    guard.release(Some(&key));
                }
            }
        });
    }
}

/// Builder for [`AdmissionPipeline`].
#[derive(Default)]
pub struct AdmissionPipelineBuilder {
    config: CerberusConfig,
    clock: Option<SharedClock>,
}

impl AdmissionPipelineBuilder {
    /// Sets the configuration. Defaults to [`CerberusConfig::default`].
    #[must_use]
    pub fn config(mut self, config: CerberusConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the clock used by the stores. Defaults to the system clock.
    #[must_use]
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> AdmissionPipeline {
        let clock = self.clock.unwrap_or_else(SystemClock::shared);
        let config = self.config;

        let store = Arc::new(IdempotencyStore::new(
            config.idempotency.completed_ttl(),
            config.idempotency.processing_ttl(),
            clock.clone(),
        ));

        AdmissionPipeline {
            rate: RateLimiter::new(
                config.rate_limit.requests,
                config.rate_limit.window(),
                clock.clone(),
            ),
            idempotency: IdempotencyGuard::new(store),
            deadline: DeadlineGuard::new(config.request.timeout(), clock),
            sweep_interval: config.idempotency.sweep_interval(),
            sweeper: parking_lot::Mutex::new(None),
        }
    }
}
