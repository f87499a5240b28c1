//! Deadline enforcement for downstream handlers.
//!
//! The guard races the handler against a sleep for the configured budget.
//! Cancellation is weak: on timeout the handler keeps running detached and
//! the caller gets the join handle back, so it can observe the eventual
//! outcome (for idempotency bookkeeping) even though the client already
//! received a `504`.

use cerberus_core::{RequestId, Response, SharedClock};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinHandle};
use tracing::warn;

/// Tracks whether a request's deadline has fired.
///
/// The flag flips at most once, so exactly one of "timed out" and
/// "completed in time" is ever recorded for a request.
#[derive(Debug)]
pub struct DeadlineTicket {
    request_id: RequestId,
    deadline: Instant,
    fired: AtomicBool,
}

impl DeadlineTicket {
    /// Creates a ticket expiring at `deadline`.
    #[must_use]
    pub fn new(request_id: RequestId, deadline: Instant) -> Self {
        Self {
            request_id,
            deadline,
            fired: AtomicBool::new(false),
        }
    }

    /// Returns the request this ticket belongs to.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the absolute expiry instant.
    #[must_use]
    pub const fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Marks the deadline as fired. Returns `true` if this call won.
    pub fn fire(&self) -> bool {
        !self.fired.swap(true, Ordering::SeqCst)
    }

    /// Returns whether the deadline has fired.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

/// How the race between handler and deadline ended.
#[derive(Debug)]
pub enum DeadlineVerdict {
    /// The handler finished within budget.
    Completed(Response),
    /// The handler panicked or was aborted before producing a response.
    Failed(JoinError),
    /// The budget expired first. The handler is still running; `remainder`
    /// resolves to its eventual response.
    TimedOut {
        /// Join handle for the detached handler.
        remainder: JoinHandle<Response>,
        /// The fired ticket for the abandoned request, for callers that
        /// track the late outcome.
        ticket: DeadlineTicket,
    },
}

/// The deadline gate.
pub struct DeadlineGuard {
    budget: Duration,
    clock: SharedClock,
}

impl std::fmt::Debug for DeadlineGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadlineGuard")
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

impl DeadlineGuard {
    /// Creates a guard with the given per-request budget.
    #[must_use]
    pub fn new(budget: Duration, clock: SharedClock) -> Self {
        Self { budget, clock }
    }

    /// Returns the per-request budget.
    #[must_use]
    pub const fn budget(&self) -> Duration {
        self.budget
    }

    /// Runs `handler` with the configured budget.
    ///
    /// The handler is spawned so it can outlive the race; on timeout it is
    /// detached rather than aborted and the caller decides what to do with
    /// the remainder.
    pub async fn run<F>(&self, request_id: RequestId, handler: F) -> DeadlineVerdict
    where
        F: Future<Output = Response> + Send + 'static,
    {
        let ticket = DeadlineTicket::new(request_id, self.clock.now() + self.budget);
        let mut handle = tokio::spawn(handler);
        let expiry = tokio::time::sleep(self.budget);
        tokio::pin!(expiry);

        tokio::select! {
            joined = &mut handle => {
                // Ticket drops unfired: the handler beat the deadline.
                match joined {
                    Ok(response) => DeadlineVerdict::Completed(response),
                    Err(err) => DeadlineVerdict::Failed(err),
                }
            }
            () = &mut expiry => {
                ticket.fire();
                warn!(
                    request_id = %request_id,
                    budget_ms = self.budget.as_millis() as u64,
                    "deadline expired, detaching from handler"
                );
                DeadlineVerdict::TimedOut { remainder: handle, ticket }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cerberus_core::SystemClock;
    use http::StatusCode;

    fn ok_response(status: StatusCode) -> Response {
        http::Response::builder()
            .status(status)
            .body(http_body_util::Full::new(bytes::Bytes::new()))
            .unwrap()
    }

    fn guard(budget: Duration) -> DeadlineGuard {
        DeadlineGuard::new(budget, SystemClock::shared())
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_handler_completes() {
        let guard = guard(Duration::from_secs(30));
        let verdict = guard
            .run(RequestId::new(), async { ok_response(StatusCode::OK) })
            .await;

        match verdict {
            DeadlineVerdict::Completed(response) => {
                assert_eq!(response.status(), StatusCode::OK);
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_handler_times_out() {
        let guard = guard(Duration::from_secs(30));
        let request_id = RequestId::new();
        let verdict = guard
            .run(request_id, async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                ok_response(StatusCode::OK)
            })
            .await;

        let DeadlineVerdict::TimedOut { ticket, .. } = verdict else {
            panic!("expected timeout");
        };
        assert!(ticket.has_fired());
        assert_eq!(ticket.request_id(), request_id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_handler_still_finishes() {
        let guard = guard(Duration::from_secs(30));
        let verdict = guard
            .run(RequestId::new(), async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                ok_response(StatusCode::CREATED)
            })
            .await;

        let DeadlineVerdict::TimedOut { remainder, .. } = verdict else {
            panic!("expected timeout");
        };
        let response = remainder.await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_handler_fails() {
        let guard = guard(Duration::from_secs(30));
        let verdict = guard
            .run(RequestId::new(), async { panic!("handler blew up") })
            .await;

        match verdict {
            DeadlineVerdict::Failed(err) => assert!(err.is_panic()),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_ticket_fires_once() {
        let ticket = DeadlineTicket::new(RequestId::new(), Instant::now());
        assert!(!ticket.has_fired());
        assert!(ticket.fire());
        assert!(!ticket.fire());
        assert!(ticket.has_fired());
    }
}
