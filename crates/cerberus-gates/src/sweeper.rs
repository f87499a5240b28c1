//! Periodic cleanup of expired idempotency records.
//!
//! The sweeper is a background task that wakes on a fixed interval and asks
//! the store to drop expired records. It is started at pipeline init and
//! stopped cooperatively at shutdown via a channel; dropping the handle
//! also requests shutdown so an abandoned sweeper does not spin forever.

use crate::idempotency::IdempotencyStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Handle to the background sweep task.
pub struct Sweeper {
    running: Arc<AtomicBool>,
    shutdown_tx: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Spawns the sweep loop against `store`, waking every `interval`.
    ///
    /// The first sweep happens one full interval after start, not
    /// immediately; a fresh store has nothing to sweep.
    #[must_use]
    pub fn spawn(store: Arc<IdempotencyStore>, interval: Duration) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task_running = running.clone();
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            info!(interval_seconds = interval.as_secs(), "sweeper started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = store.sweep();
                        debug!(removed, remaining = store.len(), "sweep pass finished");
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
            task_running.store(false, Ordering::SeqCst);
            info!("sweeper stopped");
        });

        Self {
            running,
            shutdown_tx,
            handle: Some(handle),
        }
    }

    /// Returns `true` while the sweep task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops the sweep task and waits for it to exit.
    pub async fn stop(mut self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        // Best effort; the task also exits when the channel closes.
        let _ = self.shutdown_tx.try_send(());
    }
}

impl std::fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweeper")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use cerberus_core::ManualClock;
    use http::StatusCode;

    const COMPLETED_TTL: Duration = Duration::from_secs(60);
    const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

    fn store() -> (Arc<IdempotencyStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(IdempotencyStore::new(
            COMPLETED_TTL,
            Duration::from_secs(30),
            clock.clone(),
        ));
        (store, clock)
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_drops_expired_records() {
        let (store, clock) = store();
        store.begin("k1");
        store.complete("k1", StatusCode::OK, Bytes::new());
        assert_eq!(store.len(), 1);

        let sweeper = Sweeper::spawn(store.clone(), SWEEP_INTERVAL);
        clock.advance(COMPLETED_TTL);

        // Cross the first tick; paused time advances as we sleep.
        tokio::time::sleep(SWEEP_INTERVAL + Duration::from_millis(10)).await;
        tokio::task::yield_now().await;

        assert_eq!(store.len(), 0);
        sweeper.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_keeps_live_records() {
        let (store, _clock) = store();
        store.begin("k1");
        store.complete("k1", StatusCode::OK, Bytes::new());

        let sweeper = Sweeper::spawn(store.clone(), SWEEP_INTERVAL);
        tokio::time::sleep(SWEEP_INTERVAL + Duration::from_millis(10)).await;
        tokio::task::yield_now().await;

        assert_eq!(store.len(), 1);
        sweeper.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_terminates_task() {
        let (store, _clock) = store();
        let sweeper = Sweeper::spawn(store, SWEEP_INTERVAL);

        assert!(sweeper.is_running());
        sweeper.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_flag_clears_after_stop() {
        let (store, _clock) = store();
        let sweeper = Sweeper::spawn(store, SWEEP_INTERVAL);

        let running = sweeper.running.clone();
        sweeper.stop().await;
        assert!(!running.load(Ordering::SeqCst));
    }
}
