//! Injectable time source.
//!
//! The token-bucket and idempotency stores never call `Instant::now()`
//! directly; they read time through a [`Clock`] so that window resets and
//! TTL expiry can be driven deterministically in tests.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A monotonic time source.
///
/// Production code uses [`SystemClock`]; tests use [`ManualClock`] to step
/// time forward without sleeping.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// A shared, type-erased clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// System clock backed by `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Creates a new system clock.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns a shared handle to a system clock.
    #[must_use]
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// # Example
///
/// ```
/// use cerberus_core::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let t0 = clock.now();
/// clock.advance(Duration::from_secs(60));
/// assert_eq!(clock.now() - t0, Duration::from_secs(60));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    /// Creates a manual clock starting at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Advances the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock();
        *now += duration;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock::new();
        let t1 = clock.now();
        std::thread::sleep(Duration::from_millis(5));
        assert!(clock.now() > t1);
    }

    #[test]
    fn test_manual_clock_is_frozen() {
        let clock = ManualClock::new();
        let t1 = clock.now();
        let t2 = clock.now();
        assert_eq!(t1, t2);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new();
        let t1 = clock.now();
        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.now() - t1, Duration::from_secs(90));
    }

    #[test]
    fn test_shared_clock_object_safety() {
        let clock: SharedClock = Arc::new(ManualClock::new());
        let _ = clock.now();
    }
}
