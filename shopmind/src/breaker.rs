//! Per-agent circuit breaker.
//!
//! Protects the orchestrator from repeatedly dispatching to a failing agent.
//! Three states:
//!
//!   Closed    — normal operation, requests pass through
//!   Open      — rejecting requests until the recovery timeout elapses
//!   HalfOpen  — timeout elapsed; one probe decides reopen or close
//!
//! The open→half-open transition is evaluated lazily whenever state is read;
//! nothing ticks in the background. All transitions serialize on one mutex
//! since breakers are consulted by many concurrent turns.

use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_RECOVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Breaker state as observed at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    /// Epoch seconds of the last recorded failure.
    last_failure_at: u64,
}

/// Per-agent three-state circuit breaker.
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    threshold: u32,
    recovery_timeout: Duration,
    name: String,
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl CircuitBreaker {
    /// Breaker with the default threshold (3) and recovery timeout (30 s).
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, DEFAULT_FAILURE_THRESHOLD, DEFAULT_RECOVERY_TIMEOUT)
    }

    pub fn with_config(
        name: impl Into<String>,
        threshold: u32,
        recovery_timeout: Duration,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                last_failure_at: 0,
            }),
            threshold: threshold.max(1),
            recovery_timeout,
            name: name.into(),
        }
    }

    /// Effective state, evaluating the recovery timeout lazily: an open
    /// breaker whose cooldown has elapsed reads (and becomes) half-open.
    pub fn state(&self) -> BreakerState {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == BreakerState::Open {
            let elapsed = now_epoch_secs().saturating_sub(inner.last_failure_at);
            if elapsed > self.recovery_timeout.as_secs() {
                inner.state = BreakerState::HalfOpen;
                debug!(breaker = %self.name, "recovery timeout elapsed; half-open");
            }
        }
        inner.state
    }

    /// False only while the breaker is open.
    pub fn is_available(&self) -> bool {
        self.state() != BreakerState::Open
    }

    /// Records a success: failures reset, state closes.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.consecutive_failures = 0;
        if inner.state != BreakerState::Closed {
            debug!(breaker = %self.name, "success; closing");
        }
        inner.state = BreakerState::Closed;
    }

    /// Records a failure. Trips open at the threshold; a half-open probe
    /// failure reopens immediately regardless of the count.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.consecutive_failures += 1;
        inner.last_failure_at = now_epoch_secs();

        let was_half_open = inner.state == BreakerState::HalfOpen;
        if was_half_open || inner.consecutive_failures >= self.threshold {
            if inner.state != BreakerState::Open {
                warn!(
                    breaker = %self.name,
                    consecutive_failures = inner.consecutive_failures,
                    cooldown_secs = self.recovery_timeout.as_secs(),
                    "circuit breaker tripped open"
                );
            }
            inner.state = BreakerState::Open;
        }
    }

    /// Current consecutive failure count (for diagnostics).
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().unwrap().consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_breaker() -> CircuitBreaker {
        CircuitBreaker::with_config("test", 3, Duration::from_secs(0))
    }

    /// **Scenario**: The breaker trips open after threshold consecutive
    /// failures and not before.
    #[test]
    fn trips_at_threshold() {
        let breaker = CircuitBreaker::with_config("test", 3, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.is_available());
        breaker.record_failure();
        assert!(!breaker.is_available());
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    /// **Scenario**: A success between failures resets the count, so the
    /// threshold only counts consecutive failures.
    #[test]
    fn success_resets_count() {
        let breaker = CircuitBreaker::with_config("test", 3, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        assert_eq!(breaker.consecutive_failures(), 0);
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.is_available());
    }

    /// **Scenario**: After the recovery timeout, reading state yields
    /// half-open; a success then closes the breaker.
    #[test]
    fn half_open_then_close_on_success() {
        let breaker = fast_breaker();
        for _ in 0..3 {
            breaker.record_failure();
        }
        // recovery_timeout is 0 but the comparison is strict, so step past it.
        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        assert!(breaker.is_available());

        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    /// **Scenario**: A failure while half-open reopens immediately, even
    /// though the count is below threshold.
    #[test]
    fn half_open_failure_reopens() {
        let breaker = fast_breaker();
        for _ in 0..3 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_failure();
        assert!(breaker.is_available(), "one failure after close stays closed");

        // Trip again, go half-open, then fail the probe.
        breaker.record_failure();
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    /// **Scenario**: Concurrent recorders never corrupt the count; the
    /// breaker ends open after threshold total failures.
    #[test]
    fn concurrent_failures_are_serialized() {
        let breaker = std::sync::Arc::new(CircuitBreaker::with_config(
            "test",
            8,
            Duration::from_secs(60),
        ));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let b = std::sync::Arc::clone(&breaker);
            handles.push(std::thread::spawn(move || b.record_failure()));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(breaker.consecutive_failures(), 8);
        assert!(!breaker.is_available());
    }
}
