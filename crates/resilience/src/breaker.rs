//! Process-wide circuit breaker over consecutive failures.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    open_until: Option<Instant>,
}

/// Consecutive-failure gate shared by all session acquisitions.
///
/// Distinct from per-proxy tracking: this trips on broad environmental
/// failure (the automated site blocking everyone) and pauses ALL new
/// acquisitions for a recovery window. Callers wait the window out rather
/// than failing fast. One recorded success resets the counter to zero.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    recovery_window: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, recovery_window: Duration) -> Self {
        Self {
            threshold,
            recovery_window,
            state: Mutex::new(BreakerState::default()),
        }
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures += 1;
        if state.consecutive_failures >= self.threshold && state.open_until.is_none() {
            let until = Instant::now() + self.recovery_window;
            state.open_until = Some(until);
            warn!(
                failures = state.consecutive_failures,
                window_secs = self.recovery_window.as_secs(),
                "circuit breaker opened"
            );
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures = 0;
        state.open_until = None;
    }

    pub fn is_open(&self) -> bool {
        self.remaining().is_some()
    }

    /// Time left in the recovery window, if the breaker is open.
    pub fn remaining(&self) -> Option<Duration> {
        let mut state = self.state.lock();
        match state.open_until {
            Some(until) => {
                let now = Instant::now();
                if now >= until {
                    // Window elapsed: close, but keep the counter until a
                    // success actually lands.
                    state.open_until = None;
                    None
                } else {
                    Some(until - now)
                }
            }
            None => None,
        }
    }

    /// Block until the recovery window has elapsed. No-op when closed.
    pub async fn wait_until_ready(&self) {
        while let Some(remaining) = self.remaining() {
            warn!(
                remaining_ms = remaining.as_millis() as u64,
                "circuit breaker open, waiting out recovery window"
            );
            sleep(remaining).await;
        }
    }
}
