//! Per-proxy failure tracking with temporary taint.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::warn;

#[derive(Debug, Default)]
struct ProxyEntry {
    failures: u32,
    tainted_until: Option<Instant>,
}

/// Tracks navigation/request failures per proxy string.
///
/// Reaching the failure threshold taints the proxy for a fixed duration;
/// while tainted, new session acquisitions fail fast instead of wasting a
/// browser launch. Taint expires purely by the clock — a success is not
/// required to clear it.
#[derive(Debug)]
pub struct ProxyHealthRegistry {
    failure_threshold: u32,
    taint_duration: Duration,
    entries: Mutex<HashMap<String, ProxyEntry>>,
}

impl ProxyHealthRegistry {
    pub fn new(failure_threshold: u32, taint_duration: Duration) -> Self {
        Self {
            failure_threshold,
            taint_duration,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record one failure attributed to `proxy`. Returns true when this
    /// failure tipped the proxy into taint.
    pub fn record_failure(&self, proxy: &str) -> bool {
        let mut entries = self.entries.lock();
        let entry = entries.entry(proxy.to_string()).or_default();
        entry.failures += 1;
        if entry.failures >= self.failure_threshold && entry.tainted_until.is_none() {
            entry.tainted_until = Some(Instant::now() + self.taint_duration);
            warn!(
                proxy,
                failures = entry.failures,
                taint_secs = self.taint_duration.as_secs(),
                "proxy tainted"
            );
            return true;
        }
        false
    }

    /// Clear the failure count for `proxy` after a confirmed good session.
    pub fn record_success(&self, proxy: &str) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(proxy) {
            entry.failures = 0;
        }
    }

    /// False while the proxy's taint window is still in the future.
    pub fn is_healthy(&self, proxy: &str) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(proxy) else {
            return true;
        };
        match entry.tainted_until {
            Some(until) if Instant::now() < until => false,
            Some(_) => {
                // Expired taint: forget it and start counting fresh.
                entry.tainted_until = None;
                entry.failures = 0;
                true
            }
            None => true,
        }
    }

    /// Remaining taint window for `proxy`, if any.
    pub fn taint_remaining(&self, proxy: &str) -> Option<Duration> {
        let entries = self.entries.lock();
        let until = entries.get(proxy)?.tainted_until?;
        until.checked_duration_since(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_until_threshold() {
        let registry = ProxyHealthRegistry::new(3, Duration::from_secs(60));
        registry.record_failure("p1");
        registry.record_failure("p1");
        assert!(registry.is_healthy("p1"));
        let tipped = registry.record_failure("p1");
        assert!(tipped);
        assert!(!registry.is_healthy("p1"));
    }

    #[test]
    fn unknown_proxy_is_healthy() {
        let registry = ProxyHealthRegistry::new(3, Duration::from_secs(60));
        assert!(registry.is_healthy("never-seen"));
    }

    #[test]
    fn taint_expires_by_clock_alone() {
        let registry = ProxyHealthRegistry::new(1, Duration::from_millis(20));
        registry.record_failure("p1");
        assert!(!registry.is_healthy("p1"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(registry.is_healthy("p1"));
    }

    #[test]
    fn failures_are_tracked_per_proxy() {
        let registry = ProxyHealthRegistry::new(2, Duration::from_secs(60));
        registry.record_failure("p1");
        registry.record_failure("p1");
        assert!(!registry.is_healthy("p1"));
        assert!(registry.is_healthy("p2"));
    }

    #[test]
    fn success_resets_failure_count() {
        let registry = ProxyHealthRegistry::new(2, Duration::from_secs(60));
        registry.record_failure("p1");
        registry.record_success("p1");
        registry.record_failure("p1");
        assert!(registry.is_healthy("p1"));
    }
}
