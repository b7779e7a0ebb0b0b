//! Resilience layer for flaky browser-driving and network operations.
//!
//! Three independent mechanisms cooperate here: an error classifier that
//! maps a failure to a recovery decision, a bounded retry helper with
//! exponential backoff and jitter, and two failure gates — a per-proxy
//! health registry that fails fast and a process-wide circuit breaker that
//! waits out a recovery window.

pub mod breaker;
pub mod classify;
pub mod proxy;
pub mod retry;

pub use breaker::CircuitBreaker;
pub use classify::{classify, ErrorDecision};
pub use proxy::ProxyHealthRegistry;
pub use retry::{run_with_retry, RetryPolicy};
