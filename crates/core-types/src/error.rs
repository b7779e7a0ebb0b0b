//! Error taxonomy raised by page operations and activities.

use thiserror::Error;

/// Errors surfaced by browser-driving operations.
///
/// Activities map expected "nothing to do" conditions to a benign outcome
/// tag and reserve these variants for genuinely exceptional conditions. The
/// resilience layer classifies each variant into a recovery decision.
#[derive(Debug, Error)]
pub enum ActivityError {
    /// Account is unusable: banned, checkpointed, or logged out.
    #[error("fatal account condition: {0}")]
    Fatal(String),

    /// The browser or its context crashed or was forcibly closed.
    #[error("browser context lost: {0}")]
    BrowserGone(String),

    /// The site signalled throttling ("try again later", action blocks).
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// An operation exceeded its deadline.
    #[error("timed out: {0}")]
    Timeout(String),

    /// An expected element never appeared.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// Connection reset, DNS failure, or other network blip.
    #[error("network error: {0}")]
    Network(String),

    /// Failure attributable to the session's proxy.
    #[error("proxy error: {0}")]
    Proxy(String),

    /// The context was closed underneath the operation. Benign when a stop
    /// request tore the browser down; otherwise treated as a crash.
    #[error("context already closed")]
    ContextClosed,

    /// Anything the taxonomy does not cover. Never retried.
    #[error("{0}")]
    Other(String),
}

impl ActivityError {
    /// True when the error names a condition the graph walker treats as a
    /// clean cancellation while a stop request is pending.
    pub fn is_context_closed(&self) -> bool {
        matches!(self, ActivityError::ContextClosed)
    }
}
