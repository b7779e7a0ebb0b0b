//! Session acquisition and teardown errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The proxy is tainted and acquisition was refused before launching.
    #[error("proxy {proxy} is tainted for another {remaining_secs}s")]
    ProxyTainted { proxy: String, remaining_secs: u64 },

    /// The backend failed to produce a context.
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// Proxy-based geolocation validation rejected the launch.
    #[error("geolocation validation failed: {0}")]
    GeolocationCheck(String),

    /// The context is already closed.
    #[error("browser context closed")]
    Closed,

    /// Profile cache cleanup failed. Best-effort; never fatal.
    #[error("cache cleanup failed: {0}")]
    Cleanup(String),
}
