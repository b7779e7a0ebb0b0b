//! Browser backend seam.

use crate::error::SessionError;
use crate::page::Page;
use async_trait::async_trait;
use gramflow_core_types::Identity;
use std::sync::Arc;

/// Everything needed to launch one profile-bound browser context.
#[derive(Clone, Debug)]
pub struct LaunchSpec {
    pub profile_name: String,
    pub proxy: Option<String>,
    pub identity: Identity,
}

impl LaunchSpec {
    pub fn new(profile_name: impl Into<String>) -> Self {
        Self {
            profile_name: profile_name.into(),
            proxy: None,
            identity: Identity::default(),
        }
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }
}

/// A launched, profile-bound browser context.
#[async_trait]
pub trait BrowserContext: Send + Sync {
    /// Handle to the context's page.
    fn page(&self) -> Arc<dyn Page>;

    /// Release the context and its OS-level resources.
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Launches browser contexts. Production wires a real driver here; the
/// engine itself never talks to a browser directly.
#[async_trait]
pub trait BrowserBackend: Send + Sync {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn BrowserContext>, SessionError>;

    /// Best-effort removal of stale profile cache data. Called off the hot
    /// path, at most once per profile per day.
    async fn cleanup_profile(&self, profile_name: &str) -> Result<(), SessionError>;
}
