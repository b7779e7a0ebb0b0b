//! Session factory and the scoped session resource.

use crate::backend::{BrowserBackend, BrowserContext, LaunchSpec};
use crate::error::SessionError;
use crate::page::Page;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use gramflow_resilience::{CircuitBreaker, ProxyHealthRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Factory-level knobs.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Where a fresh blank page is pointed before the session is handed out.
    pub root_url: String,
    /// Deadline for that initial navigation.
    pub nav_timeout: Duration,
    /// Whether to kick off daily profile cache cleanup on session close.
    pub cleanup_enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            root_url: "https://www.instagram.com/".to_string(),
            nav_timeout: Duration::from_secs(30),
            cleanup_enabled: true,
        }
    }
}

/// Produces ready-to-use browser sessions with proxy and breaker gating.
pub struct SessionFactory {
    backend: Arc<dyn BrowserBackend>,
    proxy_health: Arc<ProxyHealthRegistry>,
    breaker: Arc<CircuitBreaker>,
    config: SessionConfig,
    cleanup_ledger: Arc<DashMap<String, NaiveDate>>,
}

impl SessionFactory {
    pub fn new(
        backend: Arc<dyn BrowserBackend>,
        proxy_health: Arc<ProxyHealthRegistry>,
        breaker: Arc<CircuitBreaker>,
        config: SessionConfig,
    ) -> Self {
        Self {
            backend,
            proxy_health,
            breaker,
            config,
            cleanup_ledger: Arc::new(DashMap::new()),
        }
    }

    pub fn proxy_health(&self) -> &Arc<ProxyHealthRegistry> {
        &self.proxy_health
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Acquire a session for `spec`.
    ///
    /// Refuses a tainted proxy before launching anything; waits out an open
    /// circuit breaker; retries a failed geolocation validation once with
    /// validation disabled; points a blank page at the root URL, charging a
    /// navigation failure to the proxy without aborting acquisition.
    pub async fn acquire(&self, spec: LaunchSpec) -> Result<BrowserSession, SessionError> {
        if let Some(proxy) = &spec.proxy {
            if !self.proxy_health.is_healthy(proxy) {
                let remaining = self
                    .proxy_health
                    .taint_remaining(proxy)
                    .unwrap_or(Duration::ZERO);
                return Err(SessionError::ProxyTainted {
                    proxy: proxy.clone(),
                    remaining_secs: remaining.as_secs(),
                });
            }
        }

        self.breaker.wait_until_ready().await;

        let ctx = match self.backend.launch(&spec).await {
            Ok(ctx) => ctx,
            Err(SessionError::GeolocationCheck(reason)) if spec.identity.validate_geolocation => {
                warn!(
                    profile = %spec.profile_name,
                    %reason,
                    "geolocation validation failed, retrying with validation disabled"
                );
                let mut relaxed = spec.clone();
                relaxed.identity.validate_geolocation = false;
                match self.backend.launch(&relaxed).await {
                    Ok(ctx) => ctx,
                    Err(err) => {
                        self.breaker.record_failure();
                        return Err(err);
                    }
                }
            }
            Err(err) => {
                self.breaker.record_failure();
                return Err(err);
            }
        };

        self.settle_initial_page(&spec, ctx.page()).await;
        self.breaker.record_success();

        info!(profile = %spec.profile_name, "browser session acquired");
        Ok(BrowserSession {
            profile_name: spec.profile_name,
            ctx: Some(ctx),
            backend: Arc::clone(&self.backend),
            cleanup_ledger: Arc::clone(&self.cleanup_ledger),
            cleanup_enabled: self.config.cleanup_enabled,
        })
    }

    /// Point a blank fresh page at the site root. A failure here charges
    /// the proxy but still hands the session out; the caller discovers the
    /// problem through subsequent activity failures.
    async fn settle_initial_page(&self, spec: &LaunchSpec, page: Arc<dyn Page>) {
        let url = match page.current_url().await {
            Ok(url) => url,
            Err(_) => String::new(),
        };
        if !(url.is_empty() || url == "about:blank") {
            return;
        }

        let nav = timeout(self.config.nav_timeout, page.goto(&self.config.root_url)).await;
        let failed = !matches!(nav, Ok(Ok(())));
        if failed {
            warn!(
                profile = %spec.profile_name,
                url = %self.config.root_url,
                "initial navigation failed, session handed out anyway"
            );
            if let Some(proxy) = &spec.proxy {
                self.proxy_health.record_failure(proxy);
            }
        }
    }
}

/// One live browser context bound to a profile.
///
/// Call [`BrowserSession::close`] when done; the `Drop` impl covers the
/// exceptional path so the context never outlives its task.
pub struct BrowserSession {
    profile_name: String,
    ctx: Option<Box<dyn BrowserContext>>,
    backend: Arc<dyn BrowserBackend>,
    cleanup_ledger: Arc<DashMap<String, NaiveDate>>,
    cleanup_enabled: bool,
}

impl BrowserSession {
    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    pub fn page(&self) -> Result<Arc<dyn Page>, SessionError> {
        match &self.ctx {
            Some(ctx) => Ok(ctx.page()),
            None => Err(SessionError::Closed),
        }
    }

    /// Release the context, then kick off the daily cache cleanup without
    /// blocking the caller.
    pub async fn close(mut self) -> Result<(), SessionError> {
        let result = match self.ctx.take() {
            Some(mut ctx) => ctx.close().await,
            None => Ok(()),
        };
        self.spawn_daily_cleanup();
        result
    }

    fn spawn_daily_cleanup(&self) {
        if !self.cleanup_enabled {
            return;
        }
        let today = Utc::now().date_naive();
        let already_ran = self
            .cleanup_ledger
            .get(&self.profile_name)
            .map(|day| *day == today)
            .unwrap_or(false);
        if already_ran {
            return;
        }
        self.cleanup_ledger.insert(self.profile_name.clone(), today);

        let backend = Arc::clone(&self.backend);
        let profile = self.profile_name.clone();
        tokio::spawn(async move {
            if let Err(err) = backend.cleanup_profile(&profile).await {
                debug!(profile = %profile, error = %err, "profile cache cleanup failed");
            }
        });
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            warn!(profile = %self.profile_name, "session dropped without close, releasing context");
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = ctx.close().await;
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimBackend;
    use std::time::Instant;

    fn factory_with(backend: Arc<SimBackend>) -> SessionFactory {
        SessionFactory::new(
            backend,
            Arc::new(ProxyHealthRegistry::new(3, Duration::from_secs(60))),
            Arc::new(CircuitBreaker::new(5, Duration::from_secs(60))),
            SessionConfig {
                root_url: "https://example.test/".to_string(),
                nav_timeout: Duration::from_millis(200),
                cleanup_enabled: false,
            },
        )
    }

    #[tokio::test]
    async fn tainted_proxy_is_refused_before_launch() {
        let backend = Arc::new(SimBackend::new());
        let factory = factory_with(Arc::clone(&backend));
        for _ in 0..3 {
            factory.proxy_health().record_failure("bad:proxy");
        }

        let spec = LaunchSpec::new("alpha").with_proxy(Some("bad:proxy".to_string()));
        let err = factory.acquire(spec).await.err().expect("must refuse");
        assert!(matches!(err, SessionError::ProxyTainted { .. }));
        assert_eq!(backend.launch_count(), 0);
    }

    #[tokio::test]
    async fn geolocation_failure_retries_once_without_validation() {
        let backend = Arc::new(SimBackend::new().fail_geolocation_once());
        let factory = factory_with(Arc::clone(&backend));

        let session = factory
            .acquire(LaunchSpec::new("alpha"))
            .await
            .expect("fallback launch succeeds");
        assert_eq!(backend.launch_count(), 2);
        let last = backend.last_spec().expect("spec recorded");
        assert!(!last.identity.validate_geolocation);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn blank_page_is_pointed_at_root_url() {
        let backend = Arc::new(SimBackend::new());
        let factory = factory_with(Arc::clone(&backend));

        let session = factory.acquire(LaunchSpec::new("alpha")).await.unwrap();
        let page = session.page().unwrap();
        assert_eq!(page.current_url().await.unwrap(), "https://example.test/");
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn navigation_failure_charges_proxy_but_yields_session() {
        let backend = Arc::new(SimBackend::new().fail_navigation());
        let factory = factory_with(Arc::clone(&backend));

        let spec = LaunchSpec::new("alpha").with_proxy(Some("slow:proxy".to_string()));
        let session = factory.acquire(spec).await.expect("session still yielded");
        assert!(session.page().is_ok());

        // Two more charged failures taint the proxy (threshold 3).
        factory.proxy_health().record_failure("slow:proxy");
        factory.proxy_health().record_failure("slow:proxy");
        assert!(!factory.proxy_health().is_healthy("slow:proxy"));
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn launch_failures_trip_breaker_and_acquisition_waits() {
        let backend = Arc::new(SimBackend::new().fail_launches(2));
        let factory = SessionFactory::new(
            Arc::clone(&backend) as Arc<dyn BrowserBackend>,
            Arc::new(ProxyHealthRegistry::new(3, Duration::from_secs(60))),
            Arc::new(CircuitBreaker::new(2, Duration::from_millis(50))),
            SessionConfig {
                root_url: "https://example.test/".to_string(),
                nav_timeout: Duration::from_millis(200),
                cleanup_enabled: false,
            },
        );

        assert!(factory.acquire(LaunchSpec::new("a")).await.is_err());
        assert!(factory.acquire(LaunchSpec::new("a")).await.is_err());
        assert!(factory.breaker().is_open());

        // Third acquisition waits out the window instead of failing fast.
        let start = Instant::now();
        let session = factory.acquire(LaunchSpec::new("a")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(40));
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_releases_context() {
        let backend = Arc::new(SimBackend::new());
        let factory = factory_with(Arc::clone(&backend));

        let session = factory.acquire(LaunchSpec::new("alpha")).await.unwrap();
        session.close().await.unwrap();
        assert_eq!(backend.open_contexts(), 0);
    }
}
