//! Deterministic in-process backend for tests and dry runs.
//!
//! Production embeds a real browser driver behind [`BrowserBackend`]; this
//! one fakes just enough page behavior to exercise the engine end to end.

use crate::backend::{BrowserBackend, BrowserContext, LaunchSpec};
use crate::error::SessionError;
use crate::page::Page;
use async_trait::async_trait;
use gramflow_core_types::ActivityError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct SimPageState {
    url: String,
    elements: HashMap<String, usize>,
    clicks: Vec<String>,
    typed: Vec<(String, String)>,
    scrolls: Vec<i64>,
    closed: bool,
}

/// Scriptable fake page.
pub struct SimPage {
    state: Mutex<SimPageState>,
    default_count: usize,
    fail_navigation: AtomicBool,
}

impl SimPage {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimPageState {
                url: "about:blank".to_string(),
                ..SimPageState::default()
            }),
            default_count: 3,
            fail_navigation: AtomicBool::new(false),
        }
    }

    pub fn set_count(&self, selector: &str, count: usize) {
        self.state
            .lock()
            .elements
            .insert(selector.to_string(), count);
    }

    pub fn set_fail_navigation(&self, fail: bool) {
        self.fail_navigation.store(fail, Ordering::SeqCst);
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().clicks.clone()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.state.lock().typed.clone()
    }

    pub fn scroll_count(&self) -> usize {
        self.state.lock().scrolls.len()
    }

    fn mark_closed(&self) {
        self.state.lock().closed = true;
    }

    fn ensure_open(&self) -> Result<(), ActivityError> {
        if self.state.lock().closed {
            Err(ActivityError::ContextClosed)
        } else {
            Ok(())
        }
    }
}

impl Default for SimPage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Page for SimPage {
    async fn goto(&self, url: &str) -> Result<(), ActivityError> {
        self.ensure_open()?;
        if self.fail_navigation.load(Ordering::SeqCst) {
            return Err(ActivityError::Network(format!("navigation to {url} failed")));
        }
        self.state.lock().url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, ActivityError> {
        self.ensure_open()?;
        Ok(self.state.lock().url.clone())
    }

    async fn click(&self, selector: &str) -> Result<(), ActivityError> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        let present = state
            .elements
            .get(selector)
            .copied()
            .unwrap_or(self.default_count);
        if present == 0 {
            return Err(ActivityError::ElementNotFound(selector.to_string()));
        }
        state.clicks.push(selector.to_string());
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), ActivityError> {
        self.ensure_open()?;
        self.state
            .lock()
            .typed
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn scroll_by(&self, pixels: i64) -> Result<(), ActivityError> {
        self.ensure_open()?;
        self.state.lock().scrolls.push(pixels);
        Ok(())
    }

    async fn count(&self, selector: &str) -> Result<usize, ActivityError> {
        self.ensure_open()?;
        Ok(self
            .state
            .lock()
            .elements
            .get(selector)
            .copied()
            .unwrap_or(self.default_count))
    }
}

struct SimContext {
    page: Arc<SimPage>,
    open_contexts: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserContext for SimContext {
    fn page(&self) -> Arc<dyn Page> {
        Arc::clone(&self.page) as Arc<dyn Page>
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.page.mark_closed();
        self.open_contexts.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Backend that fabricates [`SimPage`] contexts, with failure knobs for
/// exercising the factory's fallback paths.
pub struct SimBackend {
    launch_count: AtomicU32,
    fail_launches: AtomicU32,
    fail_geolocation: AtomicBool,
    fail_navigation: bool,
    open_contexts: Arc<AtomicUsize>,
    last_spec: Mutex<Option<LaunchSpec>>,
    pages: Mutex<Vec<Arc<SimPage>>>,
    cleanup_calls: AtomicU32,
}

impl SimBackend {
    pub fn new() -> Self {
        Self {
            launch_count: AtomicU32::new(0),
            fail_launches: AtomicU32::new(0),
            fail_geolocation: AtomicBool::new(false),
            fail_navigation: false,
            open_contexts: Arc::new(AtomicUsize::new(0)),
            last_spec: Mutex::new(None),
            pages: Mutex::new(Vec::new()),
            cleanup_calls: AtomicU32::new(0),
        }
    }

    /// Fail the next `n` launches outright.
    pub fn fail_launches(self, n: u32) -> Self {
        self.fail_launches.store(n, Ordering::SeqCst);
        self
    }

    /// Reject the next launch that asks for geolocation validation.
    pub fn fail_geolocation_once(self) -> Self {
        self.fail_geolocation.store(true, Ordering::SeqCst);
        self
    }

    /// Every fabricated page fails navigation.
    pub fn fail_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    pub fn launch_count(&self) -> u32 {
        self.launch_count.load(Ordering::SeqCst)
    }

    pub fn open_contexts(&self) -> usize {
        self.open_contexts.load(Ordering::SeqCst)
    }

    pub fn cleanup_calls(&self) -> u32 {
        self.cleanup_calls.load(Ordering::SeqCst)
    }

    pub fn last_spec(&self) -> Option<LaunchSpec> {
        self.last_spec.lock().clone()
    }

    /// Most recently fabricated page, so tests can inspect what ran on it.
    pub fn last_page(&self) -> Option<Arc<SimPage>> {
        self.pages.lock().last().cloned()
    }
}

impl Default for SimBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserBackend for SimBackend {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn BrowserContext>, SessionError> {
        self.launch_count.fetch_add(1, Ordering::SeqCst);
        *self.last_spec.lock() = Some(spec.clone());

        let failures_left = self.fail_launches.load(Ordering::SeqCst);
        if failures_left > 0 {
            self.fail_launches.store(failures_left - 1, Ordering::SeqCst);
            return Err(SessionError::Launch("simulated launch failure".into()));
        }

        if spec.identity.validate_geolocation && self.fail_geolocation.swap(false, Ordering::SeqCst)
        {
            return Err(SessionError::GeolocationCheck(
                "simulated geolocation mismatch".into(),
            ));
        }

        let page = Arc::new(SimPage::new());
        page.set_fail_navigation(self.fail_navigation);
        self.pages.lock().push(Arc::clone(&page));
        self.open_contexts.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SimContext {
            page,
            open_contexts: Arc::clone(&self.open_contexts),
        }))
    }

    async fn cleanup_profile(&self, _profile_name: &str) -> Result<(), SessionError> {
        self.cleanup_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sim_page_records_interactions() {
        let page = SimPage::new();
        page.goto("https://example.test/feed").await.unwrap();
        page.click("article button.like").await.unwrap();
        page.type_text("textarea", "hello").await.unwrap();
        page.scroll_by(600).await.unwrap();

        assert_eq!(
            page.current_url().await.unwrap(),
            "https://example.test/feed"
        );
        assert_eq!(page.clicks(), vec!["article button.like".to_string()]);
        assert_eq!(page.typed().len(), 1);
        assert_eq!(page.scroll_count(), 1);
    }

    #[tokio::test]
    async fn closed_page_surfaces_context_closed() {
        let backend = SimBackend::new();
        let mut ctx = backend.launch(&LaunchSpec::new("p")).await.unwrap();
        let page = ctx.page();
        ctx.close().await.unwrap();

        let err = page.current_url().await.unwrap_err();
        assert!(matches!(err, ActivityError::ContextClosed));
    }

    #[tokio::test]
    async fn missing_element_is_element_not_found() {
        let page = SimPage::new();
        page.set_count("button.follow", 0);
        let err = page.click("button.follow").await.unwrap_err();
        assert!(matches!(err, ActivityError::ElementNotFound(_)));
    }
}
