//! The page handle activities drive.

use async_trait::async_trait;
use gramflow_core_types::ActivityError;

/// Minimal surface an activity needs from an open browser page.
///
/// Every method maps to one UI-level operation; the concrete selector
/// strategy lives in the backend implementation, not here.
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), ActivityError>;

    async fn current_url(&self) -> Result<String, ActivityError>;

    async fn click(&self, selector: &str) -> Result<(), ActivityError>;

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), ActivityError>;

    async fn scroll_by(&self, pixels: i64) -> Result<(), ActivityError>;

    /// Number of elements currently matching `selector`.
    async fn count(&self, selector: &str) -> Result<usize, ActivityError>;

    async fn exists(&self, selector: &str) -> Result<bool, ActivityError> {
        Ok(self.count(selector).await? > 0)
    }
}
