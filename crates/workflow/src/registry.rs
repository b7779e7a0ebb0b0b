//! Activity dispatch: id -> implementation.

use async_trait::async_trait;
use gramflow_core_types::{Account, ActivityError, Outcome};
use gramflow_session::Page;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-traversal context handed to every activity.
#[derive(Clone, Debug)]
pub struct ActivityContext {
    pub account: Account,
    /// Runner-injected extras, e.g. the eligible message targets for a
    /// messaging workflow.
    pub data: Map<String, Value>,
}

impl ActivityContext {
    pub fn new(account: Account) -> Self {
        Self {
            account,
            data: Map::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// One opaque, possibly UI-driving operation invoked by a graph node.
///
/// Implementations poll `cancel` at internal loop boundaries and map
/// expected "nothing to do" conditions to a benign outcome tag rather than
/// an error.
#[async_trait]
pub trait Activity: Send + Sync {
    async fn run(
        &self,
        page: &dyn Page,
        config: &Map<String, Value>,
        ctx: &ActivityContext,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ActivityError>;
}

/// Registration map populated at startup. Unknown ids fail loud instead of
/// silently falling through.
#[derive(Default)]
pub struct ActivityRegistry {
    entries: HashMap<String, Arc<dyn Activity>>,
}

impl ActivityRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn register(&mut self, id: impl Into<String>, activity: Arc<dyn Activity>) {
        self.entries.insert(id.into(), activity);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Activity>> {
        self.entries.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Always(&'static str);

    #[async_trait]
    impl Activity for Always {
        async fn run(
            &self,
            _page: &dyn Page,
            _config: &Map<String, Value>,
            _ctx: &ActivityContext,
            _cancel: &CancellationToken,
        ) -> Result<Outcome, ActivityError> {
            Ok(Outcome::new(self.0))
        }
    }

    #[test]
    fn lookup_by_id() {
        let mut registry = ActivityRegistry::new();
        registry.register("scroll_feed", Arc::new(Always("success")));
        assert!(registry.get("scroll_feed").is_some());
        assert!(registry.get("unknown").is_none());
        assert_eq!(registry.ids(), vec!["scroll_feed"]);
    }
}
