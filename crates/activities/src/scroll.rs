//! Feed and reel scrolling.

use async_trait::async_trait;
use gramflow_core_types::{ActivityError, Outcome};
use gramflow_session::Page;
use gramflow_workflow::{Activity, ActivityContext};
use rand::Rng;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const FEED_POST: &str = "article";
const REEL_ITEM: &str = "main [role='presentation'] video";

fn config_u32(config: &Map<String, Value>, key: &str, default: u32) -> u32 {
    config
        .get(key)
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .unwrap_or(default)
}

/// One human-ish scroll step: distance and dwell picked fresh each time.
fn scroll_step() -> (i64, Duration) {
    let mut rng = rand::thread_rng();
    let pixels = rng.gen_range(400..900);
    let dwell = Duration::from_millis(rng.gen_range(700..2200));
    (pixels, dwell)
}

/// Scroll the home feed a configured number of steps.
pub struct ScrollFeed;

#[async_trait]
impl Activity for ScrollFeed {
    async fn run(
        &self,
        page: &dyn Page,
        config: &Map<String, Value>,
        ctx: &ActivityContext,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ActivityError> {
        let steps = {
            let min = config_u32(config, "min_scrolls", 5);
            let max = config_u32(config, "max_scrolls", 15).max(min);
            let mut rng = rand::thread_rng();
            rng.gen_range(min..=max)
        };

        if page.count(FEED_POST).await? == 0 {
            // Empty feed is not an error; there is just nothing to scroll.
            info!(profile = %ctx.account.username, "feed has no posts, skipping scroll");
            return Ok(Outcome::success());
        }

        for step in 0..steps {
            if cancel.is_cancelled() {
                debug!(profile = %ctx.account.username, step, "scroll stopped by request");
                break;
            }
            let (pixels, dwell) = scroll_step();
            page.scroll_by(pixels).await?;
            sleep(dwell).await;
        }

        info!(profile = %ctx.account.username, steps, "feed scroll finished");
        Ok(Outcome::success())
    }
}

/// Watch-and-advance through reels.
pub struct ScrollReels;

#[async_trait]
impl Activity for ScrollReels {
    async fn run(
        &self,
        page: &dyn Page,
        config: &Map<String, Value>,
        ctx: &ActivityContext,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ActivityError> {
        let reels = {
            let min = config_u32(config, "min_reels", 3);
            let max = config_u32(config, "max_reels", 10).max(min);
            let mut rng = rand::thread_rng();
            rng.gen_range(min..=max)
        };

        if page.count(REEL_ITEM).await? == 0 {
            info!(profile = %ctx.account.username, "no reels available");
            return Ok(Outcome::success());
        }

        for watched in 0..reels {
            if cancel.is_cancelled() {
                debug!(profile = %ctx.account.username, watched, "reel scroll stopped by request");
                break;
            }
            let watch_time = {
                let mut rng = rand::thread_rng();
                Duration::from_millis(rng.gen_range(2_000..8_000))
            };
            sleep(watch_time).await;
            let (pixels, _) = scroll_step();
            page.scroll_by(pixels).await?;
        }

        info!(profile = %ctx.account.username, reels, "reel scroll finished");
        Ok(Outcome::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gramflow_core_types::Account;
    use gramflow_session::sim::SimPage;

    fn ctx() -> ActivityContext {
        ActivityContext::new(Account::new("tester"))
    }

    fn fast_config() -> Map<String, Value> {
        serde_json::from_value(serde_json::json!({
            "min_scrolls": 2, "max_scrolls": 2,
            "min_reels": 1, "max_reels": 1
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn scrolls_the_configured_number_of_steps() {
        let page = SimPage::new();
        ScrollFeed
            .run(&page, &fast_config(), &ctx(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(page.scroll_count(), 2);
    }

    #[tokio::test]
    async fn empty_feed_is_benign() {
        let page = SimPage::new();
        page.set_count(FEED_POST, 0);
        let outcome = ScrollFeed
            .run(&page, &fast_config(), &ctx(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(outcome.is("success"));
        assert_eq!(page.scroll_count(), 0);
    }

    #[tokio::test]
    async fn cancellation_stops_scrolling_early() {
        let page = SimPage::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = ScrollFeed
            .run(&page, &fast_config(), &ctx(), &cancel)
            .await
            .unwrap();
        assert!(outcome.is("success"));
        assert_eq!(page.scroll_count(), 0);
    }
}
