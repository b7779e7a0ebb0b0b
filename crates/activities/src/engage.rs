//! Liking, following, unfollowing, and follow-request approval.

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

const LIKE_BUTTON: &str = "article svg[aria-label='Like']";
const FOLLOW_BUTTON: &str = "button.follow";
const UNFOLLOW_BUTTON: &str = "button.following";
const UNFOLLOW_CONFIRM: &str = "button.unfollow-confirm";
const REQUESTS_URL: &str = "https://www.instagram.com/accounts/follow_requests/";
const CONFIRM_REQUEST: &str = "button.confirm-request";

fn config_u32(config: &Map<String, Value>, key: &str, default: u32) -> u32 {
    config
        .get(key)
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .unwrap_or(default)
}

fn action_pause() -> Duration {
    let mut rng = rand::thread_rng();
    Duration::from_millis(rng.gen_range(800..2500))
}

/// Like visible feed posts, up to `max_likes`.
///
/// Returns "failure" when no likeable post is on screen, so a condition
/// edge can branch on it; that is an expected state, not an error.
pub struct LikePost;

#[async_trait]
impl Activity for LikePost {
    async fn run(
        &self,
        page: &dyn Page,
        config: &Map<String, Value>,
        ctx: &ActivityContext,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ActivityError> {
        let max_likes = config_u32(config, "max_likes", 1);
        let available = page.count(LIKE_BUTTON).await?;
        if available == 0 {
            debug!(profile = %ctx.account.username, "no likeable posts on screen");
            return Ok(Outcome::failure());
        }

        let mut liked = 0;
        while liked < max_likes && liked < available as u32 {
            if cancel.is_cancelled() {
                break;
            }
            page.click(LIKE_BUTTON).await?;
            liked += 1;
            sleep(action_pause()).await;
        }

        info!(profile = %ctx.account.username, liked, "liked posts");
        Ok(Outcome::success())
    }
}

/// Follow the profiles listed in the context data under `follow_targets`,
/// or whatever follow buttons are on the current page when none are given.
pub struct FollowUser;

#[async_trait]
impl Activity for FollowUser {
    async fn run(
        &self,
        page: &dyn Page,
        config: &Map<String, Value>,
        ctx: &ActivityContext,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ActivityError> {
        let usernames: Vec<String> = ctx
            .data
            .get("follow_targets")
            .and_then(Value::as_array)
            .map(|targets| {
                targets
                    .iter()
                    .filter_map(|t| t.get("username").and_then(Value::as_str))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let mut followed = 0u32;
        if usernames.is_empty() {
            let max = config_u32(config, "max_follows", 1);
            let available = page.count(FOLLOW_BUTTON).await?;
            if available == 0 {
                debug!(profile = %ctx.account.username, "nobody to follow here");
                return Ok(Outcome::failure());
            }
            while followed < max && (followed as usize) < available {
                if cancel.is_cancelled() {
                    break;
                }
                page.click(FOLLOW_BUTTON).await?;
                followed += 1;
                sleep(action_pause()).await;
            }
        } else {
            for username in &usernames {
                if cancel.is_cancelled() {
                    break;
                }
                page.goto(&profile_url(username)).await?;
                if page.count(FOLLOW_BUTTON).await? == 0 {
                    // Already following or the profile is gone; move on.
                    continue;
                }
                page.click(FOLLOW_BUTTON).await?;
                followed += 1;
                sleep(action_pause()).await;
            }
        }

        info!(profile = %ctx.account.username, followed, "followed users");
        if followed == 0 {
            Ok(Outcome::failure())
        } else {
            Ok(Outcome::success())
        }
    }
}

/// Unfollow up to `max_unfollows` accounts from the following list.
pub struct UnfollowUser;

#[async_trait]
impl Activity for UnfollowUser {
    async fn run(
        &self,
        page: &dyn Page,
        config: &Map<String, Value>,
        ctx: &ActivityContext,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ActivityError> {
        let max = config_u32(config, "max_unfollows", 1);
        let available = page.count(UNFOLLOW_BUTTON).await?;
        if available == 0 {
            debug!(profile = %ctx.account.username, "nobody to unfollow");
            return Ok(Outcome::failure());
        }

        let mut unfollowed = 0u32;
        while unfollowed < max && (unfollowed as usize) < available {
            if cancel.is_cancelled() {
                break;
            }
            page.click(UNFOLLOW_BUTTON).await?;
            // The confirmation dialog is not always shown.
            if page.exists(UNFOLLOW_CONFIRM).await? {
                page.click(UNFOLLOW_CONFIRM).await?;
            }
            unfollowed += 1;
            sleep(action_pause()).await;
        }

        info!(profile = %ctx.account.username, unfollowed, "unfollowed users");
        Ok(Outcome::success())
    }
}

/// Approve pending follow requests, up to `max_approvals`.
pub struct ApproveFollowRequests;

#[async_trait]
impl Activity for ApproveFollowRequests {
    async fn run(
        &self,
        page: &dyn Page,
        config: &Map<String, Value>,
        ctx: &ActivityContext,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ActivityError> {
        page.goto(REQUESTS_URL).await?;
        let pending = page.count(CONFIRM_REQUEST).await?;
        if pending == 0 {
            debug!(profile = %ctx.account.username, "no pending follow requests");
            return Ok(Outcome::success());
        }

        let max = config_u32(config, "max_approvals", u32::MAX);
        let mut approved = 0u32;
        while approved < max && (approved as usize) < pending {
            if cancel.is_cancelled() {
                break;
            }
            page.click(CONFIRM_REQUEST).await?;
            approved += 1;
            sleep(action_pause()).await;
        }

        info!(profile = %ctx.account.username, approved, "approved follow requests");
        Ok(Outcome::success())
    }
}

fn profile_url(username: &str) -> String {
    format!("https://www.instagram.com/{username}/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gramflow_core_types::Account;
    use gramflow_session::sim::SimPage;
    use serde_json::json;

    fn ctx() -> ActivityContext {
        ActivityContext::new(Account::new("tester"))
    }

    #[tokio::test]
    async fn like_clicks_up_to_max() {
        let page = SimPage::new();
        page.set_count(LIKE_BUTTON, 5);
        let config = serde_json::from_value(json!({"max_likes": 2})).unwrap();

        let outcome = LikePost
            .run(&page, &config, &ctx(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(outcome.is("success"));
        assert_eq!(page.clicks().len(), 2);
    }

    #[tokio::test]
    async fn like_with_nothing_on_screen_branches_failure() {
        let page = SimPage::new();
        page.set_count(LIKE_BUTTON, 0);
        let outcome = LikePost
            .run(&page, &Map::new(), &ctx(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(outcome.is("failure"));
    }

    #[tokio::test]
    async fn follow_visits_each_target_profile() {
        let page = SimPage::new();
        page.set_count(FOLLOW_BUTTON, 1);
        let context = ctx().with_data(
            "follow_targets",
            json!([{"username": "first"}, {"username": "second"}]),
        );

        let outcome = FollowUser
            .run(&page, &Map::new(), &context, &CancellationToken::new())
            .await
            .unwrap();
        assert!(outcome.is("success"));
        assert_eq!(page.clicks().len(), 2);
        assert_eq!(
            page.current_url().await.unwrap(),
            "https://www.instagram.com/second/"
        );
    }

    #[tokio::test]
    async fn approve_is_benign_with_no_requests() {
        let page = SimPage::new();
        page.set_count(CONFIRM_REQUEST, 0);
        let outcome = ApproveFollowRequests
            .run(&page, &Map::new(), &ctx(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(outcome.is("success"));
    }

    #[tokio::test]
    async fn unfollow_handles_confirmation_dialog() {
        let page = SimPage::new();
        page.set_count(UNFOLLOW_BUTTON, 2);
        page.set_count(UNFOLLOW_CONFIRM, 1);
        let config = serde_json::from_value(json!({"max_unfollows": 1})).unwrap();

        UnfollowUser
            .run(&page, &config, &ctx(), &CancellationToken::new())
            .await
            .unwrap();
        let clicks = page.clicks();
        assert_eq!(
            clicks,
            vec![UNFOLLOW_BUTTON.to_string(), UNFOLLOW_CONFIRM.to_string()]
        );
    }
}
