//! Direct message sending.

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

const MESSAGE_BUTTON: &str = "button.message";
const MESSAGE_INPUT: &str = "textarea[placeholder='Message...']";
const SEND_BUTTON: &str = "button.send";

/// Send the configured message to each eligible target.
///
/// Targets arrive through the context data under `message_targets` — the
/// runner filters them against the per-target cooldown before the browser
/// is even opened. An empty list is benign.
pub struct SendMessage;

#[async_trait]
impl Activity for SendMessage {
    async fn run(
        &self,
        page: &dyn Page,
        config: &Map<String, Value>,
        ctx: &ActivityContext,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ActivityError> {
        let text = config
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("hey!");
        let targets: Vec<String> = ctx
            .data
            .get("message_targets")
            .and_then(Value::as_array)
            .map(|targets| {
                targets
                    .iter()
                    .filter_map(|t| t.get("username").and_then(Value::as_str))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        if targets.is_empty() {
            debug!(profile = %ctx.account.username, "no message targets supplied");
            return Ok(Outcome::success());
        }

        let mut sent = 0u32;
        for username in &targets {
            if cancel.is_cancelled() {
                break;
            }
            page.goto(&format!("https://www.instagram.com/{username}/"))
                .await?;
            if page.count(MESSAGE_BUTTON).await? == 0 {
                // Messaging unavailable for this target; skip it.
                debug!(target = %username, "no message button, skipping target");
                continue;
            }
            page.click(MESSAGE_BUTTON).await?;
            page.type_text(MESSAGE_INPUT, text).await?;
            page.click(SEND_BUTTON).await?;
            sent += 1;

            let pause = {
                let mut rng = rand::thread_rng();
                Duration::from_millis(rng.gen_range(1_500..4_000))
            };
            sleep(pause).await;
        }

        info!(profile = %ctx.account.username, sent, "messages sent");
        if sent == 0 && !targets.is_empty() {
            Ok(Outcome::failure())
        } else {
            Ok(Outcome::success())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gramflow_core_types::Account;
    use gramflow_session::sim::SimPage;
    use serde_json::json;

    fn ctx_with_targets(targets: Value) -> ActivityContext {
        ActivityContext::new(Account::new("tester")).with_data("message_targets", targets)
    }

    #[tokio::test]
    async fn sends_to_each_target() {
        let page = SimPage::new();
        let config = serde_json::from_value(json!({"message": "hello there"})).unwrap();
        let context = ctx_with_targets(json!([
            {"id": "t1", "username": "one"},
            {"id": "t2", "username": "two"}
        ]));

        let outcome = SendMessage
            .run(&page, &config, &context, &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.is("success"));
        let typed = page.typed();
        assert_eq!(typed.len(), 2);
        assert!(typed.iter().all(|(_, text)| text == "hello there"));
    }

    #[tokio::test]
    async fn no_targets_is_benign() {
        let page = SimPage::new();
        let context = ActivityContext::new(Account::new("tester"));
        let outcome = SendMessage
            .run(&page, &Map::new(), &context, &CancellationToken::new())
            .await
            .unwrap();
        assert!(outcome.is("success"));
        assert!(page.typed().is_empty());
    }

    #[tokio::test]
    async fn unreachable_targets_branch_failure() {
        let page = SimPage::new();
        page.set_count(MESSAGE_BUTTON, 0);
        let context = ctx_with_targets(json!([{"id": "t1", "username": "one"}]));

        let outcome = SendMessage
            .run(&page, &Map::new(), &context, &CancellationToken::new())
            .await
            .unwrap();
        assert!(outcome.is("failure"));
    }
}
