//! Run-level configuration.

use gramflow_resilience::RetryPolicy;
use gramflow_workflow::WalkerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options for one runner invocation. Deserialized from the CLI payload
/// with defaults for anything missing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Upper bound on concurrent per-profile sessions.
    pub parallelism: usize,
    /// Daily session cap per profile.
    pub max_sessions_per_day: u32,
    /// Minimum minutes between reopening the same profile.
    pub cooldown_minutes: i64,
    /// Minimum hours between messages to the same target.
    pub message_cooldown_hours: i64,
    /// Fresh-session restarts allowed after a browser crash.
    pub restart_budget: u32,
    /// Traversal step ceiling.
    pub max_steps: u32,
    /// Randomized pause window between graph steps, in seconds.
    pub step_pause_min_seconds: f64,
    pub step_pause_max_seconds: f64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            parallelism: 2,
            max_sessions_per_day: 5,
            cooldown_minutes: 30,
            message_cooldown_hours: 2,
            restart_budget: 1,
            max_steps: 500,
            step_pause_min_seconds: 1.0,
            step_pause_max_seconds: 3.0,
        }
    }
}

impl RunOptions {
    /// No pauses, immediate retries. For tests.
    pub fn instant() -> Self {
        Self {
            step_pause_min_seconds: 0.0,
            step_pause_max_seconds: 0.0,
            ..Self::default()
        }
    }

    /// Worker pool size for a given account count.
    pub fn worker_count(&self, accounts: usize) -> usize {
        self.parallelism.min(accounts).max(1)
    }

    pub fn walker_config(&self) -> WalkerConfig {
        let instant = self.step_pause_max_seconds <= 0.0;
        WalkerConfig {
            max_steps: self.max_steps,
            step_pause: (
                Duration::from_secs_f64(self.step_pause_min_seconds.max(0.0)),
                Duration::from_secs_f64(self.step_pause_max_seconds.max(0.0)),
            ),
            retry: if instant {
                RetryPolicy::immediate(2)
            } else {
                RetryPolicy::default()
            },
            rate_limit_pause: if instant {
                (Duration::ZERO, Duration::ZERO)
            } else {
                (Duration::from_secs(30), Duration::from_secs(90))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_is_bounded_by_accounts_and_parallelism() {
        let options = RunOptions {
            parallelism: 4,
            ..RunOptions::default()
        };
        assert_eq!(options.worker_count(10), 4);
        assert_eq!(options.worker_count(2), 2);
        assert_eq!(options.worker_count(0), 1);
    }

    #[test]
    fn missing_payload_keys_fall_back_to_defaults() {
        let options: RunOptions = serde_json::from_str(r#"{"parallelism": 7}"#).unwrap();
        assert_eq!(options.parallelism, 7);
        assert_eq!(options.max_sessions_per_day, 5);
        assert_eq!(options.cooldown_minutes, 30);
    }
}
