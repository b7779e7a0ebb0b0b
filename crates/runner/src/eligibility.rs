//! Per-account eligibility gate, checked before any browser is acquired.

use crate::options::RunOptions;
use chrono::{Duration as ChronoDuration, Utc};
use gramflow_core_types::{ProfileRecord, TargetAccount};
use gramflow_state_client::StateStore;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Why an account sat this cycle out. A skip is not an error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SkipReason {
    DailyCapReached { sessions_today: u32 },
    ProfileBusy,
    CooldownActive { minutes_left: i64 },
    NoMessageTargets,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DailyCapReached { sessions_today } => {
                write!(f, "daily session cap reached ({sessions_today} today)")
            }
            SkipReason::ProfileBusy => write!(f, "profile is busy elsewhere"),
            SkipReason::CooldownActive { minutes_left } => {
                write!(f, "reopened too recently, {minutes_left}m of cooldown left")
            }
            SkipReason::NoMessageTargets => write!(f, "no eligible message targets"),
        }
    }
}

/// Gate verdict.
#[derive(Clone, Debug)]
pub enum Eligibility {
    /// Run this cycle. For messaging workflows, the targets that survived
    /// the per-target cooldown filter.
    Eligible { message_targets: Vec<TargetAccount> },
    Skip(SkipReason),
}

/// Applies the session/cooldown rules against the remote store.
pub struct EligibilityGate {
    store: Arc<dyn StateStore>,
    options: RunOptions,
}

impl EligibilityGate {
    pub fn new(store: Arc<dyn StateStore>, options: RunOptions) -> Self {
        Self { store, options }
    }

    pub async fn check(&self, profile: &ProfileRecord, messaging_only: bool) -> Eligibility {
        if profile.sessions_today >= self.options.max_sessions_per_day {
            return Eligibility::Skip(SkipReason::DailyCapReached {
                sessions_today: profile.sessions_today,
            });
        }

        if profile.is_busy() || self.fresh_busy_check(&profile.name).await {
            return Eligibility::Skip(SkipReason::ProfileBusy);
        }

        if let Some(last_opened) = profile.last_opened_at {
            let elapsed = Utc::now() - last_opened;
            let cooldown = ChronoDuration::minutes(self.options.cooldown_minutes);
            if elapsed < cooldown {
                return Eligibility::Skip(SkipReason::CooldownActive {
                    minutes_left: (cooldown - elapsed).num_minutes().max(1),
                });
            }
        }

        let message_targets = if messaging_only {
            let targets = self.eligible_message_targets(profile).await;
            if targets.is_empty() {
                // Paying for a browser launch with no reachable work is the
                // thing this gate exists to avoid.
                return Eligibility::Skip(SkipReason::NoMessageTargets);
            }
            targets
        } else {
            Vec::new()
        };

        Eligibility::Eligible { message_targets }
    }

    /// Re-read the busy flag. An unreadable flag counts as "not busy":
    /// this check is advisory, and stalling every profile on a store blip
    /// would be worse than the accepted race.
    async fn fresh_busy_check(&self, name: &str) -> bool {
        match self.store.is_profile_busy(name).await {
            Ok(busy) => busy,
            Err(err) => {
                warn!(profile = %name, error = %err, "busy check failed, assuming not busy");
                false
            }
        }
    }

    /// Targets still outside their per-target message cooldown. A target
    /// whose cooldown state cannot be read is excluded — double-messaging
    /// is the failure mode that matters here.
    async fn eligible_message_targets(&self, profile: &ProfileRecord) -> Vec<TargetAccount> {
        let targets = match self.store.get_accounts_to_message(&profile.profile_id).await {
            Ok(targets) => targets,
            Err(err) => {
                warn!(
                    profile = %profile.name,
                    error = %err,
                    "could not fetch message targets"
                );
                return Vec::new();
            }
        };

        let cooldown = ChronoDuration::hours(self.options.message_cooldown_hours);
        let now = Utc::now();
        let mut eligible = Vec::new();
        for target in targets {
            match self.store.get_last_message_sent_at(&target.id).await {
                Ok(Some(last)) if now - last < cooldown => {}
                Ok(_) => eligible.push(target),
                Err(err) => {
                    warn!(
                        target = %target.username,
                        error = %err,
                        "cooldown state unreadable, excluding target"
                    );
                }
            }
        }
        eligible
    }
}
