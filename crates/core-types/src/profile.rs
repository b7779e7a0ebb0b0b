//! Account and profile records shared between the runner and the state store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier assigned to a profile by the remote state store.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ProfileId(pub String);

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse activity state of a profile as tracked remotely.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Idle,
    Running,
}

impl ProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::Idle => "idle",
            ProfileStatus::Running => "running",
        }
    }
}

impl fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persistent state for one automation identity, owned by the state store.
///
/// The engine never deletes these; it only flips `status`/`using` around a
/// session and bumps `sessions_today` after a successful traversal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub profile_id: ProfileId,
    pub name: String,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    pub status: ProfileStatus,
    #[serde(default)]
    pub using: bool,
    #[serde(default)]
    pub sessions_today: u32,
    #[serde(default)]
    pub last_opened_at: Option<DateTime<Utc>>,
}

impl ProfileRecord {
    /// Busy check: a profile is busy when any other runner holds it.
    ///
    /// Advisory only. The read happens before our own write, so two runners
    /// racing on the same profile can both observe `false`.
    pub fn is_busy(&self) -> bool {
        self.status == ProfileStatus::Running || self.using
    }
}

/// One target profile to automate during a run.
///
/// Immutable for the run's duration except for the cached profile record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileRecord>,
}

impl Account {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            proxy: None,
            profile: None,
        }
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

/// Assignment state of a remote account handed to a profile.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    Pending,
    Assigned,
    Done,
    Failed,
}

impl TargetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetStatus::Pending => "pending",
            TargetStatus::Assigned => "assigned",
            TargetStatus::Done => "done",
            TargetStatus::Failed => "failed",
        }
    }
}

/// A remote account assigned to a profile for follow or messaging work.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TargetAccount {
    pub id: String,
    pub username: String,
    pub status: TargetStatus,
}

/// Launch identity applied to a browser context.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default = "default_validate_geolocation")]
    pub validate_geolocation: bool,
}

fn default_validate_geolocation() -> bool {
    true
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            user_agent: None,
            validate_geolocation: true,
        }
    }
}
