//! Structured lifecycle events emitted during a run.
//!
//! Events are ordered, named, and carry a timestamp plus the profile they
//! concern. The transport is the sink's business; the CLI writes them as
//! newline-delimited JSON on stdout for the progress UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal status of one account's traversal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Success,
    Failed,
    Cancelled,
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompletionStatus::Success => "success",
            CompletionStatus::Failed => "failed",
            CompletionStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Terminal status of the whole run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Completed,
    Cancelled,
    Failed,
}

/// Lifecycle event stream consumed by an external progress UI.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    SessionStarted {
        ts: DateTime<Utc>,
    },
    ProfileStarted {
        ts: DateTime<Utc>,
        profile: String,
    },
    TaskStarted {
        ts: DateTime<Utc>,
        profile: String,
        task: String,
    },
    ProfileCompleted {
        ts: DateTime<Utc>,
        profile: String,
        status: CompletionStatus,
    },
    SessionEnded {
        ts: DateTime<Utc>,
        status: SessionStatus,
    },
}

impl RunEvent {
    pub fn session_started() -> Self {
        RunEvent::SessionStarted { ts: Utc::now() }
    }

    pub fn profile_started(profile: impl Into<String>) -> Self {
        RunEvent::ProfileStarted {
            ts: Utc::now(),
            profile: profile.into(),
        }
    }

    pub fn task_started(profile: impl Into<String>, task: impl Into<String>) -> Self {
        RunEvent::TaskStarted {
            ts: Utc::now(),
            profile: profile.into(),
            task: task.into(),
        }
    }

    pub fn profile_completed(profile: impl Into<String>, status: CompletionStatus) -> Self {
        RunEvent::ProfileCompleted {
            ts: Utc::now(),
            profile: profile.into(),
            status,
        }
    }

    pub fn session_ended(status: SessionStatus) -> Self {
        RunEvent::SessionEnded {
            ts: Utc::now(),
            status,
        }
    }

    /// Profile the event concerns, if any.
    pub fn profile(&self) -> Option<&str> {
        match self {
            RunEvent::ProfileStarted { profile, .. }
            | RunEvent::TaskStarted { profile, .. }
            | RunEvent::ProfileCompleted { profile, .. } => Some(profile),
            _ => None,
        }
    }
}

/// Destination for lifecycle events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RunEvent);
}

/// Sink that drops every event. Useful where a caller has no UI attached.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: RunEvent) {}
}
