//! Shared primitives for the gramflow workflow engine crates.

pub mod error;
pub mod events;
pub mod outcome;
pub mod profile;

pub use error::ActivityError;
pub use events::{CompletionStatus, EventSink, NullSink, RunEvent, SessionStatus};
pub use outcome::Outcome;
pub use profile::{
    Account, Identity, ProfileId, ProfileRecord, ProfileStatus, TargetAccount, TargetStatus,
};

use uuid::Uuid;

/// Identifier for one runner invocation, threaded through the logs so a
/// session's lines can be correlated across profiles.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
