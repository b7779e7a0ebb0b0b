//! Outcome tags returned by activities to select the next graph edge.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known outcome tags. Custom branch names are equally valid; these are
/// only the ones the engine itself interprets.
pub mod tags {
    pub const SUCCESS: &str = "success";
    pub const FAILURE: &str = "failure";
    pub const NEXT: &str = "next";
    pub const TRUE: &str = "true";
    pub const FALSE: &str = "false";
    pub const LOOP: &str = "loop";
    pub const DONE: &str = "done";
}

/// Short string tag an activity returns to pick the next edge.
///
/// Exists only during one traversal; never persisted.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Outcome(String);

impl Outcome {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn success() -> Self {
        Self::new(tags::SUCCESS)
    }

    pub fn failure() -> Self {
        Self::new(tags::FAILURE)
    }

    pub fn next() -> Self {
        Self::new(tags::NEXT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is(&self, tag: &str) -> bool {
        self.0 == tag
    }
}

impl From<&str> for Outcome {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
