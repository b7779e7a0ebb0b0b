//! Traversal error types.

use gramflow_core_types::ActivityError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalkError {
    /// The graph has no start node. Configuration error, never retried.
    #[error("workflow graph has no start node")]
    MissingStartNode,

    /// More than one start node; the entry point would be ambiguous.
    #[error("workflow graph has {0} start nodes, expected exactly one")]
    MultipleStartNodes(usize),

    /// An edge references a node id that does not exist.
    #[error("edge {from_node} -> {target} references an unknown node")]
    UnknownEdgeEndpoint { from_node: String, target: String },

    /// An activity node names an id nothing registered.
    #[error("no activity registered for id '{0}'")]
    UnregisteredActivity(String),

    /// An activity node carries no activity id at all.
    #[error("activity node '{0}' has no activity id")]
    MissingActivityId(String),

    /// A condition node names a check the engine does not know.
    #[error("condition node '{node}' uses unknown check '{check}'")]
    UnknownCondition { node: String, check: String },

    /// The traversal exceeded the hard step ceiling. Guards against graph
    /// cycles with no exit; logged distinctly from activity failures.
    #[error("traversal aborted after exceeding {0} steps")]
    StepCeiling(u32),

    /// An activity failed and the classifier decided the traversal cannot
    /// continue (abort or browser restart).
    #[error("activity at node '{node}' failed: {source}")]
    Activity {
        node: String,
        #[source]
        source: ActivityError,
    },
}

impl WalkError {
    /// The underlying activity error, when one caused the failure.
    pub fn activity_error(&self) -> Option<&ActivityError> {
        match self {
            WalkError::Activity { source, .. } => Some(source),
            _ => None,
        }
    }
}
