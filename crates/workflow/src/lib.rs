//! Workflow graph model and the per-profile graph walker.
//!
//! A workflow is a directed graph of nodes (start, activity, condition,
//! loop, random branch, delay) whose edges carry optional handle tags. The
//! walker traverses one graph per browser session, dispatching activity
//! nodes through a registration map and following the edge selected by each
//! returned outcome tag.

pub mod errors;
pub mod model;
pub mod registry;
pub mod walker;

pub use errors::WalkError;
pub use model::{Edge, Node, NodeData, NodeKind, WorkflowGraph};
pub use registry::{Activity, ActivityContext, ActivityRegistry};
pub use walker::{GraphWalker, WalkOutcome, WalkerConfig};
