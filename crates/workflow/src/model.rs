//! In-memory workflow graph representation.

use crate::errors::WalkError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Node kinds the walker interprets.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Start,
    Activity,
    Condition,
    Loop,
    RandomBranch,
    Delay,
}

/// Payload attached to a node: the activity id (for activity nodes) and a
/// free-form config map every node kind reads its own keys from.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl NodeData {
    pub fn config_u32(&self, key: &str, default: u32) -> u32 {
        self.config
            .get(key)
            .and_then(Value::as_u64)
            .map(|v| v as u32)
            .unwrap_or(default)
    }

    pub fn config_f64(&self, key: &str, default: f64) -> f64 {
        self.config
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub data: NodeData,
}

/// Directed edge. `source_handle` distinguishes multiple outgoing paths
/// ("true"/"false"/"loop"/"done"/custom branch names); absent or empty
/// means the unlabeled default path.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(
        default,
        rename = "sourceHandle",
        skip_serializing_if = "Option::is_none"
    )]
    pub source_handle: Option<String>,
}

impl Edge {
    fn is_unlabeled(&self) -> bool {
        self.source_handle.as_deref().map_or(true, str::is_empty)
    }
}

/// A loaded workflow. Read-only for the duration of a run; all traversal
/// state lives in the walker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl WorkflowGraph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The unique start node, if the graph has exactly one.
    pub fn start_node(&self) -> Option<&Node> {
        let mut starts = self.nodes.iter().filter(|n| n.kind == NodeKind::Start);
        let first = starts.next()?;
        if starts.next().is_some() {
            return None;
        }
        Some(first)
    }

    /// Structural validation: exactly one start node, edge endpoints exist.
    pub fn validate(&self) -> Result<(), WalkError> {
        let starts = self
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Start)
            .count();
        match starts {
            0 => return Err(WalkError::MissingStartNode),
            1 => {}
            n => return Err(WalkError::MultipleStartNodes(n)),
        }
        for edge in &self.edges {
            if self.node(&edge.source).is_none() || self.node(&edge.target).is_none() {
                return Err(WalkError::UnknownEdgeEndpoint {
                    from_node: edge.source.clone(),
                    target: edge.target.clone(),
                });
            }
        }
        Ok(())
    }

    /// Next node following `node_id` for the given outcome handle.
    ///
    /// First edge matching `(source, handle)` wins; when none matches, the
    /// node's first unlabeled edge is the fallback so activity nodes that
    /// ignore outcome tags still get their single unconditional successor.
    pub fn next_from(&self, node_id: &str, handle: &str) -> Option<&Node> {
        let tagged = if handle.is_empty() {
            None
        } else {
            self.edges
                .iter()
                .find(|e| e.source == node_id && e.source_handle.as_deref() == Some(handle))
        };
        let edge = tagged.or_else(|| {
            self.edges
                .iter()
                .find(|e| e.source == node_id && e.is_unlabeled())
        })?;
        self.node(&edge.target)
    }

    /// Distinct labeled handles leaving `node_id`, in edge order. The
    /// choice set for random-branch nodes.
    pub fn handles_from(&self, node_id: &str) -> Vec<String> {
        let mut handles: Vec<String> = Vec::new();
        for edge in self.edges.iter().filter(|e| e.source == node_id) {
            if let Some(handle) = edge.source_handle.as_deref() {
                if !handle.is_empty() && !handles.iter().any(|h| h == handle) {
                    handles.push(handle.to_string());
                }
            }
        }
        handles
    }

    /// True when any activity node dispatches the given activity id.
    pub fn has_activity(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| {
            n.kind == NodeKind::Activity && n.data.activity.as_deref() == Some(id)
        })
    }

    /// True when every activity node sends messages. Used by the runner to
    /// skip opening a browser for profiles with no reachable message work.
    pub fn is_messaging_only(&self) -> bool {
        let mut activities = self
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Activity)
            .peekable();
        if activities.peek().is_none() {
            return false;
        }
        activities.all(|n| n.data.activity.as_deref() == Some("send_message"))
    }
}
