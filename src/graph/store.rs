//! Storage seam for the knowledge graph.

use async_trait::async_trait;
use serde::Serialize;

use crate::models::{Entity, Relation};
use crate::Result;

/// Crate-assigned node identifier (stored as the `uid` property).
pub type NodeId = String;

/// Node as returned by lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub name: String,
    pub labels: Vec<String>,
    pub source: Option<String>,
}

impl GraphNode {
    /// `Label1/Label2`, as shown in the serialized context.
    pub fn label_text(&self) -> String {
        if self.labels.is_empty() {
            "Entity".to_string()
        } else {
            self.labels.join("/")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// One hop away from a matched node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Neighbor {
    pub edge_type: String,
    pub direction: Direction,
    pub node: GraphNode,
}

/// How a keyword is compared to the normalized node name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    Contains,
}

/// Labelled-property graph capability used by the builder and the query path.
///
/// Implementations only touch nodes that carry a crate-assigned `uid`.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Cheap connectivity check.
    async fn ping(&self) -> Result<()>;

    /// Create a node labelled with the entity type. `source` is the document's source label.
    async fn create_node(&self, entity: &Entity, source: &str) -> Result<NodeId>;

    /// Create a typed edge `from -> to`. `false` when either endpoint no longer exists.
    async fn create_edge(&self, from: &NodeId, to: &NodeId, relation: &Relation)
        -> Result<bool>;

    /// Nodes whose lowercased name matches `keyword`.
    async fn find_nodes(&self, keyword: &str, mode: MatchMode, limit: usize)
        -> Result<Vec<GraphNode>>;

    /// Depth-1 neighbours of a node, both directions.
    async fn neighbors(&self, node: &NodeId, limit: usize) -> Result<Vec<Neighbor>>;

    /// Remove every crate-owned node and its edges.
    async fn clear(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}
