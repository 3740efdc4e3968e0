//! In-process graph for offline runs and tests.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{Direction, GraphNode, GraphStore, MatchMode, Neighbor, NodeId};
use crate::models::{normalize_name, normalize_relation_type, sanitize_identifier, Entity, Relation};
use crate::Result;

#[derive(Debug, Clone)]
struct StoredNode {
    node: GraphNode,
    name_lower: String,
    document_id: String,
}

#[derive(Debug, Clone)]
struct StoredEdge {
    from: NodeId,
    to: NodeId,
    edge_type: String,
    document_id: String,
}

#[derive(Debug, Default)]
struct GraphData {
    nodes: Vec<StoredNode>,
    edges: Vec<StoredEdge>,
}

/// Graph kept behind a `RwLock`; node and edge creation mirrors the Cypher backends.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    data: RwLock<GraphData>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn node_count(&self) -> usize {
        self.data.read().await.nodes.len()
    }

    pub async fn edge_count(&self) -> usize {
        self.data.read().await.edges.len()
    }

    /// Document ids recorded on every node and edge, in insertion order.
    pub async fn document_ids(&self) -> Vec<String> {
        let data = self.data.read().await;
        data.nodes
            .iter()
            .map(|n| n.document_id.clone())
            .chain(data.edges.iter().map(|e| e.document_id.clone()))
            .collect()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn create_node(&self, entity: &Entity, source: &str) -> Result<NodeId> {
        let id = Uuid::new_v4().to_string();
        let stored = StoredNode {
            node: GraphNode {
                id: id.clone(),
                name: entity.name.trim().to_string(),
                labels: vec![sanitize_identifier(&entity.entity_type, "Entity")],
                source: Some(source.to_string()),
            },
            name_lower: normalize_name(&entity.name),
            document_id: entity.source_document_id.clone(),
        };

        self.data.write().await.nodes.push(stored);
        Ok(id)
    }

    async fn create_edge(&self, from: &NodeId, to: &NodeId, relation: &Relation) -> Result<bool> {
        let mut data = self.data.write().await;
        // same as the Cypher MATCH: a missing endpoint creates nothing
        for endpoint in [from, to] {
            if !data.nodes.iter().any(|n| &n.node.id == endpoint) {
                return Ok(false);
            }
        }

        data.edges.push(StoredEdge {
            from: from.clone(),
            to: to.clone(),
            edge_type: normalize_relation_type(&relation.relation_type),
            document_id: relation.source_document_id.clone(),
        });
        Ok(true)
    }

    async fn find_nodes(
        &self,
        keyword: &str,
        mode: MatchMode,
        limit: usize,
    ) -> Result<Vec<GraphNode>> {
        let keyword = normalize_name(keyword);
        let data = self.data.read().await;

        let mut found: Vec<GraphNode> = data
            .nodes
            .iter()
            .filter(|n| match mode {
                MatchMode::Exact => n.name_lower == keyword,
                MatchMode::Contains => n.name_lower.contains(&keyword),
            })
            .map(|n| n.node.clone())
            .collect();

        found.sort_by(|a, b| a.name.cmp(&b.name));
        found.truncate(limit);
        Ok(found)
    }

    async fn neighbors(&self, node: &NodeId, limit: usize) -> Result<Vec<Neighbor>> {
        let data = self.data.read().await;
        let lookup = |id: &NodeId| data.nodes.iter().find(|n| &n.node.id == id);

        let mut found: Vec<Neighbor> = data
            .edges
            .iter()
            .filter_map(|edge| {
                let (other, direction) = if &edge.from == node {
                    (&edge.to, Direction::Outgoing)
                } else if &edge.to == node {
                    (&edge.from, Direction::Incoming)
                } else {
                    return None;
                };
                lookup(other).map(|stored| Neighbor {
                    edge_type: edge.edge_type.clone(),
                    direction,
                    node: stored.node.clone(),
                })
            })
            .collect();

        found.sort_by(|a, b| {
            a.node
                .name
                .cmp(&b.node.name)
                .then_with(|| a.edge_type.cmp(&b.edge_type))
        });
        found.truncate(limit);
        Ok(found)
    }

    async fn clear(&self) -> Result<()> {
        let mut data = self.data.write().await;
        data.nodes.clear();
        data.edges.clear();
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
