//! Graph store backed by Neo4j over Bolt

use async_trait::async_trait;
use neo4rs::{query, ConfigBuilder, Graph, Row};
use tracing::{debug, info};
use uuid::Uuid;

use super::cypher;
use super::store::{Direction, GraphNode, GraphStore, MatchMode, Neighbor, NodeId};
use crate::models::{normalize_name, Entity, Relation};
use crate::Result;

pub struct BoltGraphStore {
    graph: Graph,
}

impl BoltGraphStore {
    /// Connect to Neo4j server
    pub async fn connect(uri: &str, user: &str, password: &str, database: &str) -> Result<Self> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .db(database)
            .build()?;
        let graph = Graph::connect(config).await?;
        let store = Self { graph };

        store.ping().await?;
        info!("Connected to Neo4j via Bolt at {}", uri);
        Ok(store)
    }

    async fn fetch(&self, q: neo4rs::Query) -> Result<Vec<Row>> {
        let mut result = self.graph.execute(q).await?;
        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }
}

fn node_from_row(row: &Row) -> Option<GraphNode> {
    Some(GraphNode {
        id: row.get::<String>("uid").ok()?,
        name: row.get::<String>("name").unwrap_or_default(),
        labels: row.get::<Vec<String>>("labels").unwrap_or_default(),
        source: row.get::<String>("source").ok(),
    })
}

#[async_trait]
impl GraphStore for BoltGraphStore {
    async fn ping(&self) -> Result<()> {
        self.graph.run(query(cypher::PING)).await?;
        Ok(())
    }

    async fn create_node(&self, entity: &Entity, source: &str) -> Result<NodeId> {
        let uid = Uuid::new_v4().to_string();
        let q = query(&cypher::create_node(&entity.entity_type))
            .param("uid", uid.clone())
            .param("name", entity.name.trim().to_string())
            .param("name_lower", normalize_name(&entity.name))
            .param("source", source.to_string())
            .param("document_id", entity.source_document_id.clone());

        self.graph.run(q).await?;
        debug!("Created node: {} ({})", entity.name, uid);
        Ok(uid)
    }

    async fn create_edge(&self, from: &NodeId, to: &NodeId, relation: &Relation) -> Result<bool> {
        let q = query(&cypher::create_edge(&relation.relation_type))
            .param("from", from.clone())
            .param("to", to.clone())
            .param("document_id", relation.source_document_id.clone());

        let created = self
            .fetch(q)
            .await?
            .first()
            .and_then(|row| row.get::<i64>("created").ok())
            .unwrap_or(0);
        Ok(created > 0)
    }

    async fn find_nodes(
        &self,
        keyword: &str,
        mode: MatchMode,
        limit: usize,
    ) -> Result<Vec<GraphNode>> {
        let statement = match mode {
            MatchMode::Exact => cypher::FIND_EXACT,
            MatchMode::Contains => cypher::FIND_CONTAINS,
        };
        let q = query(statement)
            .param("keyword", normalize_name(keyword))
            .param("limit", limit as i64);

        Ok(self.fetch(q).await?.iter().filter_map(node_from_row).collect())
    }

    async fn neighbors(&self, node: &NodeId, limit: usize) -> Result<Vec<Neighbor>> {
        let q = query(cypher::NEIGHBORS)
            .param("uid", node.clone())
            .param("limit", limit as i64);

        let neighbors = self
            .fetch(q)
            .await?
            .iter()
            .filter_map(|row| {
                let outgoing = row.get::<bool>("outgoing").unwrap_or(true);
                Some(Neighbor {
                    edge_type: row.get::<String>("rel_type").ok()?,
                    direction: if outgoing {
                        Direction::Outgoing
                    } else {
                        Direction::Incoming
                    },
                    node: node_from_row(row)?,
                })
            })
            .collect();
        Ok(neighbors)
    }

    async fn clear(&self) -> Result<()> {
        self.graph.run(query(cypher::CLEAR)).await?;
        info!("Cleared crate-owned graph content");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "neo4j-bolt"
    }
}
