//! Knowledge-graph storage and depth-1 retrieval.
//!
//! [`GraphConnector`] wraps one [`GraphStore`] backend (Neo4j over Bolt, the Neo4j HTTP
//! Query API, or an in-process graph) and turns store failures into degraded outcomes.

pub mod connector;
pub mod cypher;
pub mod memory;
pub mod neo4j;
pub mod neo4j_http;
pub mod store;
pub mod subgraph;

pub use connector::{extract_keywords, GraphConnector, PartialUpsert, QueryLimits, UpsertCounts};
pub use memory::MemoryGraphStore;
pub use neo4j::BoltGraphStore;
pub use neo4j_http::HttpGraphStore;
pub use store::{Direction, GraphNode, GraphStore, MatchMode, Neighbor, NodeId};
pub use subgraph::{Subgraph, Triple};
