//! Cypher statements shared by the Bolt and HTTP backends.
//!
//! Labels and relationship types cannot be parameters, so they are spliced in after
//! [`sanitize_identifier`] restricted them to `[A-Za-z0-9_]`.

use crate::models::{normalize_relation_type, sanitize_identifier};

pub const PING: &str = "RETURN 1 AS test";

pub const FIND_EXACT: &str = "MATCH (n) WHERE n.uid IS NOT NULL AND n.name_lower = $keyword \
     RETURN n.uid AS uid, n.name AS name, labels(n) AS labels, n.source AS source \
     ORDER BY n.name LIMIT $limit";

pub const FIND_CONTAINS: &str = "MATCH (n) WHERE n.uid IS NOT NULL AND n.name_lower CONTAINS $keyword \
     RETURN n.uid AS uid, n.name AS name, labels(n) AS labels, n.source AS source \
     ORDER BY n.name LIMIT $limit";

pub const NEIGHBORS: &str = "MATCH (n {uid: $uid})-[r]-(m) WHERE m.uid IS NOT NULL \
     RETURN type(r) AS rel_type, startNode(r) = n AS outgoing, \
     m.uid AS uid, m.name AS name, labels(m) AS labels, m.source AS source \
     ORDER BY m.name, type(r) LIMIT $limit";

pub const CLEAR: &str = "MATCH (n) WHERE n.uid IS NOT NULL DETACH DELETE n";

pub fn create_node(entity_type: &str) -> String {
    format!(
        "CREATE (n:{} {{uid: $uid, name: $name, name_lower: $name_lower, \
         source: $source, document_id: $document_id}}) RETURN n.uid AS uid",
        sanitize_identifier(entity_type, "Entity")
    )
}

pub fn create_edge(relation_type: &str) -> String {
    format!(
        "MATCH (a {{uid: $from}}), (b {{uid: $to}}) \
         CREATE (a)-[r:{}]->(b) SET r.document_id = $document_id \
         RETURN count(r) AS created",
        normalize_relation_type(relation_type)
    )
}
