//! Graph store over the Neo4j HTTP Query API (v2).
//!
//! Used when the Bolt port is blocked by a firewall or proxy; every call is a single
//! `POST {base}/db/{database}/query/v2` with basic auth.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use super::cypher;
use super::store::{Direction, GraphNode, GraphStore, MatchMode, Neighbor, NodeId};
use crate::models::{normalize_name, Entity, Relation};
use crate::{Error, Result};

/// Map a Bolt-style URI onto the HTTP endpoint base.
pub fn http_base_url(uri: &str) -> String {
    let converted = if let Some(rest) = uri.strip_prefix("neo4j+s://") {
        format!("https://{rest}")
    } else if let Some(rest) = uri.strip_prefix("neo4j+ssc://") {
        format!("https://{rest}")
    } else if let Some(rest) = uri.strip_prefix("neo4j://") {
        format!("http://{rest}")
    } else if let Some(rest) = uri.strip_prefix("bolt://") {
        format!("http://{rest}")
    } else {
        uri.to_string()
    };
    converted.trim_end_matches('/').to_string()
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    statement: &'a str,
    parameters: Value,
}

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    errors: Vec<QueryError>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryData {
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct QueryError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

pub struct HttpGraphStore {
    http: Client,
    endpoint: String,
    user: String,
    password: String,
}

impl HttpGraphStore {
    pub fn new(uri: &str, user: &str, password: &str, database: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::GraphStore(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            endpoint: format!("{}/db/{}/query/v2", http_base_url(uri), database),
            user: user.to_string(),
            password: password.to_string(),
        })
    }

    /// Build the client and verify the endpoint answers `RETURN 1`.
    pub async fn connect(
        uri: &str,
        user: &str,
        password: &str,
        database: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let store = Self::new(uri, user, password, database, timeout)?;
        store.ping().await?;
        info!("Connected to Neo4j via HTTP API at {}", store.endpoint);
        Ok(store)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run one statement; rows come back as field-name maps.
    async fn execute(&self, statement: &str, parameters: Value) -> Result<Vec<Map<String, Value>>> {
        debug!("HTTP query: {}", statement);

        let response = self
            .http
            .post(&self.endpoint)
            .basic_auth(&self.user, Some(&self.password))
            .json(&QueryRequest {
                statement,
                parameters,
            })
            .send()
            .await
            .map_err(|e| Error::GraphStore(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::GraphStore(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let preview: String = text.chars().take(200).collect();
            return Err(Error::GraphStore(format!("HTTP {}: {}", status, preview)));
        }

        let parsed: QueryResponse = serde_json::from_str(&text)
            .map_err(|e| Error::GraphStore(format!("Invalid response: {}", e)))?;

        if let Some(err) = parsed.errors.first() {
            return Err(Error::GraphStore(format!("{}: {}", err.code, err.message)));
        }

        let data = parsed.data.unwrap_or_default();
        Ok(data
            .values
            .into_iter()
            .map(|row| data.fields.iter().cloned().zip(row).collect())
            .collect())
    }
}

fn node_from_row(row: &Map<String, Value>) -> Option<GraphNode> {
    Some(GraphNode {
        id: row.get("uid")?.as_str()?.to_string(),
        name: row
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        labels: row
            .get("labels")
            .and_then(Value::as_array)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|l| l.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default(),
        source: row.get("source").and_then(Value::as_str).map(str::to_string),
    })
}

#[async_trait]
impl GraphStore for HttpGraphStore {
    async fn ping(&self) -> Result<()> {
        self.execute(cypher::PING, json!({})).await.map(|_| ())
    }

    async fn create_node(&self, entity: &Entity, source: &str) -> Result<NodeId> {
        let uid = Uuid::new_v4().to_string();
        self.execute(
            &cypher::create_node(&entity.entity_type),
            json!({
                "uid": uid,
                "name": entity.name.trim(),
                "name_lower": normalize_name(&entity.name),
                "source": source,
                "document_id": entity.source_document_id,
            }),
        )
        .await?;
        Ok(uid)
    }

    async fn create_edge(&self, from: &NodeId, to: &NodeId, relation: &Relation) -> Result<bool> {
        let rows = self
            .execute(
                &cypher::create_edge(&relation.relation_type),
                json!({
                    "from": from,
                    "to": to,
                    "document_id": relation.source_document_id,
                }),
            )
            .await?;

        let created = rows
            .first()
            .and_then(|row| row.get("created"))
            .and_then(Value::as_i64)
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
        let rows = self
            .execute(
                statement,
                json!({ "keyword": normalize_name(keyword), "limit": limit }),
            )
            .await?;
        Ok(rows.iter().filter_map(node_from_row).collect())
    }

    async fn neighbors(&self, node: &NodeId, limit: usize) -> Result<Vec<Neighbor>> {
        let rows = self
            .execute(cypher::NEIGHBORS, json!({ "uid": node, "limit": limit }))
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let outgoing = row.get("outgoing").and_then(Value::as_bool).unwrap_or(true);
                Some(Neighbor {
                    edge_type: row.get("rel_type")?.as_str()?.to_string(),
                    direction: if outgoing {
                        Direction::Outgoing
                    } else {
                        Direction::Incoming
                    },
                    node: node_from_row(row)?,
                })
            })
            .collect())
    }

    async fn clear(&self) -> Result<()> {
        self.execute(cypher::CLEAR, json!({})).await.map(|_| ())
    }

    fn backend_name(&self) -> &'static str {
        "neo4j-http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn store(server: &MockServer) -> HttpGraphStore {
        HttpGraphStore::new(
            &server.base_url(),
            "neo4j",
            "secret",
            "neo4j",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn converts_bolt_uris_to_http() {
        assert_eq!(
            http_base_url("neo4j+s://abc.databases.neo4j.io"),
            "https://abc.databases.neo4j.io"
        );
        assert_eq!(http_base_url("neo4j://localhost:7474"), "http://localhost:7474");
        assert_eq!(http_base_url("bolt://localhost:7474/"), "http://localhost:7474");
        assert_eq!(http_base_url("https://host"), "https://host");
    }

    #[tokio::test]
    async fn find_nodes_maps_rows() {
        let server = MockServer::start_async().await;

        let query_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/db/neo4j/query/v2")
                .header_exists("authorization")
                .matches(|req| {
                    let body: Value = serde_json::from_slice(req.body().as_ref()).unwrap();
                    body["parameters"]["keyword"] == "acme"
                        && body["parameters"]["limit"] == 5
                        && body["statement"]
                            .as_str()
                            .is_some_and(|s| s.contains("n.name_lower = $keyword"))
                });
            then.status(202).json_body(json!({
                "data": {
                    "fields": ["uid", "name", "labels", "source"],
                    "values": [["u-1", "Acme", ["Organization"], "catalog.txt"]]
                }
            }));
        });

        let nodes = store(&server)
            .find_nodes("Acme", MatchMode::Exact, 5)
            .await
            .unwrap();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, "u-1");
        assert_eq!(nodes[0].labels, vec!["Organization".to_string()]);
        assert_eq!(nodes[0].source.as_deref(), Some("catalog.txt"));
        query_mock.assert_calls(1);
    }

    #[tokio::test]
    async fn neighbors_read_direction_flag() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(POST).path("/db/neo4j/query/v2");
            then.status(200).json_body(json!({
                "data": {
                    "fields": ["rel_type", "outgoing", "uid", "name", "labels", "source"],
                    "values": [
                        ["SUPPLIES", false, "u-2", "GreenPower", ["Organization"], null],
                        ["MAKES", true, "u-3", "Panel X", ["Product"], "a.txt"]
                    ]
                }
            }));
        });

        let neighbors = store(&server).neighbors(&"u-1".to_string(), 5).await.unwrap();

        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].direction, Direction::Incoming);
        assert_eq!(neighbors[0].node.source, None);
        assert_eq!(neighbors[1].edge_type, "MAKES");
        assert_eq!(neighbors[1].direction, Direction::Outgoing);
    }

    #[tokio::test]
    async fn create_edge_reads_created_count() {
        let server = MockServer::start_async().await;
        let relation = Relation {
            source: "Acme".into(),
            target: "Panel X".into(),
            relation_type: "makes".into(),
            source_document_id: "doc-1".into(),
        };

        let created = server.mock(|when, then| {
            when.method(POST)
                .path("/db/neo4j/query/v2")
                .body_includes("\"from\":\"u-1\"");
            then.status(202).json_body(json!({
                "data": { "fields": ["created"], "values": [[1]] }
            }));
        });
        let missing = server.mock(|when, then| {
            when.method(POST)
                .path("/db/neo4j/query/v2")
                .body_includes("\"from\":\"gone\"");
            then.status(202).json_body(json!({
                "data": { "fields": ["created"], "values": [[0]] }
            }));
        });

        let store = store(&server);
        assert!(store
            .create_edge(&"u-1".to_string(), &"u-2".to_string(), &relation)
            .await
            .unwrap());
        assert!(!store
            .create_edge(&"gone".to_string(), &"u-2".to_string(), &relation)
            .await
            .unwrap());

        created.assert_calls(1);
        missing.assert_calls(1);
    }

    #[tokio::test]
    async fn reports_query_errors() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(POST).path("/db/neo4j/query/v2");
            then.status(200).json_body(json!({
                "errors": [{ "code": "Neo.ClientError.Statement.SyntaxError", "message": "bad" }]
            }));
        });

        let err = store(&server).ping().await.unwrap_err();
        assert!(err.to_string().contains("SyntaxError"));
    }

    #[tokio::test]
    async fn reports_auth_failures() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(POST).path("/db/neo4j/query/v2");
            then.status(401).body("unauthorized");
        });

        let err = HttpGraphStore::connect(
            &server.base_url(),
            "neo4j",
            "wrong",
            "neo4j",
            Duration::from_secs(5),
        )
        .await
        .err()
        .unwrap();
        assert!(err.to_string().contains("HTTP 401"));
    }
}
