use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use tracing::{debug, info, warn};

use super::memory::MemoryGraphStore;
use super::neo4j::BoltGraphStore;
use super::neo4j_http::HttpGraphStore;
use super::store::{GraphStore, MatchMode, NodeId};
use super::subgraph::{Subgraph, Triple};
use crate::builder::resolver::{EntityResolver, RunScopedResolver};
use crate::config::{GraphBackendKind, GraphStoreConfig, TimeoutConfig};
use crate::deadline::with_deadline;
use crate::models::{Entity, Relation};
use crate::outcome::Outcome;
use crate::Result;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "who", "what", "where", "when", "why", "how", "which",
    "that", "this", "in", "on", "at", "to", "for", "of", "and", "or", "with", "from", "by",
];

/// Lookup limits for [`GraphConnector::query_subgraph`].
#[derive(Debug, Clone, Copy)]
pub struct QueryLimits {
    pub max_keywords: usize,
    pub nodes_per_keyword: usize,
    pub max_neighbors: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_keywords: 10,
            nodes_per_keyword: 5,
            max_neighbors: 5,
        }
    }
}

impl From<&GraphStoreConfig> for QueryLimits {
    fn from(config: &GraphStoreConfig) -> Self {
        Self {
            max_keywords: config.max_keywords,
            nodes_per_keyword: config.nodes_per_keyword,
            max_neighbors: config.max_neighbors,
        }
    }
}

/// Counts from one [`GraphConnector::upsert_entities`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertCounts {
    pub nodes_created: usize,
    pub edges_created: usize,
    pub relations_dropped: usize,
}

/// An upsert that stopped on a store error after writing `written`.
#[derive(Debug)]
pub struct PartialUpsert {
    pub written: UpsertCounts,
    pub error: crate::Error,
}

enum State {
    Available(Arc<dyn GraphStore>),
    Unavailable(String),
}

/// Graph handle that reports failures as [`Outcome::Degraded`] instead of errors.
pub struct GraphConnector {
    state: State,
    limits: QueryLimits,
    timeout: Duration,
}

impl GraphConnector {
    /// Try Bolt, then the HTTP Query API. Never fails; an unreachable server yields an
    /// unavailable connector.
    pub async fn connect(config: &GraphStoreConfig, timeouts: &TimeoutConfig) -> Self {
        let limits = QueryLimits::from(config);

        if config.backend == GraphBackendKind::Memory {
            info!("Using in-memory knowledge graph");
            return Self::new(Arc::new(MemoryGraphStore::new()), limits, timeouts.graph());
        }

        let Some(password) = config.password.as_deref().filter(|p| !p.is_empty()) else {
            return Self::unavailable("NEO4J_PASSWORD not set");
        };

        let bolt = with_deadline(
            "neo4j bolt connect",
            timeouts.connect(),
            BoltGraphStore::connect(&config.uri, &config.user, password, &config.database),
        )
        .await;

        let bolt_err = match bolt {
            Ok(store) => return Self::new(Arc::new(store), limits, timeouts.graph()),
            Err(err) => err,
        };
        warn!("Bolt connection failed: {}. Trying HTTP API fallback...", bolt_err);

        let http = with_deadline(
            "neo4j http connect",
            timeouts.connect(),
            HttpGraphStore::connect(
                &config.uri,
                &config.user,
                password,
                &config.database,
                timeouts.graph(),
            ),
        )
        .await;

        match http {
            Ok(store) => Self::new(Arc::new(store), limits, timeouts.graph()),
            Err(http_err) => Self::unavailable(format!(
                "Neo4j unreachable (bolt: {bolt_err}; http: {http_err})"
            )),
        }
    }

    pub fn new(store: Arc<dyn GraphStore>, limits: QueryLimits, timeout: Duration) -> Self {
        Self {
            state: State::Available(store),
            limits,
            timeout,
        }
    }

    /// In-memory graph with default limits.
    pub fn memory() -> Self {
        Self::new(
            Arc::new(MemoryGraphStore::new()),
            QueryLimits::default(),
            TimeoutConfig::default().graph(),
        )
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!("Knowledge graph unavailable: {}", reason);
        Self {
            state: State::Unavailable(reason),
            limits: QueryLimits::default(),
            timeout: TimeoutConfig::default().graph(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, State::Available(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            State::Unavailable(reason) => Some(reason),
            State::Available(_) => None,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match &self.state {
            State::Available(store) => store.backend_name(),
            State::Unavailable(_) => "unavailable",
        }
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    fn store(&self) -> Result<&Arc<dyn GraphStore>> {
        match &self.state {
            State::Available(store) => Ok(store),
            State::Unavailable(reason) => Err(crate::Error::GraphStore(reason.clone())),
        }
    }

    /// Remove crate-owned nodes and edges.
    pub async fn clear(&self) -> Result<()> {
        let store = self.store()?;
        with_deadline("graph clear", self.timeout, store.clear()).await
    }

    /// Create nodes and edges, deduplicating entities within this call.
    pub async fn upsert_entities(
        &self,
        entities: &[Entity],
        relations: &[Relation],
        source: &str,
    ) -> Result<UpsertCounts> {
        let mut resolver = RunScopedResolver::new();
        self.upsert_entities_with(entities, relations, source, &mut resolver)
            .await
            .map_err(|partial| partial.error)
    }

    /// Same as [`Self::upsert_entities`], with caller-owned identity resolution.
    ///
    /// Nodes written before a store failure stay registered in `resolver`; the error carries
    /// their counts.
    pub async fn upsert_entities_with(
        &self,
        entities: &[Entity],
        relations: &[Relation],
        source: &str,
        resolver: &mut dyn EntityResolver,
    ) -> std::result::Result<UpsertCounts, PartialUpsert> {
        let mut counts = UpsertCounts::default();
        let store = self.store().map_err(|error| PartialUpsert {
            written: counts,
            error,
        })?;

        for entity in entities {
            if entity.name.trim().is_empty() || resolver.resolve(&entity.name).await.is_some() {
                continue;
            }
            let id = with_deadline("graph create node", self.timeout, store.create_node(entity, source))
                .await
                .map_err(|error| PartialUpsert {
                    written: counts,
                    error,
                })?;
            resolver.register(&entity.name, id).await;
            counts.nodes_created += 1;
        }

        for relation in relations {
            let endpoints: (Option<NodeId>, Option<NodeId>) = (
                resolver.resolve(&relation.source).await,
                resolver.resolve(&relation.target).await,
            );
            let (Some(from), Some(to)) = endpoints else {
                debug!(
                    "Dropping relation {} -[{}]-> {}: unresolved endpoint",
                    relation.source, relation.relation_type, relation.target
                );
                counts.relations_dropped += 1;
                continue;
            };
            let created = with_deadline(
                "graph create edge",
                self.timeout,
                store.create_edge(&from, &to, relation),
            )
            .await
            .map_err(|error| PartialUpsert {
                written: counts,
                error,
            })?;

            if created {
                counts.edges_created += 1;
            } else {
                debug!(
                    "Relation {} -[{}]-> {} matched no stored endpoints",
                    relation.source, relation.relation_type, relation.target
                );
                counts.relations_dropped += 1;
            }
        }

        Ok(counts)
    }

    /// Keyword lookup plus depth-1 expansion around every matched node.
    pub async fn query_subgraph(&self, question: &str) -> Outcome<Subgraph> {
        let store = match &self.state {
            State::Available(store) => store,
            State::Unavailable(reason) => return Outcome::Degraded(reason.clone()),
        };

        let keywords = extract_keywords(question, self.limits.max_keywords);
        if keywords.is_empty() {
            return Outcome::Empty;
        }
        debug!("Graph keywords: {:?}", keywords);

        match with_deadline("graph query", self.timeout, self.collect(store.as_ref(), &keywords))
            .await
        {
            Ok(subgraph) if subgraph.is_empty() => Outcome::Empty,
            Ok(subgraph) => Outcome::Success(subgraph),
            Err(err) => {
                warn!("Graph query failed: {}", err);
                Outcome::Degraded(err.to_string())
            }
        }
    }

    async fn collect(&self, store: &dyn GraphStore, keywords: &[String]) -> Result<Subgraph> {
        let mut subgraph = Subgraph::default();
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut edges_seen = 0;

        for keyword in keywords {
            let mut nodes = store
                .find_nodes(keyword, MatchMode::Exact, self.limits.nodes_per_keyword)
                .await?;
            if nodes.is_empty() {
                nodes = store
                    .find_nodes(keyword, MatchMode::Contains, self.limits.nodes_per_keyword)
                    .await?;
            }

            let fresh: Vec<_> = nodes
                .into_iter()
                .filter(|node| seen.insert(node.id.clone()))
                .collect();
            let expansions = try_join_all(
                fresh
                    .iter()
                    .map(|node| store.neighbors(&node.id, self.limits.max_neighbors)),
            )
            .await?;

            for (node, neighbors) in fresh.into_iter().zip(expansions) {
                edges_seen += neighbors.len();
                subgraph.triples.extend(neighbors.into_iter().map(|n| Triple {
                    node_id: node.id.clone(),
                    node: node.name.clone(),
                    neighbor: n.node.name,
                    edge_type: n.edge_type,
                    direction: n.direction,
                }));
                subgraph.nodes.push(node);
            }
        }

        debug!(
            "Subgraph: {} nodes, {} neighbour edges",
            subgraph.nodes.len(),
            edges_seen
        );
        subgraph.normalize();
        Ok(subgraph)
    }
}

/// Lowercase word tokens minus stop words, longer than two characters, unique, in order.
pub fn extract_keywords(text: &str, max: usize) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut keywords: Vec<String> = Vec::new();

    let words = lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty());

    for word in words {
        if keywords.len() >= max {
            break;
        }
        if word.chars().count() <= 2 || STOP_WORDS.contains(&word) {
            continue;
        }
        if !keywords.iter().any(|k| k == word) {
            keywords.push(word.to_string());
        }
    }

    keywords
}
