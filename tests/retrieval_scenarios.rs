//! End-to-end retrieval scenarios over in-process collaborators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use hybrid_rag::builder::{BuildOptions, EntityExtractor, GraphBuilder};
use hybrid_rag::graph::{
    GraphConnector, GraphNode, GraphStore, MatchMode, MemoryGraphStore, Neighbor, NodeId,
    QueryLimits,
};
use hybrid_rag::integrations::{CompletionClient, Embedder, LocalEmbedder};
use hybrid_rag::retriever::{FragmentOrigin, RetrieverOptions};
use hybrid_rag::vector::VectorStoreConnector;
use hybrid_rag::{
    Document, Entity, Error, HybridRetriever, Relation, Result, RouteDecision,
};

// ============================================================================
// Test doubles
// ============================================================================

/// Extraction model that answers from a fixed table keyed by document text.
struct CatalogLlm;

#[async_trait]
impl CompletionClient for CatalogLlm {
    async fn complete(&self, _system: &str, user: &str) -> Result<String> {
        let reply = if user.contains("manufactures") {
            r#"```json
{"entities":[{"name":"Acme","type":"Organization"},{"name":"Panel X","type":"Product"}],
 "relations":[{"source":"Acme","target":"Panel X","type":"MANUFACTURES"}]}
```"#
        } else {
            r#"{"entities":[{"name":"ACME","type":"Organization"},{"name":"GreenPower","type":"Organization"}],
"relations":[{"source":"GreenPower","target":"acme","type":"supplies"}]}"#
        };
        Ok(reply.to_string())
    }
}

struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(Error::Embedding("service unavailable".into()))
    }

    fn dimension(&self) -> usize {
        16
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Graph store whose every call fails, optionally after a delay.
struct BrokenGraphStore {
    delay: Option<Duration>,
}

impl BrokenGraphStore {
    async fn fail<T>(&self) -> Result<T> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Err(Error::GraphStore("connection reset".into()))
    }
}

#[async_trait]
impl GraphStore for BrokenGraphStore {
    async fn ping(&self) -> Result<()> {
        self.fail().await
    }

    async fn create_node(&self, _entity: &Entity, _source: &str) -> Result<NodeId> {
        self.fail().await
    }

    async fn create_edge(&self, _from: &NodeId, _to: &NodeId, _relation: &Relation) -> Result<bool> {
        self.fail().await
    }

    async fn find_nodes(
        &self,
        _keyword: &str,
        _mode: MatchMode,
        _limit: usize,
    ) -> Result<Vec<GraphNode>> {
        self.fail().await
    }

    async fn neighbors(&self, _node: &NodeId, _limit: usize) -> Result<Vec<Neighbor>> {
        self.fail().await
    }

    async fn clear(&self) -> Result<()> {
        self.fail().await
    }

    fn backend_name(&self) -> &'static str {
        "broken"
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn corpus() -> Vec<Document> {
    vec![
        Document::new("catalog", "Acme manufactures solar panel X. The price of panel X is 300 euros.")
            .with_metadata("source", "catalog.txt"),
        Document::new("suppliers", "GreenPower supplies cells to Acme since 2015.")
            .with_metadata("source", "suppliers.txt"),
        Document::new("warranty", "Every inverter ships with a ten year warranty."),
    ]
}

fn options(graph_enabled: bool, top_k: usize) -> RetrieverOptions {
    RetrieverOptions {
        graph_enabled,
        top_k,
        ..Default::default()
    }
}

fn retriever(graph: GraphConnector, top_k: usize) -> HybridRetriever {
    HybridRetriever::new(
        Arc::new(LocalEmbedder::new(128)),
        Arc::new(VectorStoreConnector::local("tests")),
        options(true, top_k),
    )
    .with_graph(Arc::new(graph))
    .with_llm(Arc::new(CatalogLlm))
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn scenario_a_factual_query_uses_vector_only() {
    let retriever = retriever(GraphConnector::memory(), 3);
    retriever.ingest(&corpus()).await.unwrap();

    let context = retriever.retrieve("What is the price of solar panel X?").await;

    assert_eq!(context.route, RouteDecision::Vector);
    assert_eq!(context.effective_route, RouteDecision::Vector);
    assert!(!context.is_empty());
    assert!(context.graph_fragment().is_none());
    assert!(context.fragments[0].text.contains("price of panel X"));
}

#[tokio::test]
async fn scenario_b_relational_query_without_matches_is_empty() {
    let retriever = retriever(GraphConnector::memory(), 3);
    retriever.ingest(&corpus()).await.unwrap();

    let context = retriever
        .retrieve("Why did the company change its pricing policy over time?")
        .await;

    assert_eq!(context.route, RouteDecision::Graph);
    assert_eq!(context.effective_route, RouteDecision::Graph);
    assert!(context.is_empty());
    assert!(context.notes.is_empty());
}

#[tokio::test]
async fn relational_query_with_matches_returns_subgraph() {
    let retriever = retriever(GraphConnector::memory(), 3);
    let report = retriever.ingest(&corpus()).await.unwrap();
    assert!(report.graph.is_some());

    let context = retriever.retrieve("history of GreenPower").await;

    assert_eq!(context.fragments.len(), 1);
    let fragment = context.graph_fragment().unwrap();
    assert!(fragment.text.starts_with("Knowledge Graph Context:"));
    assert!(fragment.text.contains("[Organization] GreenPower"));
    assert!(fragment.text.contains("-[SUPPLIES]-> Acme"));
}

#[tokio::test]
async fn scenario_c_unavailable_graph_degrades_session_to_vector() {
    let retriever = retriever(GraphConnector::unavailable("connection refused"), 3);
    assert!(!retriever.graph_active());

    let report = retriever.ingest(&corpus()).await.unwrap();
    assert!(report.graph.is_none());

    for query in ["tell me about Acme", "Why is the price of panel X high?"] {
        let context = retriever.retrieve(query).await;
        assert_eq!(context.route, RouteDecision::Hybrid);
        assert_eq!(context.effective_route, RouteDecision::Vector);
        assert!(!context.is_empty());
        assert!(context
            .fragments
            .iter()
            .all(|f| matches!(f.origin, FragmentOrigin::Vector { .. })));
    }
}

#[tokio::test]
async fn scenario_d_shared_entity_becomes_one_node() {
    let store = Arc::new(MemoryGraphStore::new());
    let graph = Arc::new(GraphConnector::new(
        store.clone(),
        QueryLimits::default(),
        Duration::from_secs(5),
    ));
    let builder = GraphBuilder::new(
        EntityExtractor::new(Arc::new(CatalogLlm)),
        graph.clone(),
        BuildOptions::default(),
        Duration::from_secs(5),
    );

    let documents = &corpus()[..2];
    let report = builder.build_graph(documents).await.unwrap();

    assert_eq!(report.documents_processed, 2);
    assert_eq!(report.entities_created, 3);
    assert_eq!(report.relations_created, 2);
    assert_eq!(store.node_count().await, 3);

    let acme = graph.query_subgraph("acme").await.success().unwrap();
    assert_eq!(acme.nodes.len(), 1);
    assert_eq!(acme.triples.len(), 2);

    let ids = store.document_ids().await;
    assert!(ids.iter().all(|id| id == "catalog" || id == "suppliers"));
    assert!(ids.iter().any(|id| id == "suppliers"));
}

// ============================================================================
// Degradation properties
// ============================================================================

#[tokio::test]
async fn failing_graph_store_degrades_hybrid_query() {
    let broken = GraphConnector::new(
        Arc::new(BrokenGraphStore { delay: None }),
        QueryLimits::default(),
        Duration::from_secs(5),
    );
    let retriever = retriever(broken, 2);
    retriever.ingest(&corpus()).await.unwrap();

    let context = retriever.retrieve("tell me about Acme").await;

    assert_eq!(context.effective_route, RouteDecision::Hybrid);
    assert!(!context.is_empty());
    assert!(context.graph_fragment().is_none());
    assert!(context.notes.iter().any(|n| n.contains("connection reset")));
}

#[tokio::test]
async fn slow_graph_store_times_out() {
    let slow = GraphConnector::new(
        Arc::new(BrokenGraphStore {
            delay: Some(Duration::from_secs(5)),
        }),
        QueryLimits::default(),
        Duration::from_millis(50),
    );

    let outcome = slow.query_subgraph("history of Acme").await;
    let reason = outcome.degraded_reason().unwrap();
    assert!(reason.contains("timed out"));
}

#[tokio::test]
async fn embedding_failure_yields_empty_context_not_error() {
    let retriever = HybridRetriever::new(
        Arc::new(FailingEmbedder),
        Arc::new(VectorStoreConnector::local("tests")),
        options(false, 3),
    );

    let report = retriever.ingest(&corpus()).await.unwrap();
    assert_eq!(report.vector_chunks, 0);
    assert!(!report.notes.is_empty());

    let context = retriever.retrieve("What is the price of panel X?").await;
    assert!(context.is_empty());
    assert!(context.notes.iter().any(|n| n.contains("embedding failed")));
}

#[tokio::test]
async fn vector_results_are_bounded_and_ordered() {
    let retriever = HybridRetriever::new(
        Arc::new(LocalEmbedder::new(128)),
        Arc::new(VectorStoreConnector::local("tests")),
        options(false, 2),
    );
    let documents: Vec<Document> = (0..8)
        .map(|i| Document::new(format!("doc-{i}"), format!("panel model {i} price {}", i * 100)))
        .collect();
    retriever.ingest(&documents).await.unwrap();

    let context = retriever.retrieve("price of panel model 3").await;
    let scores: Vec<f32> = context
        .vector_fragments()
        .map(|f| match f.origin {
            FragmentOrigin::Vector { score, .. } => score,
            FragmentOrigin::Graph { .. } => unreachable!(),
        })
        .collect();

    assert_eq!(scores.len(), 2);
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert!(scores.iter().all(|s| (-1.0..=1.0).contains(s)));
}

#[tokio::test]
async fn reingesting_does_not_duplicate_chunks() {
    let retriever = HybridRetriever::new(
        Arc::new(LocalEmbedder::new(64)),
        Arc::new(VectorStoreConnector::local("tests")),
        options(false, 10),
    );

    retriever.ingest(&corpus()).await.unwrap();
    retriever.ingest(&corpus()).await.unwrap();

    assert_eq!(retriever.vectors().local_len().await, Some(3));
}
