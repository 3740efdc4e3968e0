//! Hybrid retriever: route a question, query the vector index and/or the knowledge
//! graph concurrently, and merge the hits into one ordered context.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::builder::{BuildOptions, BuildReport, EntityExtractor, GraphBuilder};
use crate::chunker::Chunker;
use crate::config::Config;
use crate::deadline::with_deadline;
use crate::graph::GraphConnector;
use crate::integrations::{embedder_from_config, ChatClient, CompletionClient, Embedder};
use crate::models::{Chunk, Document};
use crate::outcome::Outcome;
use crate::router::{QueryRouter, RouteDecision};
use crate::vector::VectorStoreConnector;
use crate::Result;

#[derive(Debug, Clone)]
pub struct RetrieverOptions {
    pub top_k: usize,
    /// Graph retrieval requested for this session
    pub graph_enabled: bool,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_batch_size: usize,
    pub embedding_timeout: Duration,
    pub extraction_timeout: Duration,
    pub build: BuildOptions,
}

impl Default for RetrieverOptions {
    fn default() -> Self {
        Self {
            top_k: 4,
            graph_enabled: false,
            chunk_size: 128,
            chunk_overlap: 16,
            embedding_batch_size: 48,
            embedding_timeout: Duration::from_secs(15),
            extraction_timeout: Duration::from_secs(60),
            build: BuildOptions::default(),
        }
    }
}

impl From<&Config> for RetrieverOptions {
    fn from(config: &Config) -> Self {
        Self {
            top_k: config.vector_store.top_k,
            graph_enabled: config.graph_store.enabled,
            chunk_size: config.chunking.size,
            chunk_overlap: config.chunking.overlap,
            embedding_batch_size: config.embedding.batch_size,
            embedding_timeout: config.timeouts.embedding(),
            extraction_timeout: config.timeouts.extraction(),
            build: BuildOptions::from(&config.builder),
        }
    }
}

/// Where a context fragment came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FragmentOrigin {
    Vector {
        chunk_id: String,
        document_id: String,
        score: f32,
    },
    Graph {
        nodes: usize,
        triples: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextFragment {
    pub text: String,
    pub origin: FragmentOrigin,
}

impl From<Chunk> for ContextFragment {
    fn from(chunk: Chunk) -> Self {
        Self {
            origin: FragmentOrigin::Vector {
                chunk_id: chunk.id,
                document_id: chunk.document_id,
                score: chunk.score,
            },
            text: chunk.text,
        }
    }
}

/// Ordered context for answer generation: vector chunks by descending score, then the
/// serialized subgraph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalContext {
    /// Decision made by the router
    pub route: RouteDecision,
    /// Branches actually queried
    pub effective_route: RouteDecision,
    pub fragments: Vec<ContextFragment>,
    /// Degraded branches, one line each
    pub notes: Vec<String>,
}

impl RetrievalContext {
    fn new(route: RouteDecision, effective_route: RouteDecision) -> Self {
        Self {
            route,
            effective_route,
            fragments: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn vector_fragments(&self) -> impl Iterator<Item = &ContextFragment> {
        self.fragments
            .iter()
            .filter(|f| matches!(f.origin, FragmentOrigin::Vector { .. }))
    }

    pub fn graph_fragment(&self) -> Option<&ContextFragment> {
        self.fragments
            .iter()
            .find(|f| matches!(f.origin, FragmentOrigin::Graph { .. }))
    }

    /// Fragments joined by blank lines.
    pub fn joined_text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub vector_chunks: usize,
    pub graph: Option<BuildReport>,
    /// Batches that could not be embedded or stored
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Session-scoped orchestrator over the router and both connectors.
pub struct HybridRetriever {
    router: QueryRouter,
    embedder: Arc<dyn Embedder>,
    vectors: Arc<VectorStoreConnector>,
    graph: Option<Arc<GraphConnector>>,
    llm: Option<Arc<dyn CompletionClient>>,
    options: RetrieverOptions,
}

impl HybridRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vectors: Arc<VectorStoreConnector>,
        options: RetrieverOptions,
    ) -> Self {
        Self {
            router: QueryRouter::new(),
            embedder,
            vectors,
            graph: None,
            llm: None,
            options,
        }
    }

    /// Attach the graph connector. An unavailable connector puts the session in
    /// vector-only mode; the warning is logged here, once.
    pub fn with_graph(mut self, graph: Arc<GraphConnector>) -> Self {
        if self.options.graph_enabled {
            if let Some(reason) = graph.unavailable_reason() {
                warn!(
                    "Graph retrieval requested but unavailable ({}); continuing vector-only",
                    reason
                );
            }
        }
        self.graph = Some(graph);
        self
    }

    pub fn with_router(mut self, router: QueryRouter) -> Self {
        self.router = router;
        self
    }

    /// Completion client used for entity extraction during [`Self::ingest`].
    pub fn with_llm(mut self, llm: Arc<dyn CompletionClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Wire every component from configuration. Connectors degrade instead of failing;
    /// only an invalid routing table is an error.
    pub async fn connect(config: &Config) -> Result<Self> {
        let router = QueryRouter::from_config(&config.routing)?;
        let embedder = embedder_from_config(&config.embedding);
        let vectors = VectorStoreConnector::connect(
            &config.vector_store,
            embedder.dimension(),
            &config.timeouts,
        )
        .await;

        let mut retriever = Self::new(embedder, Arc::new(vectors), RetrieverOptions::from(config))
            .with_router(router);

        match ChatClient::from_config(&config.llm) {
            Ok(client) => retriever = retriever.with_llm(Arc::new(client)),
            Err(err) => debug!("No completion client: {}", err),
        }

        if config.graph_store.enabled {
            let graph = GraphConnector::connect(&config.graph_store, &config.timeouts).await;
            retriever = retriever.with_graph(Arc::new(graph));
        }

        Ok(retriever)
    }

    pub fn router(&self) -> &QueryRouter {
        &self.router
    }

    pub fn vectors(&self) -> &VectorStoreConnector {
        &self.vectors
    }

    pub fn graph(&self) -> Option<&GraphConnector> {
        self.graph.as_deref()
    }

    pub fn llm(&self) -> Option<Arc<dyn CompletionClient>> {
        self.llm.clone()
    }

    /// Graph path usable for this session.
    pub fn graph_active(&self) -> bool {
        self.options.graph_enabled && self.graph.as_ref().is_some_and(|g| g.is_available())
    }

    /// Route actually served once graph availability is taken into account.
    pub fn effective_route(&self, route: RouteDecision) -> RouteDecision {
        if self.graph_active() {
            route
        } else {
            RouteDecision::Vector
        }
    }

    /// Route the query and retrieve. Never fails; degraded branches are listed in
    /// [`RetrievalContext::notes`].
    pub async fn retrieve(&self, query: &str) -> RetrievalContext {
        let route = self.router.route(query);
        self.retrieve_with_route(query, route).await
    }

    /// Retrieve with an explicit route, bypassing the router.
    pub async fn retrieve_with_route(&self, query: &str, route: RouteDecision) -> RetrievalContext {
        let effective = self.effective_route(route);
        let mut context = RetrievalContext::new(route, effective);
        debug!("Query routed to {} (serving {})", route, effective);

        if effective != route {
            context
                .notes
                .push(format!("graph path unavailable; {route} query served by vector path"));
        }

        let vector_branch = async {
            if effective.uses_vector() {
                Some(self.search_vectors(query).await)
            } else {
                None
            }
        };
        let graph_branch = async {
            match (&self.graph, effective.uses_graph()) {
                (Some(graph), true) => Some(graph.query_subgraph(query).await),
                _ => None,
            }
        };

        let (vector_hits, subgraph) = tokio::join!(vector_branch, graph_branch);

        match vector_hits {
            Some(Outcome::Success(chunks)) => {
                context
                    .fragments
                    .extend(chunks.into_iter().map(ContextFragment::from));
            }
            Some(Outcome::Degraded(reason)) => context.notes.push(format!("vector: {reason}")),
            Some(Outcome::Empty) | None => {}
        }

        match subgraph {
            Some(Outcome::Success(subgraph)) => context.fragments.push(ContextFragment {
                text: subgraph.to_context(),
                origin: FragmentOrigin::Graph {
                    nodes: subgraph.nodes.len(),
                    triples: subgraph.triples.len(),
                },
            }),
            Some(Outcome::Degraded(reason)) => context.notes.push(format!("graph: {reason}")),
            Some(Outcome::Empty) | None => {}
        }

        info!(
            "Retrieved {} fragments (route {}, served {})",
            context.fragments.len(),
            route,
            effective
        );
        context
    }

    async fn search_vectors(&self, query: &str) -> Outcome<Vec<Chunk>> {
        if query.trim().is_empty() {
            return Outcome::Empty;
        }

        let embedding = match with_deadline(
            "query embedding",
            self.options.embedding_timeout,
            self.embedder.embed(query),
        )
        .await
        {
            Ok(embedding) => embedding,
            Err(err) => {
                warn!("Query embedding failed: {}", err);
                return Outcome::Degraded(format!("embedding failed: {err}"));
            }
        };

        self.vectors.search(&embedding, self.options.top_k).await
    }

    /// Chunk, embed and upsert documents, then build the graph when the graph path and an
    /// extraction model are available.
    pub async fn ingest(&self, documents: &[Document]) -> Result<IngestReport> {
        let chunker = Chunker::new(self.options.chunk_size, self.options.chunk_overlap);
        let chunks: Vec<Chunk> = documents.iter().flat_map(|d| chunker.chunk(d)).collect();
        info!(
            "Ingesting {} documents as {} chunks",
            documents.len(),
            chunks.len()
        );

        let mut report = IngestReport::default();
        let batch_size = self.options.embedding_batch_size.max(1);

        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = match with_deadline(
                "chunk embedding",
                self.options.embedding_timeout,
                self.embedder.embed_batch(&texts),
            )
            .await
            {
                Ok(embeddings) => embeddings,
                Err(err) => {
                    warn!("Skipping batch of {} chunks: {}", batch.len(), err);
                    report.notes.push(format!("embedding: {err}"));
                    continue;
                }
            };

            let embedded: Vec<Chunk> = batch
                .iter()
                .cloned()
                .zip(embeddings)
                .map(|(chunk, embedding)| chunk.with_embedding(embedding))
                .collect();

            match self.vectors.upsert(&embedded).await {
                Outcome::Success(n) => report.vector_chunks += n,
                Outcome::Empty => {}
                Outcome::Degraded(reason) => report.notes.push(format!("vector: {reason}")),
            }
        }

        match (self.graph_active(), &self.graph, &self.llm) {
            (true, Some(graph), Some(llm)) => {
                let builder = GraphBuilder::new(
                    EntityExtractor::new(llm.clone()),
                    graph.clone(),
                    self.options.build.clone(),
                    self.options.extraction_timeout,
                );
                report.graph = Some(builder.build_graph(documents).await?);
            }
            (true, _, None) => {
                warn!("No LLM client configured, skipping graph build");
                report
                    .notes
                    .push("graph: build skipped, no LLM client configured for extraction".into());
            }
            _ => {}
        }

        Ok(report)
    }
}
