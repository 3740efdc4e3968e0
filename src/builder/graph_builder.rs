use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use super::extraction::EntityExtractor;
use super::resolver::{EntityResolver, RunScopedResolver};
use crate::config::BuilderConfig;
use crate::deadline::with_deadline;
use crate::graph::GraphConnector;
use crate::models::Document;
use crate::Result;

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Delete crate-owned graph content before the run
    pub clear_before_build: bool,
    /// Only the first N documents are processed
    pub max_documents: Option<usize>,
}

impl From<&BuilderConfig> for BuildOptions {
    fn from(config: &BuilderConfig) -> Self {
        Self {
            clear_before_build: config.clear_before_build,
            max_documents: config.max_documents,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub documents_processed: usize,
    pub documents_skipped: usize,
    pub entities_created: usize,
    pub relations_created: usize,
}

/// Populates the knowledge graph from documents, one extraction prompt per document.
pub struct GraphBuilder {
    extractor: EntityExtractor,
    graph: Arc<GraphConnector>,
    options: BuildOptions,
    extraction_timeout: Duration,
}

impl GraphBuilder {
    pub fn new(
        extractor: EntityExtractor,
        graph: Arc<GraphConnector>,
        options: BuildOptions,
        extraction_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            graph,
            options,
            extraction_timeout,
        }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Build with a fresh [`RunScopedResolver`].
    pub async fn build_graph(&self, documents: &[Document]) -> Result<BuildReport> {
        let mut resolver = RunScopedResolver::new();
        self.build_graph_with_resolver(documents, &mut resolver).await
    }

    /// A failed document (LLM error, malformed output, timeout, store write) is skipped and
    /// the run continues. Only a failed pre-build clear aborts.
    ///
    /// When a store write fails partway through a document, the nodes and edges already
    /// written stay in the graph and are still counted in the report.
    pub async fn build_graph_with_resolver(
        &self,
        documents: &[Document],
        resolver: &mut dyn EntityResolver,
    ) -> Result<BuildReport> {
        let limit = self.options.max_documents.unwrap_or(documents.len());
        let documents = &documents[..limit.min(documents.len())];
        let mut report = BuildReport::default();

        if !self.graph.is_available() {
            warn!("Knowledge graph unavailable, skipping graph build");
            report.documents_skipped = documents.len();
            return Ok(report);
        }

        if self.options.clear_before_build {
            self.graph.clear().await?;
            info!("Cleared existing graph content");
        }

        info!("Building knowledge graph from {} documents", documents.len());

        for document in documents {
            let extraction = with_deadline(
                "entity extraction",
                self.extraction_timeout,
                self.extractor
                    .extract_entities_and_relations(&document.text, &document.id),
            )
            .await;

            let extraction = match extraction {
                Ok(extraction) => extraction,
                Err(err) => {
                    warn!("Skipping document {}: {}", document.id, err);
                    report.documents_skipped += 1;
                    continue;
                }
            };

            match self
                .graph
                .upsert_entities_with(
                    &extraction.entities,
                    &extraction.relations,
                    document.source_label(),
                    resolver,
                )
                .await
            {
                Ok(counts) => {
                    report.documents_processed += 1;
                    report.entities_created += counts.nodes_created;
                    report.relations_created += counts.edges_created;
                }
                Err(partial) => {
                    warn!(
                        "Graph write failed for document {} after {} nodes: {}",
                        document.id, partial.written.nodes_created, partial.error
                    );
                    report.documents_skipped += 1;
                    report.entities_created += partial.written.nodes_created;
                    report.relations_created += partial.written.edges_created;
                }
            }
        }

        info!(
            "Graph build finished: {} processed, {} skipped, {} entities, {} relations",
            report.documents_processed,
            report.documents_skipped,
            report.entities_created,
            report.relations_created
        );
        Ok(report)
    }
}
