use std::time::Duration;

use tracing::{debug, info, warn};

use super::{LocalIndex, QdrantIndex};
use crate::config::{TimeoutConfig, VectorStoreConfig};
use crate::deadline::with_deadline;
use crate::models::Chunk;
use crate::outcome::Outcome;

/// How the connector is currently serving requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorMode {
    Remote,
    Degraded { reason: String },
}

enum Backend {
    Qdrant(QdrantIndex),
    Local(LocalIndex),
}

/// Handle over the vector index, remote when possible.
pub struct VectorStoreConnector {
    backend: Backend,
    mode: VectorMode,
    timeout: Duration,
}

impl VectorStoreConnector {
    /// Connect to Qdrant, or fall back to an in-process index. Never fails.
    pub async fn connect(
        config: &VectorStoreConfig,
        dimension: usize,
        timeouts: &TimeoutConfig,
    ) -> Self {
        let Some(url) = config.url.as_deref().filter(|u| !u.trim().is_empty()) else {
            return Self::local("vector store URL not configured");
        };

        let attempt = async {
            let index = QdrantIndex::new(
                url,
                config.api_key.as_deref(),
                &config.collection,
                dimension,
            )?;
            index.init_collection().await?;
            Ok::<_, crate::Error>(index)
        };

        match with_deadline("qdrant connect", timeouts.connect(), attempt).await {
            Ok(index) => {
                info!(
                    "Connected to Qdrant at {} (collection '{}')",
                    url,
                    index.collection()
                );
                Self {
                    backend: Backend::Qdrant(index),
                    mode: VectorMode::Remote,
                    timeout: timeouts.vector(),
                }
            }
            Err(err) => {
                let mut connector = Self::local(format!("Qdrant unreachable: {err}"));
                connector.timeout = timeouts.vector();
                connector
            }
        }
    }

    /// Ephemeral in-process index in degraded mode.
    pub fn local(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!("Vector store degraded to local index: {}", reason);
        Self {
            backend: Backend::Local(LocalIndex::new()),
            mode: VectorMode::Degraded { reason },
            timeout: TimeoutConfig::default().vector(),
        }
    }

    pub fn mode(&self) -> &VectorMode {
        &self.mode
    }

    pub fn is_remote(&self) -> bool {
        self.mode == VectorMode::Remote
    }

    /// Entries held by the local index; `None` when remote.
    pub async fn local_len(&self) -> Option<usize> {
        match &self.backend {
            Backend::Local(index) => Some(index.len().await),
            Backend::Qdrant(_) => None,
        }
    }

    /// Insert or replace chunks by id.
    pub async fn upsert(&self, chunks: &[Chunk]) -> Outcome<usize> {
        if chunks.is_empty() {
            return Outcome::Empty;
        }

        match &self.backend {
            Backend::Local(index) => match index.upsert(chunks).await {
                0 => Outcome::Empty,
                n => Outcome::Success(n),
            },
            Backend::Qdrant(index) => {
                match with_deadline("vector upsert", self.timeout, index.upsert(chunks)).await {
                    Ok(0) => Outcome::Empty,
                    Ok(n) => {
                        debug!("Upserted {} chunks", n);
                        Outcome::Success(n)
                    }
                    Err(err) => {
                        warn!("Vector upsert failed: {}", err);
                        Outcome::Degraded(err.to_string())
                    }
                }
            }
        }
    }

    /// Top-k chunks, best first.
    pub async fn search(&self, query_embedding: &[f32], top_k: usize) -> Outcome<Vec<Chunk>> {
        if top_k == 0 || query_embedding.is_empty() {
            return Outcome::Empty;
        }

        let hits = match &self.backend {
            Backend::Local(index) => index.search(query_embedding, top_k).await,
            Backend::Qdrant(index) => {
                match with_deadline(
                    "vector search",
                    self.timeout,
                    index.search(query_embedding, top_k),
                )
                .await
                {
                    Ok(hits) => hits,
                    Err(err) => {
                        warn!("Vector search failed: {}", err);
                        return Outcome::Degraded(err.to_string());
                    }
                }
            }
        };

        let mut hits = hits;
        hits.truncate(top_k);
        for hit in &mut hits {
            hit.score = hit.score.clamp(-1.0, 1.0);
        }
        Outcome::from_vec(hits)
    }
}
