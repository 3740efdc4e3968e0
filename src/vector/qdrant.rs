//! Vector index backed by Qdrant

use std::collections::HashMap;

use qdrant_client::qdrant::{
    value::Kind, CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::Chunk;
use crate::Result;

/// Qdrant collection holding chunk embeddings.
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantIndex {
    /// Build a client. No network traffic happens until [`Self::init_collection`].
    pub fn new(url: &str, api_key: Option<&str>, collection: &str, dimension: usize) -> Result<Self> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key.to_string());
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            dimension,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Health check, then create the collection if it doesn't exist
    pub async fn init_collection(&self) -> Result<()> {
        self.client.health_check().await?;

        if self.client.collection_exists(self.collection.clone()).await? {
            debug!("Collection '{}' already exists", self.collection);
            return Ok(());
        }

        info!("Creating collection '{}'", self.collection);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                ),
            )
            .await?;

        info!("Collection created successfully");
        Ok(())
    }

    /// Upsert chunks; point ids derive from chunk ids, so repeats overwrite.
    pub async fn upsert(&self, chunks: &[Chunk]) -> Result<usize> {
        let points: Vec<PointStruct> = chunks
            .iter()
            .filter(|chunk| !chunk.embedding.is_empty())
            .map(|chunk| {
                let mut payload: HashMap<String, QdrantValue> = HashMap::new();
                payload.insert("chunk_id".into(), chunk.id.clone().into());
                payload.insert("document_id".into(), chunk.document_id.clone().into());
                payload.insert("text".into(), chunk.text.clone().into());

                PointStruct::new(
                    point_id(&chunk.id).to_string(),
                    chunk.embedding.clone(),
                    payload,
                )
            })
            .collect();

        if points.is_empty() {
            return Ok(0);
        }

        let count = points.len();
        debug!("Upserting {} points to Qdrant", count);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await?;

        Ok(count)
    }

    /// Nearest neighbours by cosine similarity, best first.
    pub async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<Chunk>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let request =
            SearchPointsBuilder::new(&self.collection, query_embedding.to_vec(), top_k as u64)
                .with_payload(true);

        let response = self.client.search_points(request).await?;

        let mut chunks: Vec<Chunk> = response
            .result
            .into_iter()
            .filter_map(|point| {
                let payload = point.payload;
                Some(Chunk {
                    id: payload.get("chunk_id")?.as_text()?.to_string(),
                    document_id: payload.get("document_id")?.as_text()?.to_string(),
                    text: payload.get("text")?.as_text()?.to_string(),
                    embedding: Vec::new(),
                    score: point.score,
                })
            })
            .collect();

        chunks.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(chunks)
    }
}

/// Qdrant only accepts integer or UUID point ids.
pub fn point_id(chunk_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_bytes())
}

trait QdrantValueExt {
    fn as_text(&self) -> Option<&str>;
}

impl QdrantValueExt for QdrantValue {
    fn as_text(&self) -> Option<&str> {
        match &self.kind {
            Some(Kind::StringValue(v)) => Some(v),
            _ => None,
        }
    }
}
