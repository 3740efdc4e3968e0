//! Embedding generation: OpenAI-compatible service with a local fallback

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client as OpenAIClient,
};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::{Error, Result};

/// Longest input (in bytes) sent to the embedding API.
const MAX_INPUT_BYTES: usize = 8000;

/// Converts text into dense vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed several texts; output has one vector per input, in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("No embedding returned".to_string()))
    }

    /// Vector dimension produced by this embedder.
    fn dimension(&self) -> usize;

    fn name(&self) -> &str;
}

/// Pick the embedder described by configuration.
///
/// A missing API key for the remote provider falls back to [`LocalEmbedder`].
pub fn embedder_from_config(config: &EmbeddingConfig) -> Arc<dyn Embedder> {
    match config.provider {
        EmbeddingProvider::Local => Arc::new(LocalEmbedder::new(config.dimension)),
        EmbeddingProvider::OpenAi => match OpenAiEmbedder::from_config(config) {
            Ok(service) => {
                info!("Using remote embeddings ({})", service.model);
                Arc::new(service)
            }
            Err(err) => {
                warn!("Falling back to local embeddings ({err})");
                Arc::new(LocalEmbedder::new(config.dimension))
            }
        },
    }
}

/// Service for generating text embeddings
pub struct OpenAiEmbedder {
    client: OpenAIClient<OpenAIConfig>,
    model: String,
    /// Used for models this crate does not know the size of
    configured_dimension: usize,
}

impl OpenAiEmbedder {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("embedding API key not set".to_string()))?;

        let mut openai = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = &config.base_url {
            openai = openai.with_api_base(base);
        }

        Ok(Self {
            client: OpenAIClient::with_config(openai),
            model: config.model.clone(),
            configured_dimension: config.dimension,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        // Filter out empty texts and truncate long ones
        let processed: Vec<String> = texts
            .iter()
            .map(|t| truncate_bytes(t.trim(), MAX_INPUT_BYTES).to_string())
            .filter(|t| !t.is_empty())
            .collect();

        if processed.is_empty() {
            return Ok(vec![Vec::new(); texts.len()]);
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(processed))
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        debug!(
            "Generated {} embeddings, tokens used: {}",
            response.data.len(),
            response.usage.total_tokens
        );

        // Map back to original indices (empty texts get empty vectors)
        let mut result = Vec::with_capacity(texts.len());
        let mut embed_iter = response.data.into_iter();

        for text in texts {
            if text.trim().is_empty() {
                result.push(Vec::new());
            } else if let Some(embed) = embed_iter.next() {
                result.push(embed.embedding);
            }
        }

        if result.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                result.len()
            )));
        }

        Ok(result)
    }

    /// Known OpenAI models report their native size; anything else uses `embedding.dimension`.
    fn dimension(&self) -> usize {
        match self.model.as_str() {
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            "text-embedding-ada-002" => 1536,
            _ => self.configured_dimension,
        }
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Deterministic, fast hashing embedder for offline/local use.
#[derive(Debug, Clone)]
pub struct LocalEmbedder {
    dim: usize,
}

impl LocalEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(8) }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dim];
        for token in text.split_whitespace() {
            let token = token.trim_matches(|c: char| !c.is_alphanumeric());
            if token.is_empty() {
                continue;
            }
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let idx = (hasher.finish() as usize) % self.dim;
            vec[idx] += 1.0;
        }

        normalize(&mut vec);
        vec
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn name(&self) -> &str {
        "local-hash"
    }
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
}

fn truncate_bytes(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openai_config(model: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            api_key: Some("test_key".into()),
            model: model.into(),
            ..Default::default()
        }
    }

    #[test]
    fn dimension_returns_expected_values() {
        let default = OpenAiEmbedder::from_config(&openai_config("text-embedding-3-small")).unwrap();
        assert_eq!(default.dimension(), 1536);

        let large = OpenAiEmbedder::from_config(&openai_config("text-embedding-3-large")).unwrap();
        assert_eq!(large.dimension(), 3072);
    }

    #[test]
    fn unknown_models_use_configured_dimension() {
        let config = EmbeddingConfig {
            base_url: Some("http://localhost:11434/v1".into()),
            dimension: 768,
            ..openai_config("nomic-embed-text")
        };
        let service = OpenAiEmbedder::from_config(&config).unwrap();
        assert_eq!(service.dimension(), 768);

        let known = EmbeddingConfig {
            dimension: 768,
            ..openai_config("text-embedding-3-large")
        };
        assert_eq!(OpenAiEmbedder::from_config(&known).unwrap().dimension(), 3072);
    }

    #[test]
    fn missing_key_is_config_error() {
        let config = EmbeddingConfig {
            api_key: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(
            OpenAiEmbedder::from_config(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn factory_falls_back_to_local_without_key() {
        let config = EmbeddingConfig {
            api_key: None,
            dimension: 32,
            ..Default::default()
        };
        let embedder = embedder_from_config(&config);
        assert_eq!(embedder.name(), "local-hash");
        assert_eq!(embedder.dimension(), 32);
    }

    #[tokio::test]
    async fn embed_batch_short_circuits_on_empty_texts() {
        let service = OpenAiEmbedder::from_config(&openai_config("text-embedding-3-small")).unwrap();

        let embeddings = service
            .embed_batch(&["   ".to_string(), "\n".to_string()])
            .await
            .unwrap();

        assert_eq!(embeddings.len(), 2);
        assert!(embeddings.iter().all(|e| e.is_empty()));
    }

    #[test]
    fn local_embedder_produces_consistent_embeddings() {
        let embedder = LocalEmbedder::new(64);
        let text = "hello world rust programming";

        let emb1 = embedder.embed_text(text);
        let emb2 = embedder.embed_text(text);

        assert_eq!(emb1, emb2);
        assert_eq!(emb1.len(), 64);
    }

    #[test]
    fn local_embedder_ignores_case_and_punctuation() {
        let embedder = LocalEmbedder::new(64);
        assert_eq!(embedder.embed_text("Solar panel?"), embedder.embed_text("solar PANEL"));
    }

    #[test]
    fn local_embedder_respects_minimum_dimension() {
        assert_eq!(LocalEmbedder::new(0).dimension(), 8);
    }

    #[test]
    fn local_embedder_empty_text() {
        let emb = LocalEmbedder::new(32).embed_text("");
        assert_eq!(emb.len(), 32);
        assert!(emb.iter().all(|&v| v == 0.0));
    }

    #[tokio::test]
    async fn default_embed_uses_batch() {
        let embedder = LocalEmbedder::new(16);
        let single = embedder.embed("grid inverter").await.unwrap();
        assert_eq!(single, embedder.embed_text("grid inverter"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_bytes("abc", 10), "abc");
        assert_eq!(truncate_bytes("héllo", 2), "h");
    }
}
