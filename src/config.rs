//! Configuration for the retrieval engine
//!
//! Loads configuration from config.yml file. This is the only place in the crate that
//! reads the process environment; everything downstream receives a resolved [`Config`].

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::{Error, Result};

/// Default config file name, looked up in the working directory and its parent.
pub const CONFIG_FILE: &str = "config.yml";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_COLLECTION: &str = "documents";
pub const DEFAULT_NEO4J_URI: &str = "bolt://localhost:7687";

/// Main configuration struct
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub chunking: ChunkingConfig,
    pub vector_store: VectorStoreConfig,
    pub graph_store: GraphStoreConfig,
    pub routing: RoutingConfig,
    pub builder: BuilderConfig,
    pub timeouts: TimeoutConfig,
}

/// Chat-completion service used for entity extraction and answers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            temperature: 0.0,
            max_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    OpenAi,
    Local,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub api_key: Option<String>,
    /// Override for OpenAI-compatible endpoints
    pub base_url: Option<String>,
    pub model: String,
    /// Vector size for the local hashing embedder and for remote models other than the
    /// OpenAI `text-embedding-*` family
    pub dimension: usize,
    /// Texts per embedding request during ingestion
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAi,
            api_key: None,
            base_url: None,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: 256,
            batch_size: 48,
        }
    }
}

/// Word-window chunking applied at ingestion.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: 128,
            overlap: 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// Qdrant gRPC URL; `None` means the ephemeral local index is used
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub collection: String,
    pub top_k: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            collection: DEFAULT_COLLECTION.to_string(),
            top_k: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphBackendKind {
    Neo4j,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphStoreConfig {
    /// Graph retrieval requested for this session
    pub enabled: bool,
    pub backend: GraphBackendKind,
    pub uri: String,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    pub max_keywords: usize,
    pub nodes_per_keyword: usize,
    pub max_neighbors: usize,
}

impl Default for GraphStoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: GraphBackendKind::Neo4j,
            uri: DEFAULT_NEO4J_URI.to_string(),
            user: "neo4j".to_string(),
            password: None,
            database: "neo4j".to_string(),
            max_keywords: 10,
            nodes_per_keyword: 5,
            max_neighbors: 5,
        }
    }
}

/// Extra routing patterns appended to the built-in rule table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub factual_patterns: Vec<String>,
    pub relational_patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    pub clear_before_build: bool,
    pub max_documents: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect_ms: u64,
    pub embedding_ms: u64,
    pub vector_ms: u64,
    pub graph_ms: u64,
    pub extraction_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 5_000,
            embedding_ms: 15_000,
            vector_ms: 10_000,
            graph_ms: 10_000,
            extraction_ms: 60_000,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn embedding(&self) -> Duration {
        Duration::from_millis(self.embedding_ms)
    }

    pub fn vector(&self) -> Duration {
        Duration::from_millis(self.vector_ms)
    }

    pub fn graph(&self) -> Duration {
        Duration::from_millis(self.graph_ms)
    }

    pub fn extraction(&self) -> Duration {
        Duration::from_millis(self.extraction_ms)
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults
    /// Environment variables take precedence over config.yml values
    pub fn new() -> Self {
        Self::load_from_file(CONFIG_FILE)
            .or_else(|_| Self::load_from_file(format!("../{CONFIG_FILE}")))
            .unwrap_or_else(|_| Self::from_env())
    }

    /// Defaults with secrets and endpoints taken from the environment only.
    pub fn from_env() -> Self {
        Self::load_dotenv();
        let mut config = Self::default();
        config.resolve_env();
        config
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut config = Self::from_yaml(&content)?;
        config.resolve_env();
        Ok(config)
    }

    /// Parse YAML without touching the environment.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        // Try to load from current directory first, then parent
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    fn resolve_env(&mut self) {
        self.llm.api_key = resolve_env_string(self.llm.api_key.take(), "GROQ_API_KEY");
        self.embedding.api_key =
            resolve_env_string(self.embedding.api_key.take(), "OPENAI_API_KEY");
        self.vector_store.url = resolve_env_string(self.vector_store.url.take(), "QDRANT_URL");
        self.vector_store.api_key =
            resolve_env_string(self.vector_store.api_key.take(), "QDRANT_API_KEY");
        self.graph_store.password =
            resolve_env_string(self.graph_store.password.take(), "NEO4J_PASSWORD");

        if let Some(uri) = resolve_env_string(Some(self.graph_store.uri.clone()), "NEO4J_URI") {
            self.graph_store.uri = uri;
        }
        if let Some(user) = resolve_env_string(Some(self.graph_store.user.clone()), "NEO4J_USER") {
            self.graph_store.user = user;
        }
    }
}

/// Resolve a value: `${VAR}` placeholders read `VAR`, missing values fall back to `env_key`.
fn resolve_env_string(value: Option<String>, env_key: &str) -> Option<String> {
    if let Some(ref v) = value {
        if v.starts_with("${") && v.ends_with('}') {
            let var_name = &v[2..v.len() - 1];
            return std::env::var(var_name)
                .ok()
                .or_else(|| std::env::var(env_key).ok())
                .filter(|s| !s.trim().is_empty());
        }
        if !v.trim().is_empty() {
            return value;
        }
    }
    std::env::var(env_key).ok().filter(|s| !s.trim().is_empty())
}
