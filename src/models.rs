//! Data model shared by the ingestion and retrieval paths.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Plain-text document handed over by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub source_metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source_metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.source_metadata.insert(key.into(), value.into());
        self
    }

    /// Source label used in graph nodes: `source` metadata, else the document id.
    pub fn source_label(&self) -> &str {
        self.source_metadata
            .get("source")
            .map(String::as_str)
            .unwrap_or(&self.id)
    }
}

/// Retrievable unit of text stored in the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable id; upserts with the same id replace each other
    pub id: String,
    pub document_id: String,
    pub text: String,
    /// Filled at ingestion, omitted from search results
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Cosine similarity to the query, filled at search time
    #[serde(default)]
    pub score: f32,
}

impl Chunk {
    pub fn new(
        id: impl Into<String>,
        document_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            document_id: document_id.into(),
            text: text.into(),
            embedding: Vec::new(),
            score: 0.0,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}

/// Named thing extracted from a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub entity_type: String,
    pub source_document_id: String,
}

impl Entity {
    /// Identity key within one build run.
    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Typed directed link between two entities, by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub target: String,
    pub relation_type: String,
    pub source_document_id: String,
}

/// Trim, collapse inner whitespace and lowercase an entity name.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Restrict a label or relationship type to `[A-Za-z0-9_]` so it can be spliced into
/// Cypher. Spaces and dashes become underscores; an empty result yields `fallback`.
pub fn sanitize_identifier(raw: &str, fallback: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '_' => Some(c),
            ' ' | '-' => Some('_'),
            _ => None,
        })
        .collect();
    let cleaned = cleaned.trim_matches('_').to_string();

    match cleaned.chars().next() {
        None => fallback.to_string(),
        Some(c) if c.is_ascii_digit() => format!("_{cleaned}"),
        Some(_) => cleaned,
    }
}

/// Relationship types are stored as `UPPER_SNAKE_CASE`.
pub fn normalize_relation_type(raw: &str) -> String {
    sanitize_identifier(raw, "RELATED_TO").to_uppercase()
}
