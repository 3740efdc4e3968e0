//! LLM-driven entity and relation extraction.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::integrations::CompletionClient;
use crate::models::{Entity, Relation};
use crate::{Error, Result};

pub const EXTRACTION_SYSTEM_PROMPT: &str = "You extract a knowledge graph from text. \
Return only JSON of the form \
{\"entities\":[{\"name\":\"...\",\"type\":\"...\"}],\
\"relations\":[{\"source\":\"...\",\"target\":\"...\",\"type\":\"...\"}]}. \
Entity types are short nouns such as Organization, Person, Product, Location, Concept. \
Relation types are short verbs in UPPER_SNAKE_CASE. \
Every relation endpoint must be the name of a listed entity. No commentary.";

/// Longest document text (in chars) sent in one extraction prompt.
const MAX_PROMPT_CHARS: usize = 12_000;

/// Entities and relations pulled from one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct RawExtraction {
    #[serde(default)]
    entities: Vec<RawEntity>,
    #[serde(default)]
    relations: Vec<RawRelation>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    name: String,
    #[serde(default, rename = "type")]
    entity_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRelation {
    source: String,
    target: String,
    #[serde(default, rename = "type")]
    relation_type: Option<String>,
}

/// Strip Markdown code-fence markup (with or without a language tag) and any prose
/// around the fenced block. Unfenced replies are cut to the outermost `{...}`.
pub fn sanitize_llm_json(raw: &str) -> String {
    let text = raw.trim();

    let Some(open) = text.find("```") else {
        return match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if start < end => text[start..=end].to_string(),
            _ => text.to_string(),
        };
    };

    let after_fence = &text[open + 3..];
    // language tag runs to the end of the opening line
    let body = match after_fence.find('\n') {
        Some(newline)
            if after_fence[..newline]
                .trim()
                .chars()
                .all(|c| c.is_ascii_alphanumeric()) =>
        {
            &after_fence[newline + 1..]
        }
        _ => after_fence
            .trim_start_matches(|c: char| c.is_ascii_alphabetic())
            .trim_start(),
    };

    let body = match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    };

    body.trim().to_string()
}

/// Strict parse of sanitized extraction output.
pub fn parse_extraction(raw: &str, document_id: &str) -> Result<Extraction> {
    let cleaned = sanitize_llm_json(raw);
    let parsed: RawExtraction =
        serde_json::from_str(&cleaned).map_err(|e| Error::ExtractionParse(e.to_string()))?;

    let entities = parsed
        .entities
        .into_iter()
        .filter(|e| !e.name.trim().is_empty())
        .map(|e| Entity {
            name: e.name.trim().to_string(),
            entity_type: e
                .entity_type
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Entity".to_string()),
            source_document_id: document_id.to_string(),
        })
        .collect();

    let relations = parsed
        .relations
        .into_iter()
        .filter(|r| !r.source.trim().is_empty() && !r.target.trim().is_empty())
        .map(|r| Relation {
            source: r.source.trim().to_string(),
            target: r.target.trim().to_string(),
            relation_type: r.relation_type.unwrap_or_default(),
            source_document_id: document_id.to_string(),
        })
        .collect();

    Ok(Extraction {
        entities,
        relations,
    })
}

/// Runs the extraction prompt through a [`CompletionClient`].
#[derive(Clone)]
pub struct EntityExtractor {
    llm: Arc<dyn CompletionClient>,
}

impl EntityExtractor {
    pub fn new(llm: Arc<dyn CompletionClient>) -> Self {
        Self { llm }
    }

    /// One prompt per document; malformed output is [`Error::ExtractionParse`].
    pub async fn extract_entities_and_relations(
        &self,
        text: &str,
        document_id: &str,
    ) -> Result<Extraction> {
        let excerpt: String = text.chars().take(MAX_PROMPT_CHARS).collect();
        let prompt = format!("Text:\n{}", excerpt);

        let raw = self.llm.complete(EXTRACTION_SYSTEM_PROMPT, &prompt).await?;
        let extraction = parse_extraction(&raw, document_id)?;

        debug!(
            "Extracted {} entities, {} relations from {}",
            extraction.entities.len(),
            extraction.relations.len(),
            document_id
        );
        Ok(extraction)
    }
}
