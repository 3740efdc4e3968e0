//! Integration tests for the hybrid_rag library
//!
//! These tests verify the public API and module interactions.

use std::io::Write;

use hybrid_rag::{
    builder::sanitize_llm_json,
    chunker::Chunker,
    config::{Config, GraphBackendKind},
    error::{Error, Result},
    models::Document,
    router::{QueryRouter, RouteDecision},
};

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_yaml_sections() {
    let yaml = r#"
llm:
  model: llama-test
chunking:
  size: 64
  overlap: 8
vector_store:
  collection: catalog
  top_k: 6
graph_store:
  enabled: true
  backend: memory
routing:
  factual_patterns: ['\bvoltage\b']
builder:
  clear_before_build: true
  max_documents: 50
timeouts:
  graph_ms: 250
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.llm.model, "llama-test");
    assert_eq!(config.chunking.size, 64);
    assert_eq!(config.vector_store.collection, "catalog");
    assert_eq!(config.vector_store.top_k, 6);
    assert!(config.graph_store.enabled);
    assert_eq!(config.graph_store.backend, GraphBackendKind::Memory);
    assert_eq!(config.graph_store.max_keywords, 10);
    assert_eq!(config.builder.max_documents, Some(50));
    assert_eq!(config.timeouts.graph().as_millis(), 250);
    assert_eq!(config.timeouts.vector().as_millis(), 10_000);
}

#[test]
fn test_config_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "vector_store:\n  top_k: 9").unwrap();

    let config = Config::load_from_file(file.path()).unwrap();
    assert_eq!(config.vector_store.top_k, 9);
}

// ============================================================================
// Error Tests
// ============================================================================

#[test]
fn test_error_types() {
    let parse = Error::ExtractionParse("expected value".into());
    assert!(parse.to_string().contains("extraction output"));

    let timeout = Error::Timeout {
        operation: "graph query",
        millis: 10,
    };
    assert!(timeout.is_timeout());
    assert_eq!(timeout.to_string(), "graph query timed out after 10ms");
}

#[test]
fn test_result_type() {
    fn returns_ok() -> Result<i32> {
        Ok(42)
    }

    fn returns_err() -> Result<i32> {
        Err(Error::InvalidArgument("bad".to_string()))
    }

    assert_eq!(returns_ok().unwrap(), 42);
    assert!(returns_err().is_err());
}

// ============================================================================
// Router Tests
// ============================================================================

#[test]
fn test_router_scenarios() {
    let router = QueryRouter::new();

    assert_eq!(
        router.route("What is the price of solar panel X?"),
        RouteDecision::Vector
    );
    assert_eq!(
        router.route("Why did the company change its pricing policy over time?"),
        RouteDecision::Graph
    );
    assert_eq!(router.route(""), RouteDecision::Hybrid);
}

#[test]
fn test_router_is_deterministic() {
    let router = QueryRouter::new();
    let query = "Compare the warranty of panel X and panel Y";
    let first = router.route(query);
    for _ in 0..10 {
        assert_eq!(router.route(query), first);
    }
}

// ============================================================================
// Chunker Tests
// ============================================================================

#[test]
fn test_chunker_basic() {
    let chunker = Chunker::new(5, 2);
    let doc = Document::new("doc", "one two three four five six seven eight nine ten");
    let chunks = chunker.chunk(&doc);

    assert!(!chunks.is_empty());
    assert_eq!(chunks[0].text, "one two three four five");
    assert!(chunks.iter().all(|c| c.document_id == "doc"));
}

#[test]
fn test_chunker_covers_every_word() {
    let chunker = Chunker::new(3, 1);
    let doc = Document::new("doc", "a b c d e f g");
    let chunks = chunker.chunk(&doc);

    let last = chunks.last().unwrap();
    assert!(last.text.ends_with('g'));
}

// ============================================================================
// Sanitizer Tests
// ============================================================================

#[test]
fn test_sanitizer_handles_common_reply_shapes() {
    let json = r#"{"entities":[],"relations":[]}"#;
    for raw in [
        json.to_string(),
        format!("```json\n{json}\n```"),
        format!("```\n{json}\n```"),
        format!("Here you go:\n```json\n{json}\n```"),
    ] {
        assert_eq!(sanitize_llm_json(&raw), json, "{raw}");
    }
}
