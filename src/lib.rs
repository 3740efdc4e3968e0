//! Hybrid retrieval engine
//!
//! Answers questions over a private document corpus by combining:
//! - a query router that picks a retrieval strategy per question
//! - dense vector search (Qdrant, or an in-process index when it is unreachable)
//! - knowledge-graph traversal (Neo4j over Bolt or HTTP, or an in-memory graph)
//! - LLM-driven entity and relation extraction to build the graph
//! - an orchestrator that merges both paths into one ordered context

pub mod answer;
pub mod builder;
pub mod chunker;
pub mod config;
pub mod deadline;
pub mod error;
pub mod graph;
pub mod integrations;
pub mod models;
pub mod outcome;
pub mod retriever;
pub mod router;
pub mod vector;

// Re-export common types
pub use config::Config;
pub use error::{Error, Result};
pub use models::{Chunk, Document, Entity, Relation};
pub use outcome::Outcome;
pub use retriever::{HybridRetriever, RetrievalContext};
pub use router::{QueryRouter, RouteDecision};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
