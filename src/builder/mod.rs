//! Knowledge-graph construction from documents.

pub mod extraction;
pub mod graph_builder;
pub mod resolver;

pub use extraction::{parse_extraction, sanitize_llm_json, EntityExtractor, Extraction};
pub use graph_builder::{BuildOptions, BuildReport, GraphBuilder};
pub use resolver::{EntityResolver, RunScopedResolver};
