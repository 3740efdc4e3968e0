//! External language-model integrations.
//!
//! Provides clients for:
//! - embeddings (OpenAI-compatible API, or a deterministic local fallback)
//! - chat completions (OpenAI-compatible API such as Groq), used for entity extraction
//!   and answer synthesis
//!
//! Both are consumed through traits so the retrieval core can be tested without network.

pub mod embeddings;
pub mod openai;

pub use embeddings::{embedder_from_config, Embedder, LocalEmbedder, OpenAiEmbedder};
pub use openai::{ChatClient, ChatMessage, CompletionClient};
