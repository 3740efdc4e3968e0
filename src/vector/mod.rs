//! Vector similarity retrieval.
//!
//! The [`VectorStoreConnector`] fronts a Qdrant collection and degrades to an ephemeral
//! in-process index whenever the remote store cannot be reached at connect time.

pub mod connector;
pub mod local;
pub mod qdrant;

pub use connector::{VectorMode, VectorStoreConnector};
pub use local::{cosine_similarity, LocalIndex};
pub use qdrant::QdrantIndex;
