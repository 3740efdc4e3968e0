//! Command implementations
//!
//! Each module corresponds to a subcommand of the `hybrid_rag` CLI.

pub mod ingest;
pub mod query;
pub mod route;

pub use query::QueryArgs;
