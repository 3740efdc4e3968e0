//! Hybrid RAG CLI - main entry point

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hybrid_rag::commands::{self, QueryArgs};
use hybrid_rag::Config;

#[derive(Parser)]
#[command(name = "hybrid_rag")]
#[command(about = "Hybrid vector + knowledge-graph retrieval over private documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config.yml (defaults to ./config.yml, then ../config.yml, then environment)
    #[arg(long, global = true, env = "HYBRID_RAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how a question would be routed
    Route {
        query: String,

        /// Print the explanation as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Index files into the vector store and build the knowledge graph
    Ingest {
        /// Files or directories (.txt, .md, .json, .csv)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Retrieve context for a question
    Query {
        query: String,

        /// Files to ingest first (the local fallback index lives only for this run)
        #[arg(long, num_args = 1..)]
        docs: Vec<PathBuf>,

        /// Force a route: vector | graph | hybrid (aliases: qdrant, naive, neo4j, local, global)
        #[arg(long)]
        mode: Option<String>,

        /// Generate an answer from the retrieved context
        #[arg(long, default_value_t = false)]
        answer: bool,

        /// Number of vector hits
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print context (and answer) as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hybrid_rag=info".parse()?))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => Config::new(),
    };

    execute_command(&config, cli.command).await
}

async fn execute_command(config: &Config, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Route { query, json } => {
            commands::route::run(config, &query, json)?;
        }
        Commands::Ingest { paths } => {
            commands::ingest::run(config, &paths).await?;
        }
        Commands::Query {
            query,
            docs,
            mode,
            answer,
            top_k,
            json,
        } => {
            let args = QueryArgs {
                query,
                docs,
                mode,
                answer,
                top_k,
                json,
            };
            commands::query::run(config, args).await?;
        }
    }
    Ok(())
}
