//! Plain-text document loading and the `ingest` subcommand.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::models::Document;
use crate::retriever::HybridRetriever;

/// Extensions read as UTF-8 text.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "json", "csv"];

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Read files (directories are walked recursively) into documents.
///
/// The document id is the path as given; `source` metadata is the file name.
pub fn load_documents(paths: &[PathBuf]) -> Result<Vec<Document>> {
    let ingested_at = Utc::now().to_rfc3339();
    let mut documents = Vec::new();

    for root in paths {
        if !root.exists() {
            anyhow::bail!("path not found: {}", root.display());
        }

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if !is_supported(path) {
                debug!("Skipping unsupported file {}", path.display());
                continue;
            }

            let text = match fs::read_to_string(path) {
                Ok(text) => text,
                Err(err) => {
                    warn!("Skipping {}: {}", path.display(), err);
                    continue;
                }
            };
            if text.trim().is_empty() {
                continue;
            }

            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".to_string());

            documents.push(
                Document::new(path.display().to_string(), text)
                    .with_metadata("source", file_name)
                    .with_metadata("ingested_at", ingested_at.clone()),
            );
        }
    }

    Ok(documents)
}

pub async fn run(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let documents = load_documents(paths)?;
    if documents.is_empty() {
        println!("No documents found.");
        return Ok(());
    }
    info!("Loaded {} documents", documents.len());

    let retriever = HybridRetriever::connect(config)
        .await
        .context("failed to initialise retriever")?;
    let report = retriever.ingest(&documents).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
