use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use crate::models::Chunk;

#[derive(Debug, Default)]
struct Entries {
    chunks: Vec<Chunk>,
    positions: HashMap<String, usize>,
}

/// Ephemeral brute-force cosine index.
///
/// Entries keep their first-insertion position, which is also the tie-break order for
/// equal scores.
#[derive(Debug, Default)]
pub struct LocalIndex {
    entries: RwLock<Entries>,
}

impl LocalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace chunks by id. Returns the number written.
    pub async fn upsert(&self, chunks: &[Chunk]) -> usize {
        let mut entries = self.entries.write().await;
        let mut written = 0;

        for chunk in chunks {
            if chunk.embedding.is_empty() {
                debug!("Skipping chunk {} without embedding", chunk.id);
                continue;
            }
            let mut stored = chunk.clone();
            stored.score = 0.0;

            match entries.positions.get(&chunk.id).copied() {
                Some(pos) => entries.chunks[pos] = stored,
                None => {
                    let pos = entries.chunks.len();
                    entries.positions.insert(chunk.id.clone(), pos);
                    entries.chunks.push(stored);
                }
            }
            written += 1;
        }

        written
    }

    /// Top-k chunks by descending cosine similarity.
    pub async fn search(&self, query: &[f32], top_k: usize) -> Vec<Chunk> {
        if top_k == 0 {
            return Vec::new();
        }

        let entries = self.entries.read().await;
        let mut scored: Vec<Chunk> = entries
            .chunks
            .iter()
            .map(|chunk| Chunk {
                id: chunk.id.clone(),
                document_id: chunk.document_id.clone(),
                text: chunk.text.clone(),
                embedding: Vec::new(),
                score: cosine_similarity(query, &chunk.embedding),
            })
            .collect();

        // stable sort keeps insertion order for ties
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        scored
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.chunks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}
