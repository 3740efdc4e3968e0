use crate::models::{Chunk, Document};

/// Word-window chunker with overlap.
///
/// Chunk ids are `"{document_id}#{index}"`, so re-ingesting an unchanged document
/// produces the same ids and the vector upsert replaces rather than duplicates.
#[derive(Debug, Clone)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a new chunker.
    pub fn new(size: usize, overlap: usize) -> Self {
        Self {
            size: size.max(1),
            overlap: overlap.min(size.saturating_sub(1)),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split a document into overlapping chunks.
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let words: Vec<&str> = document.text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }

        let step = self.size.saturating_sub(self.overlap).max(1);
        let mut chunks = Vec::new();
        let mut idx = 0;

        while idx < words.len() {
            let end = (idx + self.size).min(words.len());
            let id = format!("{}#{}", document.id, chunks.len());
            chunks.push(Chunk::new(id, document.id.clone(), words[idx..end].join(" ")));

            if end == words.len() {
                break;
            }
            idx += step;
        }

        chunks
    }
}
