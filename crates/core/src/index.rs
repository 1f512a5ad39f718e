use crate::{DocumentChunk, PipelineError, ScoredChunk};

pub trait VectorIndex: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector length shared by every entry, 0 when empty.
    fn dimensions(&self) -> usize;

    fn query(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>, PipelineError>;
}

#[derive(Debug, Clone)]
struct IndexEntry {
    chunk: DocumentChunk,
    vector: Vec<f32>,
    norm: f32,
}

/// Exact cosine-similarity index built once from the whole corpus.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVectorIndex {
    entries: Vec<IndexEntry>,
    dimensions: usize,
}

impl InMemoryVectorIndex {
    pub fn build(
        chunks: Vec<DocumentChunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self, PipelineError> {
        if chunks.len() != embeddings.len() {
            return Err(PipelineError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimensions = embeddings.first().map(Vec::len).unwrap_or(0);
        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, vector)| {
                if vector.len() != dimensions || dimensions == 0 {
                    return Err(PipelineError::Request(format!(
                        "embedding dimension {} != {} for chunk {}",
                        vector.len(),
                        dimensions,
                        chunk.chunk_index
                    )));
                }
                let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
                Ok(IndexEntry {
                    chunk,
                    vector,
                    norm,
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        Ok(Self {
            entries,
            dimensions,
        })
    }
}

impl VectorIndex for InMemoryVectorIndex {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn query(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>, PipelineError> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if query_vector.len() != self.dimensions {
            return Err(PipelineError::Request(format!(
                "query vector dim {} is not {}",
                query_vector.len(),
                self.dimensions
            )));
        }

        let query_norm = query_vector
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| {
                (position, cosine(query_vector, query_norm, &entry.vector, entry.norm))
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|left, right| right.1.total_cmp(&left.1));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(position, score)| ScoredChunk {
                chunk: self.entries[position].chunk.clone(),
                score,
            })
            .collect())
    }
}

fn cosine(left: &[f32], left_norm: f32, right: &[f32], right_norm: f32) -> f32 {
    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    let dot = left
        .iter()
        .zip(right.iter())
        .map(|(a, b)| a * b)
        .sum::<f32>();
    dot / (left_norm * right_norm)
}
