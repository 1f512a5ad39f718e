use crate::embeddings::Embedder;
use crate::index::VectorIndex;
use crate::{PipelineError, ScoredChunk};
use tracing::debug;

pub async fn retrieve<E, I>(
    embedder: &E,
    index: &I,
    question: &str,
    top_k: usize,
) -> Result<Vec<ScoredChunk>, PipelineError>
where
    E: Embedder + ?Sized,
    I: VectorIndex + ?Sized,
{
    if index.is_empty() {
        return Err(PipelineError::IndexEmpty);
    }

    let query_vector = embedder.embed(question).await?;
    let hits = index.query(&query_vector, top_k)?;

    debug!(
        question = %question,
        hits = hits.len(),
        best_score = hits.first().map(|hit| hit.score).unwrap_or(0.0),
        "retrieved context"
    );
    Ok(hits)
}
