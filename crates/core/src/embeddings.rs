use crate::config::EmbeddingSettings;
use crate::PipelineError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::debug;
use url::Url;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Maps text to a fixed-length vector. The same text must always produce the
/// same vector, and every vector from one embedder has `dimensions()` entries.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Vector length, or 0 while it is not known yet.
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        (**self).embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        (**self).embed_batch(texts).await
    }
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for Arc<T> {
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        (**self).embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        (**self).embed_batch(texts).await
    }
}

pub fn l2_normalize(vector: &mut [f32]) {
    let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in vector.iter_mut() {
            *value /= magnitude;
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
    pub normalize: bool,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            normalize: false,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        if self.normalize {
            l2_normalize(&mut vector);
        }

        vector
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        Ok(self.embed_sync(text))
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

/// Client for an OpenAI-compatible `/embeddings` endpoint, such as a
/// text-embeddings-inference server hosting a sentence-transformers model.
pub struct HttpEmbedder {
    endpoint: Url,
    model: String,
    api_key: Option<String>,
    normalize: bool,
    batch_size: usize,
    client: Client,
    dimensions: OnceLock<usize>,
}

impl HttpEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, PipelineError> {
        let endpoint = settings.endpoint()?;
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(PipelineError::embedding)?;

        Ok(Self {
            endpoint,
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            normalize: settings.normalize,
            batch_size: settings.batch_size.max(1),
            client,
            dimensions: OnceLock::new(),
        })
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let mut request = self.client.post(self.endpoint.clone()).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(PipelineError::embedding)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::EmbeddingService(format!(
                "{} returned {status}: {body}",
                self.endpoint
            )));
        }

        let mut parsed: EmbeddingResponse =
            response.json().await.map_err(PipelineError::embedding)?;
        if parsed.data.len() != texts.len() {
            return Err(PipelineError::EmbeddingService(format!(
                "expected {} embeddings, received {}",
                texts.len(),
                parsed.data.len()
            )));
        }
        parsed
            .data
            .sort_by_key(|item| item.index.unwrap_or(usize::MAX));

        let mut vectors = Vec::with_capacity(parsed.data.len());
        for item in parsed.data {
            let mut vector = item.embedding;
            if vector.is_empty() {
                return Err(PipelineError::EmbeddingService(
                    "service returned an empty embedding".to_string(),
                ));
            }
            let expected = *self.dimensions.get_or_init(|| vector.len());
            if vector.len() != expected {
                return Err(PipelineError::EmbeddingService(format!(
                    "embedding dimension {} != {}",
                    vector.len(),
                    expected
                )));
            }
            if self.normalize {
                l2_normalize(&mut vector);
            }
            vectors.push(vector);
        }

        debug!(model = %self.model, count = vectors.len(), "embedded texts");
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions.get().copied().unwrap_or(0)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let mut vectors = self.request(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| PipelineError::EmbeddingService("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.request(batch).await?);
        }
        Ok(vectors)
    }
}
