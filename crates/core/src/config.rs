use crate::chunking::ChunkingConfig;
use crate::{IngestionOptions, PipelineError};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const API_KEY_ENV: &str = "GROQ_API_KEY";
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gemma2-9b-it";
pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:8080/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-mpnet-base-v2";
pub const DEFAULT_SESSION_ID: &str = "default_session";
pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn endpoint(base: &str, path: &str) -> Result<Url, PipelineError> {
    let base = format!("{}/", base.trim().trim_end_matches('/'));
    Ok(Url::parse(&base)?.join(path)?)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl LlmSettings {
    pub fn resolve_api_key(&self) -> Result<String, PipelineError> {
        non_blank(self.api_key.clone()).ok_or_else(|| {
            PipelineError::MissingCredential(format!(
                "set {API_KEY_ENV} or pass an api key for {}",
                self.api_base
            ))
        })
    }

    pub fn endpoint(&self) -> Result<Url, PipelineError> {
        endpoint(&self.api_base, "chat/completions")
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub normalize: bool,
    pub timeout: Duration,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EMBEDDING_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_key: None,
            normalize: false,
            timeout: DEFAULT_TIMEOUT,
            batch_size: 32,
        }
    }
}

impl EmbeddingSettings {
    pub fn endpoint(&self) -> Result<Url, PipelineError> {
        endpoint(&self.base_url, "embeddings")
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub data_dir: PathBuf,
    pub ingestion: IngestionOptions,
    pub top_k: usize,
    pub default_session: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            ingestion: IngestionOptions::default(),
            top_k: DEFAULT_TOP_K,
            default_session: DEFAULT_SESSION_ID.to_string(),
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<(), PipelineError> {
        ChunkingConfig::from(&self.ingestion).validate()?;
        if self.top_k == 0 {
            return Err(PipelineError::InvalidConfig(
                "top_k must be at least 1".to_string(),
            ));
        }
        if self.ingestion.extensions.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "at least one document extension is required".to_string(),
            ));
        }
        Ok(())
    }
}
