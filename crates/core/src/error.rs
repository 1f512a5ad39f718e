use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document directory does not exist: {0}")]
    MissingDirectory(String),

    #[error("document parse error: {0}")]
    DocumentParse(String),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("document has no readable text: {0}")]
    EmptyDocument(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("embedding service error: {0}")]
    EmbeddingService(String),

    #[error("llm service error: {0}")]
    LlmService(String),

    #[error("vector index is empty")]
    IndexEmpty,

    #[error("missing api credential: {0}")]
    MissingCredential(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("ingestion failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Request(String),
}

impl PipelineError {
    pub(crate) fn embedding(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::EmbeddingService(format!("request timed out: {error}"))
        } else {
            Self::EmbeddingService(error.to_string())
        }
    }

    pub(crate) fn llm(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::LlmService(format!("request timed out: {error}"))
        } else {
            Self::LlmService(error.to_string())
        }
    }

    pub fn is_service_unavailable(&self) -> bool {
        matches!(self, Self::EmbeddingService(_) | Self::LlmService(_))
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmbeddingService(_) => {
                "The search service is temporarily unavailable. Please try again in a moment."
            }
            Self::LlmService(_) => {
                "The answer service is temporarily unavailable. Please try again in a moment."
            }
            _ => "Something went wrong, please retry.",
        }
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_unavailable_message() {
        let error = PipelineError::LlmService("503".to_string());
        assert!(error.is_service_unavailable());
        assert!(error.user_message().contains("temporarily unavailable"));

        let error = PipelineError::EmbeddingService("timeout".to_string());
        assert!(error.user_message().contains("temporarily unavailable"));
    }

    #[test]
    fn other_errors_map_to_retry_message() {
        let error = PipelineError::Request("boom".to_string());
        assert!(!error.is_service_unavailable());
        assert_eq!(error.user_message(), "Something went wrong, please retry.");
    }
}
