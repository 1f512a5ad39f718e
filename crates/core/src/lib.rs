pub mod canned;
pub mod chunking;
pub mod composer;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod history;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod retriever;
pub mod rewriter;

#[cfg(test)]
mod test_support;

pub use canned::{CannedAnswerTable, CannedCategory, CannedEntry};
pub use chunking::{build_chunks, split_text, tidy_text, ChunkingConfig, TextWindow};
pub use composer::compose_answer;
pub use config::{
    EmbeddingSettings, LlmSettings, PipelineSettings, API_KEY_ENV, DEFAULT_API_BASE,
    DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBEDDING_URL, DEFAULT_SESSION_ID,
    DEFAULT_TOP_K,
};
pub use embeddings::{
    l2_normalize, CharacterNgramEmbedder, Embedder, HttpEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{IngestError, PipelineError};
pub use extractor::{extract_document_text, DocumentExtractor, DocxExtractor, PdfExtractor};
pub use history::{new_session_id, ConversationStore, InMemoryConversationStore};
pub use index::{InMemoryVectorIndex, VectorIndex};
pub use ingest::{
    discover_documents, ingest_folder_chunks, load_documents_best_effort, ChunkedCorpus,
    IngestionReport, SkippedDocument,
};
pub use llm::{ChatMessage, ChatModel, ChatRole, OpenAiChatModel};
pub use models::{
    AnswerOrigin, ChatReply, ChatRequest, Document, DocumentChunk, IngestionOptions, ScoredChunk,
    Turn,
};
pub use pipeline::{ChatPipeline, CorpusSummary, PipelineComponents};
pub use retriever::retrieve;
pub use rewriter::rewrite_question;
