use crate::canned::CannedAnswerTable;
use crate::composer::compose_answer;
use crate::config::{LlmSettings, PipelineSettings};
use crate::embeddings::Embedder;
use crate::history::{ConversationStore, InMemoryConversationStore};
use crate::index::{InMemoryVectorIndex, VectorIndex};
use crate::ingest::{ingest_folder_chunks, ChunkedCorpus, SkippedDocument};
use crate::llm::{ChatModel, OpenAiChatModel};
use crate::retriever::retrieve;
use crate::rewriter::rewrite_question;
use crate::{
    AnswerOrigin, ChatReply, ChatRequest, DocumentChunk, IngestError, PipelineError, Turn,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct PipelineComponents<E, L, S = InMemoryConversationStore> {
    pub embedder: E,
    pub llm: L,
    pub store: S,
    pub canned: CannedAnswerTable,
}

#[derive(Debug, Clone, Default)]
pub struct CorpusSummary {
    pub documents: usize,
    pub chunks: usize,
    pub skipped_files: Vec<SkippedDocument>,
}

/// A ready-to-serve assistant. Only `initialize` (or `with_index`) creates
/// one, so every request runs against a fully built index.
pub struct ChatPipeline<E, L, S = InMemoryConversationStore> {
    embedder: E,
    llm: L,
    store: S,
    canned: CannedAnswerTable,
    index: Arc<InMemoryVectorIndex>,
    corpus: CorpusSummary,
    top_k: usize,
    default_session: String,
}

impl<E> ChatPipeline<E, OpenAiChatModel, InMemoryConversationStore>
where
    E: Embedder,
{
    pub async fn start(
        settings: &PipelineSettings,
        llm_settings: &LlmSettings,
        embedder: E,
        canned: CannedAnswerTable,
    ) -> Result<Self, PipelineError> {
        let llm = OpenAiChatModel::new(llm_settings)?;
        Self::initialize(
            settings,
            PipelineComponents {
                embedder,
                llm,
                store: InMemoryConversationStore::new(),
                canned,
            },
        )
        .await
    }
}

impl<E, L, S> ChatPipeline<E, L, S>
where
    E: Embedder,
    L: ChatModel,
    S: ConversationStore,
{
    /// Loads, chunks and embeds the corpus once. A missing document directory
    /// leaves the corpus empty; embedding failures abort startup.
    pub async fn initialize(
        settings: &PipelineSettings,
        components: PipelineComponents<E, L, S>,
    ) -> Result<Self, PipelineError> {
        settings.validate()?;

        let corpus = match ingest_folder_chunks(&settings.data_dir, &settings.ingestion) {
            Ok(corpus) => corpus,
            Err(IngestError::MissingDirectory(folder)) => {
                warn!(folder = %folder, "document directory missing, starting with an empty corpus");
                ChunkedCorpus {
                    chunks: Vec::new(),
                    document_count: 0,
                    skipped_files: Vec::new(),
                }
            }
            Err(error) => return Err(error.into()),
        };

        let texts: Vec<String> = corpus.chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            components.embedder.embed_batch(&texts).await?
        };

        let summary = CorpusSummary {
            documents: corpus.document_count,
            chunks: corpus.chunks.len(),
            skipped_files: corpus.skipped_files,
        };
        let index = InMemoryVectorIndex::build(corpus.chunks, embeddings)?;

        info!(
            documents = summary.documents,
            chunks = index.len(),
            dimensions = index.dimensions(),
            skipped = summary.skipped_files.len(),
            model = components.llm.name(),
            "vector index ready"
        );

        Ok(Self::with_index(settings, components, index, summary))
    }

    pub fn with_index(
        settings: &PipelineSettings,
        components: PipelineComponents<E, L, S>,
        index: InMemoryVectorIndex,
        corpus: CorpusSummary,
    ) -> Self {
        Self {
            embedder: components.embedder,
            llm: components.llm,
            store: components.store,
            canned: components.canned,
            index: Arc::new(index),
            corpus,
            top_k: settings.top_k,
            default_session: settings.default_session.clone(),
        }
    }

    pub fn corpus(&self) -> &CorpusSummary {
        &self.corpus
    }

    pub fn index(&self) -> Arc<InMemoryVectorIndex> {
        Arc::clone(&self.index)
    }

    pub fn canned(&self) -> &CannedAnswerTable {
        &self.canned
    }

    pub fn default_session(&self) -> &str {
        &self.default_session
    }

    pub fn history(&self, session_id: &str) -> Vec<Turn> {
        self.store.get(self.session_key(session_id))
    }

    pub fn clear_history(&self, session_id: &str) {
        let session_id = self.session_key(session_id);
        self.store.clear(session_id);
        info!(session = %session_id, "history cleared");
    }

    /// Runs one submission. Failures never escape: they are logged and
    /// turned into a reply the user can read, and the turn is not recorded.
    pub async fn handle(&self, request: &ChatRequest) -> ChatReply {
        match self.try_handle(request).await {
            Ok(reply) => reply,
            Err(failure) => {
                error!(
                    session = %self.session_key(&request.session_id),
                    error = %failure,
                    "request failed"
                );
                ChatReply::failed(failure.user_message())
            }
        }
    }

    pub async fn try_handle(&self, request: &ChatRequest) -> Result<ChatReply, PipelineError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(PipelineError::Request("message is empty".to_string()));
        }
        let session_id = self.session_key(&request.session_id);

        if let Some(answer) = self.canned.lookup(request.category.as_deref(), message) {
            self.store.append(session_id, Turn::new(message, answer));
            info!(session = %session_id, "canned answer");
            return Ok(ChatReply::canned(answer));
        }

        let history = self.store.get(session_id);
        let standalone = rewrite_question(&self.llm, &history, message).await?;

        let hits = match retrieve(&self.embedder, self.index.as_ref(), &standalone, self.top_k).await
        {
            Ok(hits) => hits,
            Err(PipelineError::IndexEmpty) => {
                warn!(session = %session_id, "no documents indexed, answering without context");
                Vec::new()
            }
            Err(failure) => return Err(failure),
        };

        let context: Vec<DocumentChunk> = hits.into_iter().map(|hit| hit.chunk).collect();
        let answer = compose_answer(&self.llm, &standalone, &context, &history).await?;

        self.store.append(session_id, Turn::new(message, answer.clone()));
        info!(
            session = %session_id,
            context_chunks = context.len(),
            turns = history.len() + 1,
            "answer generated"
        );

        let mut sources: Vec<String> = Vec::new();
        for chunk in &context {
            if !sources.contains(&chunk.source_path) {
                sources.push(chunk.source_path.clone());
            }
        }

        Ok(ChatReply {
            answer,
            origin: AnswerOrigin::Generated,
            standalone_question: Some(standalone),
            sources,
        })
    }

    fn session_key<'a>(&'a self, session_id: &'a str) -> &'a str {
        if session_id.trim().is_empty() {
            &self.default_session
        } else {
            session_id
        }
    }
}
