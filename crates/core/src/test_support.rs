use crate::embeddings::Embedder;
use crate::llm::{ChatMessage, ChatModel};
use crate::PipelineError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Default)]
pub struct ScriptedChatModel {
    replies: Mutex<VecDeque<Result<String, PipelineError>>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
    fallback: String,
}

impl ScriptedChatModel {
    pub fn answering(fallback: &str) -> Self {
        Self {
            fallback: fallback.to_string(),
            ..Self::default()
        }
    }

    pub fn then_reply(self, reply: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    pub fn then_fail(self, error: PipelineError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, PipelineError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

pub struct FixedEmbedder {
    pub vectors: HashMap<String, Vec<f32>>,
    pub default: Vec<f32>,
    pub calls: Mutex<Vec<String>>,
}

impl FixedEmbedder {
    pub fn new(default: Vec<f32>) -> Self {
        Self {
            vectors: HashMap::new(),
            default,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn embedded(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    fn dimensions(&self) -> usize {
        self.default.len()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        self.calls.lock().unwrap().push(text.to_string());
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }
}

pub struct UnavailableEmbedder;

#[async_trait]
impl Embedder for UnavailableEmbedder {
    fn dimensions(&self) -> usize {
        3
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, PipelineError> {
        Err(PipelineError::EmbeddingService("connection refused".to_string()))
    }
}
