use crate::config::LlmSettings;
use crate::PipelineError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, PipelineError>;
}

#[async_trait]
impl<T: ChatModel + ?Sized> ChatModel for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, PipelineError> {
        (**self).complete(messages).await
    }
}

#[async_trait]
impl<T: ChatModel + ?Sized> ChatModel for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, PipelineError> {
        (**self).complete(messages).await
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiChatModel {
    endpoint: Url,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    client: Client,
}

impl OpenAiChatModel {
    /// Fails with `MissingCredential` when no api key is configured.
    pub fn new(settings: &LlmSettings) -> Result<Self, PipelineError> {
        let api_key = settings.resolve_api_key()?;
        let endpoint = settings.endpoint()?;
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(PipelineError::llm)?;

        Ok(Self {
            endpoint,
            api_key,
            model: settings.model.clone(),
            temperature: settings.temperature,
            client,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, PipelineError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest {
                model: &self.model,
                messages,
                stream: false,
                temperature: self.temperature,
            })
            .send()
            .await
            .map_err(PipelineError::llm)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::LlmService(format!(
                "{} returned {status}: {body}",
                self.model
            )));
        }

        let parsed: CompletionResponse = response.json().await.map_err(PipelineError::llm)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PipelineError::LlmService(format!("{} returned no completion", self.model))
            })?;

        debug!(model = %self.model, chars = content.len(), "completion received");
        Ok(content)
    }
}
