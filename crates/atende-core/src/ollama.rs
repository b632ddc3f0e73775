//! Ollama client for embeddings and chat completion. Wraps ollama-rs with a simple API.

use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use ollama_rs::Ollama;
use thiserror::Error;

use crate::config::Config;
use crate::history::{Role, Turn};
use crate::service::{EmbeddingService, GenerationService, ServiceError};

pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_CHAT_MODEL: &str = "llama3.1";
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Thin wrapper around Ollama for embedding and chat. Cheap to clone.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    inner: Ollama,
    embed_model: String,
    chat_model: String,
}

impl Default for OllamaClient {
    /// Localhost:11434 with the default models.
    fn default() -> Self {
        Self {
            inner: Ollama::default(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
        }
    }
}

impl OllamaClient {
    /// Create from URL string. Default: http://localhost:11434.
    pub fn from_url(url: &str) -> Result<Self, OllamaError> {
        let inner = Ollama::try_new(url).map_err(OllamaError::ParseUrl)?;
        Ok(Self {
            inner,
            ..Self::default()
        })
    }

    /// Create from the URL and embedding/chat models in `config`.
    pub fn from_config(config: &Config) -> Result<Self, OllamaError> {
        Ok(Self::from_url(&config.ollama_url)?
            .with_embed_model(&config.embed_model)
            .with_chat_model(&config.chat_model))
    }

    /// Set the embedding model (e.g. `nomic-embed-text`, `all-minilm`).
    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    /// Set the chat model used for replies and lead merges.
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn embed_model(&self) -> &str {
        &self.embed_model
    }

    /// Embed a single string. Returns the embedding vector.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, OllamaError> {
        let req = GenerateEmbeddingsRequest::new(
            self.embed_model.clone(),
            EmbeddingsInput::Single(text.to_string()),
        );
        let res = self
            .inner
            .generate_embeddings(req)
            .await
            .map_err(OllamaError::Request)?;
        res.embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or(OllamaError::EmptyEmbedding)
    }

    /// Embed multiple strings in one call. Returns one embedding per input.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, OllamaError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let req = GenerateEmbeddingsRequest::new(
            self.embed_model.clone(),
            EmbeddingsInput::Multiple(texts.to_vec()),
        );
        let res = self
            .inner
            .generate_embeddings(req)
            .await
            .map_err(OllamaError::Request)?;
        Ok(res.embeddings)
    }

    /// Send the messages to the chat model and return the first completion.
    pub async fn chat(&self, messages: &[Turn]) -> Result<String, OllamaError> {
        let messages = messages.iter().map(to_chat_message).collect();
        let req = ChatMessageRequest::new(self.chat_model.clone(), messages);
        let res = self
            .inner
            .send_chat_messages(req)
            .await
            .map_err(OllamaError::Request)?;
        Ok(res.message.content)
    }
}

fn to_chat_message(turn: &Turn) -> ChatMessage {
    let content = turn.content.clone();
    match turn.role {
        Role::System => ChatMessage::system(content),
        Role::User => ChatMessage::user(content),
        Role::Assistant => ChatMessage::assistant(content),
    }
}

impl EmbeddingService for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        Ok(OllamaClient::embed(self, text).await?)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        Ok(OllamaClient::embed_batch(self, texts).await?)
    }
}

impl GenerationService for OllamaClient {
    async fn complete(&self, messages: &[Turn]) -> Result<String, ServiceError> {
        Ok(self.chat(messages).await?)
    }
}

#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("invalid Ollama URL: {0}")]
    ParseUrl(#[from] url::ParseError),
    #[error("Ollama request failed: {0}")]
    Request(#[from] ollama_rs::error::OllamaError),
    #[error("Ollama returned no embedding")]
    EmptyEmbedding,
}

impl From<OllamaError> for ServiceError {
    fn from(err: OllamaError) -> Self {
        match err {
            OllamaError::EmptyEmbedding => ServiceError::Malformed(err.to_string()),
            other => ServiceError::Request(other.to_string()),
        }
    }
}
