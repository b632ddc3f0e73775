//! Boundaries to the embedding and generation services.
//!
//! Components receive an implementation at construction time. [OllamaClient]
//! implements both; tests use in-memory fakes.
//!
//! [OllamaClient]: crate::ollama::OllamaClient

use std::future::Future;

use thiserror::Error;

use crate::history::Turn;

/// Turns text into a fixed-length vector.
pub trait EmbeddingService: Send + Sync {
    /// Embed a single, already normalized string.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, ServiceError>> + Send;

    /// Embed several strings, one vector per input and in input order.
    /// Backends with a batch endpoint override this.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, ServiceError>> + Send {
        async move {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }
    }
}

/// Produces one completion for an ordered list of role-tagged messages.
pub trait GenerationService: Send + Sync {
    fn complete(&self, messages: &[Turn]) -> impl Future<Output = Result<String, ServiceError>> + Send;
}

impl<T: EmbeddingService> EmbeddingService for &T {
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, ServiceError>> + Send {
        (**self).embed(text)
    }

    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, ServiceError>> + Send {
        (**self).embed_batch(texts)
    }
}

impl<T: GenerationService> GenerationService for &T {
    fn complete(&self, messages: &[Turn]) -> impl Future<Output = Result<String, ServiceError>> + Send {
        (**self).complete(messages)
    }
}

/// Replaces literal newlines with spaces; embedding models treat them as signal.
pub fn normalize_for_embedding(text: &str) -> String {
    text.replace('\n', " ")
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service request failed: {0}")]
    Request(String),
    #[error("malformed service response: {0}")]
    Malformed(String),
}
