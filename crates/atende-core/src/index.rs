//! Index pipeline: corpus questions → normalize → embed → persisted vector index.
//!
//! A persisted index is reused as-is (warm start). Otherwise every question is
//! embedded and the index is written once; if any embedding fails nothing is written.

use std::path::Path;

use tracing::{debug, info};

use crate::corpus::Corpus;
use crate::service::{normalize_for_embedding, EmbeddingService, ServiceError};
use crate::store::{StoreError, VectorIndex};

/// Load the index at `storage_path`, or embed the corpus and persist a new one there.
/// `model` is recorded in the file; a persisted index from another model is rejected.
pub async fn build_index<E: EmbeddingService>(
    corpus: &Corpus,
    storage_path: &Path,
    embedder: &E,
    model: &str,
) -> Result<VectorIndex, IndexError> {
    if corpus.is_empty() {
        return Err(IndexError::EmptyCorpus);
    }

    if storage_path.exists() {
        let index = VectorIndex::load(storage_path)?;
        if index.len() != corpus.len() {
            return Err(IndexError::CorpusMismatch {
                indexed: index.len(),
                corpus: corpus.len(),
            });
        }
        if index.model() != model {
            return Err(IndexError::ModelMismatch {
                indexed: index.model().to_string(),
                requested: model.to_string(),
            });
        }
        info!(path = %storage_path.display(), entries = index.len(), "loaded persisted index");
        return Ok(index);
    }

    let questions: Vec<String> = corpus
        .entries()
        .iter()
        .map(|e| normalize_for_embedding(&e.question))
        .collect();
    debug!(entries = questions.len(), "embedding corpus questions");
    let embeddings = embedder.embed_batch(&questions).await?;
    if embeddings.len() != questions.len() {
        return Err(IndexError::MalformedEmbedding(format!(
            "expected {} vectors, got {}",
            questions.len(),
            embeddings.len()
        )));
    }

    let index = VectorIndex::from_vectors(model, embeddings).map_err(|e| match e {
        StoreError::Empty | StoreError::DimensionMismatch { .. } => IndexError::MalformedEmbedding(e.to_string()),
        other => IndexError::Store(other),
    })?;
    index.save(storage_path)?;
    info!(
        path = %storage_path.display(),
        entries = index.len(),
        dimensions = index.dimensions(),
        "built and saved index"
    );
    Ok(index)
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("corpus is empty")]
    EmptyCorpus,
    #[error("embedding error: {0}")]
    Embedding(#[from] ServiceError),
    #[error("malformed embedding: {0}")]
    MalformedEmbedding(String),
    #[error("persisted index has {indexed} entries but the corpus has {corpus}; delete it to rebuild")]
    CorpusMismatch { indexed: usize, corpus: usize },
    #[error("persisted index was built with model {indexed:?} but {requested:?} is configured; delete it to rebuild")]
    ModelMismatch { indexed: String, requested: String },
    #[error("index storage error: {0}")]
    Store(#[from] StoreError),
}
