//! Nearest-entry lookup: embed the query and return the closest corpus entry (k = 1).
//!
//! There is no distance threshold; some entry is always returned. Deciding
//! whether it is relevant is left to the response prompt.

use tracing::debug;

use crate::corpus::{Corpus, CorpusEntry};
use crate::service::{normalize_for_embedding, EmbeddingService, ServiceError};
use crate::store::{StoreError, VectorIndex};

/// A retrieved entry with its position and Euclidean distance to the query.
#[derive(Debug, Clone, Copy)]
pub struct Match<'a> {
    pub entry: &'a CorpusEntry,
    pub position: usize,
    pub distance: f32,
}

/// Read-only view over a corpus and its index, plus the embedder for queries.
pub struct Retriever<'a, E> {
    corpus: &'a Corpus,
    index: &'a VectorIndex,
    embedder: E,
}

impl<'a, E: EmbeddingService> Retriever<'a, E> {
    /// The index must have been built from `corpus`.
    pub fn new(corpus: &'a Corpus, index: &'a VectorIndex, embedder: E) -> Result<Self, RetrieveError> {
        if corpus.len() != index.len() {
            return Err(RetrieveError::CorpusMismatch {
                indexed: index.len(),
                corpus: corpus.len(),
            });
        }
        Ok(Self {
            corpus,
            index,
            embedder,
        })
    }

    /// The closest entry to `query`.
    pub async fn retrieve_entry(&self, query: &str) -> Result<Match<'a>, RetrieveError> {
        let embedding = self.embedder.embed(&normalize_for_embedding(query)).await?;
        let hit = self.index.nearest(&embedding).map_err(|e| match e {
            StoreError::QueryDimension { expected, actual } => RetrieveError::DimensionMismatch { expected, actual },
            other => RetrieveError::Store(other),
        })?;
        let entry = self
            .corpus
            .get(hit.position)
            .ok_or(RetrieveError::CorpusMismatch {
                indexed: self.index.len(),
                corpus: self.corpus.len(),
            })?;
        debug!(position = hit.position, distance = hit.distance, "retrieved entry");
        Ok(Match {
            entry,
            position: hit.position,
            distance: hit.distance,
        })
    }

    /// The answer of the closest entry to `query`.
    pub async fn retrieve(&self, query: &str) -> Result<&'a str, RetrieveError> {
        Ok(self.retrieve_entry(query).await?.entry.answer.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetrieveError {
    #[error("embedding error: {0}")]
    Embedding(#[from] ServiceError),
    #[error("query embedding has {actual} dimensions but the index has {expected}; check the embedding model")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("index has {indexed} entries but the corpus has {corpus}")]
    CorpusMismatch { indexed: usize, corpus: usize },
    #[error("index error: {0}")]
    Store(StoreError),
}
