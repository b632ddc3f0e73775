//! Flat vector index with exact Euclidean nearest-neighbor search.
//! Vectors keep insertion order, so vector `i` belongs to corpus entry `i`.
//! Persisted as a single JSON file; the index is never mutated after it is built.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const FORMAT_VERSION: u32 = 1;

/// A nearest-neighbor hit: position in insertion order and Euclidean distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// Read-only set of equal-length embedding vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    version: u32,
    /// Embedding model the vectors came from, for diagnostics.
    model: String,
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Build from vectors in corpus order. All vectors must be non-empty and the same length.
    pub fn from_vectors(model: impl Into<String>, vectors: Vec<Vec<f32>>) -> Result<Self, StoreError> {
        let dimensions = vectors.first().map(Vec::len).unwrap_or(0);
        if dimensions == 0 {
            return Err(StoreError::Empty);
        }
        for (position, v) in vectors.iter().enumerate() {
            if v.len() != dimensions {
                return Err(StoreError::DimensionMismatch {
                    position,
                    expected: dimensions,
                    actual: v.len(),
                });
            }
        }
        Ok(Self {
            version: FORMAT_VERSION,
            model: model.into(),
            dimensions,
            vectors,
        })
    }

    /// The single closest vector. Ties go to the lowest position.
    pub fn nearest(&self, query: &[f32]) -> Result<Neighbor, StoreError> {
        if query.len() != self.dimensions {
            return Err(StoreError::QueryDimension {
                expected: self.dimensions,
                actual: query.len(),
            });
        }
        let mut best: Option<Neighbor> = None;
        for (position, v) in self.vectors.iter().enumerate() {
            let distance = squared_l2(query, v);
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(Neighbor { position, distance });
            }
        }
        best.map(|b| Neighbor {
            distance: b.distance.sqrt(),
            ..b
        })
        .ok_or(StoreError::Empty)
    }

    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        self.vectors.get(position).map(Vec::as_slice)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Write the index to `path` atomically: a sibling temp file is written, synced, then renamed.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(self).map_err(StoreError::Serialize)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(parent.to_path_buf(), e))?;
        }
        let tmp = tmp_path(path);
        let write = || -> std::io::Result<()> {
            let mut f = std::fs::File::create(&tmp)?;
            f.write_all(&bytes)?;
            f.sync_all()?;
            std::fs::rename(&tmp, path)
        };
        write().map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            StoreError::Io(path.to_path_buf(), e)
        })
    }

    /// Load and validate an index written by [VectorIndex::save].
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let bytes = std::fs::read(path).map_err(|e| StoreError::Io(path.to_path_buf(), e))?;
        let index: VectorIndex =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt(path.to_path_buf(), e.to_string()))?;
        if index.version != FORMAT_VERSION {
            return Err(StoreError::Corrupt(
                path.to_path_buf(),
                format!("unsupported format version {}", index.version),
            ));
        }
        let VectorIndex { model, vectors, dimensions, .. } = index;
        let checked = Self::from_vectors(model, vectors)
            .map_err(|e| StoreError::Corrupt(path.to_path_buf(), e.to_string()))?;
        if checked.dimensions != dimensions {
            return Err(StoreError::Corrupt(
                path.to_path_buf(),
                format!("header says {dimensions} dimensions, vectors have {}", checked.dimensions),
            ));
        }
        Ok(checked)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("index has no vectors")]
    Empty,
    #[error("vector {position} has {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        actual: usize,
    },
    #[error("query has {actual} dimensions but the index has {expected}")]
    QueryDimension { expected: usize, actual: usize },
    #[error("failed to serialize index: {0}")]
    Serialize(serde_json::Error),
    #[error("index file {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("corrupt index file {0}: {1}")]
    Corrupt(PathBuf, String),
}
