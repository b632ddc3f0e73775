//! In-memory fakes of the service traits for unit tests.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::history::Turn;
use crate::service::{EmbeddingService, GenerationService, ServiceError};

/// Embedder with fixed vectors per text and an optional hash-based fallback.
/// Counts every request.
#[derive(Default)]
pub struct FakeEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    fallback_dims: Option<usize>,
    failing: HashSet<String>,
    requests: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn with_fallback_dims(mut self, dims: usize) -> Self {
        self.fallback_dims = Some(dims);
        self
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(v) = self.vectors.get(text) {
            return v.clone();
        }
        let dims = self.fallback_dims.expect("no vector configured for text");
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();
        (0..dims)
            .map(|i| ((seed.rotate_left(i as u32 * 7) % 1000) as f32) / 1000.0)
            .collect()
    }
}

impl EmbeddingService for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(text.to_string());
        if self.failing.contains(text) {
            return Err(ServiceError::Request(format!("embedding refused for {text:?}")));
        }
        if !self.vectors.contains_key(text) && self.fallback_dims.is_none() {
            return Err(ServiceError::Malformed(format!("no vector for {text:?}")));
        }
        Ok(self.vector_for(text))
    }
}

/// Generator that replays scripted replies in order and records each request.
#[derive(Default)]
pub struct FakeGenerator {
    replies: Mutex<VecDeque<Result<String, ServiceError>>>,
    requests: Mutex<Vec<Vec<Turn>>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, reason: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(ServiceError::Request(reason.to_string())));
        self
    }

    pub fn requests(&self) -> Vec<Vec<Turn>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Vec<Turn> {
        self.requests().pop().expect("no request was made")
    }
}

impl GenerationService for FakeGenerator {
    async fn complete(&self, messages: &[Turn]) -> Result<String, ServiceError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Request("no scripted reply".into())))
    }
}
