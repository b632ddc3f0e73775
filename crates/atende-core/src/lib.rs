//! All assistant logic independent of how it is driven (CLI or a chat UI).
//!
//! Two assistants share the same pieces: the FAQ consultant retrieves the closest
//! corpus answer from a persisted vector index; the commercial agent accumulates
//! lead facts turn by turn. Only config and the index live in the app data
//! directory (see [app_data]); conversations stay in memory.

pub mod app_data;
pub mod config;
pub mod corpus;
pub mod history;
pub mod index;
pub mod lead;
pub mod ollama;
pub mod prompts;
pub mod responder;
pub mod retriever;
pub mod service;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

pub use app_data::app_data_dir;
pub use config::{load_config, save_config, Config, ConfigError};
pub use corpus::{Corpus, CorpusEntry, CorpusError};
pub use history::{History, HistoryWindow, Role, Turn};
pub use index::{build_index, IndexError};
pub use lead::{FactAccumulator, LeadRecord, MergeError};
pub use ollama::{OllamaClient, OllamaError};
pub use responder::{Context, Responder, ResponderOptions, ResponseError};
pub use retriever::{Match, RetrieveError, Retriever};
pub use service::{EmbeddingService, GenerationService, ServiceError};
pub use session::{ChatError, FactUpdate, FaqSession, LeadSession, LeadTurn, ERROR_PREFIX};
pub use store::{Neighbor, StoreError, VectorIndex};

/// Returns a short status string. Used to verify the backend is wired up.
pub fn status() -> &'static str {
    "atende-core ready"
}
