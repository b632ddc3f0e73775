//! The fixed question/answer knowledge base.
//!
//! Entry identity is its position: entry `i` pairs with vector `i` of the index.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const BUILTIN_FAQ: &str = include_str!("../data/faq.toml");

/// One question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub question: String,
    pub answer: String,
}

impl CorpusEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Ordered, immutable list of entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
}

impl Corpus {
    /// Validates that every entry has a question and an answer.
    pub fn new(entries: Vec<CorpusEntry>) -> Result<Self, CorpusError> {
        for (position, e) in entries.iter().enumerate() {
            if e.question.trim().is_empty() || e.answer.trim().is_empty() {
                return Err(CorpusError::BlankEntry(position));
            }
        }
        Ok(Self { entries })
    }

    /// The FAQ shipped with the binary.
    pub fn builtin() -> Result<Self, CorpusError> {
        Self::from_toml(BUILTIN_FAQ)
    }

    pub fn from_toml(s: &str) -> Result<Self, CorpusError> {
        let parsed: Corpus = toml::from_str(s).map_err(CorpusError::Toml)?;
        Self::new(parsed.entries)
    }

    pub fn from_yaml(s: &str) -> Result<Self, CorpusError> {
        let parsed: Corpus = serde_yaml::from_str(s).map_err(CorpusError::Yaml)?;
        Self::new(parsed.entries)
    }

    /// Load a corpus file; the format follows the extension (`toml`, `yaml`, `yml`).
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let raw = std::fs::read_to_string(path).map_err(|e| CorpusError::Read(path.to_path_buf(), e))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&raw),
            Some("yaml") | Some("yml") => Self::from_yaml(&raw),
            _ => Err(CorpusError::UnknownFormat(path.to_path_buf())),
        }
    }

    /// `path` if given, else the built-in FAQ.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, CorpusError> {
        match path {
            Some(p) => Self::load(p),
            None => Self::builtin(),
        }
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn get(&self, position: usize) -> Option<&CorpusEntry> {
        self.entries.get(position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("read error for {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("invalid TOML corpus: {0}")]
    Toml(toml::de::Error),
    #[error("invalid YAML corpus: {0}")]
    Yaml(serde_yaml::Error),
    #[error("unsupported corpus format: {0}")]
    UnknownFormat(PathBuf),
    #[error("corpus entry {0} has an empty question or answer")]
    BlankEntry(usize),
}
