//! Persisted config (service endpoint, models, corpus and index paths) in the app data directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app_data;
use crate::history::{HistoryWindow, Role};
use crate::ollama::{DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_EMBED_MODEL};

const CONFIG_FILENAME: &str = "config.toml";
const INDEX_FILENAME: &str = "faq_index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the Ollama server.
    pub ollama_url: String,
    pub embed_model: String,
    /// Model used for assistant replies.
    pub chat_model: String,
    /// Model used for lead fact merges. Falls back to `chat_model` when empty.
    pub merge_model: String,
    /// FAQ corpus file (`.toml`, `.yaml` or `.yml`). The built-in FAQ is used when unset.
    pub corpus_path: Option<String>,
    /// Where the FAQ index is persisted. Defaults to the app data directory.
    pub index_path: Option<String>,
    /// Most recent turns sent with each request; 0 sends the whole history.
    pub history_window: usize,
    /// Opening assistant turn for the commercial agent. Empty disables it.
    pub greeting: String,
    /// Role tag stored for assistant replies.
    pub assistant_role: Role,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_BASE_URL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            merge_model: String::new(),
            corpus_path: None,
            index_path: None,
            history_window: HistoryWindow::DEFAULT_TURNS,
            greeting: crate::prompts::LEAD_GREETING.to_string(),
            assistant_role: Role::Assistant,
        }
    }
}

impl Config {
    pub fn history_window(&self) -> HistoryWindow {
        HistoryWindow::from_limit(self.history_window)
    }

    pub fn merge_model(&self) -> &str {
        if self.merge_model.is_empty() {
            &self.chat_model
        } else {
            &self.merge_model
        }
    }

    pub fn greeting(&self) -> Option<&str> {
        Some(self.greeting.trim()).filter(|g| !g.is_empty())
    }

    pub fn corpus_path(&self) -> Option<PathBuf> {
        self.corpus_path
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }

    /// The configured index path, or `faq_index.json` in the app data directory.
    pub fn resolve_index_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(p) = self.index_path.as_deref().filter(|s| !s.is_empty()) {
            return Ok(PathBuf::from(p));
        }
        let data_dir = app_data::app_data_dir().ok_or(ConfigError::NoDataDir)?;
        Ok(data_dir.join(INDEX_FILENAME))
    }
}

/// Load config from the app data directory. Returns default config if missing or invalid.
pub fn load_config() -> Config {
    let Some(data_dir) = app_data::app_data_dir() else {
        return Config::default();
    };
    let path = data_dir.join(CONFIG_FILENAME);
    let Ok(s) = std::fs::read_to_string(&path) else {
        return Config::default();
    };
    parse_config(&s)
}

fn parse_config(s: &str) -> Config {
    match toml::from_str(s) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "invalid config, using defaults");
            Config::default()
        }
    }
}

/// Save config to the app data directory and return the file written.
pub fn save_config(config: &Config) -> Result<PathBuf, ConfigError> {
    let data_dir = app_data::app_data_dir().ok_or(ConfigError::NoDataDir)?;
    let path = data_dir.join(CONFIG_FILENAME);
    write_config(config, &path)?;
    Ok(path)
}

fn write_config(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(ConfigError::Write)?;
    }
    let s = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    std::fs::write(path, s).map_err(ConfigError::Write)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine app data directory")]
    NoDataDir,
    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(std::io::Error),
}
