//! Where Atende stores its own data (config, persisted FAQ index).
//!
//! Conversation state is never written here; it lives only in memory.

use std::path::PathBuf;

/// Returns the directory where Atende stores config and the persisted index.
/// On Linux: `~/.local/share/atende/`.
/// Creates the directory if it doesn't exist; returns `None` if we can't determine the path.
pub fn app_data_dir() -> Option<PathBuf> {
    let dir = directories::ProjectDirs::from("app", "Atende", "Atende")?.data_local_dir().to_path_buf();
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}
