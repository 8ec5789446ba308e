mod config;
pub mod database;
pub mod history;
mod kv;

pub use config::{Config, ProfileConfig, StorageConfig, TrackingConfig};
pub use database::Database;
pub use history::{RunHistoryStore, DEFAULT_HISTORY_KEY};
pub use kv::{KeyValueStore, MemoryStore};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `STRIDE_DATA_DIR` wins when set. Otherwise `~/.config/stride[-dev]/`,
/// where STRIDE_ENV=dev selects the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("STRIDE_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("STRIDE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("stride-dev")
            } else {
                base_dir.join("stride")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
