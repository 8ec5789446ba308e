pub mod config;
pub mod distance;
pub mod history;
pub mod replay;

use stride_core::{Config, Database, RunHistoryStore};

/// History store on the default database, keyed as configured.
pub fn open_history(config: &Config) -> Result<RunHistoryStore, Box<dyn std::error::Error>> {
    let db = Database::open()?;
    Ok(RunHistoryStore::with_key(
        Box::new(db),
        config.storage.history_key.clone(),
    ))
}
