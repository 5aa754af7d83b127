//! Storage layer
//!
//! JSON file (DashMap in memory, whole-document rewrite on save) or SQLite,
//! picked once at startup from `HBNB_TYPE_STORAGE`.

pub mod db;
pub mod file;
pub mod session;

pub use db::DbStorage;
pub use file::FileStorage;
pub use session::close_storage;

use crate::config::{Config, StorageType};
use anyhow::{Context, Result};
use hbnb_core::Storage;
use std::sync::Arc;
use tracing::info;

/// Build the configured backend and load its current contents
pub async fn open(config: &Config) -> Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.type_storage {
        StorageType::File => {
            let storage = FileStorage::new(&config.file_path);
            info!("Using file storage at {}", storage.path().display());
            Arc::new(storage)
        }
        StorageType::Db => Arc::new(
            DbStorage::open(&config.db_path, config.is_test_env())
                .await
                .context("Failed to initialize database")?,
        ),
    };

    storage
        .reload()
        .await
        .context("Failed to load stored objects")?;
    Ok(storage)
}
