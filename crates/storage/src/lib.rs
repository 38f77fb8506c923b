// Docpref Storage Layer
//
// Document-collection interface with pluggable engines

pub mod trait_;
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use trait_::*;
pub use memory::{MemoryCollection, MemoryDatabase};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteCollection, SqliteDatabase};

use docpref_core::{Backend, Result, StorageConfig};
use std::sync::Arc;

/// Open the database selected by the storage configuration
pub async fn open_database(config: &StorageConfig) -> Result<SharedDatabase> {
    match config.backend {
        Backend::Memory => Ok(Arc::new(MemoryDatabase::new())),
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => {
            let db = SqliteDatabase::open(config.db_path.clone(), config.enable_wal).await?;
            Ok(Arc::new(db))
        }
        #[cfg(not(feature = "sqlite"))]
        Backend::Sqlite => Err(docpref_core::PrefError::Config(
            "sqlite backend requires the `sqlite` feature".to_string(),
        )),
    }
}

/// Open the configured database and return its configured collection
pub async fn open_collection(config: &StorageConfig) -> Result<SharedCollection> {
    let db = open_database(config).await?;
    db.collection(&config.collection).await
}
