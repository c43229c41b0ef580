//! Persistence backends for namecard.
//!
//! Two [`CardStore`] implementations:
//! - [`InMemoryStore`] — tests and ephemeral runs
//! - [`SqliteStore`] — the production default (behind the `sqlite` feature)

pub mod in_memory;
pub mod seed;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use seed::seed_demo;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use namecard_core::error::{Error, StoreError};
use namecard_core::store::CardStore;
use std::sync::Arc;

/// Open the store the configuration asks for.
pub async fn open_store(config: &namecard_config::StoreConfig) -> Result<Arc<dyn CardStore>, Error> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(SqliteStore::new(&config.path).await?)),
        other => Err(StoreError::Storage(format!("Unknown store backend: {other}")).into()),
    }
}
