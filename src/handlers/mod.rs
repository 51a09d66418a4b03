// handlers/mod.rs - route handlers and the state they share
//
// material: JSON CRUD and search over the active table
// csv:      multipart CSV append and full import
// health:   liveness of the storage backend
pub mod csv;
pub mod health;
pub mod material;
pub mod policy;

use std::sync::Arc;

use tracing::info;

use crate::config::{AppConfig, StorageBackend};
use crate::database::columns::{ColumnRecorder, ColumnStore};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::memory::{MemoryColumnStore, MemoryRepository};
use crate::database::postgres::{PgColumnStore, PgDataRepository};
use crate::database::repository::DataRepository;

/// Everything a handler needs, cloned into each request
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn DataRepository>,
    pub columns: Arc<ColumnRecorder>,
    pub table: Arc<str>,
    pub register_json_columns: bool,
    pub search_max_limit: Option<i64>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        repository: Arc<dyn DataRepository>,
        columns: Arc<ColumnRecorder>,
    ) -> Self {
        Self {
            repository,
            columns,
            table: Arc::from(config.material.table.as_str()),
            register_json_columns: config.material.register_json_columns,
            search_max_limit: config.search.max_limit,
        }
    }

    /// Open the configured storage backend and load the recorded columns
    pub async fn from_config(config: &AppConfig) -> Result<Self, DatabaseError> {
        let (repository, store): (Arc<dyn DataRepository>, Arc<dyn ColumnStore>) =
            match config.database.storage {
                StorageBackend::Memory => {
                    info!("Using in-memory storage for table '{}'", config.material.table);
                    (Arc::new(MemoryRepository::new()), Arc::new(MemoryColumnStore::new()))
                }
                StorageBackend::Postgres => {
                    let pool = DatabaseManager::connect(&config.database).await?.pool();
                    let repository = PgDataRepository::new(pool.clone());
                    repository.prepare(&config.material.table).await?;
                    let store = PgColumnStore::open(pool, config.material.columns_table.clone()).await?;
                    (Arc::new(repository), Arc::new(store))
                }
            };

        let columns = ColumnRecorder::load(store).await?;
        Ok(Self::new(config, repository, Arc::new(columns)))
    }
}
