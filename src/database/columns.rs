//! Known column names of the active table.
//!
//! The recorder tracks field names for discovery (`GET /columns`); it never
//! alters the table itself. Names are kept in the order they were first seen.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::database::manager::DatabaseError;

/// Persistence for the recorded column names
#[async_trait]
pub trait ColumnStore: Send + Sync {
    async fn load(&self) -> Result<Vec<String>, DatabaseError>;
    async fn insert(&self, name: &str) -> Result<(), DatabaseError>;
    async fn clear(&self) -> Result<(), DatabaseError>;
}

/// Process-wide column set shared by every request
pub struct ColumnRecorder {
    store: Arc<dyn ColumnStore>,
    columns: RwLock<Vec<String>>,
}

impl ColumnRecorder {
    /// Build the recorder from whatever the store already holds
    pub async fn load(store: Arc<dyn ColumnStore>) -> Result<Self, DatabaseError> {
        let columns = store.load().await?;
        debug!("Loaded {} known columns", columns.len());
        Ok(Self { store, columns: RwLock::new(columns) })
    }

    pub async fn list(&self) -> Vec<String> {
        self.columns.read().await.clone()
    }

    /// Record one column name. Adding a known name is a no-op; a store failure
    /// is reported as `DatabaseError::Schema` and leaves the set unchanged.
    pub async fn add(&self, name: &str) -> Result<(), DatabaseError> {
        let mut columns = self.columns.write().await;
        if columns.iter().any(|c| c == name) {
            return Ok(());
        }
        self.store.insert(name).await.map_err(|e| match e {
            DatabaseError::Schema(msg) => DatabaseError::Schema(msg),
            other => DatabaseError::schema(format!("cannot record column '{}': {}", name, other)),
        })?;
        columns.push(name.to_string());
        Ok(())
    }

    /// Record several names, stopping at the first failure
    pub async fn add_many<I, S>(&self, names: I) -> Result<(), DatabaseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.add(name.as_ref()).await?;
        }
        Ok(())
    }

    /// Forget every recorded column
    pub async fn clear(&self) -> Result<(), DatabaseError> {
        let mut columns = self.columns.write().await;
        self.store.clear().await?;
        columns.clear();
        Ok(())
    }
}
