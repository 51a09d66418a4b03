//! Test doubles and helpers shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{body::to_bytes, response::Response};
use serde_json::Value;

use crate::config::AppConfig;
use crate::database::columns::{ColumnRecorder, ColumnStore};
use crate::database::manager::DatabaseError;
use crate::database::memory::{MemoryColumnStore, MemoryRepository};
use crate::database::record::Record;
use crate::database::repository::{DataRepository, SearchFilter};
use crate::handlers::AppState;

/// Column store that loads nothing and refuses every write
pub struct BrokenColumnStore;

#[async_trait]
impl ColumnStore for BrokenColumnStore {
    async fn load(&self) -> Result<Vec<String>, DatabaseError> {
        Ok(Vec::new())
    }

    async fn insert(&self, name: &str) -> Result<(), DatabaseError> {
        Err(DatabaseError::schema(format!("column table is read-only ({})", name)))
    }

    async fn clear(&self) -> Result<(), DatabaseError> {
        Err(DatabaseError::schema("column table is read-only"))
    }
}

/// Repository whose every call fails, for exercising the failure policy
pub struct FailingRepository;

#[async_trait]
impl DataRepository for FailingRepository {
    async fn find_all(&self, table: &str) -> Result<Vec<Record>, DatabaseError> {
        Err(DatabaseError::QueryError(format!("cannot read {}", table)))
    }

    async fn find_one(&self, id: &str, table: &str) -> Result<Record, DatabaseError> {
        Err(DatabaseError::not_found(format!("record {} not found in {}", id, table)))
    }

    async fn fuzzy_search(
        &self,
        _query: &str,
        _filter: Option<&SearchFilter>,
        table: &str,
    ) -> Result<Vec<Record>, DatabaseError> {
        Err(DatabaseError::QueryError(format!("cannot search {}", table)))
    }

    async fn save(&self, _record: &Record, table: &str) -> Result<(), DatabaseError> {
        Err(DatabaseError::write(format!("cannot write {}", table)))
    }

    async fn update(&self, _record: &Record, table: &str) -> Result<(), DatabaseError> {
        Err(DatabaseError::write(format!("cannot write {}", table)))
    }

    async fn delete_one(&self, _id: &str, table: &str) -> Result<(), DatabaseError> {
        Err(DatabaseError::write(format!("cannot write {}", table)))
    }

    async fn delete_all(&self, table: &str) -> Result<(), DatabaseError> {
        Err(DatabaseError::write(format!("cannot write {}", table)))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Err(DatabaseError::QueryError("store offline".to_string()))
    }
}

/// Memory repository whose saves start failing after a fixed number succeed
pub struct FlakyRepository {
    inner: MemoryRepository,
    saves_left: AtomicUsize,
}

impl FlakyRepository {
    pub fn failing_after(saves: usize) -> Self {
        Self { inner: MemoryRepository::new(), saves_left: AtomicUsize::new(saves) }
    }
}

#[async_trait]
impl DataRepository for FlakyRepository {
    async fn find_all(&self, table: &str) -> Result<Vec<Record>, DatabaseError> {
        self.inner.find_all(table).await
    }

    async fn find_one(&self, id: &str, table: &str) -> Result<Record, DatabaseError> {
        self.inner.find_one(id, table).await
    }

    async fn fuzzy_search(
        &self,
        query: &str,
        filter: Option<&SearchFilter>,
        table: &str,
    ) -> Result<Vec<Record>, DatabaseError> {
        self.inner.fuzzy_search(query, filter, table).await
    }

    async fn save(&self, record: &Record, table: &str) -> Result<(), DatabaseError> {
        let allowed = self
            .saves_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(DatabaseError::write(format!("disk full writing {}", table)));
        }
        self.inner.save(record, table).await
    }

    async fn update(&self, record: &Record, table: &str) -> Result<(), DatabaseError> {
        self.inner.update(record, table).await
    }

    async fn delete_one(&self, id: &str, table: &str) -> Result<(), DatabaseError> {
        self.inner.delete_one(id, table).await
    }

    async fn delete_all(&self, table: &str) -> Result<(), DatabaseError> {
        self.inner.delete_all(table).await
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.inner.ping().await
    }
}

/// Config for the `albums` table on the memory backend
pub fn test_config(register_json_columns: bool) -> AppConfig {
    let register = register_json_columns.to_string();
    AppConfig::from_lookup(move |key: &str| match key {
        "MATERIAL_TABLE" => Some("albums".to_string()),
        "MATERIAL_STORAGE" => Some("memory".to_string()),
        "MATERIAL_REGISTER_JSON_COLUMNS" => Some(register.clone()),
        _ => None,
    })
    .expect("test config")
}

/// Fresh in-memory state with no rows and no recorded columns
pub async fn test_state(register_json_columns: bool) -> AppState {
    let columns = ColumnRecorder::load(Arc::new(MemoryColumnStore::new()))
        .await
        .expect("memory column store");
    AppState::new(
        &test_config(register_json_columns),
        Arc::new(MemoryRepository::new()),
        Arc::new(columns),
    )
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}
