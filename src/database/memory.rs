//! In-process storage backend, used for development runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::database::columns::ColumnStore;
use crate::database::manager::DatabaseError;
use crate::database::record::Record;
use crate::database::repository::{record_id, DataRepository, SearchFilter};

#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_query(record: &Record, needle: &str, filter: Option<&SearchFilter>) -> bool {
    let columns = filter.map(|f| f.columns.as_slice()).unwrap_or_default();
    record
        .fields()
        .filter(|(name, _)| columns.is_empty() || columns.iter().any(|c| c == name))
        .filter_map(|(_, value)| value.search_text())
        .any(|text| text.to_lowercase().contains(needle))
}

fn merge_into(stored: &mut Record, incoming: &Record) {
    for (name, value) in incoming.fields() {
        stored.set(name, value.clone());
    }
}

#[async_trait]
impl DataRepository for MemoryRepository {
    async fn find_all(&self, table: &str) -> Result<Vec<Record>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.get(table).cloned().unwrap_or_default())
    }

    async fn find_one(&self, id: &str, table: &str) -> Result<Record, DatabaseError> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .and_then(|rows| rows.iter().find(|r| r.id() == Some(id)))
            .cloned()
            .ok_or_else(|| DatabaseError::not_found(format!("record {} not found in {}", id, table)))
    }

    async fn fuzzy_search(
        &self,
        query: &str,
        filter: Option<&SearchFilter>,
        table: &str,
    ) -> Result<Vec<Record>, DatabaseError> {
        let needle = query.to_lowercase();
        let limit = filter
            .and_then(|f| f.limit)
            .map(|l| l.max(0) as usize)
            .unwrap_or(usize::MAX);

        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| matches_query(r, &needle, filter))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn save(&self, record: &Record, table: &str) -> Result<(), DatabaseError> {
        let id = record_id(record)?;
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();
        match rows.iter().position(|r| r.id() == Some(id)) {
            Some(index) => merge_into(&mut rows[index], record),
            None => rows.push(record.clone()),
        }
        Ok(())
    }

    async fn update(&self, record: &Record, table: &str) -> Result<(), DatabaseError> {
        let id = record_id(record)?;
        let mut tables = self.tables.write().await;
        let stored = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| r.id() == Some(id)))
            .ok_or_else(|| DatabaseError::not_found(format!("record {} not found in {}", id, table)))?;
        merge_into(stored, record);
        Ok(())
    }

    async fn delete_one(&self, id: &str, table: &str) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| DatabaseError::not_found(format!("record {} not found in {}", id, table)))?;
        let before = rows.len();
        rows.retain(|r| r.id() != Some(id));
        if rows.len() == before {
            return Err(DatabaseError::not_found(format!("record {} not found in {}", id, table)));
        }
        Ok(())
    }

    async fn delete_all(&self, table: &str) -> Result<(), DatabaseError> {
        self.tables.write().await.remove(table);
        Ok(())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

/// Column side table kept in memory
#[derive(Default)]
pub struct MemoryColumnStore {
    names: RwLock<Vec<String>>,
}

impl MemoryColumnStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ColumnStore for MemoryColumnStore {
    async fn load(&self) -> Result<Vec<String>, DatabaseError> {
        Ok(self.names.read().await.clone())
    }

    async fn insert(&self, name: &str) -> Result<(), DatabaseError> {
        let mut names = self.names.write().await;
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), DatabaseError> {
        self.names.write().await.clear();
        Ok(())
    }
}
