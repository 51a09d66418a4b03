use async_trait::async_trait;

use crate::database::manager::DatabaseError;
use crate::database::record::Record;

/// Optional narrowing of a fuzzy search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    /// Only match against these fields (all fields when empty)
    pub columns: Vec<String>,
    pub limit: Option<i64>,
}

/// Generic row store keyed by table name.
///
/// Lookups that find nothing fail with `DatabaseError::NotFound`; write
/// failures surface as `DatabaseError::Write` so callers can decide per
/// operation whether to recover.
#[async_trait]
pub trait DataRepository: Send + Sync {
    async fn find_all(&self, table: &str) -> Result<Vec<Record>, DatabaseError>;

    async fn find_one(&self, id: &str, table: &str) -> Result<Record, DatabaseError>;

    async fn fuzzy_search(
        &self,
        query: &str,
        filter: Option<&SearchFilter>,
        table: &str,
    ) -> Result<Vec<Record>, DatabaseError>;

    /// Insert the record, replacing the stored fields of an existing id
    async fn save(&self, record: &Record, table: &str) -> Result<(), DatabaseError>;

    /// Overwrite the given fields of an existing record
    async fn update(&self, record: &Record, table: &str) -> Result<(), DatabaseError>;

    async fn delete_one(&self, id: &str, table: &str) -> Result<(), DatabaseError>;

    async fn delete_all(&self, table: &str) -> Result<(), DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;
}

/// The id a write needs, or a write error naming the record
pub(crate) fn record_id<'a>(record: &'a Record) -> Result<&'a str, DatabaseError> {
    record
        .id()
        .ok_or_else(|| DatabaseError::write(format!("{} has no id", record)))
}
