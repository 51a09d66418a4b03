//! Postgres backend.
//!
//! Rows live in a table with `id TEXT PRIMARY KEY` and one JSONB column per
//! field; columns are added on demand the first time a field is written.
//! Rows are read back through `row_to_json`, so a stored record carries
//! every column of the table (null where the row never set it).

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{PgPool, Postgres, Row};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::database::columns::ColumnStore;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::record::{FieldValue, Record, ID_FIELD};
use crate::database::repository::{record_id, DataRepository, SearchFilter};

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

pub struct PgDataRepository {
    pool: PgPool,
    /// Columns known to exist, per table
    known_columns: RwLock<HashMap<String, HashSet<String>>>,
}

impl PgDataRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, known_columns: RwLock::new(HashMap::new()) }
    }

    /// Create the table if needed and cache its columns
    pub async fn prepare(&self, table: &str) -> Result<(), DatabaseError> {
        self.columns(table).await.map(|_| ())
    }

    async fn columns(&self, table: &str) -> Result<HashSet<String>, DatabaseError> {
        {
            let known = self.known_columns.read().await;
            if let Some(columns) = known.get(table) {
                return Ok(columns.clone());
            }
        }

        let quoted = quoted_table(table)?;
        sqlx::query(&format!("CREATE TABLE IF NOT EXISTS {} (\"id\" TEXT PRIMARY KEY)", quoted))
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::schema)?;

        let rows = sqlx::query(
            "SELECT column_name::text AS name FROM information_schema.columns
             WHERE table_schema = current_schema() AND table_name = $1",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut columns = HashSet::new();
        for row in rows {
            columns.insert(row.try_get::<String, _>("name")?);
        }

        info!("Prepared table {} with {} columns", table, columns.len());
        self.known_columns.write().await.insert(table.to_string(), columns.clone());
        Ok(columns)
    }

    /// Add a JSONB column for every field of the record the table lacks
    async fn ensure_columns(&self, record: &Record, table: &str) -> Result<(), DatabaseError> {
        let existing = self.columns(table).await?;
        let missing: Vec<&str> = record
            .data_fields()
            .map(|(name, _)| name)
            .filter(|name| !existing.contains(*name))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let quoted = quoted_table(table)?;
        for name in &missing {
            let sql = format!(
                "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} JSONB",
                quoted,
                DatabaseManager::quote_identifier(name)
            );
            sqlx::query(&sql).execute(&self.pool).await.map_err(DatabaseError::schema)?;
            debug!("Added column {} to {}", name, table);
        }

        let mut known = self.known_columns.write().await;
        let columns = known.entry(table.to_string()).or_default();
        columns.extend(missing.iter().map(|name| name.to_string()));
        Ok(())
    }

    async fn select_rows(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Record>, DatabaseError> {
        let mut q = sqlx::query(sql);
        for p in params {
            q = bind_param(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }
}

fn quoted_table(table: &str) -> Result<String, DatabaseError> {
    if !DatabaseManager::is_valid_identifier(table) {
        return Err(DatabaseError::InvalidIdentifier(table.to_string()));
    }
    Ok(DatabaseManager::quote_identifier(table))
}

fn row_to_record(row: &PgRow) -> Result<Record, DatabaseError> {
    match row.try_get::<Value, _>("row")? {
        Value::Object(map) => Ok(Record::from_stored(map)),
        other => Err(DatabaseError::QueryError(format!("unexpected row format: {}", other))),
    }
}

/// Escape LIKE wildcards so the query is matched literally
fn like_pattern(query: &str) -> String {
    let escaped = query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}

fn bind_param(q: PgQuery<'_>, v: Value) -> PgQuery<'_> {
    match v {
        // SQL NULL rather than a JSON null document
        Value::Null => {
            let none: Option<Value> = None;
            q.bind(none)
        }
        Value::String(s) => q.bind(s),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        other => q.bind(other),
    }
}

/// JSONB parameters are bound as documents, never as bare scalars
fn bind_jsonb<'q>(q: PgQuery<'q>, value: &FieldValue) -> PgQuery<'q> {
    match value {
        FieldValue::Null => {
            let none: Option<Value> = None;
            q.bind(none)
        }
        other => q.bind(other.to_json()),
    }
}

#[async_trait]
impl DataRepository for PgDataRepository {
    async fn find_all(&self, table: &str) -> Result<Vec<Record>, DatabaseError> {
        self.columns(table).await?;
        let sql = format!("SELECT row_to_json(t) AS row FROM {} t", quoted_table(table)?);
        self.select_rows(&sql, vec![]).await
    }

    async fn find_one(&self, id: &str, table: &str) -> Result<Record, DatabaseError> {
        self.columns(table).await?;
        let sql = format!(
            "SELECT row_to_json(t) AS row FROM {} t WHERE t.\"id\" = $1",
            quoted_table(table)?
        );
        self.select_rows(&sql, vec![Value::String(id.to_string())])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::not_found(format!("record {} not found in {}", id, table)))
    }

    async fn fuzzy_search(
        &self,
        query: &str,
        filter: Option<&SearchFilter>,
        table: &str,
    ) -> Result<Vec<Record>, DatabaseError> {
        let existing = self.columns(table).await?;
        let mut sql = format!("SELECT row_to_json(t) AS row FROM {} t WHERE ", quoted_table(table)?);
        let mut params = vec![Value::String(like_pattern(query))];

        let requested = filter.map(|f| f.columns.as_slice()).unwrap_or_default();
        if requested.is_empty() {
            sql.push_str("t::text ILIKE $1");
        } else {
            // Unknown columns cannot match anything
            let searchable: Vec<String> = requested
                .iter()
                .filter(|c| existing.contains(c.as_str()))
                .map(|c| format!("t.{}::text ILIKE $1", DatabaseManager::quote_identifier(c)))
                .collect();
            if searchable.is_empty() {
                return Ok(vec![]);
            }
            sql.push('(');
            sql.push_str(&searchable.join(" OR "));
            sql.push(')');
        }

        if let Some(limit) = filter.and_then(|f| f.limit) {
            sql.push_str(" LIMIT $2");
            params.push(Value::from(limit.max(0)));
        }

        self.select_rows(&sql, params).await
    }

    async fn save(&self, record: &Record, table: &str) -> Result<(), DatabaseError> {
        let id = record_id(record)?.to_string();
        self.ensure_columns(record, table).await?;

        let fields: Vec<(&str, &FieldValue)> = record.data_fields().collect();
        let mut columns = vec![DatabaseManager::quote_identifier(ID_FIELD)];
        let mut placeholders = vec!["$1".to_string()];
        for (i, (name, _)) in fields.iter().enumerate() {
            columns.push(DatabaseManager::quote_identifier(name));
            placeholders.push(format!("${}", i + 2));
        }

        let conflict = if fields.is_empty() {
            "DO NOTHING".to_string()
        } else {
            let updates: Vec<String> = columns[1..]
                .iter()
                .map(|c| format!("{} = EXCLUDED.{}", c, c))
                .collect();
            format!("DO UPDATE SET {}", updates.join(", "))
        };

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT (\"id\") {}",
            quoted_table(table)?,
            columns.join(", "),
            placeholders.join(", "),
            conflict
        );

        let mut q = sqlx::query(&sql).bind(id);
        for (_, value) in &fields {
            q = bind_jsonb(q, value);
        }
        q.execute(&self.pool).await.map_err(DatabaseError::write)?;
        Ok(())
    }

    async fn update(&self, record: &Record, table: &str) -> Result<(), DatabaseError> {
        let id = record_id(record)?.to_string();
        self.ensure_columns(record, table).await?;

        let fields: Vec<(&str, &FieldValue)> = record.data_fields().collect();
        if fields.is_empty() {
            // Nothing to overwrite; still report a missing row
            return self.find_one(&id, table).await.map(|_| ());
        }

        let assignments: Vec<String> = fields
            .iter()
            .enumerate()
            .map(|(i, (name, _))| format!("{} = ${}", DatabaseManager::quote_identifier(name), i + 2))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE \"id\" = $1",
            quoted_table(table)?,
            assignments.join(", ")
        );

        let mut q = sqlx::query(&sql).bind(id.clone());
        for (_, value) in &fields {
            q = bind_jsonb(q, value);
        }
        let result = q.execute(&self.pool).await.map_err(DatabaseError::write)?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("record {} not found in {}", id, table)));
        }
        Ok(())
    }

    async fn delete_one(&self, id: &str, table: &str) -> Result<(), DatabaseError> {
        self.columns(table).await?;
        let sql = format!("DELETE FROM {} WHERE \"id\" = $1", quoted_table(table)?);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::write)?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("record {} not found in {}", id, table)));
        }
        Ok(())
    }

    async fn delete_all(&self, table: &str) -> Result<(), DatabaseError> {
        self.columns(table).await?;
        let sql = format!("DELETE FROM {}", quoted_table(table)?);
        sqlx::query(&sql).execute(&self.pool).await.map_err(DatabaseError::write)?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}

/// Column names persisted in a side table, in first-seen order
pub struct PgColumnStore {
    pool: PgPool,
    table: String,
}

impl PgColumnStore {
    /// Open the side table, creating it when missing
    pub async fn open(pool: PgPool, table: impl Into<String>) -> Result<Self, DatabaseError> {
        let store = Self { pool, table: table.into() };
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\"position\" BIGSERIAL, \"name\" TEXT PRIMARY KEY)",
            quoted_table(&store.table)?
        );
        sqlx::query(&sql).execute(&store.pool).await.map_err(DatabaseError::schema)?;
        Ok(store)
    }
}

#[async_trait]
impl ColumnStore for PgColumnStore {
    async fn load(&self) -> Result<Vec<String>, DatabaseError> {
        let sql = format!("SELECT \"name\" FROM {} ORDER BY \"position\"", quoted_table(&self.table)?);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(DatabaseError::from))
            .collect()
    }

    async fn insert(&self, name: &str) -> Result<(), DatabaseError> {
        let sql = format!(
            "INSERT INTO {} (\"name\") VALUES ($1) ON CONFLICT (\"name\") DO NOTHING",
            quoted_table(&self.table)?
        );
        sqlx::query(&sql)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::schema)?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), DatabaseError> {
        let sql = format!("DELETE FROM {}", quoted_table(&self.table)?);
        sqlx::query(&sql).execute(&self.pool).await.map_err(DatabaseError::schema)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("abbey"), "%abbey%");
        assert_eq!(like_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }

    #[test]
    fn table_names_are_validated_before_quoting() {
        assert_eq!(quoted_table("albums").unwrap(), "\"albums\"");
        assert!(matches!(
            quoted_table("albums\"; DROP TABLE x; --"),
            Err(DatabaseError::InvalidIdentifier(_))
        ));
    }
}
