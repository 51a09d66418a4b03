use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::database::record::Record;
use crate::database::repository::SearchFilter;
use crate::error::ApiResult;

use super::policy::{settle, Endpoint, Step};
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    /// Comma separated field names to match against
    pub fields: Option<String>,
    pub limit: Option<i64>,
}

impl SearchQuery {
    /// The filter to hand the repository; none unless the caller narrowed the search
    fn filter(&self, max_limit: Option<i64>) -> Option<SearchFilter> {
        let columns: Vec<String> = self
            .fields
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        let limit = match (self.limit, max_limit) {
            (Some(l), Some(max)) => Some(l.clamp(0, max)),
            (Some(l), None) => Some(l.max(0)),
            (None, _) => None,
        };

        if columns.is_empty() && limit.is_none() {
            None
        } else {
            Some(SearchFilter { columns, limit })
        }
    }
}

/// GET / - every record of the active table
pub async fn list_all(State(state): State<AppState>) -> ApiResult<Json<Vec<Record>>> {
    let records = settle(
        Endpoint::ListAll,
        Step::Fetch,
        state.repository.find_all(&state.table).await,
        format!("Can not list table --{}--", state.table),
    )?
    .unwrap_or_default();
    Ok(Json(records))
}

/// GET /columns - recorded column names
pub async fn list_columns(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.columns.list().await)
}

/// GET /material?query= - fuzzy search; an empty query matches nothing
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Record>>> {
    if params.query.is_empty() {
        return Ok(Json(Vec::new()));
    }

    info!("Searching for '{}'", params.query);
    let filter = params.filter(state.search_max_limit);
    let records = settle(
        Endpoint::Search,
        Step::Fetch,
        state
            .repository
            .fuzzy_search(&params.query, filter.as_ref(), &state.table)
            .await,
        format!("Can not search table --{}-- for '{}'", state.table, params.query),
    )?
    .unwrap_or_default();
    Ok(Json(records))
}

/// POST /material - create a record and return it as stored
pub async fn create(State(state): State<AppState>, body: String) -> ApiResult<Json<Record>> {
    let record = Record::from_json_str(&body)?.with_assigned_id();
    let id = record.id().unwrap_or_default().to_string();

    if state.register_json_columns {
        settle(
            Endpoint::Create,
            Step::RegisterColumns,
            state.columns.add_many(record.field_names()).await,
            "Can not record columns",
        )?;
    }

    settle(
        Endpoint::Create,
        Step::Write,
        state.repository.save(&record, &state.table).await,
        format!("Can not add data to table --{}-- : {}", state.table, record),
    )?;
    info!("Adding object {}", id);

    Ok(Json(refetch(&state, Endpoint::Create, &id).await?))
}

/// PUT /material - update the record named by the payload's id
pub async fn update(State(state): State<AppState>, body: String) -> ApiResult<Json<Record>> {
    let record = Record::from_json_str(&body)?.require_id()?;
    let id = record.id().unwrap_or_default().to_string();

    if state.register_json_columns {
        settle(
            Endpoint::Update,
            Step::RegisterColumns,
            state.columns.add_many(record.field_names()).await,
            "Can not record columns",
        )?;
    }

    let updated = settle(
        Endpoint::Update,
        Step::Write,
        state.repository.update(&record, &state.table).await,
        format!("Can not update data at table --{}-- : {}", state.table, record),
    )?;
    if updated.is_some() {
        info!("Updating object {}", id);
    }

    Ok(Json(refetch(&state, Endpoint::Update, &id).await?))
}

/// GET /material/:id - one record, or `{}` when it does not exist
pub async fn get_by_id(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Record>> {
    info!("Getting object {}", id);
    Ok(Json(refetch(&state, Endpoint::GetById, &id).await?))
}

/// DELETE /material/:id - always answers `Deleted`
pub async fn delete_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<&'static str> {
    let deleted = settle(
        Endpoint::DeleteById,
        Step::Write,
        state.repository.delete_one(&id, &state.table).await,
        format!("Can not find data at table --{}-- : {}", state.table, id),
    )?;
    if deleted.is_some() {
        info!("Deleting object {}", id);
    }
    Ok("Deleted")
}

/// Load the stored shape of a record; an empty record when the policy recovers a miss
async fn refetch(state: &AppState, endpoint: Endpoint, id: &str) -> ApiResult<Record> {
    let record = settle(
        endpoint,
        Step::Fetch,
        state.repository.find_one(id, &state.table).await,
        format!("Can not find data at table --{}-- : {}", state.table, id),
    )?;
    Ok(record.unwrap_or_default())
}
