use std::iter;

use axum::extract::{Multipart, State};
use tracing::{info, warn};

use crate::database::record::ID_FIELD;
use crate::error::{ApiError, ApiResult};
use crate::ingest::CsvUpload;

use super::policy::{settle, Endpoint, Step};
use super::AppState;

/// Multipart field carrying the CSV file
const FILE_FIELD: &str = "file";

/// POST /appendcsv - add every row of the uploaded file to the table
pub async fn append_csv(State(state): State<AppState>, multipart: Multipart) -> ApiResult<String> {
    let (filename, upload) = read_csv_upload(multipart).await?;
    info!("Append csv file: {}", filename);

    settle(
        Endpoint::AppendCsv,
        Step::RegisterColumns,
        state.columns.add_many(upload.labels()).await,
        format!("Can not record columns of {}", filename),
    )?;

    let count = save_rows(&state, Endpoint::AppendCsv, &upload).await?;
    Ok(format!("Success : add {} albums.", count))
}

/// POST /importcsv - replace the table contents and columns with the uploaded file
pub async fn import_csv(State(state): State<AppState>, multipart: Multipart) -> ApiResult<String> {
    // Parse before clearing so a bad upload leaves the table untouched
    let (filename, upload) = read_csv_upload(multipart).await?;
    info!("Import csv file: {}", filename);

    settle(
        Endpoint::ImportCsv,
        Step::Clear,
        state.repository.delete_all(&state.table).await,
        format!("Can not clear table --{}--", state.table),
    )?;
    settle(
        Endpoint::ImportCsv,
        Step::Clear,
        state.columns.clear().await,
        "Can not clear recorded columns",
    )?;

    let names: Vec<&str> = iter::once(ID_FIELD)
        .chain(upload.labels().into_iter().filter(|l| *l != ID_FIELD))
        .collect();
    settle(
        Endpoint::ImportCsv,
        Step::RegisterColumns,
        state.columns.add_many(names).await,
        format!("Can not record columns of {}", filename),
    )?;

    let count = save_rows(&state, Endpoint::ImportCsv, &upload).await?;
    Ok(format!("Success : import {} albums.", count))
}

/// Pull the `file` part out of the form and parse it
async fn read_csv_upload(mut multipart: Multipart) -> ApiResult<(String, CsvUpload)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload.csv").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?;
        let upload = CsvUpload::from_bytes(&data)?;
        return Ok((filename, upload));
    }

    warn!("CSV upload without a '{}' field", FILE_FIELD);
    Err(ApiError::bad_request(format!("Missing '{}' field", FILE_FIELD)))
}

/// Save each row in file order; returns how many rows were written
async fn save_rows(state: &AppState, endpoint: Endpoint, upload: &CsvUpload) -> ApiResult<usize> {
    let mut count = 0;
    for record in upload.records() {
        let saved = settle(
            endpoint,
            Step::Write,
            state.repository.save(&record, &state.table).await,
            format!("Can not add data to table --{}-- : {}", state.table, record),
        )?;
        if saved.is_some() {
            info!("Adding object: {}", record.id().unwrap_or_default());
            count += 1;
        }
    }
    Ok(count)
}
