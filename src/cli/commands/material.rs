use crate::cli::client::MaterialClient;
use crate::cli::utils::{output_list, output_record, output_records, output_success, read_stdin_json};
use crate::cli::OutputFormat;

pub async fn list(client: &MaterialClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let records = client.list().await?;
    output_records(&output_format, &records)
}

pub async fn columns(client: &MaterialClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let columns = client.columns().await?;
    output_list(&output_format, &columns)
}

pub async fn search(
    client: &MaterialClient,
    query: &str,
    fields: Option<&str>,
    limit: Option<i64>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let records = client.search(query, fields, limit).await?;
    output_records(&output_format, &records)
}

pub async fn get(client: &MaterialClient, id: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let record = client.get(id).await?;
    output_record(&output_format, &record)
}

/// Create a record read from stdin
pub async fn create(client: &MaterialClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let input = read_stdin_json()?;
    let record = client.create(&input).await?;
    output_record(&output_format, &record)
}

/// Update the record named by the `id` of the stdin payload
pub async fn update(client: &MaterialClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let input = read_stdin_json()?;
    if input.get("id").map_or(true, |id| id.is_null()) {
        anyhow::bail!("update payload needs an \"id\" field");
    }
    let record = client.update(&input).await?;
    output_record(&output_format, &record)
}

pub async fn delete(client: &MaterialClient, id: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let message = client.delete(id).await?;
    output_success(&output_format, &format!("{} {}", message, id))
}
