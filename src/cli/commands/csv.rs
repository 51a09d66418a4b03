use std::path::Path;

use anyhow::Context;

use crate::cli::client::MaterialClient;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Add rows, keeping what is stored
    Append,
    /// Replace every row and the recorded columns
    Import,
}

pub async fn upload(
    client: &MaterialClient,
    file: &Path,
    mode: UploadMode,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("cannot read {}", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.csv")
        .to_string();

    let message = match mode {
        UploadMode::Append => client.append_csv(&file_name, data).await?,
        UploadMode::Import => client.import_csv(&file_name, data).await?,
    };
    output_success(&output_format, &message)
}
