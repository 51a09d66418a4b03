use serde_json::Value;

use crate::cli::client::MaterialClient;
use crate::cli::OutputFormat;

/// Check the server's /health endpoint; a degraded server is an error
pub async fn health(client: &MaterialClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let (healthy, report) = client.health().await?;

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            let field = |name: &str| report.get(name).and_then(Value::as_str).unwrap_or("-").to_string();
            println!("Server: {}", client.base_url());
            println!("Status: {}", field("status"));
            println!("Table: {}", field("table"));
        }
    }

    if !healthy {
        anyhow::bail!("server at {} is degraded", client.base_url());
    }
    Ok(())
}
