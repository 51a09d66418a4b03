pub mod client;
pub mod commands;
pub mod utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::cli::client::MaterialClient;
use crate::cli::commands::csv::UploadMode;

#[derive(Parser)]
#[command(name = "material")]
#[command(about = "Material CLI - Command-line client for the Material API")]
#[command(version)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "MATERIAL_API_URL",
        default_value = "http://localhost:8080",
        help = "Base URL of the Material API server"
    )]
    pub server: String,

    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "List every record")]
    List,

    #[command(about = "List recorded column names")]
    Columns,

    #[command(about = "Fuzzy search records")]
    Search {
        #[arg(help = "Text to look for")]
        query: String,
        #[arg(long, help = "Comma separated fields to search (default: all)")]
        fields: Option<String>,
        #[arg(long, help = "Maximum number of records to return")]
        limit: Option<i64>,
    },

    #[command(about = "Get one record by id")]
    Get {
        #[arg(help = "Record ID")]
        id: String,
    },

    #[command(about = "Create record from stdin")]
    Create,

    #[command(about = "Update record from stdin (payload must carry its id)")]
    Update,

    #[command(about = "Delete one record by id")]
    Delete {
        #[arg(help = "Record ID to delete")]
        id: String,
    },

    #[command(about = "Append the rows of a CSV file")]
    Append {
        #[arg(help = "CSV file path")]
        file: PathBuf,
    },

    #[command(about = "Replace all records with the rows of a CSV file")]
    Import {
        #[arg(help = "CSV file path")]
        file: PathBuf,
    },

    #[command(about = "Check server health status")]
    Health,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json && !cli.text {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let client = MaterialClient::new(&cli.server)?;

    use commands::{csv, material, server};
    match cli.command {
        Commands::List => material::list(&client, output_format).await,
        Commands::Columns => material::columns(&client, output_format).await,
        Commands::Search { query, fields, limit } => {
            material::search(&client, &query, fields.as_deref(), limit, output_format).await
        }
        Commands::Get { id } => material::get(&client, &id, output_format).await,
        Commands::Create => material::create(&client, output_format).await,
        Commands::Update => material::update(&client, output_format).await,
        Commands::Delete { id } => material::delete(&client, &id, output_format).await,
        Commands::Append { file } => csv::upload(&client, &file, UploadMode::Append, output_format).await,
        Commands::Import { file } => csv::upload(&client, &file, UploadMode::Import, output_format).await,
        Commands::Health => server::health(&client, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_with_filters() {
        let cli = Cli::try_parse_from([
            "material", "--server", "http://music:9000", "--json", "search", "beatles", "--fields", "artist",
            "--limit", "5",
        ])
        .unwrap();

        assert_eq!(cli.server, "http://music:9000");
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        match cli.command {
            Commands::Search { query, fields, limit } => {
                assert_eq!(query, "beatles");
                assert_eq!(fields.as_deref(), Some("artist"));
                assert_eq!(limit, Some(5));
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn text_is_the_default_format() {
        let cli = Cli::try_parse_from(["material", "list"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Text));
    }
}
