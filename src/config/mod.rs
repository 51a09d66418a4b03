use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

use crate::database::manager::DatabaseManager;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub material: MaterialConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialConfig {
    /// The single table every operation targets
    pub table: String,
    /// Side table holding the recorded column names
    pub columns_table: String,
    /// Whether JSON create/update also record their field names
    pub register_json_columns: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub storage: StorageBackend,
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub max_upload_bytes: usize,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub max_limit: Option<i64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MATERIAL_TABLE must be set to the table to serve")]
    MissingTable,

    #[error("{var} is not a valid table name: {value}")]
    InvalidTableName { var: &'static str, value: String },

    #[error("MATERIAL_STORAGE must be 'postgres' or 'memory', got '{0}'")]
    InvalidStorage(String),

    #[error("DATABASE_URL is required for postgres storage")]
    MissingDatabaseUrl,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let table = lookup("MATERIAL_TABLE")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingTable)?;
        validate_table_name("MATERIAL_TABLE", &table)?;

        let columns_table = lookup("MATERIAL_COLUMNS_TABLE").unwrap_or_else(|| format!("{}_columns", table));
        validate_table_name("MATERIAL_COLUMNS_TABLE", &columns_table)?;

        let material = MaterialConfig { table, columns_table, register_json_columns: false };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(material),
            Environment::Staging => Self::staging(material),
            Environment::Development => Self::development(material),
        }
        .with_overrides(&lookup)?;

        if config.database.storage == StorageBackend::Postgres && config.database.url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        Ok(config)
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Material overrides
        if let Some(v) = lookup("MATERIAL_REGISTER_JSON_COLUMNS") {
            self.material.register_json_columns = v.parse().unwrap_or(self.material.register_json_columns);
        }

        // Database overrides
        if let Some(v) = lookup("MATERIAL_STORAGE") {
            self.database.storage = match v.to_lowercase().as_str() {
                "postgres" | "postgresql" => StorageBackend::Postgres,
                "memory" => StorageBackend::Memory,
                _ => return Err(ConfigError::InvalidStorage(v)),
            };
        }
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Some(v) = lookup("MATERIAL_API_PORT").or_else(|| lookup("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Some(v) = lookup("API_MAX_UPLOAD_BYTES") {
            self.api.max_upload_bytes = v.parse().unwrap_or(self.api.max_upload_bytes);
        }
        if let Some(v) = lookup("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Search overrides
        if let Some(v) = lookup("SEARCH_MAX_LIMIT") {
            self.search.max_limit = v.parse().ok();
        }

        Ok(self)
    }

    fn development(material: MaterialConfig) -> Self {
        Self {
            environment: Environment::Development,
            material,
            database: DatabaseConfig {
                storage: StorageBackend::Postgres,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                port: 8080,
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
                enable_request_logging: true,
            },
            search: SearchConfig { max_limit: Some(1000) },
        }
    }

    fn staging(material: MaterialConfig) -> Self {
        Self {
            environment: Environment::Staging,
            material,
            database: DatabaseConfig {
                storage: StorageBackend::Postgres,
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                port: 8080,
                max_upload_bytes: 5 * 1024 * 1024, // 5MB
                enable_request_logging: true,
            },
            search: SearchConfig { max_limit: Some(500) },
        }
    }

    fn production(material: MaterialConfig) -> Self {
        Self {
            environment: Environment::Production,
            material,
            database: DatabaseConfig {
                storage: StorageBackend::Postgres,
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                port: 8080,
                max_upload_bytes: 2 * 1024 * 1024, // 2MB
                enable_request_logging: false,
            },
            search: SearchConfig { max_limit: Some(100) },
        }
    }
}

fn validate_table_name(var: &'static str, value: &str) -> Result<(), ConfigError> {
    if DatabaseManager::is_valid_identifier(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidTableName { var, value: value.to_string() })
    }
}
