#![allow(dead_code)]

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use tokio::task::JoinHandle;

use material_api::config::AppConfig;
use material_api::handlers::AppState;
use material_api::server;

/// An in-process server on its own port with fresh in-memory storage
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn spawn(extra: &[(&str, &str)]) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut vars: Vec<(String, String)> = vec![
            ("MATERIAL_TABLE".into(), "albums".into()),
            ("MATERIAL_STORAGE".into(), "memory".into()),
            ("API_ENABLE_REQUEST_LOGGING".into(), "false".into()),
        ];
        vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        let config = AppConfig::from_lookup(move |key: &str| {
            vars.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        })?;

        let state = AppState::from_config(&config).await?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;

        let handle = tokio::spawn(async move {
            let _ = server::serve(listener, state, &config.api, std::future::pending()).await;
        });

        Ok(Self { port, base_url, handle })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start a server with the default test settings
pub async fn start_server() -> Result<TestServer> {
    start_server_with(&[]).await
}

/// Start a server with extra configuration variables layered over the defaults
pub async fn start_server_with(extra: &[(&str, &str)]) -> Result<TestServer> {
    let server = TestServer::spawn(extra).await?;
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Multipart form with `csv` as the `file` field
pub fn csv_form(file_name: &str, csv: &str) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(csv.as_bytes().to_vec()).file_name(file_name.to_string());
    reqwest::multipart::Form::new().part("file", part)
}
