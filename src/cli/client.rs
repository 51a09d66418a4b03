use std::time::Duration;

use anyhow::Context;
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde_json::Value;
use url::Url;

/// HTTP client for a running Material API server
#[derive(Debug, Clone)]
pub struct MaterialClient {
    http: Client,
    base: Url,
}

impl MaterialClient {
    pub fn new(server: &str) -> anyhow::Result<Self> {
        let base = Url::parse(server).with_context(|| format!("invalid server URL '{}'", server))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("server URL '{}' cannot carry a path", server);
        }
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Base URL with `segments` appended, each one percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn list(&self) -> anyhow::Result<Vec<Value>> {
        let response = send(self.http.get(self.endpoint(&[]))).await?;
        Ok(response.json().await?)
    }

    pub async fn columns(&self) -> anyhow::Result<Vec<String>> {
        let response = send(self.http.get(self.endpoint(&["columns"]))).await?;
        Ok(response.json().await?)
    }

    pub async fn search(
        &self,
        query: &str,
        fields: Option<&str>,
        limit: Option<i64>,
    ) -> anyhow::Result<Vec<Value>> {
        let mut url = self.endpoint(&["material"]);
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("query", query);
            if let Some(fields) = fields {
                params.append_pair("fields", fields);
            }
            if let Some(limit) = limit {
                params.append_pair("limit", &limit.to_string());
            }
        }
        let response = send(self.http.get(url)).await?;
        Ok(response.json().await?)
    }

    pub async fn get(&self, id: &str) -> anyhow::Result<Value> {
        let response = send(self.http.get(self.endpoint(&["material", id]))).await?;
        Ok(response.json().await?)
    }

    pub async fn create(&self, record: &Value) -> anyhow::Result<Value> {
        let response = send(self.http.post(self.endpoint(&["material"])).json(record)).await?;
        Ok(response.json().await?)
    }

    pub async fn update(&self, record: &Value) -> anyhow::Result<Value> {
        let response = send(self.http.put(self.endpoint(&["material"])).json(record)).await?;
        Ok(response.json().await?)
    }

    pub async fn delete(&self, id: &str) -> anyhow::Result<String> {
        let response = send(self.http.delete(self.endpoint(&["material", id]))).await?;
        Ok(response.text().await?)
    }

    pub async fn append_csv(&self, file_name: &str, data: Vec<u8>) -> anyhow::Result<String> {
        self.upload("appendcsv", file_name, data).await
    }

    pub async fn import_csv(&self, file_name: &str, data: Vec<u8>) -> anyhow::Result<String> {
        self.upload("importcsv", file_name, data).await
    }

    async fn upload(&self, path: &str, file_name: &str, data: Vec<u8>) -> anyhow::Result<String> {
        let part = multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = multipart::Form::new().part("file", part);
        let response = send(self.http.post(self.endpoint(&[path])).multipart(form)).await?;
        Ok(response.text().await?)
    }

    /// Health report; a degraded server still answers with a body
    pub async fn health(&self) -> anyhow::Result<(bool, Value)> {
        let response = self.http.get(self.endpoint(&["health"])).send().await?;
        let healthy = response.status().is_success();
        Ok((healthy, response.json().await?))
    }
}

/// Send the request and turn error statuses into errors carrying the server's message
async fn send(request: RequestBuilder) -> anyhow::Result<Response> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);
    anyhow::bail!("server returned {}: {}", status, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_extend_the_base_path() {
        let client = MaterialClient::new("http://localhost:8080").unwrap();
        assert_eq!(client.endpoint(&[]).as_str(), "http://localhost:8080/");
        assert_eq!(client.endpoint(&["material", "1"]).as_str(), "http://localhost:8080/material/1");

        let prefixed = MaterialClient::new("http://example.com/api/").unwrap();
        assert_eq!(prefixed.endpoint(&["columns"]).as_str(), "http://example.com/api/columns");
    }

    #[test]
    fn ids_are_percent_encoded() {
        let client = MaterialClient::new("http://localhost:8080").unwrap();
        assert_eq!(
            client.endpoint(&["material", "a/b c"]).as_str(),
            "http://localhost:8080/material/a%2Fb%20c"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(MaterialClient::new("not a url").is_err());
        assert!(MaterialClient::new("mailto:someone@example.com").is_err());
    }
}
