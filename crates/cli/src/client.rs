//! API client for the monitoring server

use anyhow::{Context, Result};
use monitor_lib::{HealthResponse, Level, MetricResult, MonitoringRequest};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the monitoring server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

/// Error body returned by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// GET `path` with `query` encoded as query string
    pub async fn get<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T> {
        let response = self.send(path, query).await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Run a monitoring query at `level`
    pub async fn query(&self, level: Level, request: &MonitoringRequest) -> Result<MetricResult> {
        let path = format!("api/v1/monitoring/{}", level.resource_name());
        self.get(&path, request).await
    }

    /// Server health; a 503 still carries the component report
    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self.send("healthz", &()).await?;

        match response.status() {
            s if s.is_success() || s == StatusCode::SERVICE_UNAVAILABLE => {
                response.json().await.context("Failed to parse response")
            }
            _ => Err(api_error(response).await),
        }
    }

    async fn send<Q: Serialize + ?Sized>(&self, path: &str, query: &Q) -> Result<Response> {
        let url = self.base_url.join(path).context("Invalid path")?;

        self.client
            .get(url)
            .query(query)
            .send()
            .await
            .context("Failed to send request")
    }
}

async fn api_error(response: Response) -> anyhow::Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error)
        .unwrap_or(body);
    anyhow::anyhow!("API error ({}): {}", status, message)
}
