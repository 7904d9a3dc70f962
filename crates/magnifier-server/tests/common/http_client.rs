//! HTTP client helpers for tests.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TIMEOUT_SECS);

pub struct TestClient {
    client: reqwest::Client,
    base_url: String,
}

/// A proxied response plus its `X-Cache-Status` header.
#[derive(Debug)]
pub struct Proxied<T> {
    pub body: T,
    pub cache_status: String,
}

impl TestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    fn cache_status(resp: &reqwest::Response) -> String {
        resp.headers()
            .get("x-cache-status")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("unknown")
            .to_string()
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, TestClientError> {
        match resp.status().as_u16() {
            200 => Ok(resp),
            400 => Err(TestClientError::BadRequest(resp.text().await?)),
            401 => Err(TestClientError::Unauthorized),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(TestClientError::UnexpectedStatus(status, body))
            }
        }
    }

    pub async fn company(&self, tax_id: &str) -> Result<Proxied<String>, TestClientError> {
        let resp = self
            .client
            .get(self.url("/api/company/twincn"))
            .query(&[("no", tax_id)])
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let cache_status = Self::cache_status(&resp);

        Ok(Proxied {
            body: resp.text().await?,
            cache_status,
        })
    }

    pub async fn tender_search(
        &self,
        tax_id: &str,
        page: Option<u32>,
    ) -> Result<Proxied<Value>, TestClientError> {
        let mut query = vec![("taxId", tax_id.to_string())];
        if let Some(page) = page {
            query.push(("page", page.to_string()));
        }
        let resp = self
            .client
            .get(self.url("/api/tender-search-proxy"))
            .query(&query)
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let cache_status = Self::cache_status(&resp);

        Ok(Proxied {
            body: resp.json().await?,
            cache_status,
        })
    }

    pub async fn tender_detail(
        &self,
        unit_id: &str,
        job_number: &str,
    ) -> Result<Proxied<Value>, TestClientError> {
        let resp = self
            .client
            .get(self.url("/api/tender-detail-proxy"))
            .query(&[("unit_id", unit_id), ("job_number", job_number)])
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let cache_status = Self::cache_status(&resp);

        Ok(Proxied {
            body: resp.json().await?,
            cache_status,
        })
    }

    /// Posts `prompt` and returns the decoded `data:` payloads once the stream ends.
    pub async fn generate(&self, prompt: &str) -> Result<Vec<Value>, TestClientError> {
        let resp = self
            .client
            .post(self.url("/api/gemini/stream"))
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await?;
        let body = Self::check(resp).await?.text().await?;

        Ok(body
            .lines()
            .filter_map(|line| line.strip_prefix("data: "))
            .filter_map(|data| serde_json::from_str(data).ok())
            .collect())
    }

    pub async fn run_script(
        &self,
        script: &str,
        token: Option<&str>,
    ) -> Result<String, TestClientError> {
        let mut builder = self
            .client
            .post(self.url("/api/admin/run-script"))
            .json(&serde_json::json!({ "scriptName": script }));
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        let resp = Self::check(builder.send().await?).await?;
        Ok(resp.text().await?)
    }

    pub async fn health(&self) -> Result<HealthResponse, TestClientError> {
        let resp = self.client.get(self.url("/api/health")).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub version: String,
    pub database: String,
}

impl HealthResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TestClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0} - Body: {1}")]
    UnexpectedStatus(u16, String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_url_building() {
        let client = TestClient::new("http://localhost:3000");
        assert_eq!(
            client.url("/api/health"),
            "http://localhost:3000/api/health"
        );
        assert_eq!(client.url("api/health"), "http://localhost:3000/api/health");
    }
}
