//! HTTP client for the Cachet admin API.

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Success envelope returned by the server.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// Error envelope returned for failed requests.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// HTTP client for the Cachet admin API.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client pointing at the given base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Return the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    /// GET a versioned endpoint and unwrap the response data.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let resp = send(self.client.get(&url), "GET", &url).await?;
        unwrap_data(resp, &url, &[]).await
    }

    /// GET a versioned endpoint whose body is meaningful even when the
    /// server answers with one of `accepted` (health returns 503 with a report).
    pub async fn get_accepting<T: DeserializeOwned>(
        &self,
        path: &str,
        accepted: &[StatusCode],
    ) -> Result<T> {
        let url = self.url(path);
        let resp = send(self.client.get(&url), "GET", &url).await?;
        unwrap_data(resp, &url, accepted).await
    }

    /// POST a JSON body and unwrap the response data.
    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path);
        let resp = send(self.client.post(&url).json(body), "POST", &url).await?;
        unwrap_data(resp, &url, &[]).await
    }

    /// POST without a body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let resp = send(self.client.post(&url), "POST", &url).await?;
        unwrap_data(resp, &url, &[]).await
    }

    /// DELETE and unwrap the response data.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let resp = send(self.client.delete(&url), "DELETE", &url).await?;
        unwrap_data(resp, &url, &[]).await
    }

    /// Unversioned GET returning the raw JSON body (liveness probe).
    pub async fn get_raw(&self, path: &str) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = send(self.client.get(&url), "GET", &url).await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(api_error(status, resp).await);
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}

async fn send(request: RequestBuilder, method: &str, url: &str) -> Result<Response> {
    request
        .send()
        .await
        .with_context(|| format!("{} {} failed", method, url))
}

async fn unwrap_data<T: DeserializeOwned>(
    resp: Response,
    url: &str,
    accepted: &[StatusCode],
) -> Result<T> {
    let status = resp.status();
    if !status.is_success() && !accepted.contains(&status) {
        return Err(api_error(status, resp).await);
    }

    let api_resp: ApiResponse<T> = resp
        .json()
        .await
        .with_context(|| format!("Failed to parse response from {}", url))?;

    if api_resp.success {
        api_resp
            .data
            .ok_or_else(|| anyhow::anyhow!("API returned success but no data"))
    } else {
        Err(anyhow::anyhow!(
            "API error: {}",
            api_resp.error.unwrap_or_else(|| "Unknown error".into())
        ))
    }
}

async fn api_error(status: StatusCode, resp: Response) -> anyhow::Error {
    let body = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => anyhow::anyhow!(
            "API error ({}): {} [{}]",
            status,
            envelope.error.message,
            envelope.error.code
        ),
        Err(_) => anyhow::anyhow!("API error ({}): {}", status, body),
    }
}

/// Percent-encode a path segment; keys often contain `:` and `/`.
pub fn encode_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b':' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
