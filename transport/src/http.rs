//! reqwest-backed transport

use crate::{Transport, TransportError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// HTTP transport bound to one base URL and API key
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    /// Create a transport, optionally with a per-request timeout
    ///
    /// # Errors
    ///
    /// Returns `TransportError::RequestFailed` if the HTTP client cannot be built
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Base URL requests are sent to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, body: Value) -> Result<Value, TransportError> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, "POST");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("accept", "application/json")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json::<Value>()
                .await
                .map_err(|e| TransportError::Decode(e.to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(TransportError::RateLimited),
            StatusCode::UNAUTHORIZED => Err(TransportError::Unauthorized),
            status => {
                let message = response.text().await.unwrap_or_default();
                tracing::warn!(%url, status = status.as_u16(), "Platform returned an error");
                Err(TransportError::ApiError {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}
