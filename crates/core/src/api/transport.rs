use async_trait::async_trait;
use reqwest::{header::HeaderMap, Method};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// Fully prepared request handed to a [`Transport`].
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the API base URL, e.g. `/cliente/cad`.
    pub path: String,
    /// Headers chosen by the client (content type, authorization).
    pub headers: HeaderMap,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Header value as text, if present and printable.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Raw response: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body, possibly empty.
    pub body: String,
}

impl ApiResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends prepared requests somewhere and returns what came back.
///
/// Implementations only fail for transport-level problems; every HTTP status,
/// including errors, is returned as an [`ApiResponse`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and wait for its response.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Transport resolving request paths against `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.url(&request.path);
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(request.headers);
        if let Some(body) = request.body.as_ref() {
            let encoded = serde_json::to_vec(body).map_err(|err| Error::Encode(err.to_string()))?;
            builder = builder.body(encoded);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| Error::Network(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| Error::Network(err.to_string()))?;
        debug!(method = %request.method, %url, status, "response received");
        Ok(ApiResponse { status, body })
    }
}
